use std::fmt;

/// Identifies the pod a sidecar runs in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyHandle {
    pub namespace: String,
    pub pod_name: String,
}

impl ProxyHandle {
    pub fn new(namespace: impl Into<String>, pod_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
        }
    }
}

impl fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.pod_name)
    }
}
