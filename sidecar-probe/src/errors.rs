//! Error types for admin access and configuration polling.

use std::time::Duration;

use serde::Serialize;
use sidecar_probe_common::{ConfigDump, DecodeError, render};

/// A single admin query or log read failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    /// The exec channel failed or the command exited non-zero.
    #[error(
        "failed exec on pod {namespace}/{pod}: {reason}. Command: {command}. Output:\n{output}"
    )]
    Exec {
        namespace: String,
        pod: String,
        command: String,
        reason: String,
        output: String,
    },

    /// The command succeeded but its output is not the expected message.
    #[error("failed parsing Envoy admin response from '/{path}': {source}\nResponse JSON: {body}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
        body: String,
    },

    #[error("failed reading logs of {namespace}/{pod} (container {container}, previous: {previous}): {reason}")]
    Logs {
        namespace: String,
        pod: String,
        container: String,
        previous: bool,
        reason: String,
    },
}

impl AdminError {
    /// The decode failure behind this error, if it is one.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode { source, .. } => Some(source),
            Self::Exec { .. } | Self::Logs { .. } => None,
        }
    }
}

/// Why one poll attempt did not end the wait.
#[derive(Debug, thiserror::Error)]
pub enum TransientError {
    #[error(transparent)]
    Fetch(AdminError),

    #[error("{0:#}")]
    Predicate(anyhow::Error),

    #[error("config accepted {accepted} of {required} consecutive times")]
    NotConverged { accepted: u32, required: u32 },
}

/// The reason a wait ended without the config being accepted.
#[derive(Debug, thiserror::Error)]
pub enum WaitFailure {
    /// The proxy returned a config dump this client can never decode.
    #[error(transparent)]
    Unparseable(AdminError),

    #[error("envoy config rejected")]
    Rejected,

    #[error("timeout while waiting after {attempts} attempts (last error: {last})")]
    Timeout {
        attempts: u32,
        elapsed: Duration,
        last: TransientError,
    },
}

impl WaitFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// A wait for Envoy configuration failed.
///
/// Carries the last config dump decoded during the wait, so the report shows
/// what the proxy actually had.
#[derive(Debug, thiserror::Error)]
#[error(
    "failed waiting for Envoy configuration: {failure}. Last config_dump:\n{}",
    .rendered.as_deref().unwrap_or("nil")
)]
pub struct WaitError {
    pub(crate) failure: WaitFailure,
    pub(crate) last_config: Option<ConfigDump>,
    pub(crate) rendered: Option<String>,
    pub(crate) attempts: u32,
}

impl WaitError {
    /// Renders `last_config` up front so the message never borrows it.
    pub fn new(failure: WaitFailure, last_config: Option<ConfigDump>, attempts: u32) -> Self {
        let rendered = last_config.as_ref().map(render_snapshot);
        Self {
            failure,
            last_config,
            rendered,
            attempts,
        }
    }

    pub fn failure(&self) -> &WaitFailure {
        &self.failure
    }

    pub fn last_config(&self) -> Option<&ConfigDump> {
        self.last_config.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Indented JSON for a snapshot, or a marker naming why it could not be
/// rendered. Never `nil`, which is reserved for "nothing decoded".
fn render_snapshot<M: Serialize>(snapshot: &M) -> String {
    render(snapshot).unwrap_or_else(|e| format!("<render failed: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn exec_error() -> AdminError {
        AdminError::Exec {
            namespace: "apps".to_string(),
            pod: "echo-a".to_string(),
            command: "pilot-agent request GET config_dump".to_string(),
            reason: "exit status 1".to_string(),
            output: "connection refused".to_string(),
        }
    }

    #[test]
    fn test_exec_error_names_pod_command_and_output() {
        let msg = exec_error().to_string();
        assert_eq!(
            msg,
            "failed exec on pod apps/echo-a: exit status 1. \
             Command: pilot-agent request GET config_dump. Output:\nconnection refused"
        );
    }

    #[test]
    fn test_decode_error_embeds_path_and_body() {
        let err = AdminError::Decode {
            path: "server_info".to_string(),
            source: DecodeError::Malformed("expected value at line 1 column 1".to_string()),
            body: "not json".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed parsing Envoy admin response from '/server_info'"));
        assert!(msg.ends_with("Response JSON: not json"));
        assert!(err.decode_error().is_some());
        assert!(exec_error().decode_error().is_none());
    }

    #[test]
    fn test_predicate_error_shows_context_chain() {
        let err = anyhow::anyhow!("listener missing").context("checking outbound listeners");
        let transient = TransientError::Predicate(err);
        assert_eq!(
            transient.to_string(),
            "checking outbound listeners: listener missing"
        );
    }

    #[test]
    fn test_wait_error_without_snapshot_renders_nil() {
        let err = WaitError::new(WaitFailure::Rejected, None, 1);
        assert_eq!(
            err.to_string(),
            "failed waiting for Envoy configuration: envoy config rejected. Last config_dump:\nnil"
        );
        assert!(err.failure().is_rejected());
        assert_eq!(err.attempts(), 1);
    }

    #[test]
    fn test_timeout_reports_attempts_and_last_error() {
        let failure = WaitFailure::Timeout {
            attempts: 7,
            elapsed: Duration::from_secs(1),
            last: TransientError::Fetch(exec_error()),
        };
        let msg = failure.to_string();
        assert!(msg.starts_with("timeout while waiting after 7 attempts (last error: failed exec"));
        assert!(failure.is_timeout());
    }

    #[test]
    fn test_wait_error_renders_snapshot_indented() {
        let err = WaitError::new(WaitFailure::Rejected, Some(ConfigDump::default()), 2);
        assert!(err.to_string().ends_with("Last config_dump:\n{\n  \"configs\": []\n}"));
        assert_eq!(err.attempts(), 2);
    }

    #[test]
    fn test_unrenderable_snapshot_is_not_reported_as_nil() {
        let snapshot: BTreeMap<[u8; 2], u8> = BTreeMap::from([([1, 2], 3)]);
        let rendered = render_snapshot(&snapshot);
        assert!(rendered.starts_with("<render failed: "), "{rendered}");
        assert_ne!(rendered, "nil");
    }
}
