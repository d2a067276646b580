//! Deterministic in-memory [`Cluster`] for tests.
//!
//! Exec and log results are scripted up front and consumed FIFO. Every call
//! is recorded with the (tokio) instant it arrived, so tests can assert both
//! how often the proxy was queried and how far apart the queries were.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::cluster::{Cluster, ExecError, ExecOutput, PodExec, PodLogs};

/// What a recorded call asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRequest {
    Exec { command: String },
    Logs { previous: bool },
}

/// A call received by [`MockCluster`].
#[derive(Debug, Clone)]
pub struct MockCall {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub request: MockRequest,
    pub at: Instant,
}

impl MockCall {
    /// The exec command line, if this was an exec call.
    pub fn command(&self) -> Option<&str> {
        match &self.request {
            MockRequest::Exec { command } => Some(command),
            MockRequest::Logs { .. } => None,
        }
    }
}

type ExecResult = Result<ExecOutput, ExecError>;
type LogsResult = Result<String, ExecError>;

#[derive(Debug, Default)]
struct Script {
    exec: VecDeque<ExecResult>,
    exec_fallback: Option<ExecResult>,
    logs: VecDeque<LogsResult>,
}

#[derive(Debug, Clone)]
pub struct MockCluster {
    name: String,
    latency: Duration,
    script: Arc<Mutex<Script>>,
    recorded_calls: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockCluster {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl MockCluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO,
            script: Arc::default(),
            recorded_calls: Arc::default(),
        }
    }

    /// Delay every call by `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Append a scripted exec result. Results are consumed FIFO.
    pub fn push_exec(&self, result: ExecResult) {
        self.lock_script().exec.push_back(result);
    }

    /// Script a successful exec printing `body`.
    pub fn push_body(&self, body: impl Into<String>) {
        self.push_exec(Ok(ExecOutput::ok(body)));
    }

    /// Answer with `result` once the FIFO queue is drained.
    pub fn respond_always(&self, result: ExecResult) {
        self.lock_script().exec_fallback = Some(result);
    }

    /// Append a scripted log result. Results are consumed FIFO.
    pub fn push_logs(&self, result: LogsResult) {
        self.lock_script().logs.push_back(result);
    }

    /// Snapshot of all calls received by the mock.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.recorded_calls
            .lock()
            .expect("recorded_calls mutex poisoned")
            .clone()
    }

    /// Exec calls made against one pod.
    #[must_use]
    pub fn exec_calls_for(&self, pod: &str) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.pod == pod && call.command().is_some())
            .collect()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script mutex poisoned")
    }

    fn record(&self, pod: &str, namespace: &str, container: &str, request: MockRequest) {
        self.recorded_calls
            .lock()
            .expect("recorded_calls mutex poisoned")
            .push(MockCall {
                namespace: namespace.to_string(),
                pod: pod.to_string(),
                container: container.to_string(),
                request,
                at: Instant::now(),
            });
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl PodExec for MockCluster {
    async fn pod_exec(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        command: &str,
    ) -> Result<ExecOutput, ExecError> {
        self.record(
            pod,
            namespace,
            container,
            MockRequest::Exec {
                command: command.to_string(),
            },
        );
        self.simulate_latency().await;

        let mut script = self.lock_script();
        match script.exec.pop_front() {
            Some(result) => result,
            None => script
                .exec_fallback
                .clone()
                .unwrap_or_else(|| Err(ExecError::new("mock cluster has no scripted exec results"))),
        }
    }
}

impl PodLogs for MockCluster {
    async fn pod_logs(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        previous: bool,
    ) -> Result<String, ExecError> {
        self.record(pod, namespace, container, MockRequest::Logs { previous });
        self.simulate_latency().await;

        self.lock_script()
            .logs
            .pop_front()
            .unwrap_or_else(|| Err(ExecError::new("mock cluster has no scripted log results")))
    }
}

impl Cluster for MockCluster {
    fn name(&self) -> &str {
        &self.name
    }
}
