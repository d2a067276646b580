//! Remote-execution and log channels into a cluster.
//!
//! The probe never talks to the proxy over the network. Everything goes
//! through a [`Cluster`]: a command executed inside a named container of a
//! pod, or a log read from one. Implementations wrap whatever transport the
//! test environment has (kube exec, `kubectl`, ...).

use std::future::Future;

/// Captured output of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    /// Output of a command that exited 0 and printed `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, as captured.
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// The channel itself failed: the command could not be started, the stream
/// broke, or the pod went away.
///
/// Whatever the command printed before the failure is kept in `output`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ExecError {
    pub reason: String,
    pub output: ExecOutput,
}

impl ExecError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            output: ExecOutput::default(),
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: ExecOutput) -> Self {
        self.output = output;
        self
    }
}

/// Executes a command inside a container.
pub trait PodExec: Send + Sync {
    fn pod_exec(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        command: &str,
    ) -> impl Future<Output = Result<ExecOutput, ExecError>> + Send;
}

/// Reads a container's logs.
pub trait PodLogs: Send + Sync {
    /// `previous` selects the container instance before the last restart
    /// instead of the running one.
    fn pod_logs(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        previous: bool,
    ) -> impl Future<Output = Result<String, ExecError>> + Send;
}

/// A cluster a proxy runs in, as seen through its exec and log channels.
pub trait Cluster: PodExec + PodLogs {
    /// Display name used in diagnostics.
    fn name(&self) -> &str;
}
