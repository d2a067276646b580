//! Settings for reaching a sidecar and waiting on its configuration.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use super::env::{EnvError, EnvParser};
use super::source::{ConfigSource, Sourced};

/// Container that hosts the proxy in an injected pod.
pub const DEFAULT_PROXY_CONTAINER: &str = "istio-proxy";

/// Admin CLI shim inside the proxy container.
pub const DEFAULT_AGENT_COMMAND: &str = "pilot-agent";

/// Total time budget for a configuration wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay before the first retry of a configuration wait.
pub const DEFAULT_WAIT_DELAY: Duration = Duration::from_millis(100);

/// Cap on the progressively growing retry delay.
pub const DEFAULT_WAIT_MAX_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Container the admin command is executed in.
    pub container: String,
    /// Executable that forwards `request GET <path>` to the admin port.
    pub agent_command: String,
    pub wait_timeout: Duration,
    pub wait_delay: Duration,
    pub wait_max_delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            container: DEFAULT_PROXY_CONTAINER.to_string(),
            agent_command: DEFAULT_AGENT_COMMAND.to_string(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            wait_delay: DEFAULT_WAIT_DELAY,
            wait_max_delay: DEFAULT_WAIT_MAX_DELAY,
        }
    }
}

/// One or more `SIDECAR_PROBE_*` variables held invalid values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sidecar probe environment: {}", render_errors(.0))]
pub struct ConfigError(pub Vec<EnvError>);

fn render_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProbeConfig {
    /// Load from the environment, failing if any variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut parser = EnvParser::new();
        let config = Self::from_parser(&mut parser);
        if parser.has_errors() {
            return Err(ConfigError(parser.take_errors()));
        }
        Ok(config)
    }

    /// Load from the environment, substituting defaults for invalid values.
    ///
    /// Errors stay recorded on `parser`.
    pub fn from_parser(parser: &mut EnvParser) -> Self {
        let defaults = Self::default();
        let container = parser.get_string("CONTAINER", &defaults.container);
        let agent_command = parser.get_string("AGENT_COMMAND", &defaults.agent_command);
        let wait_timeout = parser.get_duration_ms(
            "WAIT_TIMEOUT_MS",
            defaults.wait_timeout,
            Duration::from_millis(1),
            Duration::from_secs(3600),
        );
        let wait_delay = parser.get_duration_ms(
            "WAIT_DELAY_MS",
            defaults.wait_delay,
            Duration::ZERO,
            Duration::from_secs(60),
        );
        let wait_max_delay = parser.get_duration_ms(
            "WAIT_MAX_DELAY_MS",
            defaults.wait_max_delay,
            Duration::ZERO,
            Duration::from_secs(300),
        );

        let wait_delay = settle(wait_delay);
        Self {
            container: settle(container),
            agent_command: settle(agent_command),
            wait_timeout: settle(wait_timeout),
            wait_delay,
            wait_max_delay: settle(wait_max_delay).max(wait_delay),
        }
    }

    /// The command line that queries `path` on the admin interface.
    pub fn admin_command(&self, path: &str) -> String {
        format!("{} request GET {}", self.agent_command, path)
    }
}

/// Unwrap a setting, noting in the log when the environment supplied it.
fn settle<T: fmt::Debug>(setting: Sourced<T>) -> T {
    if let (ConfigSource::Environment, Some(var)) = (setting.source, &setting.env_var) {
        debug!(
            var = var.as_str(),
            source = %setting.source,
            value = ?setting.value,
            "probe setting read from environment"
        );
    }
    setting.into_inner()
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::testing::env_test_lock;
    use std::env;

    const VARS: [&str; 5] = [
        "SIDECAR_PROBE_CONTAINER",
        "SIDECAR_PROBE_AGENT_COMMAND",
        "SIDECAR_PROBE_WAIT_TIMEOUT_MS",
        "SIDECAR_PROBE_WAIT_DELAY_MS",
        "SIDECAR_PROBE_WAIT_MAX_DELAY_MS",
    ];

    fn cleanup_env() {
        for var in VARS {
            // SAFETY: env access is serialized by env_test_lock
            unsafe { env::remove_var(var) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: env access is serialized by env_test_lock
        unsafe { env::set_var(key, value) };
    }

    #[test]
    fn test_defaults() {
        let _guard = env_test_lock();
        cleanup_env();

        let config = ProbeConfig::from_env().unwrap();
        assert_eq!(config, ProbeConfig::default());
        assert_eq!(config.container, "istio-proxy");
        assert_eq!(config.wait_timeout, Duration::from_secs(30));
        assert_eq!(config.wait_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_overrides() {
        let _guard = env_test_lock();
        cleanup_env();

        set_env("SIDECAR_PROBE_CONTAINER", "envoy");
        set_env("SIDECAR_PROBE_AGENT_COMMAND", "/usr/local/bin/pilot-agent");
        set_env("SIDECAR_PROBE_WAIT_TIMEOUT_MS", "5000");
        set_env("SIDECAR_PROBE_WAIT_DELAY_MS", "50");

        let config = ProbeConfig::from_env().unwrap();
        assert_eq!(config.container, "envoy");
        assert_eq!(config.wait_timeout, Duration::from_secs(5));
        assert_eq!(config.wait_delay, Duration::from_millis(50));
        assert_eq!(
            config.admin_command("config_dump"),
            "/usr/local/bin/pilot-agent request GET config_dump"
        );

        cleanup_env();
    }

    #[test]
    fn test_invalid_values_are_reported_together() {
        let _guard = env_test_lock();
        cleanup_env();

        set_env("SIDECAR_PROBE_WAIT_TIMEOUT_MS", "forever");
        set_env("SIDECAR_PROBE_WAIT_DELAY_MS", "999999");

        let err = ProbeConfig::from_env().unwrap_err();
        assert_eq!(err.0.len(), 2);
        let message = err.to_string();
        assert!(message.contains("SIDECAR_PROBE_WAIT_TIMEOUT_MS"));
        assert!(message.contains("SIDECAR_PROBE_WAIT_DELAY_MS"));

        let mut parser = EnvParser::new();
        let lossy = ProbeConfig::from_parser(&mut parser);
        assert_eq!(lossy.wait_timeout, DEFAULT_WAIT_TIMEOUT);
        assert_eq!(lossy.wait_delay, DEFAULT_WAIT_DELAY);
        assert!(parser.has_errors());

        cleanup_env();
    }

    #[test]
    fn test_max_delay_never_below_delay() {
        let _guard = env_test_lock();
        cleanup_env();

        set_env("SIDECAR_PROBE_WAIT_DELAY_MS", "3000");
        set_env("SIDECAR_PROBE_WAIT_MAX_DELAY_MS", "1000");

        let config = ProbeConfig::from_env().unwrap();
        assert_eq!(config.wait_max_delay, Duration::from_secs(3));

        cleanup_env();
    }

    #[test]
    fn test_admin_command_default() {
        assert_eq!(
            ProbeConfig::default().admin_command("clusters?format=json"),
            "pilot-agent request GET clusters?format=json"
        );
    }

    #[test]
    fn test_settle_keeps_value_from_either_source() {
        assert_eq!(settle(Sourced::default_value(7u64)), 7);
        assert_eq!(
            settle(Sourced::from_env("proxy".to_string(), "SIDECAR_PROBE_CONTAINER")),
            "proxy"
        );
    }
}
