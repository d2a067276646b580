//! Configuration system for sidecar-probe.
//!
//! Settings come from `SIDECAR_PROBE_*` environment variables with typed
//! parsing, error collection, and source tracking.

pub mod env;
pub mod probe;
pub mod source;

pub use env::{ENV_PREFIX, EnvError, EnvParser};
pub use probe::{
    ConfigError, DEFAULT_AGENT_COMMAND, DEFAULT_PROXY_CONTAINER, DEFAULT_WAIT_DELAY,
    DEFAULT_WAIT_MAX_DELAY, DEFAULT_WAIT_TIMEOUT, ProbeConfig,
};
pub use source::{ConfigSource, Sourced};
