//! Shared types for sidecar-probe.
//!
//! - [`admin`]: Envoy admin API messages, one type per snapshot kind
//! - [`decode`]: permissive JSON decoding, `@type` resolution and rendering
//! - [`config`]: `SIDECAR_PROBE_*` environment configuration
//! - [`testing`]: structured logging for test suites

pub mod admin;
pub mod config;
pub mod decode;
pub mod testing;

pub use admin::{
    AdminMessage, AnyMessage, Clusters, ConfigDump, ConfigSection, Listeners, ServerInfo,
    SnapshotKind,
};
pub use config::{ConfigError, EnvError, EnvParser, ProbeConfig};
pub use decode::{DecodeError, Decoder, TypeRegistry, render};
