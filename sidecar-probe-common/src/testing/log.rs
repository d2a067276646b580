//! Structured test logging for CI debugging.
//!
//! Call [`init_test_logging`] once from test setup (it is safe to call from
//! every test) to route `tracing` output from both crates to the test
//! writer, and optionally to a JSONL file:
//!
//! ```ignore
//! use sidecar_probe_common::testing::init_test_logging;
//!
//! #[test]
//! fn test_something() {
//!     init_test_logging();
//!     // ...
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `SIDECAR_PROBE_TEST_LOG_LEVEL`: level filter (default: `info`)
//! - `SIDECAR_PROBE_TEST_LOG_FILE`: also append JSON events to this file

use std::path::Path;
use std::sync::{Mutex, Once};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

use crate::config::EnvParser;

static GLOBAL_LOGGING_INIT: Once = Once::new();

/// Crate targets the filter applies the configured level to.
const LOG_TARGETS: &[&str] = &["sidecar_probe", "sidecar_probe_common"];

/// Install the global test subscriber. Only the first call has an effect.
pub fn init_test_logging() {
    GLOBAL_LOGGING_INIT.call_once(|| {
        let mut parser = EnvParser::new();
        let level = parser.get_log_level("TEST_LOG_LEVEL", "info").into_inner();
        let log_file = parser
            .get_optional_string("TEST_LOG_FILE")
            .into_inner()
            .and_then(|path| create_log_file(Path::new(&path)));

        let file_layer = log_file.map(|file| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
        });

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_level(true)
            .compact();

        let filter = tracing_subscriber::EnvFilter::try_new(filter_directive(&level))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(stderr_layer);

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Filter directive applying `level` to this workspace's crates.
pub fn filter_directive(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn create_log_file(path: &Path) -> Option<std::fs::File> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_covers_both_crates() {
        assert_eq!(
            filter_directive("debug"),
            "sidecar_probe=debug,sidecar_probe_common=debug"
        );
    }

    #[test]
    fn test_create_log_file_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("probe.jsonl");
        assert!(create_log_file(&path).is_some());
        assert!(path.exists());
    }

    #[test]
    fn test_init_is_idempotent() {
        init_test_logging();
        init_test_logging();
        tracing::info!(check = "idempotent", "logging initialized twice");
    }
}
