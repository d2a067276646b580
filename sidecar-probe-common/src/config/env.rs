//! Typed reads of `SIDECAR_PROBE_*` environment variables.
//!
//! Invalid values never abort a read: the default is substituted and an
//! [`EnvError`] is recorded on the parser, so a caller can report every bad
//! variable at once (see [`super::ProbeConfig::from_env`]).

use super::source::Sourced;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by every variable this crate reads.
pub const ENV_PREFIX: &str = "SIDECAR_PROBE_";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("{var}='{value}' is not {expected}")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    #[error("{var}={value} is outside {min}..={max}")]
    OutOfRange {
        var: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("{var}='{value}' is not a log level (one of trace, debug, info, warn, error, off)")]
    InvalidLogLevel { var: String, value: String },
}

/// Reads prefixed variables and collects what was wrong with them.
#[derive(Debug, Default)]
pub struct EnvParser {
    errors: Vec<EnvError>,
}

impl EnvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// Full variable name and its raw value, if set.
    fn lookup(name: &str) -> (String, Option<String>) {
        let var = format!("{ENV_PREFIX}{name}");
        let value = env::var(&var).ok();
        (var, value)
    }

    /// Trimmed string; unset or blank falls back to `default`.
    pub fn get_string(&mut self, name: &str, default: &str) -> Sourced<String> {
        match Self::lookup(name) {
            (var, Some(value)) if !value.trim().is_empty() => {
                Sourced::from_env(value.trim().to_string(), var)
            }
            _ => Sourced::default_value(default.to_string()),
        }
    }

    /// Integer within `min..=max`.
    pub fn get_u64_range(&mut self, name: &str, default: u64, min: u64, max: u64) -> Sourced<u64> {
        let (var, Some(raw)) = Self::lookup(name) else {
            return Sourced::default_value(default);
        };
        let Ok(n) = raw.trim().parse::<u64>() else {
            self.errors.push(EnvError::InvalidValue {
                var,
                expected: "a non-negative integer".to_string(),
                value: raw,
            });
            return Sourced::default_value(default);
        };
        if (min..=max).contains(&n) {
            return Sourced::from_env(n, var);
        }
        self.errors.push(EnvError::OutOfRange {
            var: var.clone(),
            value: n.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
        Sourced::from_env(default, var)
    }

    /// Duration given in whole milliseconds, within `min..=max`.
    pub fn get_duration_ms(
        &mut self,
        name: &str,
        default: Duration,
        min: Duration,
        max: Duration,
    ) -> Sourced<Duration> {
        self.get_u64_range(name, millis(default), millis(min), millis(max))
            .map(Duration::from_millis)
    }

    /// A `tracing` level name, lowercased.
    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let (var, Some(raw)) = Self::lookup(name) else {
            return Sourced::default_value(default.to_string());
        };
        let level = raw.trim().to_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            return Sourced::from_env(level, var);
        }
        self.errors.push(EnvError::InvalidLogLevel {
            var: var.clone(),
            value: raw,
        });
        Sourced::from_env(default.to_string(), var)
    }

    /// `None` when unset or empty.
    pub fn get_optional_string(&mut self, name: &str) -> Sourced<Option<String>> {
        match Self::lookup(name) {
            (var, Some(value)) => Sourced::from_env(Some(value).filter(|v| !v.is_empty()), var),
            (_, None) => Sourced::default_value(None),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
