//! Test support shared by the workspace's test suites.

pub mod log;

use std::sync::{Mutex, MutexGuard, OnceLock};

pub use log::{filter_directive, init_test_logging};

/// Serializes tests that read or mutate `SIDECAR_PROBE_*` variables.
///
/// The environment is process-wide, so every test in a binary that touches
/// it must hold this guard for its whole body.
pub fn env_test_lock() -> MutexGuard<'static, ()> {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
