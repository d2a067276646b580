//! Fail-fast unwrapping for test code.

use std::fmt::Display;

/// Unwrap a result or fail the calling test with the error's message.
///
/// ```ignore
/// let dump = sidecar.config_dump().await.or_fail();
/// sidecar.wait_for_config(has_listener).await.or_fail();
/// ```
///
/// The panic is reported at the caller's location.
pub trait OrFail<T> {
    fn or_fail(self) -> T;
}

impl<T, E: Display> OrFail<T> for Result<T, E> {
    #[track_caller]
    fn or_fail(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                let location = std::panic::Location::caller();
                tracing::error!(%location, error = %err, "test failed");
                panic!("{err}")
            }
        }
    }
}
