//! Waiting for a sidecar's config dump to satisfy a predicate.
//!
//! Each attempt fetches the full config dump and hands it to the caller's
//! predicate:
//!
//! - `Ok(true)` accepts (after `converge` consecutive acceptances)
//! - `Ok(false)` rejects the config outright, without retrying
//! - `Err(_)` means "not yet" and is retried until the timeout
//!
//! Fetch failures are retried too, unless [`classify_fetch_error`] says the
//! response can never decode. Whatever ends the wait, the error carries the
//! last config dump that did decode.

use std::future::Future;

use sidecar_probe_common::ConfigDump;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use crate::cluster::Cluster;
use crate::errors::{AdminError, TransientError, WaitError, WaitFailure};
use crate::policy::PollPolicy;
use crate::sidecar::Sidecar;

/// What a failed fetch means for the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    /// Retrying cannot help; stop now.
    Terminal,
    /// Retry after the backoff delay.
    Transient,
}

/// Decide whether a failed config dump fetch is worth retrying.
///
/// Only responses naming a type the decoder cannot resolve, or embedding a
/// payload without `@type`, are terminal. Transport failures and other
/// decode failures are expected while a proxy starts up.
pub fn classify_fetch_error(err: &AdminError) -> FetchDisposition {
    match err.decode_error() {
        Some(decode) if decode.is_structural() => FetchDisposition::Terminal,
        _ => FetchDisposition::Transient,
    }
}

/// Poll `fetch` until `accept` accepts, rejects, or the policy times out.
///
/// `label` names the proxy in log events.
pub async fn poll_config<F, Fut, A>(
    label: &str,
    policy: &PollPolicy,
    mut fetch: F,
    mut accept: A,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ConfigDump, AdminError>>,
    A: FnMut(&ConfigDump) -> anyhow::Result<bool>,
{
    let start = Instant::now();
    let required = policy.required_acceptances();
    let mut attempt = 0u32;
    let mut accepted = 0u32;
    let mut last_config: Option<ConfigDump> = None;

    loop {
        attempt += 1;
        debug!(proxy = label, attempt, "fetching config_dump");

        let transient = match fetch().await {
            Err(err) => match classify_fetch_error(&err) {
                FetchDisposition::Terminal => {
                    warn!(
                        proxy = label,
                        attempt,
                        error = %err,
                        "config_dump can never decode"
                    );
                    let failure = WaitFailure::Unparseable(err);
                    return Err(WaitError::new(failure, last_config, attempt));
                }
                FetchDisposition::Transient => {
                    accepted = 0;
                    TransientError::Fetch(err)
                }
            },
            Ok(config) => {
                let verdict = accept(&config);
                last_config = Some(config);
                match verdict {
                    Ok(true) => {
                        accepted += 1;
                        if accepted >= required {
                            info!(
                                proxy = label,
                                attempt,
                                elapsed_ms = start.elapsed().as_millis() as u64,
                                "envoy config accepted"
                            );
                            return Ok(());
                        }
                        TransientError::NotConverged { accepted, required }
                    }
                    Ok(false) => {
                        warn!(proxy = label, attempt, "envoy config rejected");
                        return Err(WaitError::new(WaitFailure::Rejected, last_config, attempt));
                    }
                    Err(err) => {
                        accepted = 0;
                        TransientError::Predicate(err)
                    }
                }
            }
        };

        let delay = policy.backoff_delay(attempt);
        let deadline = start + policy.timeout;
        if Instant::now() >= deadline {
            return Err(timed_out(label, start, attempt, transient, last_config));
        }
        if Instant::now() + delay > deadline {
            // The next fetch would start after the budget ran out.
            debug!(
                proxy = label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "backoff outlasts the budget, waiting out the deadline"
            );
            sleep_until(deadline).await;
            return Err(timed_out(label, start, attempt, transient, last_config));
        }

        debug!(
            proxy = label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            reason = %transient,
            "config not ready, retrying after backoff"
        );
        sleep(delay).await;
    }
}

fn timed_out(
    label: &str,
    start: Instant,
    attempts: u32,
    last: TransientError,
    last_config: Option<ConfigDump>,
) -> WaitError {
    let elapsed = start.elapsed();
    warn!(
        proxy = label,
        attempts,
        elapsed_ms = elapsed.as_millis() as u64,
        last_error = %last,
        "timed out waiting for envoy config"
    );
    let failure = WaitFailure::Timeout {
        attempts,
        elapsed,
        last,
    };
    WaitError::new(failure, last_config, attempts)
}

impl<C: Cluster> Sidecar<C> {
    /// Wait for the config dump to be accepted, using the policy derived
    /// from this sidecar's [`ProbeConfig`](sidecar_probe_common::ProbeConfig).
    pub async fn wait_for_config<A>(&self, accept: A) -> Result<(), WaitError>
    where
        A: FnMut(&ConfigDump) -> anyhow::Result<bool>,
    {
        let policy = PollPolicy::from_config(self.config());
        self.wait_for_config_with(accept, &policy).await
    }

    pub async fn wait_for_config_with<A>(
        &self,
        accept: A,
        policy: &PollPolicy,
    ) -> Result<(), WaitError>
    where
        A: FnMut(&ConfigDump) -> anyhow::Result<bool>,
    {
        let label = self.handle().to_string();
        poll_config(&label, policy, || self.config_dump(), accept).await
    }
}
