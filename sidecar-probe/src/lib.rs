//! Test-side access to an Envoy sidecar through a cluster's exec channel.
//!
//! A [`Sidecar`] runs `pilot-agent request GET <path>` inside the proxy
//! container and decodes the admin response. [`Sidecar::wait_for_config`]
//! polls the config dump until a predicate accepts it, and [`OrFail`] turns
//! any of these results into a test failure.
//!
//! ```ignore
//! use sidecar_probe::{OrFail, ProxyHandle, Sidecar};
//!
//! let sidecar = Sidecar::new(ProxyHandle::new("apps", pod), cluster);
//! sidecar
//!     .wait_for_config(|dump| {
//!         let listeners = dump.listener_names()?;
//!         anyhow::ensure!(listeners.iter().any(|l| l == "virtualInbound"));
//!         Ok(true)
//!     })
//!     .await
//!     .or_fail();
//! ```

pub mod cluster;
pub mod errors;
pub mod handle;
pub mod mock;
pub mod or_fail;
pub mod policy;
pub mod poller;
pub mod sidecar;

pub use cluster::{Cluster, ExecError, ExecOutput, PodExec, PodLogs};
pub use errors::{AdminError, TransientError, WaitError, WaitFailure};
pub use handle::ProxyHandle;
pub use mock::{MockCall, MockCluster, MockRequest};
pub use or_fail::OrFail;
pub use policy::{Backoff, PollPolicy};
pub use poller::{FetchDisposition, classify_fetch_error, poll_config};
pub use sidecar::{LogScope, Sidecar};

pub use sidecar_probe_common as common;
