//! Read access to a sidecar's Envoy admin interface.
//!
//! Every query is a single `<agent> request GET <path>` executed in the proxy
//! container, followed by a permissive decode of its stdout. Nothing is cached
//! and nothing is retried here; see [`crate::poller`] for waiting.

use std::sync::Arc;

use sidecar_probe_common::{
    AdminMessage, Clusters, ConfigDump, ConfigError, Decoder, Listeners, ProbeConfig, ServerInfo,
};
use tracing::{debug, warn};

use crate::cluster::Cluster;
use crate::errors::AdminError;
use crate::handle::ProxyHandle;

/// Which container instance to read logs from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogScope {
    /// The running container, since its last restart.
    #[default]
    Current,
    /// The instance that ran before the last restart.
    Previous,
}

impl LogScope {
    fn previous(self) -> bool {
        matches!(self, Self::Previous)
    }
}

/// An Envoy sidecar reachable through a cluster's exec channel.
#[derive(Debug)]
pub struct Sidecar<C> {
    handle: ProxyHandle,
    cluster: Arc<C>,
    config: ProbeConfig,
    decoder: Decoder,
}

impl<C> Clone for Sidecar<C> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            cluster: Arc::clone(&self.cluster),
            config: self.config.clone(),
            decoder: self.decoder.clone(),
        }
    }
}

impl<C: Cluster> Sidecar<C> {
    /// A sidecar with the built-in [`ProbeConfig`] defaults. The
    /// environment is not consulted; use [`Sidecar::from_env`] for that.
    pub fn new(handle: ProxyHandle, cluster: Arc<C>) -> Self {
        Self {
            handle,
            cluster,
            config: ProbeConfig::default(),
            decoder: Decoder::default(),
        }
    }

    /// A sidecar configured from the `SIDECAR_PROBE_*` variables.
    pub fn from_env(handle: ProxyHandle, cluster: Arc<C>) -> Result<Self, ConfigError> {
        let config = ProbeConfig::from_env()?;
        Ok(Self::new(handle, cluster).with_config(config))
    }

    #[must_use]
    pub fn with_config(mut self, config: ProbeConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn handle(&self) -> &ProxyHandle {
        &self.handle
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Fetch one admin snapshot and decode it as `M`.
    pub async fn fetch<M: AdminMessage>(&self) -> Result<M, AdminError> {
        let path = M::KIND.path();
        let command = self.config.admin_command(path);
        let namespace = self.handle.namespace.as_str();
        let pod = self.handle.pod_name.as_str();

        debug!(
            cluster = self.cluster.name(),
            namespace, pod, path, "querying envoy admin"
        );

        let exec_failed = |reason: String, output: String| AdminError::Exec {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            command: command.clone(),
            reason,
            output,
        };

        let output = self
            .cluster
            .pod_exec(pod, namespace, &self.config.container, &command)
            .await
            .map_err(|e| exec_failed(e.reason, e.output.combined_output()))?;

        if !output.success() {
            warn!(
                namespace,
                pod,
                path,
                exit_code = output.exit_code,
                "admin request exited non-zero"
            );
            return Err(exec_failed(
                format!("command exited with status {}", output.exit_code),
                output.combined_output(),
            ));
        }

        self.decoder
            .decode::<M>(&output.stdout)
            .map_err(|source| AdminError::Decode {
                path: path.to_string(),
                source,
                body: output.stdout,
            })
    }

    pub async fn info(&self) -> Result<ServerInfo, AdminError> {
        self.fetch().await
    }

    pub async fn config_dump(&self) -> Result<ConfigDump, AdminError> {
        self.fetch().await
    }

    pub async fn clusters(&self) -> Result<Clusters, AdminError> {
        self.fetch().await
    }

    pub async fn listeners(&self) -> Result<Listeners, AdminError> {
        self.fetch().await
    }

    /// Read the proxy container's logs.
    pub async fn logs(&self, scope: LogScope) -> Result<String, AdminError> {
        let namespace = self.handle.namespace.as_str();
        let pod = self.handle.pod_name.as_str();
        let previous = scope.previous();

        self.cluster
            .pod_logs(pod, namespace, &self.config.container, previous)
            .await
            .map_err(|e| AdminError::Logs {
                namespace: namespace.to_string(),
                pod: pod.to_string(),
                container: self.config.container.clone(),
                previous,
                reason: e.reason,
            })
    }
}
