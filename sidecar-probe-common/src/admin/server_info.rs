//! `/server_info` response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AdminMessage, SnapshotKind};

/// Proxy server identity and lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    /// Build version string, e.g. `<sha>/1.27.0/Clean/RELEASE/BoringSSL`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "ServerState::is_unreported")]
    pub state: ServerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_restart_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_current_epoch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_all_epochs: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub command_line_options: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
}

impl ServerInfo {
    pub fn is_live(&self) -> bool {
        self.state == ServerState::Live
    }
}

impl AdminMessage for ServerInfo {
    const KIND: SnapshotKind = SnapshotKind::ServerInfo;
}

/// Lifecycle state as reported by the proxy.
///
/// States this client does not know are kept verbatim, so a rendered
/// snapshot shows exactly what the proxy said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServerState {
    Live,
    Draining,
    PreInitializing,
    Initializing,
    Other(String),
}

impl ServerState {
    /// The response carried no state at all.
    pub fn is_unreported(&self) -> bool {
        matches!(self, Self::Other(s) if s.is_empty())
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for ServerState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "LIVE" => Self::Live,
            "DRAINING" => Self::Draining,
            "PRE_INITIALIZING" => Self::PreInitializing,
            "INITIALIZING" => Self::Initializing,
            _ => Self::Other(state),
        }
    }
}

impl From<ServerState> for String {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Live => "LIVE".to_string(),
            ServerState::Draining => "DRAINING".to_string(),
            ServerState::PreInitializing => "PRE_INITIALIZING".to_string(),
            ServerState::Initializing => "INITIALIZING".to_string(),
            ServerState::Other(state) => state,
        }
    }
}

/// Node identity the proxy presents to its control plane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent_name: Option<String>,
}
