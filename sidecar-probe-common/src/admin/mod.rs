//! Envoy admin API message model.
//!
//! Each administrative read endpoint maps to exactly one message type:
//!
//! | Kind | Query path | Type |
//! |------|------------|------|
//! | server info | `server_info` | [`ServerInfo`] |
//! | config dump | `config_dump` | [`ConfigDump`] |
//! | cluster table | `clusters?format=json` | [`Clusters`] |
//! | listener table | `listeners?format=json` | [`Listeners`] |
//!
//! All types are permissive: fields this client does not know about are
//! ignored, and every known field is optional or defaulted so that newer
//! proxy versions keep decoding.

pub mod clusters;
pub mod config_dump;
pub mod listeners;
pub mod server_info;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::decode::DecodeError;

pub use clusters::{Clusters, ClusterStatus, HostHealthStatus, HostStatus, SimpleMetric};
pub use config_dump::{
    BootstrapConfigDump, ClustersConfigDump, ConfigDump, ConfigSection, DynamicCluster,
    DynamicListener, DynamicListenerState, DynamicRouteConfig, ListenersConfigDump,
    RoutesConfigDump, StaticCluster, StaticListener, StaticRouteConfig, UpdateFailureState,
};
pub use listeners::{Address, ListenerStatus, Listeners, Pipe, SocketAddress};
pub use server_info::{Node, ServerInfo, ServerState};

/// The closed set of snapshot kinds a sidecar exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    ServerInfo,
    ConfigDump,
    Clusters,
    Listeners,
}

impl SnapshotKind {
    pub const ALL: [SnapshotKind; 4] = [
        SnapshotKind::ServerInfo,
        SnapshotKind::ConfigDump,
        SnapshotKind::Clusters,
        SnapshotKind::Listeners,
    ];

    /// Admin endpoint path, relative to the admin root.
    pub fn path(self) -> &'static str {
        match self {
            Self::ServerInfo => "server_info",
            Self::ConfigDump => "config_dump",
            Self::Clusters => "clusters?format=json",
            Self::Listeners => "listeners?format=json",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerInfo => write!(f, "server_info"),
            Self::ConfigDump => write!(f, "config_dump"),
            Self::Clusters => write!(f, "clusters"),
            Self::Listeners => write!(f, "listeners"),
        }
    }
}

/// A message returned by one of the admin read endpoints.
pub trait AdminMessage:
    DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Snapshot kind this message decodes from.
    const KIND: SnapshotKind;

    /// Validates that every embedded typed payload names its type.
    ///
    /// Runs on the raw JSON before deserialization.
    fn check_discriminators(_raw: &Value) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// A typed payload carried as JSON with an `@type` discriminator.
///
/// The payload fields are kept as raw JSON; use [`AnyMessage::decode_as`]
/// to project them onto a concrete type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnyMessage {
    #[serde(rename = "@type", default, skip_serializing_if = "String::is_empty")]
    pub type_url: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AnyMessage {
    /// Fully-qualified message name (the part after the last `/`).
    pub fn type_name(&self) -> &str {
        self.type_url
            .rsplit_once('/')
            .map_or(self.type_url.as_str(), |(_, name)| name)
    }

    /// The payload's `name` field, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Deserialize the payload fields into `T`.
    pub fn decode_as<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

/// Accepts a uint64 encoded either as a JSON number or as a string.
///
/// The proto3 JSON mapping emits 64-bit integers as strings; older admin
/// handlers emitted plain numbers.
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    match Option::<Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Repr::Number(n)) => Ok(Some(n)),
        Some(Repr::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
