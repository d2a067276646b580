//! `/config_dump` response and its typed sections.
//!
//! A config dump is a list of typed payloads, one per config provider
//! (bootstrap, clusters, listeners, routes, secrets, ...). The list itself is
//! kept as [`AnyMessage`]s; [`ConfigDump::section`] projects an entry onto
//! one of the section types below.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AdminMessage, AnyMessage, SnapshotKind};
use crate::decode::DecodeError;

/// Where each admin section embeds typed resources.
///
/// Keyed by the section's message name (without package, so every API
/// version matches). Each entry names a repeated field of the section and
/// the paths, relative to one element, that hold an `Any`. Only these
/// positions must carry `@type`; the resources themselves are payload and
/// are never inspected.
const TYPED_POSITIONS: &[(&str, &[(&str, &[&str])])] = &[
    (
        "ClustersConfigDump",
        &[
            ("static_clusters", &["cluster"]),
            (
                "dynamic_active_clusters",
                &["cluster", "error_state.failed_configuration"],
            ),
            (
                "dynamic_warming_clusters",
                &["cluster", "error_state.failed_configuration"],
            ),
        ],
    ),
    (
        "ListenersConfigDump",
        &[
            ("static_listeners", &["listener"]),
            (
                "dynamic_listeners",
                &[
                    "active_state.listener",
                    "warming_state.listener",
                    "draining_state.listener",
                    "error_state.failed_configuration",
                ],
            ),
        ],
    ),
    (
        "RoutesConfigDump",
        &[
            ("static_route_configs", &["route_config"]),
            (
                "dynamic_route_configs",
                &["route_config", "error_state.failed_configuration"],
            ),
        ],
    ),
    (
        "ScopedRoutesConfigDump",
        &[
            ("inline_scoped_route_configs", &["scoped_route_configs"]),
            (
                "dynamic_scoped_route_configs",
                &["scoped_route_configs", "error_state.failed_configuration"],
            ),
        ],
    ),
    (
        "SecretsConfigDump",
        &[
            ("static_secrets", &["secret"]),
            ("dynamic_active_secrets", &["secret", "error_state.failed_configuration"]),
            ("dynamic_warming_secrets", &["secret", "error_state.failed_configuration"]),
        ],
    ),
    (
        "EndpointsConfigDump",
        &[
            ("static_endpoint_configs", &["endpoint_config"]),
            (
                "dynamic_endpoint_configs",
                &["endpoint_config", "error_state.failed_configuration"],
            ),
        ],
    ),
    (
        "EcdsConfigDump",
        &[("ecds_filters", &["ecds_filter", "error_state.failed_configuration"])],
    ),
];

/// Full admin-exposed configuration of the proxy at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDump {
    pub configs: Vec<AnyMessage>,
}

impl AdminMessage for ConfigDump {
    const KIND: SnapshotKind = SnapshotKind::ConfigDump;

    fn check_discriminators(raw: &Value) -> Result<(), DecodeError> {
        let Some(configs) = raw.get("configs").and_then(Value::as_array) else {
            return Ok(());
        };
        for (i, config) in configs.iter().enumerate() {
            let location = format!("configs[{i}]");
            require_type(config, &location)?;
            check_section(config, &location)?;
        }
        Ok(())
    }
}

fn require_type(value: &Value, location: &str) -> Result<(), DecodeError> {
    match value {
        Value::Object(map) if !map.contains_key("@type") => {
            Err(DecodeError::MissingTypeDiscriminator {
                location: location.to_string(),
            })
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(j, item)| require_type(item, &format!("{location}[{j}]"))),
        _ => Ok(()),
    }
}

/// Check the typed positions of one `configs` entry.
///
/// Sections this client has no layout for are left alone.
fn check_section(config: &Value, location: &str) -> Result<(), DecodeError> {
    let Some(type_url) = config.get("@type").and_then(Value::as_str) else {
        return Ok(());
    };
    let message = type_url.rsplit(['/', '.']).next().unwrap_or(type_url);
    let Some((_, fields)) = TYPED_POSITIONS.iter().find(|(name, _)| *name == message) else {
        return Ok(());
    };

    for (field, paths) in *fields {
        let Some(entries) = config.get(*field).and_then(Value::as_array) else {
            continue;
        };
        for (j, entry) in entries.iter().enumerate() {
            for path in *paths {
                let mut value = Some(entry);
                for key in path.split('.') {
                    value = value.and_then(|v| v.get(key));
                }
                if let Some(value) = value {
                    require_type(value, &format!("{location}.{field}[{j}].{path}"))?;
                }
            }
        }
    }
    Ok(())
}

/// A config dump entry type that can be projected from [`ConfigDump`].
pub trait ConfigSection: DeserializeOwned {
    /// Fully-qualified message name carried in the entry's `@type`.
    const TYPE_NAME: &'static str;
}

impl ConfigDump {
    /// First entry whose type name matches.
    pub fn find(&self, type_name: &str) -> Option<&AnyMessage> {
        self.configs.iter().find(|c| c.type_name() == type_name)
    }

    /// Type names of all entries, in dump order.
    pub fn type_names(&self) -> Vec<&str> {
        self.configs.iter().map(AnyMessage::type_name).collect()
    }

    /// Decode the section of type `S`, or `None` when the dump has no such
    /// entry.
    pub fn section<S: ConfigSection>(&self) -> Result<Option<S>, DecodeError> {
        self.find(S::TYPE_NAME)
            .map(AnyMessage::decode_as::<S>)
            .transpose()
    }

    /// Names of static and actively-serving dynamic listeners.
    pub fn listener_names(&self) -> Result<Vec<String>, DecodeError> {
        let Some(dump) = self.section::<ListenersConfigDump>()? else {
            return Ok(Vec::new());
        };
        let statics = dump
            .static_listeners
            .iter()
            .filter_map(|l| l.listener.name().map(str::to_string));
        let dynamics = dump
            .dynamic_listeners
            .iter()
            .filter(|l| l.active_state.is_some())
            .map(|l| l.name.clone());
        Ok(statics.chain(dynamics).collect())
    }

    /// Names of static and dynamically-added active clusters.
    pub fn cluster_names(&self) -> Result<Vec<String>, DecodeError> {
        let Some(dump) = self.section::<ClustersConfigDump>()? else {
            return Ok(Vec::new());
        };
        let statics = dump.static_clusters.iter().map(|c| &c.cluster);
        let dynamics = dump.dynamic_active_clusters.iter().map(|c| &c.cluster);
        Ok(statics
            .chain(dynamics)
            .filter_map(|c| c.name().map(str::to_string))
            .collect())
    }

    /// Names of static and dynamic route configurations.
    pub fn route_config_names(&self) -> Result<Vec<String>, DecodeError> {
        let Some(dump) = self.section::<RoutesConfigDump>()? else {
            return Ok(Vec::new());
        };
        let statics = dump.static_route_configs.iter().map(|r| &r.route_config);
        let dynamics = dump.dynamic_route_configs.iter().map(|r| &r.route_config);
        Ok(statics
            .chain(dynamics)
            .filter_map(|r| r.name().map(str::to_string))
            .collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfigDump {
    pub bootstrap: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl ConfigSection for BootstrapConfigDump {
    const TYPE_NAME: &'static str = "envoy.admin.v3.BootstrapConfigDump";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClustersConfigDump {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
    pub static_clusters: Vec<StaticCluster>,
    pub dynamic_active_clusters: Vec<DynamicCluster>,
    pub dynamic_warming_clusters: Vec<DynamicCluster>,
}

impl ConfigSection for ClustersConfigDump {
    const TYPE_NAME: &'static str = "envoy.admin.v3.ClustersConfigDump";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticCluster {
    pub cluster: AnyMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicCluster {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
    pub cluster: AnyMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenersConfigDump {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
    pub static_listeners: Vec<StaticListener>,
    pub dynamic_listeners: Vec<DynamicListener>,
}

impl ConfigSection for ListenersConfigDump {
    const TYPE_NAME: &'static str = "envoy.admin.v3.ListenersConfigDump";
}

impl ListenersConfigDump {
    /// Names of dynamic listeners that are still warming.
    pub fn warming(&self) -> Vec<&str> {
        self.dynamic_listeners
            .iter()
            .filter(|l| l.warming_state.is_some())
            .map(|l| l.name.as_str())
            .collect()
    }

    /// Dynamic listeners whose last update was rejected by the proxy.
    pub fn errored(&self) -> Vec<&DynamicListener> {
        self.dynamic_listeners
            .iter()
            .filter(|l| l.error_state.is_some())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticListener {
    pub listener: AnyMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicListener {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_state: Option<DynamicListenerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warming_state: Option<DynamicListenerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draining_state: Option<DynamicListenerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_state: Option<UpdateFailureState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicListenerState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
    pub listener: AnyMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateFailureState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_configuration: Option<AnyMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_attempt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfigDump {
    pub static_route_configs: Vec<StaticRouteConfig>,
    pub dynamic_route_configs: Vec<DynamicRouteConfig>,
}

impl ConfigSection for RoutesConfigDump {
    const TYPE_NAME: &'static str = "envoy.admin.v3.RoutesConfigDump";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticRouteConfig {
    pub route_config: AnyMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicRouteConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
    pub route_config: AnyMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}
