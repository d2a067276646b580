//! `/listeners?format=json` response.

use serde::{Deserialize, Serialize};

use super::{AdminMessage, SnapshotKind};

/// The proxy's live listener table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Listeners {
    pub listener_statuses: Vec<ListenerStatus>,
}

impl Listeners {
    pub fn names(&self) -> Vec<&str> {
        self.listener_statuses
            .iter()
            .map(|l| l.name.as_str())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ListenerStatus> {
        self.listener_statuses.iter().find(|l| l.name == name)
    }
}

impl AdminMessage for Listeners {
    const KIND: SnapshotKind = SnapshotKind::Listeners;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerStatus {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_address: Option<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_local_addresses: Vec<Address>,
}

impl ListenerStatus {
    pub fn port(&self) -> Option<u32> {
        self.local_address
            .as_ref()
            .and_then(|a| a.socket_address.as_ref())
            .map(|s| s.port_value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_address: Option<SocketAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipe: Option<Pipe>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketAddress {
    pub address: String,
    pub port_value: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipe {
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listener_table() {
        let listeners: Listeners = serde_json::from_value(json!({
            "listener_statuses": [
                {
                    "name": "virtualOutbound",
                    "local_address": {"socket_address": {"address": "0.0.0.0", "port_value": 15001}}
                },
                {
                    "name": "0.0.0.0_8080",
                    "local_address": {"socket_address": {"address": "0.0.0.0", "port_value": 8080}},
                    "additional_local_addresses": [
                        {"socket_address": {"address": "::", "port_value": 8080}}
                    ]
                },
                {"name": "uds", "local_address": {"pipe": {"path": "/etc/istio/proxy/XDS"}}}
            ]
        }))
        .unwrap();

        assert_eq!(
            listeners.names(),
            vec!["virtualOutbound", "0.0.0.0_8080", "uds"]
        );
        assert_eq!(listeners.get("virtualOutbound").unwrap().port(), Some(15001));
        assert_eq!(listeners.get("uds").unwrap().port(), None);
        assert_eq!(
            listeners.get("0.0.0.0_8080").unwrap().additional_local_addresses.len(),
            1
        );
    }
}
