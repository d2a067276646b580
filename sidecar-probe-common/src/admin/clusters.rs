//! `/clusters?format=json` response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::listeners::Address;
use super::{AdminMessage, SnapshotKind, lenient_u64};

/// The proxy's live cluster table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clusters {
    pub cluster_statuses: Vec<ClusterStatus>,
}

impl Clusters {
    pub fn names(&self) -> Vec<&str> {
        self.cluster_statuses.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ClusterStatus> {
        self.cluster_statuses.iter().find(|c| c.name == name)
    }
}

impl AdminMessage for Clusters {
    const KIND: SnapshotKind = SnapshotKind::Clusters;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterStatus {
    pub name: String,
    pub added_via_api: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host_statuses: Vec<HostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breakers: Option<Value>,
}

impl ClusterStatus {
    /// Hosts whose EDS health is `HEALTHY` (or unreported) and that have not
    /// failed active health checking.
    pub fn healthy_hosts(&self) -> impl Iterator<Item = &HostStatus> {
        self.host_statuses.iter().filter(|h| h.is_healthy())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stats: Vec<SimpleMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_status: Option<HostHealthStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<Value>,
}

impl HostStatus {
    pub fn is_healthy(&self) -> bool {
        match &self.health_status {
            None => true,
            Some(h) => {
                !h.failed_active_health_check
                    && h
                        .eds_health_status
                        .as_deref()
                        .is_none_or(|s| s == "HEALTHY")
            }
        }
    }

    /// Value of the named stat, if reported.
    pub fn stat(&self, name: &str) -> Option<u64> {
        self.stats
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostHealthStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eds_health_status: Option<String>,
    pub failed_active_health_check: bool,
    pub failed_outlier_check: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleMetric {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
    #[serde(
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Clusters {
        serde_json::from_value(json!({
            "cluster_statuses": [
                {
                    "name": "outbound|80||echo.echo.svc.cluster.local",
                    "added_via_api": true,
                    "host_statuses": [
                        {
                            "address": {"socket_address": {"address": "10.1.0.7", "port_value": 8080}},
                            "stats": [
                                {"name": "cx_active", "type": "GAUGE", "value": "3"},
                                {"name": "rq_total", "value": 17}
                            ],
                            "health_status": {"eds_health_status": "HEALTHY"},
                            "weight": 1
                        },
                        {
                            "address": {"socket_address": {"address": "10.1.0.8", "port_value": 8080}},
                            "health_status": {"eds_health_status": "UNHEALTHY"}
                        }
                    ]
                },
                {"name": "BlackHoleCluster"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_names_and_lookup() {
        let clusters = sample();
        assert_eq!(
            clusters.names(),
            vec!["outbound|80||echo.echo.svc.cluster.local", "BlackHoleCluster"]
        );
        assert!(clusters.get("BlackHoleCluster").is_some());
        assert!(clusters.get("missing").is_none());
    }

    #[test]
    fn test_healthy_hosts_and_stats() {
        let clusters = sample();
        let echo = clusters
            .get("outbound|80||echo.echo.svc.cluster.local")
            .unwrap();
        assert_eq!(echo.healthy_hosts().count(), 1);

        let host = &echo.host_statuses[0];
        assert_eq!(host.stat("cx_active"), Some(3));
        assert_eq!(host.stat("rq_total"), Some(17));
        assert_eq!(host.stat("missing"), None);
        assert_eq!(
            host.address.as_ref().unwrap().socket_address.as_ref().unwrap().port_value,
            8080
        );
    }
}
