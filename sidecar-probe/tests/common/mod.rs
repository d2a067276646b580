use std::sync::Arc;

use sidecar_probe::{MockCluster, ProxyHandle, Sidecar};

pub use sidecar_probe::common::testing::init_test_logging;

pub const NAMESPACE: &str = "apps";

#[allow(dead_code)]
pub fn fixture(name: &str) -> &'static str {
    match name {
        "server_info.json" => include_str!("../fixtures/server_info.json"),
        "config_dump.json" => include_str!("../fixtures/config_dump.json"),
        "config_dump_unknown_type.json" => include_str!("../fixtures/config_dump_unknown_type.json"),
        "config_dump_legacy.json" => include_str!("../fixtures/config_dump_legacy.json"),
        "config_dump_istio_filters.json" => {
            include_str!("../fixtures/config_dump_istio_filters.json")
        }
        "clusters.json" => include_str!("../fixtures/clusters.json"),
        "listeners.json" => include_str!("../fixtures/listeners.json"),
        other => panic!("unknown fixture: {other}"),
    }
}

/// A sidecar in [`NAMESPACE`] backed by `cluster`.
#[allow(dead_code)]
pub fn sidecar(cluster: &Arc<MockCluster>, pod: &str) -> Sidecar<MockCluster> {
    Sidecar::new(ProxyHandle::new(NAMESPACE, pod), Arc::clone(cluster))
}
