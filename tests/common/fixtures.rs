// Canned clusters shared by the integration tests.

use super::cluster_sim::SimulatedCluster;

pub const NODE_A: &str = "10.0.0.1:8983_solr";
pub const NODE_B: &str = "10.0.0.2:8983_solr";
pub const NODE_C: &str = "10.0.0.3:8983_solr";
pub const NODE_GONE: &str = "10.0.0.9:8983_solr";

/// Nodes {A, B}; collection `c` with slices s1 and s2, both led from A.
pub fn two_node_cluster() -> SimulatedCluster {
    SimulatedCluster::new()
        .with_live_nodes(&[NODE_A, NODE_B])
        .with_collection("c", &["s1", "s2"])
        .with_replica("c", "s1", NODE_A, true)
        .with_replica("c", "s2", NODE_A, true)
}

/// Nodes {A, B, C}; collection `c` fully replicated on A and B, plus a
/// replica of s1 on a node that has left the cluster.
pub fn degraded_cluster() -> SimulatedCluster {
    SimulatedCluster::new()
        .with_live_nodes(&[NODE_A, NODE_B, NODE_C])
        .with_collection("c", &["s1", "s2"])
        .with_replica("c", "s1", NODE_A, true)
        .with_replica("c", "s2", NODE_A, true)
        .with_replica("c", "s1", NODE_B, false)
        .with_replica("c", "s2", NODE_B, false)
        .with_replica("c", "s1", NODE_GONE, false)
        .with_config("c_conf")
        .with_alias("search", &["c"])
}

/// Nodes {A, B, C}; collection `logs` with one slice on each of A and B.
pub fn leader_follower_cluster() -> SimulatedCluster {
    SimulatedCluster::new()
        .with_live_nodes(&[NODE_A, NODE_B, NODE_C])
        .with_collection("logs", &["shard1"])
        .with_replica("logs", "shard1", NODE_A, true)
        .with_replica("logs", "shard1", NODE_B, false)
}
