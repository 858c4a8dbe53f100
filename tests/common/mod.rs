//! Common test utilities for integration tests.

pub mod cluster_sim;
pub mod fixtures;

use shardctl::cluster::ClusterManager;
use shardctl::convergence::Poller;
use std::sync::Arc;
use std::time::Duration;

// Re-export common types
pub use cluster_sim::*;
pub use fixtures::*;

/// Poll interval used against the simulated cluster.
pub const FAST_POLL: Duration = Duration::from_millis(5);

/// Manager over a simulated cluster with fast polling and a short deadline.
pub fn manager_for(sim: &Arc<SimulatedCluster>) -> ClusterManager {
    manager_with_timeout(sim, Duration::from_secs(2))
}

pub fn manager_with_timeout(sim: &Arc<SimulatedCluster>, timeout: Duration) -> ClusterManager {
    ClusterManager::with_backends(sim.clone(), sim.clone(), Poller::new(FAST_POLL, Some(timeout)))
}
