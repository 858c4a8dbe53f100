//! Cluster model and connection management.
//!
//! This module handles:
//! - Immutable topology snapshots ([`ClusterState`])
//! - The connection owner that produces them ([`ClusterManager`])
//! - The backend traits the engine reaches the live cluster through
//! - Health auditing of a snapshot

mod backend;
mod health;
mod manager;
mod state;

pub use backend::{CoordinationService, CreateCollectionRequest, ManagementApi, TransferStatus};
pub use health::{check_health, ClusterHealth, HealthIssue, HealthReport};
pub use manager::{resolve_node, ClusterManager};
pub use state::{ClusterState, ClusterStateBuilder};
