//! Capabilities the engine calls through to reach the live cluster.
//!
//! [`CoordinationService`] answers topology reads; [`ManagementApi`] accepts
//! mutation requests. The HTTP implementation lives in
//! [`crate::client::SolrClient`]; tests plug in an in-memory cluster.

use super::ClusterState;
use crate::error::Result;
use crate::types::NodeName;
use async_trait::async_trait;

/// Read side: the system of record for live topology.
#[async_trait]
pub trait CoordinationService: Send + Sync {
    /// Read live nodes, collections, replicas, aliases and the overseer.
    async fn read_topology(&self) -> Result<ClusterState>;

    /// Whether a named config set exists in the config store.
    async fn config_exists(&self, config_name: &str) -> Result<bool>;

    /// Release the connection. Called at most once by the manager.
    fn close(&self) {}
}

/// Parameters of a collection creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCollectionRequest {
    pub name: String,
    pub num_slices: u32,
    pub config_name: String,
    pub max_shards_per_node: Option<u32>,
    pub replication_factor: Option<u32>,
    pub node_set: Option<Vec<NodeName>>,
    /// Request id for asynchronous submission; `None` waits for the result.
    pub async_id: Option<String>,
}

/// Progress of a core-level backup or restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    InProgress,
    Success,
    Failed(String),
    /// The core reported nothing about the transfer yet.
    Unknown,
}

impl TransferStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TransferStatus::Success | TransferStatus::Failed(_))
    }
}

/// Write side: one call per kind of mutation.
///
/// Every call returns once the cluster has accepted (or rejected) the
/// request. Waiting for the resulting state change is the caller's job.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn add_replica(&self, collection: &str, slice: &str, node: &NodeName) -> Result<()>;

    /// Delete a replica by its replica name (e.g. `core_node3`).
    async fn delete_replica(&self, collection: &str, slice: &str, replica: &str) -> Result<()>;

    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<()>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Create or atomically repoint an alias.
    async fn create_alias(&self, alias: &str, collections: &[String]) -> Result<()>;

    async fn delete_alias(&self, alias: &str) -> Result<()>;

    /// Ask `target_core` on `node` to pull its index from `source_url`.
    async fn fetch_index(&self, node: &NodeName, target_core: &str, source_url: &str) -> Result<()>;

    async fn backup_index(&self, node: &NodeName, core: &str, location: &str, keep: u32) -> Result<()>;

    async fn backup_status(&self, node: &NodeName, core: &str) -> Result<TransferStatus>;

    async fn restore_index(&self, node: &NodeName, core: &str, location: &str) -> Result<()>;

    async fn restore_status(&self, node: &NodeName, core: &str) -> Result<TransferStatus>;
}
