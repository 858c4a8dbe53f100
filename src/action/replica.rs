//! Replica placement mutations.

use super::{Mutation, PreviewRow};
use crate::cluster::ClusterManager;
use crate::error::{Result, ShardError};
use crate::types::NodeName;
use async_trait::async_trait;
use std::fmt;
use tracing::info;

/// Add a replica of a slice on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReplica {
    pub collection: String,
    pub slice: String,
    pub node: NodeName,
    /// Block until the new replica reports active.
    pub wait_for_replication: bool,
}

impl AddReplica {
    pub fn new(
        collection: impl Into<String>,
        slice: impl Into<String>,
        node: impl Into<NodeName>,
        wait_for_replication: bool,
    ) -> Self {
        Self {
            collection: collection.into(),
            slice: slice.into(),
            node: node.into(),
            wait_for_replication,
        }
    }
}

impl fmt::Display for AddReplica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddReplica {}/{} on {}", self.collection, self.slice, self.node)?;
        if self.wait_for_replication {
            write!(f, " (wait)")?;
        }
        Ok(())
    }
}

#[async_trait]
impl Mutation for AddReplica {
    fn kind(&self) -> &'static str {
        "add-replica"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: Some(self.collection.clone()),
            slice: Some(self.slice.clone()),
            node: Some(self.node.to_string()),
            detail: if self.wait_for_replication {
                "wait for replication".to_string()
            } else {
                String::new()
            },
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        info!(
            collection = %self.collection,
            slice = %self.slice,
            node = %self.node,
            "Adding replica"
        );
        manager
            .api()
            .add_replica(&self.collection, &self.slice, &self.node)
            .await?;

        if !self.wait_for_replication {
            return Ok(());
        }

        let (collection, slice, node) = (self.collection.as_str(), self.slice.as_str(), &self.node);
        manager
            .poller()
            .until("new replica active", || async move {
                let state = manager.current_state().await?;
                Ok(state
                    .replicas()
                    .iter()
                    .any(|r| r.is_of(collection, slice) && &r.node == node && r.active))
            })
            .await
    }
}

/// Delete the replica of a slice hosted on a node, subject to a safety factor.
///
/// The safety factor is re-checked against a fresh snapshot on execution: the
/// delete is refused unless the slice currently has more than
/// `safety_factor` replicas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReplica {
    pub collection: String,
    pub slice: String,
    pub node: NodeName,
    pub safety_factor: usize,
}

impl DeleteReplica {
    pub fn new(
        collection: impl Into<String>,
        slice: impl Into<String>,
        node: impl Into<NodeName>,
        safety_factor: usize,
    ) -> Self {
        Self {
            collection: collection.into(),
            slice: slice.into(),
            node: node.into(),
            safety_factor,
        }
    }
}

impl fmt::Display for DeleteReplica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeleteReplica {}/{} on {} (safety factor {})",
            self.collection, self.slice, self.node, self.safety_factor
        )
    }
}

#[async_trait]
impl Mutation for DeleteReplica {
    fn kind(&self) -> &'static str {
        "delete-replica"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: Some(self.collection.clone()),
            slice: Some(self.slice.clone()),
            node: Some(self.node.to_string()),
            detail: format!("safety factor {}", self.safety_factor),
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        let state = manager.current_state().await?;
        state.collection(&self.collection)?;

        let replica = state
            .replicas()
            .iter()
            .find(|r| r.is_of(&self.collection, &self.slice) && r.node == self.node)
            .ok_or_else(|| {
                ShardError::ReplicaNotFound(format!(
                    "{}/{} on {}",
                    self.collection, self.slice, self.node
                ))
            })?;

        let count = state.slice_replica_count(&self.collection, &self.slice);
        if count <= self.safety_factor {
            return Err(ShardError::SafetyViolation {
                collection: self.collection.clone(),
                slice: self.slice.clone(),
                node: self.node.to_string(),
                remaining: count.saturating_sub(1),
                safety_factor: self.safety_factor,
            });
        }

        info!(
            collection = %self.collection,
            slice = %self.slice,
            node = %self.node,
            core = %replica.core,
            remaining = count - 1,
            "Deleting replica"
        );
        manager
            .api()
            .delete_replica(&self.collection, &self.slice, &replica.name)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replica_display() {
        let action = AddReplica::new("c", "s1", "a:8983_solr", false);
        assert_eq!(action.to_string(), "AddReplica c/s1 on a:8983_solr");
        assert!(action.preview().detail.is_empty());
    }

    #[test]
    fn test_delete_replica_display() {
        let action = DeleteReplica::new("c", "s1", "a:8983_solr", 1);
        assert_eq!(
            action.to_string(),
            "DeleteReplica c/s1 on a:8983_solr (safety factor 1)"
        );
    }
}
