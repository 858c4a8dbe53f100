//! Collection and alias lifecycle mutations.

use super::{Mutation, PreviewRow};
use crate::cluster::{ClusterManager, CreateCollectionRequest};
use crate::error::{Result, ShardError};
use crate::types::NodeName;
use async_trait::async_trait;
use std::fmt;
use tracing::info;
use uuid::Uuid;

/// Create a collection from a config set already in the config store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCollection {
    pub name: String,
    pub num_slices: u32,
    pub config_name: String,
    pub max_shards_per_node: Option<u32>,
    pub replication_factor: Option<u32>,
    /// Restrict placement to these nodes.
    pub node_set: Option<Vec<NodeName>>,
    /// Submit with a request id and return without waiting for the result.
    pub asynchronous: bool,
}

impl CreateCollection {
    pub fn new(name: impl Into<String>, num_slices: u32, config_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_slices,
            config_name: config_name.into(),
            max_shards_per_node: None,
            replication_factor: None,
            node_set: None,
            asynchronous: false,
        }
    }
}

impl fmt::Display for CreateCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CreateCollection {} ({} slices, config {}",
            self.name, self.num_slices, self.config_name
        )?;
        if let Some(rf) = self.replication_factor {
            write!(f, ", replication factor {}", rf)?;
        }
        if let Some(max) = self.max_shards_per_node {
            write!(f, ", max {} per node", max)?;
        }
        if let Some(nodes) = &self.node_set {
            let names: Vec<&str> = nodes.iter().map(NodeName::as_str).collect();
            write!(f, ", on {}", names.join(","))?;
        }
        if self.asynchronous {
            write!(f, ", async")?;
        }
        write!(f, ")")
    }
}

#[async_trait]
impl Mutation for CreateCollection {
    fn kind(&self) -> &'static str {
        "create-collection"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: Some(self.name.clone()),
            slice: None,
            node: None,
            detail: format!("{} slices, config {}", self.num_slices, self.config_name),
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        if !manager.config_exists(&self.config_name).await? {
            return Err(ShardError::ConfigNotFound(self.config_name.clone()));
        }
        if manager.current_state().await?.has_collection(&self.name) {
            return Err(ShardError::CollectionExists(self.name.clone()));
        }

        let request = CreateCollectionRequest {
            name: self.name.clone(),
            num_slices: self.num_slices,
            config_name: self.config_name.clone(),
            max_shards_per_node: self.max_shards_per_node,
            replication_factor: self.replication_factor,
            node_set: self.node_set.clone(),
            async_id: self.asynchronous.then(|| Uuid::new_v4().to_string()),
        };

        info!(
            collection = %self.name,
            slices = self.num_slices,
            config = %self.config_name,
            request_id = ?request.async_id,
            "Creating collection"
        );
        manager.api().create_collection(&request).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCollection {
    pub name: String,
}

impl DeleteCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for DeleteCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeleteCollection {}", self.name)
    }
}

#[async_trait]
impl Mutation for DeleteCollection {
    fn kind(&self) -> &'static str {
        "delete-collection"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: Some(self.name.clone()),
            slice: None,
            node: None,
            detail: String::new(),
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        info!(collection = %self.name, "Deleting collection");
        manager.api().delete_collection(&self.name).await
    }
}

/// Create an alias, or atomically repoint an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAlias {
    pub alias: String,
    pub collections: Vec<String>,
}

impl UpdateAlias {
    pub fn new(alias: impl Into<String>, collections: Vec<String>) -> Self {
        Self {
            alias: alias.into(),
            collections,
        }
    }
}

impl fmt::Display for UpdateAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UpdateAlias {} -> {}", self.alias, self.collections.join(","))
    }
}

#[async_trait]
impl Mutation for UpdateAlias {
    fn kind(&self) -> &'static str {
        "update-alias"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: None,
            slice: None,
            node: None,
            detail: format!("{} -> {}", self.alias, self.collections.join(",")),
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        info!(alias = %self.alias, collections = ?self.collections, "Updating alias");
        manager.api().create_alias(&self.alias, &self.collections).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAlias {
    pub alias: String,
}

impl DeleteAlias {
    pub fn new(alias: impl Into<String>) -> Self {
        Self { alias: alias.into() }
    }
}

impl fmt::Display for DeleteAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeleteAlias {}", self.alias)
    }
}

#[async_trait]
impl Mutation for DeleteAlias {
    fn kind(&self) -> &'static str {
        "delete-alias"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: None,
            slice: None,
            node: None,
            detail: self.alias.clone(),
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        info!(alias = %self.alias, "Deleting alias");
        manager.api().delete_alias(&self.alias).await
    }
}
