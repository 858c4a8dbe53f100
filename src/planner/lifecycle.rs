//! Collection and alias lifecycle.

use crate::action::{Action, CreateCollection, DeleteAlias, DeleteCollection, UpdateAlias};
use crate::cluster::ClusterState;
use crate::error::{Result, ShardError};
use crate::operation::Operation;

/// Plan a collection creation.
///
/// The config set is checked when the action executes, since the snapshot
/// does not carry the config store.
pub fn create_collection(state: &ClusterState, request: CreateCollection) -> Result<Operation> {
    if state.has_collection(&request.name) {
        return Err(ShardError::CollectionExists(request.name));
    }
    if request.num_slices == 0 {
        return Err(ShardError::Precondition(
            "a collection needs at least one slice".to_string(),
        ));
    }
    if let Some(nodes) = &request.node_set {
        if let Some(dead) = nodes.iter().find(|n| !state.is_live(n)) {
            return Err(ShardError::NodeNotFound(dead.to_string()));
        }
    }

    Ok(Action::from(request).into())
}

pub fn delete_collection(state: &ClusterState, name: &str) -> Result<Operation> {
    state.collection(name)?;
    Ok(Action::from(DeleteCollection::new(name)).into())
}

/// Point `alias` at `collections`, creating it if needed.
pub fn update_alias(state: &ClusterState, alias: &str, collections: &[String]) -> Result<Operation> {
    if collections.is_empty() {
        return Err(ShardError::Precondition(format!(
            "alias {} needs at least one collection",
            alias
        )));
    }
    for collection in collections {
        state.collection(collection)?;
    }
    Ok(Action::from(UpdateAlias::new(alias, collections.to_vec())).into())
}

pub fn delete_alias(state: &ClusterState, alias: &str) -> Result<Operation> {
    state
        .alias(alias)
        .ok_or_else(|| ShardError::AliasNotFound(alias.to_string()))?;
    Ok(Action::from(DeleteAlias::new(alias)).into())
}
