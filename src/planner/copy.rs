//! Index copies: cross-cluster deploy, backup and restore.

use crate::action::{Action, BackupIndex, FetchIndex, RestoreIndex};
use crate::cluster::ClusterState;
use crate::error::{Result, ShardError};
use crate::operation::Operation;
use std::path::Path;

/// Map a core name's `replicaN` suffix to `replica1`.
///
/// The source cluster is assumed to hold the canonical first replica of
/// every slice under that name. Names without the suffix are unchanged.
pub fn first_replica_core(core: &str) -> String {
    if let Some(idx) = core.rfind("replica") {
        let digits = &core[idx + "replica".len()..];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return format!("{}replica1", &core[..idx]);
        }
    }
    core.to_string()
}

/// Load a collection's index from another cluster.
///
/// Per active slice, the leader fetches its first-replica counterpart from
/// `source_host`; every other active replica then fetches from the leader.
/// An active slice without an active leader fails planning.
pub fn deploy_from_another_cluster(
    state: &ClusterState,
    collection: &str,
    source_host: &str,
) -> Result<Operation> {
    let coll = state.collection(collection)?;
    let live = state.live_replicas_for(collection)?;

    let mut op = Operation::empty();
    for slice in coll.active_slice_names() {
        let leader = state
            .leader_of(collection, slice)
            .ok_or_else(|| ShardError::NoLeader {
                collection: collection.to_string(),
                slice: slice.to_string(),
            })?;

        op.push(FetchIndex::new(
            leader.core.clone(),
            first_replica_core(&leader.core),
            source_host,
            None,
        ));

        for follower in live
            .iter()
            .filter(|r| r.slice == slice && r.core != leader.core)
        {
            op.push(FetchIndex::new(
                follower.core.clone(),
                leader.core.clone(),
                leader.node.host_port(),
                Some(leader.node.context()),
            ));
        }
    }

    Ok(op)
}

/// Back up the leader of every active slice into `dir/collection/slice`.
///
/// With `parallel` the backups are only requested; otherwise each one is
/// waited on before the next starts.
pub fn backup_collection(
    state: &ClusterState,
    collection: &str,
    dir: &Path,
    keep: u32,
    parallel: bool,
) -> Result<Operation> {
    let coll = state.collection(collection)?;

    coll.slices
        .iter()
        .filter(|s| s.active)
        .map(|slice| {
            let leader = state
                .leader_of(collection, &slice.name)
                .ok_or_else(|| ShardError::NoLeader {
                    collection: collection.to_string(),
                    slice: slice.name.clone(),
                })?;
            Ok(Action::from(BackupIndex::new(
                leader.core.clone(),
                dir.join(collection).join(&slice.name),
                !parallel,
                keep,
            )))
        })
        .collect::<Result<Vec<_>>>()
        .map(Operation::new)
}

/// Restore every active replica of an active slice of `collection` from
/// `dir/source/slice`.
///
/// `source_name` names the collection the backup was taken from, when it
/// differs from the target.
pub fn restore_collection(
    state: &ClusterState,
    collection: &str,
    dir: &Path,
    source_name: Option<&str>,
) -> Result<Operation> {
    let coll = state.collection(collection)?;
    let source = source_name.unwrap_or(collection);

    Ok(state
        .live_replicas_for(collection)?
        .into_iter()
        .filter(|r| coll.is_active_slice(&r.slice))
        .map(|r| {
            Action::from(RestoreIndex::new(
                r.core.clone(),
                dir.join(source).join(&r.slice),
            ))
        })
        .collect())
}
