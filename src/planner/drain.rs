//! Moving replicas off nodes: clone, clean, wipe and migrate.

use crate::action::{Action, AddReplica, DeleteReplica};
use crate::cluster::ClusterState;
use crate::error::{Result, ShardError};
use crate::operation::Operation;
use crate::types::NodeName;
use std::collections::BTreeMap;

/// Copy every replica hosted on `from` onto `onto`.
///
/// `from` may be offline, which is how a dead node's replicas are rebuilt
/// elsewhere. `onto` must be live. Nothing on `from` is touched.
pub fn clone_replicas(
    state: &ClusterState,
    from: &NodeName,
    onto: &NodeName,
    wait_for_replication: bool,
) -> Result<Operation> {
    if from == onto {
        return Err(ShardError::Precondition(format!(
            "cannot clone {} onto itself",
            from
        )));
    }
    if !state.is_live(onto) {
        return Err(ShardError::NodeNotFound(onto.to_string()));
    }

    Ok(state
        .replicas_on(from)
        .into_iter()
        .map(|r| {
            Action::from(AddReplica::new(
                r.collection.clone(),
                r.slice.clone(),
                onto.clone(),
                wait_for_replication,
            ))
        })
        .collect())
}

/// Delete every inactive replica of a collection.
///
/// Uses a safety factor of 1, so a slice's last replica is never removed
/// even when it is down.
pub fn clean_cluster(state: &ClusterState, collection: &str) -> Result<Operation> {
    Ok(state
        .replicas_for(collection)?
        .into_iter()
        .filter(|r| !r.active)
        .map(|r| {
            Action::from(DeleteReplica::new(
                r.collection.clone(),
                r.slice.clone(),
                r.node.clone(),
                1,
            ))
        })
        .collect())
}

/// Delete every replica on `node`, optionally only those of one collection.
///
/// Fails if any deletion would leave its slice with fewer than
/// `safety_factor` replicas. The same check runs again when each delete
/// executes.
pub fn wipe_node(
    state: &ClusterState,
    node: &NodeName,
    collection: Option<&str>,
    safety_factor: usize,
) -> Result<Operation> {
    plan_wipe(state, node, collection, safety_factor, &BTreeMap::new())
}

/// Clone `from` onto `onto`, then wipe `from`.
///
/// When waiting for replication, the wipe phase counts the replicas the clone
/// phase will add, so a slice whose only replica is on `from` can still move
/// with a safety factor of 1: each clone is active before any delete runs.
/// Without waiting, only replicas that already exist are counted.
pub fn migrate(
    state: &ClusterState,
    from: &NodeName,
    onto: &NodeName,
    safety_factor: usize,
    wait_for_replication: bool,
) -> Result<Operation> {
    let clones = clone_replicas(state, from, onto, wait_for_replication)?;

    let mut pending: BTreeMap<(String, String), usize> = BTreeMap::new();
    if wait_for_replication {
        for action in clones.actions() {
            if let Action::AddReplica(add) = action {
                *pending
                    .entry((add.collection.clone(), add.slice.clone()))
                    .or_default() += 1;
            }
        }
    }

    let wipe = plan_wipe(state, from, None, safety_factor, &pending)?;
    Ok(clones + wipe)
}

fn plan_wipe(
    state: &ClusterState,
    node: &NodeName,
    collection: Option<&str>,
    safety_factor: usize,
    pending: &BTreeMap<(String, String), usize>,
) -> Result<Operation> {
    if let Some(collection) = collection {
        state.collection(collection)?;
    }

    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut op = Operation::empty();

    for replica in state
        .replicas_on(node)
        .into_iter()
        .filter(|r| collection.map_or(true, |c| r.collection == c))
    {
        let key = (replica.collection.clone(), replica.slice.clone());
        let count = counts.entry(key.clone()).or_insert_with(|| {
            state.slice_replica_count(&replica.collection, &replica.slice)
                + pending.get(&key).copied().unwrap_or(0)
        });

        if *count <= safety_factor {
            return Err(ShardError::SafetyViolation {
                collection: replica.collection.clone(),
                slice: replica.slice.clone(),
                node: node.to_string(),
                remaining: count.saturating_sub(1),
                safety_factor,
            });
        }
        *count -= 1;

        op.push(DeleteReplica::new(
            replica.collection.clone(),
            replica.slice.clone(),
            node.clone(),
            safety_factor,
        ));
    }

    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::testing::{collection, replica, with_replicas};

    fn two_node_state() -> ClusterState {
        let builder = ClusterState::builder()
            .live_nodes(["a:1_solr", "b:1_solr"])
            .collection(collection("c", &["s1", "s2"]));
        with_replicas(
            builder,
            vec![
                replica("c", "s1", 1, "a:1_solr", true),
                replica("c", "s2", 1, "a:1_solr", true),
            ],
        )
    }

    #[test]
    fn test_clone_replicas_scenario() {
        let state = two_node_state();
        let op = clone_replicas(&state, &"a:1_solr".into(), &"b:1_solr".into(), true).unwrap();

        assert_eq!(
            op.actions(),
            &[
                Action::from(AddReplica::new("c", "s1", "b:1_solr", true)),
                Action::from(AddReplica::new("c", "s2", "b:1_solr", true)),
            ]
        );
    }

    #[test]
    fn test_clone_from_empty_node_is_empty() {
        let state = two_node_state();
        let op = clone_replicas(&state, &"b:1_solr".into(), &"a:1_solr".into(), false).unwrap();
        assert!(op.is_empty());
    }

    #[test]
    fn test_clone_onto_dead_node_fails() {
        let state = two_node_state();
        let result = clone_replicas(&state, &"a:1_solr".into(), &"z:1_solr".into(), false);
        assert!(matches!(result, Err(ShardError::NodeNotFound(_))));
    }

    #[test]
    fn test_wipe_node_safety_boundary() {
        let builder = ClusterState::builder()
            .live_nodes(["a:1_solr", "b:1_solr", "c:1_solr"])
            .collection(collection("c", &["s1"]));

        let two = with_replicas(
            ClusterState::builder()
                .live_nodes(["a:1_solr", "b:1_solr"])
                .collection(collection("c", &["s1"])),
            vec![
                replica("c", "s1", 1, "a:1_solr", true),
                replica("c", "s1", 2, "b:1_solr", false),
            ],
        );
        assert!(matches!(
            wipe_node(&two, &"a:1_solr".into(), None, 2),
            Err(ShardError::SafetyViolation { remaining: 1, safety_factor: 2, .. })
        ));

        let three = with_replicas(
            builder,
            vec![
                replica("c", "s1", 1, "a:1_solr", true),
                replica("c", "s1", 2, "b:1_solr", false),
                replica("c", "s1", 3, "c:1_solr", false),
            ],
        );
        let op = wipe_node(&three, &"a:1_solr".into(), None, 2).unwrap();
        assert_eq!(
            op.actions(),
            &[Action::from(DeleteReplica::new("c", "s1", "a:1_solr", 2))]
        );
    }

    #[test]
    fn test_wipe_node_collection_filter() {
        let builder = ClusterState::builder()
            .live_nodes(["a:1_solr", "b:1_solr"])
            .collection(collection("c", &["s1"]))
            .collection(collection("d", &["s1"]));
        let state = with_replicas(
            builder,
            vec![
                replica("c", "s1", 1, "a:1_solr", true),
                replica("c", "s1", 2, "b:1_solr", false),
                replica("d", "s1", 1, "a:1_solr", true),
            ],
        );

        let op = wipe_node(&state, &"a:1_solr".into(), Some("c"), 1).unwrap();
        assert_eq!(op.len(), 1);
        assert!(wipe_node(&state, &"a:1_solr".into(), None, 1).is_err());
        assert!(matches!(
            wipe_node(&state, &"a:1_solr".into(), Some("missing"), 1),
            Err(ShardError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_wipe_offline_node() {
        let state = with_replicas(
            ClusterState::builder()
                .live_node("a:1_solr")
                .collection(collection("c", &["s1"])),
            vec![
                replica("c", "s1", 1, "a:1_solr", true),
                replica("c", "s1", 2, "gone:1_solr", false),
            ],
        );
        let op = wipe_node(&state, &"gone:1_solr".into(), None, 1).unwrap();
        assert_eq!(op.len(), 1);
    }

    #[test]
    fn test_clean_cluster_targets_inactive() {
        let state = with_replicas(
            ClusterState::builder()
                .live_node("a:1_solr")
                .collection(collection("c", &["s1"])),
            vec![
                replica("c", "s1", 1, "a:1_solr", true),
                replica("c", "s1", 2, "gone:1_solr", false),
            ],
        );
        let op = clean_cluster(&state, "c").unwrap();
        assert_eq!(
            op.actions(),
            &[Action::from(DeleteReplica::new("c", "s1", "gone:1_solr", 1))]
        );
    }

    #[test]
    fn test_migrate_counts_pending_clones() {
        let state = two_node_state();
        let op = migrate(&state, &"a:1_solr".into(), &"b:1_solr".into(), 1, true).unwrap();

        let kinds: Vec<&str> = op.actions().iter().map(Action::kind).collect();
        assert_eq!(
            kinds,
            vec!["add-replica", "add-replica", "delete-replica", "delete-replica"]
        );

        // With a safety factor of 2 the single clone is not enough.
        assert!(migrate(&state, &"a:1_solr".into(), &"b:1_solr".into(), 2, true).is_err());
    }

    #[test]
    fn test_migrate_without_wait_keeps_sole_copies() {
        let state = two_node_state();
        assert!(matches!(
            migrate(&state, &"a:1_solr".into(), &"b:1_solr".into(), 1, false),
            Err(ShardError::SafetyViolation { remaining: 0, .. })
        ));
    }
}
