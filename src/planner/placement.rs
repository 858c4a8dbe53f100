//! Replica placement: spreading a collection over fresh nodes.

use crate::action::{Action, AddReplica};
use crate::cluster::ClusterState;
use crate::error::{Result, ShardError};
use crate::operation::Operation;
use crate::types::NodeName;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Replicate a collection built on a single indexer node onto every other
/// live node.
///
/// Exactly one live node may host the collection. Slices are split into
/// groups of `slices_per_node`; one complete copy of the collection needs
/// `slices / slices_per_node` nodes, and the other live nodes must form a
/// whole number of such copies. Groups are dealt round-robin over the
/// target nodes in name order, so every target receives `slices_per_node`
/// distinct slices.
pub fn populate_cluster(
    state: &ClusterState,
    collection: &str,
    slices_per_node: usize,
    wait_for_replication: bool,
) -> Result<Operation> {
    let coll = state.collection(collection)?;
    if slices_per_node == 0 {
        return Err(ShardError::Precondition(
            "slices per node must be at least 1".to_string(),
        ));
    }

    let indexers: Vec<&NodeName> = state
        .nodes_hosting(collection)?
        .into_iter()
        .filter(|n| state.is_live(n))
        .collect();
    let indexer = match indexers.as_slice() {
        [only] => *only,
        other => {
            return Err(ShardError::Precondition(format!(
                "{} must be hosted by exactly one live node, found {}",
                collection,
                other.len()
            )))
        }
    };

    let slices: Vec<&str> = coll.active_slice_names().collect();
    if slices.len() % slices_per_node != 0 {
        return Err(ShardError::Precondition(format!(
            "{} slices cannot be divided into groups of {}",
            slices.len(),
            slices_per_node
        )));
    }
    let nodes_per_copy = slices.len() / slices_per_node;
    if nodes_per_copy == 0 {
        return Err(ShardError::Precondition(format!("{} has no slices", collection)));
    }

    let targets: Vec<&NodeName> = state.live_nodes().iter().filter(|n| *n != indexer).collect();
    if targets.is_empty() || targets.len() % nodes_per_copy != 0 {
        return Err(ShardError::Precondition(format!(
            "{} target nodes cannot hold whole copies of {} nodes each",
            targets.len(),
            nodes_per_copy
        )));
    }

    debug!(
        collection,
        indexer = %indexer,
        replication_factor = targets.len() / nodes_per_copy,
        "Populating cluster"
    );

    let groups: Vec<&[&str]> = slices.chunks(slices_per_node).collect();
    Ok(targets
        .iter()
        .enumerate()
        .flat_map(|(i, node)| {
            groups[i % nodes_per_copy].iter().map(move |slice| {
                Action::from(AddReplica::new(
                    collection,
                    *slice,
                    (*node).clone(),
                    wait_for_replication,
                ))
            })
        })
        .collect())
}

/// Greedily add replicas of a collection until the eligible nodes are full.
///
/// The per-node cap is the largest replica count of the collection on any
/// node today. Eligible nodes are `node_subset` (which must be live) or all
/// live nodes. Each step adds the least-replicated slice (ties by slice
/// order) to the emptiest eligible node that neither hosts it nor is at the
/// cap (ties by node name). Stops early, with a warning, when no such pair is
/// left.
pub fn fill_cluster(
    state: &ClusterState,
    collection: &str,
    node_subset: Option<&[NodeName]>,
    wait_for_replication: bool,
) -> Result<Operation> {
    let coll = state.collection(collection)?;
    let replicas = state.replicas_for(collection)?;

    let eligible: BTreeSet<&NodeName> = match node_subset {
        Some(nodes) => nodes
            .iter()
            .map(|n| {
                if state.is_live(n) {
                    Ok(n)
                } else {
                    Err(ShardError::NodeNotFound(n.to_string()))
                }
            })
            .collect::<Result<_>>()?,
        None => state.live_nodes().iter().collect(),
    };

    let mut per_node: BTreeMap<&NodeName, usize> = BTreeMap::new();
    for replica in &replicas {
        *per_node.entry(&replica.node).or_default() += 1;
    }
    let cap = per_node.values().copied().max().unwrap_or(0);

    let mut node_load: BTreeMap<&NodeName, usize> = eligible
        .iter()
        .map(|n| (*n, per_node.get(n).copied().unwrap_or(0)))
        .collect();
    let current: usize = node_load.values().sum();
    let capacity = (cap * eligible.len()).saturating_sub(current);

    let mut slice_hosts: Vec<(&str, BTreeSet<&NodeName>)> = coll
        .active_slice_names()
        .map(|slice| {
            let hosts = replicas
                .iter()
                .filter(|r| r.slice == slice)
                .map(|r| &r.node)
                .collect();
            (slice, hosts)
        })
        .collect();

    debug!(collection, cap, capacity, eligible = eligible.len(), "Filling cluster");

    let mut op = Operation::empty();
    for _ in 0..capacity {
        match next_assignment(&slice_hosts, &node_load, cap) {
            Some((slice_idx, node)) => {
                let (slice, hosts) = &mut slice_hosts[slice_idx];
                op.push(AddReplica::new(collection, *slice, node.clone(), wait_for_replication));
                hosts.insert(node);
                *node_load.entry(node).or_default() += 1;
            }
            None => {
                warn!(
                    collection,
                    planned = op.len(),
                    capacity,
                    "No slice can be placed on any eligible node, stopping early"
                );
                break;
            }
        }
    }

    Ok(op)
}

/// Pick the next (slice index, node) pair, or `None` if nothing is legal.
fn next_assignment<'a>(
    slice_hosts: &[(&str, BTreeSet<&'a NodeName>)],
    node_load: &BTreeMap<&'a NodeName, usize>,
    cap: usize,
) -> Option<(usize, &'a NodeName)> {
    let mut order: Vec<usize> = (0..slice_hosts.len()).collect();
    order.sort_by_key(|&i| (slice_hosts[i].1.len(), i));

    order.into_iter().find_map(|i| {
        let hosts = &slice_hosts[i].1;
        node_load
            .iter()
            .filter(|(node, load)| **load < cap && !hosts.contains(*node))
            .min_by_key(|(node, load)| (**load, **node))
            .map(|(node, _)| (i, *node))
    })
}
