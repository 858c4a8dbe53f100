//! Immutable topology snapshot.

use crate::error::{Result, ShardError};
use crate::types::{Alias, Collection, NodeName, Replica};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Topology of the cluster at one instant.
///
/// A `ClusterState` is never mutated after it is built. Planners read it;
/// actions replay against whatever is live when they execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterState {
    live_nodes: BTreeSet<NodeName>,
    collections: BTreeMap<String, Collection>,
    /// Sorted by (collection, slice, core).
    replicas: Vec<Replica>,
    aliases: BTreeMap<String, Alias>,
    overseer: Option<NodeName>,
}

impl ClusterState {
    pub fn builder() -> ClusterStateBuilder {
        ClusterStateBuilder::default()
    }

    pub fn live_nodes(&self) -> &BTreeSet<NodeName> {
        &self.live_nodes
    }

    pub fn is_live(&self, node: &NodeName) -> bool {
        self.live_nodes.contains(node)
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn collection(&self, name: &str) -> Result<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| ShardError::CollectionNotFound(name.to_string()))
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    pub fn replicas(&self) -> &[Replica] {
        &self.replicas
    }

    pub fn aliases(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.values()
    }

    pub fn alias(&self, name: &str) -> Option<&Alias> {
        self.aliases.get(name)
    }

    pub fn overseer(&self) -> Option<&NodeName> {
        self.overseer.as_ref()
    }

    /// All replicas of a collection, active or not.
    pub fn replicas_for(&self, collection: &str) -> Result<Vec<&Replica>> {
        self.collection(collection)?;
        Ok(self
            .replicas
            .iter()
            .filter(|r| r.collection == collection)
            .collect())
    }

    /// Active replicas of a collection.
    pub fn live_replicas_for(&self, collection: &str) -> Result<Vec<&Replica>> {
        Ok(self
            .replicas_for(collection)?
            .into_iter()
            .filter(|r| r.active)
            .collect())
    }

    /// Every inactive replica in the cluster, including those on dead nodes.
    pub fn inactive_replicas(&self) -> Vec<&Replica> {
        self.replicas.iter().filter(|r| !r.active).collect()
    }

    /// Nodes holding at least one replica of the collection, live or not.
    pub fn nodes_hosting(&self, collection: &str) -> Result<BTreeSet<&NodeName>> {
        Ok(self
            .replicas_for(collection)?
            .into_iter()
            .map(|r| &r.node)
            .collect())
    }

    pub fn replicas_on(&self, node: &NodeName) -> Vec<&Replica> {
        self.replicas.iter().filter(|r| &r.node == node).collect()
    }

    /// Active leader of a slice, if one is elected.
    pub fn leader_of(&self, collection: &str, slice: &str) -> Option<&Replica> {
        self.replicas
            .iter()
            .find(|r| r.is_of(collection, slice) && r.leader && r.active)
    }

    /// Number of replicas of a slice, active or not.
    pub fn slice_replica_count(&self, collection: &str, slice: &str) -> usize {
        self.replicas
            .iter()
            .filter(|r| r.is_of(collection, slice))
            .count()
    }

    pub fn find_core(&self, core: &str) -> Option<&Replica> {
        self.replicas.iter().find(|r| r.core == core)
    }

    /// Live nodes plus every node named by replica metadata.
    pub fn known_nodes(&self) -> BTreeSet<&NodeName> {
        self.live_nodes
            .iter()
            .chain(self.replicas.iter().map(|r| &r.node))
            .collect()
    }

    /// Resolve a user-supplied node reference to a canonical node name.
    ///
    /// Accepts the full name, `host:port`, a bare host or a base URL. Only
    /// live nodes are candidates unless `allow_offline` is set, in which case
    /// nodes known only from replica metadata match too.
    pub fn canonical_node_name(&self, reference: &str, allow_offline: bool) -> Result<NodeName> {
        let candidates: BTreeSet<&NodeName> = if allow_offline {
            self.known_nodes()
        } else {
            self.live_nodes.iter().collect()
        };

        match_node_reference(reference, candidates)
    }
}

/// Match a reference against candidate nodes.
///
/// Exact matches win; otherwise the reference is compared against the
/// `host:port` and host parts of every candidate.
fn match_node_reference<'a>(
    reference: &str,
    candidates: impl IntoIterator<Item = &'a NodeName>,
) -> Result<NodeName> {
    let reference = normalize_reference(reference);
    let candidates: Vec<&NodeName> = candidates.into_iter().collect();

    if let Some(exact) = candidates.iter().find(|n| n.as_str() == reference) {
        return Ok((*exact).clone());
    }

    let matches: Vec<&NodeName> = candidates
        .into_iter()
        .filter(|n| n.host_port() == reference || n.host() == reference)
        .collect();

    match matches.as_slice() {
        [] => Err(ShardError::NodeNotFound(reference)),
        [only] => Ok((*only).clone()),
        many => Err(ShardError::AmbiguousNode {
            reference,
            candidates: many.iter().map(|n| n.to_string()).collect(),
        }),
    }
}

/// Turn `http://host:port/solr/` into `host:port_solr`; other forms pass through.
fn normalize_reference(reference: &str) -> String {
    let trimmed = reference.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));

    match without_scheme {
        Some(rest) => {
            let rest = rest.trim_end_matches('/');
            match rest.split_once('/') {
                Some((host_port, context)) => format!("{}_{}", host_port, context.replace('/', "_")),
                None => rest.to_string(),
            }
        }
        None => trimmed.to_string(),
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Live nodes ({}):", self.live_nodes.len())?;
        for node in &self.live_nodes {
            let marker = if self.overseer.as_ref() == Some(node) {
                " [overseer]"
            } else {
                ""
            };
            writeln!(f, "  {}{}", node, marker)?;
        }

        for collection in self.collections.values() {
            writeln!(
                f,
                "Collection {} (config: {}, replication factor: {})",
                collection.name,
                collection.config_name.as_deref().unwrap_or("-"),
                collection
                    .replication_factor
                    .map(|rf| rf.to_string())
                    .unwrap_or_else(|| "-".to_string())
            )?;
            for slice in &collection.slices {
                writeln!(
                    f,
                    "  {}{}",
                    slice.name,
                    if slice.active { "" } else { " (inactive slice)" }
                )?;
                for replica in self
                    .replicas
                    .iter()
                    .filter(|r| r.is_of(&collection.name, &slice.name))
                {
                    writeln!(
                        f,
                        "    {} on {}{}{}",
                        replica.core,
                        replica.node,
                        if replica.leader { " leader" } else { "" },
                        if replica.active { "" } else { " INACTIVE" }
                    )?;
                }
            }
        }

        if !self.aliases.is_empty() {
            writeln!(f, "Aliases:")?;
            for alias in self.aliases.values() {
                writeln!(f, "  {} -> {}", alias.name, alias.collections.join(","))?;
            }
        }

        Ok(())
    }
}

/// Assembles a [`ClusterState`].
///
/// Replica activity is normalised on build: a replica on a node that is not
/// live is never considered active.
#[derive(Debug, Default)]
pub struct ClusterStateBuilder {
    live_nodes: BTreeSet<NodeName>,
    collections: BTreeMap<String, Collection>,
    replicas: BTreeMap<String, Replica>,
    aliases: BTreeMap<String, Alias>,
    overseer: Option<NodeName>,
}

impl ClusterStateBuilder {
    pub fn live_node(mut self, node: impl Into<NodeName>) -> Self {
        self.live_nodes.insert(node.into());
        self
    }

    pub fn live_nodes<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeName>,
    {
        self.live_nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn collection(mut self, collection: Collection) -> Self {
        self.collections.insert(collection.name.clone(), collection);
        self
    }

    /// Add a replica; a later replica with the same core replaces an earlier one.
    pub fn replica(mut self, replica: Replica) -> Self {
        self.replicas.insert(replica.core.clone(), replica);
        self
    }

    pub fn alias(mut self, name: impl Into<String>, collections: Vec<String>) -> Self {
        let name = name.into();
        self.aliases.insert(
            name.clone(),
            Alias {
                name,
                collections,
            },
        );
        self
    }

    pub fn overseer(mut self, node: impl Into<NodeName>) -> Self {
        self.overseer = Some(node.into());
        self
    }

    pub fn build(self) -> ClusterState {
        let live_nodes = self.live_nodes;
        let mut replicas: Vec<Replica> = self
            .replicas
            .into_values()
            .map(|mut r| {
                r.active = r.active && live_nodes.contains(&r.node);
                r
            })
            .collect();
        replicas.sort_by(|a, b| {
            (&a.collection, &a.slice, &a.core).cmp(&(&b.collection, &b.slice, &b.core))
        });

        ClusterState {
            live_nodes,
            collections: self.collections,
            replicas,
            aliases: self.aliases,
            overseer: self.overseer,
        }
    }
}
