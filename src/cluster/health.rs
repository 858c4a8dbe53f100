//! Read-only health audit of a snapshot.

use super::ClusterState;
use crate::error::Result;
use crate::types::NodeName;
use std::fmt;

/// Cluster health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClusterHealth {
    /// Every slice has a leader and enough active replicas.
    Healthy,
    /// Redundancy is reduced but every slice is still served.
    Degraded,
    /// At least one slice cannot serve or accept writes.
    Critical,
}

impl ClusterHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ClusterHealth::Healthy)
    }
}

impl fmt::Display for ClusterHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClusterHealth::Healthy => "healthy",
            ClusterHealth::Degraded => "degraded",
            ClusterHealth::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// One finding of the audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthIssue {
    NoActiveReplicas { collection: String, slice: String },
    NoLeader { collection: String, slice: String },
    UnderReplicated {
        collection: String,
        slice: String,
        active: usize,
        required: usize,
    },
    ReplicaOnDeadNode {
        collection: String,
        slice: String,
        core: String,
        node: NodeName,
    },
}

impl HealthIssue {
    pub fn severity(&self) -> ClusterHealth {
        match self {
            HealthIssue::NoActiveReplicas { .. } | HealthIssue::NoLeader { .. } => {
                ClusterHealth::Critical
            }
            HealthIssue::UnderReplicated { .. } | HealthIssue::ReplicaOnDeadNode { .. } => {
                ClusterHealth::Degraded
            }
        }
    }
}

impl fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthIssue::NoActiveReplicas { collection, slice } => {
                write!(f, "{}/{} has no active replicas", collection, slice)
            }
            HealthIssue::NoLeader { collection, slice } => {
                write!(f, "{}/{} has no active leader", collection, slice)
            }
            HealthIssue::UnderReplicated {
                collection,
                slice,
                active,
                required,
            } => write!(
                f,
                "{}/{} has {} active replica(s), expected at least {}",
                collection, slice, active, required
            ),
            HealthIssue::ReplicaOnDeadNode {
                collection,
                slice,
                core,
                node,
            } => write!(f, "{}/{} core {} is on dead node {}", collection, slice, core, node),
        }
    }
}

/// Result of auditing one or all collections.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub status: ClusterHealth,
    pub issues: Vec<HealthIssue>,
}

/// Audit active slices of `collection` (or every collection).
///
/// `min_active` is the number of active replicas each slice should have;
/// `None` uses the collection's replication factor, or 1 when unknown.
pub fn check_health(
    state: &ClusterState,
    collection: Option<&str>,
    min_active: Option<usize>,
) -> Result<HealthReport> {
    let collections = match collection {
        Some(name) => vec![state.collection(name)?],
        None => state.collections().collect(),
    };

    let mut issues = Vec::new();
    for collection in collections {
        let required = min_active
            .or(collection.replication_factor.map(|rf| rf as usize))
            .unwrap_or(1);

        for slice in collection.slices.iter().filter(|s| s.active) {
            let replicas: Vec<_> = state
                .replicas()
                .iter()
                .filter(|r| r.is_of(&collection.name, &slice.name))
                .collect();
            let active = replicas.iter().filter(|r| r.active).count();

            if active == 0 {
                issues.push(HealthIssue::NoActiveReplicas {
                    collection: collection.name.clone(),
                    slice: slice.name.clone(),
                });
            } else if state.leader_of(&collection.name, &slice.name).is_none() {
                issues.push(HealthIssue::NoLeader {
                    collection: collection.name.clone(),
                    slice: slice.name.clone(),
                });
            }

            if active > 0 && active < required {
                issues.push(HealthIssue::UnderReplicated {
                    collection: collection.name.clone(),
                    slice: slice.name.clone(),
                    active,
                    required,
                });
            }

            for replica in replicas.iter().filter(|r| !state.is_live(&r.node)) {
                issues.push(HealthIssue::ReplicaOnDeadNode {
                    collection: collection.name.clone(),
                    slice: slice.name.clone(),
                    core: replica.core.clone(),
                    node: replica.node.clone(),
                });
            }
        }
    }

    let status = issues
        .iter()
        .map(HealthIssue::severity)
        .max()
        .unwrap_or(ClusterHealth::Healthy);

    Ok(HealthReport { status, issues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Collection, Replica, Slice};

    fn replica(slice: &str, core: &str, node: &str, leader: bool) -> Replica {
        Replica {
            collection: "c".into(),
            slice: slice.into(),
            name: format!("core_node_{}", core),
            core: core.into(),
            node: node.into(),
            active: true,
            leader,
        }
    }

    #[test]
    fn test_healthy_cluster() {
        let mut collection = Collection::new("c", vec![Slice::new("s1")]);
        collection.replication_factor = Some(2);
        let state = ClusterState::builder()
            .live_nodes(["a:1_solr", "b:1_solr"])
            .collection(collection)
            .replica(replica("s1", "c1", "a:1_solr", true))
            .replica(replica("s1", "c2", "b:1_solr", false))
            .build();

        let report = check_health(&state, Some("c"), None).unwrap();
        assert!(report.status.is_healthy());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_degraded_when_node_dies() {
        let mut collection = Collection::new("c", vec![Slice::new("s1")]);
        collection.replication_factor = Some(2);
        let state = ClusterState::builder()
            .live_node("a:1_solr")
            .collection(collection)
            .replica(replica("s1", "c1", "a:1_solr", true))
            .replica(replica("s1", "c2", "b:1_solr", false))
            .build();

        let report = check_health(&state, None, None).unwrap();
        assert_eq!(report.status, ClusterHealth::Degraded);
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn test_critical_without_leader() {
        let state = ClusterState::builder()
            .live_node("a:1_solr")
            .collection(Collection::new("c", vec![Slice::new("s1"), Slice::new("s2")]))
            .replica(replica("s1", "c1", "a:1_solr", true))
            .replica(replica("s2", "c2", "a:1_solr", false))
            .build();

        let report = check_health(&state, Some("c"), Some(1)).unwrap();
        assert_eq!(report.status, ClusterHealth::Critical);
        assert_eq!(
            report.issues,
            vec![HealthIssue::NoLeader {
                collection: "c".into(),
                slice: "s2".into()
            }]
        );
    }

    #[test]
    fn test_unknown_collection() {
        let state = ClusterState::builder().build();
        assert!(check_health(&state, Some("missing"), None).is_err());
    }
}
