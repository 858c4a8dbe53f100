//! Decoding of topology and transfer-status responses.

use crate::cluster::{ClusterState, TransferStatus};
use crate::types::{Collection, Replica, Slice};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Body of `/admin/collections?action=CLUSTERSTATUS`.
#[derive(Debug, Deserialize)]
pub struct ClusterStatusResponse {
    pub cluster: ClusterSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClusterSection {
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionStatus>,
    /// Alias name to comma-separated collection list.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub live_nodes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionStatus {
    #[serde(default)]
    pub shards: BTreeMap<String, ShardStatus>,
    #[serde(default, rename = "replicationFactor")]
    pub replication_factor: Option<Value>,
    #[serde(default, rename = "maxShardsPerNode")]
    pub max_shards_per_node: Option<Value>,
    #[serde(default, rename = "configName")]
    pub config_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShardStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub replicas: BTreeMap<String, ReplicaStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReplicaStatus {
    pub core: String,
    pub node_name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub leader: Option<Value>,
}

/// Build a snapshot from a CLUSTERSTATUS body and the overseer leader.
pub fn cluster_state_from(response: ClusterStatusResponse, overseer: Option<String>) -> ClusterState {
    let cluster = response.cluster;
    let mut builder = ClusterState::builder().live_nodes(cluster.live_nodes);

    for (name, status) in cluster.collections {
        let mut slice_names: Vec<&String> = status.shards.keys().collect();
        slice_names.sort_by(|a, b| natural_cmp(a, b));

        let slices = slice_names
            .into_iter()
            .map(|slice| Slice {
                name: slice.clone(),
                active: status.shards[slice]
                    .state
                    .as_deref()
                    .map_or(true, |s| s == "active"),
            })
            .collect();

        let mut collection = Collection::new(name.clone(), slices);
        collection.replication_factor = status.replication_factor.as_ref().and_then(positive_u32);
        collection.max_shards_per_node = status.max_shards_per_node.as_ref().and_then(positive_u32);
        collection.config_name = status.config_name.clone();
        builder = builder.collection(collection);

        for (slice, shard) in status.shards {
            for (replica_name, replica) in shard.replicas {
                builder = builder.replica(Replica {
                    collection: name.clone(),
                    slice: slice.clone(),
                    name: replica_name,
                    core: replica.core,
                    node: replica.node_name.into(),
                    active: replica.state.as_deref() == Some("active"),
                    leader: replica.leader.as_ref().map_or(false, truthy),
                });
            }
        }
    }

    for (alias, collections) in cluster.aliases {
        let targets = collections
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        builder = builder.alias(alias, targets);
    }

    if let Some(overseer) = overseer {
        builder = builder.overseer(overseer);
    }

    builder.build()
}

/// Read the backup section of a `command=details` response.
pub fn backup_status_from(details: &Value) -> TransferStatus {
    transfer_status(details.pointer("/details/backup"))
}

/// Read a `command=restorestatus` response.
pub fn restore_status_from(body: &Value) -> TransferStatus {
    transfer_status(body.get("restorestatus"))
}

fn transfer_status(section: Option<&Value>) -> TransferStatus {
    let section = match section {
        Some(section) => section,
        None => return TransferStatus::Unknown,
    };

    let status = section
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();

    match status.as_str() {
        "success" => TransferStatus::Success,
        "in progress" => TransferStatus::InProgress,
        "failed" => TransferStatus::Failed(
            section
                .get("exception")
                .and_then(Value::as_str)
                .unwrap_or("no reason given")
                .to_string(),
        ),
        _ => TransferStatus::Unknown,
    }
}

/// Numbers arrive as JSON numbers or strings; `-1` means unset.
fn positive_u32(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Order `shard2` before `shard10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    fn split(s: &str) -> (&str, Option<u64>) {
        let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (prefix, suffix) = s.split_at(s.len() - digits);
        (prefix, suffix.parse().ok())
    }

    let (pa, na) = split(a);
    let (pb, nb) = split(b);
    pa.cmp(pb).then(na.cmp(&nb)).then_with(|| a.cmp(b))
}
