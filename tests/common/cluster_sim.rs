// In-memory cluster for integration tests.
// Implements both backend traits so a ClusterManager can run against it.

use async_trait::async_trait;
use shardctl::cluster::{
    ClusterState, CoordinationService, CreateCollectionRequest, ManagementApi, TransferStatus,
};
use shardctl::error::{Result, ShardError};
use shardctl::types::{Collection, NodeName, Replica, Slice};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;

/// A simulated replica, with the number of topology reads left before it
/// reports active.
#[derive(Debug, Clone)]
struct SimReplica {
    replica: Replica,
    reads_until_active: Option<u32>,
}

/// Scripted progress of a backup or restore.
#[derive(Debug, Clone)]
enum Transfer {
    Running { polls_left: u32 },
    Failing(String),
}

#[derive(Debug, Default)]
struct SimState {
    live_nodes: BTreeSet<NodeName>,
    collections: BTreeMap<String, Collection>,
    replicas: Vec<SimReplica>,
    aliases: BTreeMap<String, Vec<String>>,
    configs: BTreeSet<String>,
    next_replica: u32,
    /// `None` leaves new replicas inactive forever.
    activate_after_reads: Option<u32>,
    transfer_polls: u32,
    failing_transfer: Option<String>,
    backups: BTreeMap<String, Transfer>,
    restores: BTreeMap<String, Transfer>,
    rejected_requests: BTreeSet<&'static str>,
    requests: Vec<String>,
}

/// In-memory cluster implementing [`CoordinationService`] and [`ManagementApi`].
pub struct SimulatedCluster {
    state: Mutex<SimState>,
    close_calls: AtomicUsize,
}

impl SimulatedCluster {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                activate_after_reads: Some(0),
                next_replica: 1,
                ..SimState::default()
            }),
            close_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_live_nodes(self, nodes: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            state.live_nodes.extend(nodes.iter().map(|n| NodeName::new(*n)));
        }
        self
    }

    pub fn with_config(self, name: &str) -> Self {
        self.state.lock().configs.insert(name.to_string());
        self
    }

    pub fn with_collection(self, name: &str, slices: &[&str]) -> Self {
        let mut collection = Collection::new(name, slices.iter().map(|s| Slice::new(*s)).collect());
        collection.config_name = Some(format!("{}_conf", name));
        self.state.lock().collections.insert(name.to_string(), collection);
        self
    }

    /// Place an active replica directly, bypassing the management API.
    pub fn with_replica(self, collection: &str, slice: &str, node: &str, leader: bool) -> Self {
        {
            let mut state = self.state.lock();
            let n = state.next_replica;
            state.next_replica += 1;
            state.replicas.push(SimReplica {
                replica: Replica {
                    collection: collection.to_string(),
                    slice: slice.to_string(),
                    name: format!("core_node{}", n),
                    core: format!("{}_{}_replica{}", collection, slice, n),
                    node: NodeName::new(node),
                    active: true,
                    leader,
                },
                reads_until_active: None,
            });
        }
        self
    }

    pub fn with_alias(self, alias: &str, collections: &[&str]) -> Self {
        self.state.lock().aliases.insert(
            alias.to_string(),
            collections.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// New replicas become active after this many topology reads; `None`
    /// keeps them inactive.
    pub fn set_activation(&self, reads: Option<u32>) {
        self.state.lock().activate_after_reads = reads;
    }

    /// Backups and restores report success after this many status polls.
    pub fn set_transfer_polls(&self, polls: u32) {
        self.state.lock().transfer_polls = polls;
    }

    /// Backups and restores report failure with `message`.
    pub fn fail_transfers(&self, message: &str) {
        self.state.lock().failing_transfer = Some(message.to_string());
    }

    /// Reject every request of the given kind (e.g. `ADDREPLICA`).
    pub fn reject(&self, request: &'static str) {
        self.state.lock().rejected_requests.insert(request);
    }

    pub fn kill_node(&self, node: &str) {
        self.state.lock().live_nodes.remove(&NodeName::new(node));
    }

    /// Remove a replica behind the planner's back.
    pub fn drop_replica(&self, collection: &str, slice: &str, node: &str) {
        let mut state = self.state.lock();
        let node = NodeName::new(node);
        state
            .replicas
            .retain(|r| !(r.replica.is_of(collection, slice) && r.replica.node == node));
    }

    /// Management requests received so far, one line each.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    pub fn requests_of(&self, kind: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.split_whitespace().next() == Some(kind))
            .collect()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Snapshot without advancing activation.
    pub fn snapshot(&self) -> ClusterState {
        let state = self.state.lock();
        build_state(&state)
    }

    fn accept(&self, state: &mut SimState, kind: &'static str, detail: String) -> Result<()> {
        if state.rejected_requests.contains(kind) {
            return Err(ShardError::ManagementApi {
                action: kind.to_string(),
                message: "rejected by simulated cluster".to_string(),
            });
        }
        state.requests.push(format!("{} {}", kind, detail));
        Ok(())
    }

    fn start_transfer(&self, state: &SimState) -> Transfer {
        match &state.failing_transfer {
            Some(message) => Transfer::Failing(message.clone()),
            None => Transfer::Running {
                polls_left: state.transfer_polls,
            },
        }
    }
}

impl Default for SimulatedCluster {
    fn default() -> Self {
        Self::new()
    }
}

fn build_state(state: &SimState) -> ClusterState {
    let mut builder = ClusterState::builder().live_nodes(state.live_nodes.iter().cloned());
    for collection in state.collections.values() {
        builder = builder.collection(collection.clone());
    }
    for replica in &state.replicas {
        builder = builder.replica(replica.replica.clone());
    }
    for (alias, collections) in &state.aliases {
        builder = builder.alias(alias.clone(), collections.clone());
    }
    if let Some(first) = state.live_nodes.iter().next() {
        builder = builder.overseer(first.clone());
    }
    builder.build()
}

fn poll_transfer(transfers: &mut BTreeMap<String, Transfer>, core: &str) -> TransferStatus {
    match transfers.get_mut(core) {
        None => TransferStatus::Unknown,
        Some(Transfer::Failing(message)) => TransferStatus::Failed(message.clone()),
        Some(Transfer::Running { polls_left: 0 }) => TransferStatus::Success,
        Some(Transfer::Running { polls_left }) => {
            *polls_left -= 1;
            TransferStatus::InProgress
        }
    }
}

fn api_error(action: &str, message: impl Into<String>) -> ShardError {
    ShardError::ManagementApi {
        action: action.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl CoordinationService for SimulatedCluster {
    async fn read_topology(&self) -> Result<ClusterState> {
        let mut state = self.state.lock();
        for sim in state.replicas.iter_mut() {
            if let Some(reads) = sim.reads_until_active.as_mut() {
                if *reads == 0 {
                    sim.replica.active = true;
                    sim.reads_until_active = None;
                } else {
                    *reads -= 1;
                }
            }
        }
        Ok(build_state(&state))
    }

    async fn config_exists(&self, config_name: &str) -> Result<bool> {
        Ok(self.state.lock().configs.contains(config_name))
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ManagementApi for SimulatedCluster {
    async fn add_replica(&self, collection: &str, slice: &str, node: &NodeName) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(&mut state, "ADDREPLICA", format!("{}/{} {}", collection, slice, node))?;

        let known = state
            .collections
            .get(collection)
            .map_or(false, |c| c.has_slice(slice));
        if !known {
            return Err(api_error("ADDREPLICA", format!("no such slice {}/{}", collection, slice)));
        }
        if !state.live_nodes.contains(node) {
            return Err(api_error("ADDREPLICA", format!("node {} is not live", node)));
        }

        let n = state.next_replica;
        state.next_replica += 1;
        let has_leader = state
            .replicas
            .iter()
            .any(|r| r.replica.is_of(collection, slice) && r.replica.leader);
        let activation = state.activate_after_reads;

        state.replicas.push(SimReplica {
            replica: Replica {
                collection: collection.to_string(),
                slice: slice.to_string(),
                name: format!("core_node{}", n),
                core: format!("{}_{}_replica{}", collection, slice, n),
                node: node.clone(),
                active: activation == Some(0),
                leader: !has_leader,
            },
            reads_until_active: activation.filter(|reads| *reads > 0),
        });
        Ok(())
    }

    async fn delete_replica(&self, collection: &str, slice: &str, replica: &str) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(&mut state, "DELETEREPLICA", format!("{}/{} {}", collection, slice, replica))?;

        let position = state
            .replicas
            .iter()
            .position(|r| r.replica.is_of(collection, slice) && r.replica.name == replica)
            .ok_or_else(|| api_error("DELETEREPLICA", format!("no replica {}", replica)))?;
        let removed = state.replicas.remove(position);

        if removed.replica.leader {
            if let Some(next) = state
                .replicas
                .iter_mut()
                .find(|r| r.replica.is_of(collection, slice) && r.replica.active)
            {
                next.replica.leader = true;
            }
        }
        Ok(())
    }

    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(
            &mut state,
            "CREATE",
            format!(
                "{} slices={} config={} async={}",
                request.name,
                request.num_slices,
                request.config_name,
                request.async_id.is_some()
            ),
        )?;

        if state.collections.contains_key(&request.name) {
            return Err(api_error("CREATE", "collection already exists"));
        }

        let nodes: Vec<NodeName> = match &request.node_set {
            Some(nodes) => nodes.clone(),
            None => state.live_nodes.iter().cloned().collect(),
        };
        if nodes.is_empty() {
            return Err(api_error("CREATE", "no live nodes"));
        }

        let slices: Vec<Slice> = (1..=request.num_slices)
            .map(|i| Slice::new(format!("shard{}", i)))
            .collect();
        let mut collection = Collection::new(request.name.clone(), slices.clone());
        collection.config_name = Some(request.config_name.clone());
        collection.replication_factor = request.replication_factor;
        collection.max_shards_per_node = request.max_shards_per_node;
        state.collections.insert(request.name.clone(), collection);

        let copies = request.replication_factor.unwrap_or(1) as usize;
        let mut placement = 0;
        for slice in &slices {
            for copy in 0..copies {
                let n = state.next_replica;
                state.next_replica += 1;
                state.replicas.push(SimReplica {
                    replica: Replica {
                        collection: request.name.clone(),
                        slice: slice.name.clone(),
                        name: format!("core_node{}", n),
                        core: format!("{}_{}_replica{}", request.name, slice.name, copy + 1),
                        node: nodes[placement % nodes.len()].clone(),
                        active: true,
                        leader: copy == 0,
                    },
                    reads_until_active: None,
                });
                placement += 1;
            }
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(&mut state, "DELETE", name.to_string())?;

        if state.collections.remove(name).is_none() {
            return Err(api_error("DELETE", format!("no collection {}", name)));
        }
        state.replicas.retain(|r| r.replica.collection != name);
        Ok(())
    }

    async fn create_alias(&self, alias: &str, collections: &[String]) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(&mut state, "CREATEALIAS", format!("{} {}", alias, collections.join(",")))?;
        state.aliases.insert(alias.to_string(), collections.to_vec());
        Ok(())
    }

    async fn delete_alias(&self, alias: &str) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(&mut state, "DELETEALIAS", alias.to_string())?;
        state
            .aliases
            .remove(alias)
            .map(|_| ())
            .ok_or_else(|| api_error("DELETEALIAS", format!("no alias {}", alias)))
    }

    async fn fetch_index(&self, node: &NodeName, target_core: &str, source_url: &str) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(&mut state, "FETCHINDEX", format!("{} {} {}", node, target_core, source_url))
    }

    async fn backup_index(&self, node: &NodeName, core: &str, location: &str, keep: u32) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(&mut state, "BACKUP", format!("{} {} {} keep={}", node, core, location, keep))?;
        let transfer = self.start_transfer(&state);
        state.backups.insert(core.to_string(), transfer);
        Ok(())
    }

    async fn backup_status(&self, _node: &NodeName, core: &str) -> Result<TransferStatus> {
        let mut state = self.state.lock();
        state.requests.push(format!("BACKUPSTATUS {}", core));
        Ok(poll_transfer(&mut state.backups, core))
    }

    async fn restore_index(&self, node: &NodeName, core: &str, location: &str) -> Result<()> {
        let mut state = self.state.lock();
        self.accept(&mut state, "RESTORE", format!("{} {} {}", node, core, location))?;
        let transfer = self.start_transfer(&state);
        state.restores.insert(core.to_string(), transfer);
        Ok(())
    }

    async fn restore_status(&self, _node: &NodeName, core: &str) -> Result<TransferStatus> {
        let mut state = self.state.lock();
        state.requests.push(format!("RESTORESTATUS {}", core));
        Ok(poll_transfer(&mut state.restores, core))
    }
}
