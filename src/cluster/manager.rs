//! Connection owner and snapshot source.

use super::backend::{CoordinationService, ManagementApi};
use super::state::ClusterState;
use crate::client::SolrClient;
use crate::config::ManagerConfig;
use crate::convergence::Poller;
use crate::error::{Result, ShardError};
use crate::types::NodeName;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the coordination-service connection for the duration of a run.
///
/// Every [`current_state`](Self::current_state) call is a fresh read; nothing
/// is cached. The connection is released by [`shutdown`](Self::shutdown),
/// which is idempotent and also runs on drop, so every exit path releases it
/// exactly once.
pub struct ClusterManager {
    coordination: Arc<dyn CoordinationService>,
    api: Arc<dyn ManagementApi>,
    poller: Poller,
    closed: AtomicBool,
}

impl ClusterManager {
    /// Connect to the cluster described by `config` over HTTP.
    ///
    /// Reads the topology once so an unreachable cluster fails here rather
    /// than halfway through planning.
    pub async fn connect(config: &ManagerConfig) -> Result<Self> {
        config.validate()?;
        let client = Arc::new(SolrClient::new(&config.cluster.endpoint, &config.network)?);
        let manager = Self::with_backends(
            client.clone(),
            client,
            Poller::from_config(&config.polling),
        );

        let state = manager.current_state().await?;
        info!(
            endpoint = %config.cluster.endpoint,
            live_nodes = state.live_nodes().len(),
            "Connected to cluster"
        );
        Ok(manager)
    }

    /// Build a manager over arbitrary backends.
    pub fn with_backends(
        coordination: Arc<dyn CoordinationService>,
        api: Arc<dyn ManagementApi>,
        poller: Poller,
    ) -> Self {
        Self {
            coordination,
            api,
            poller,
            closed: AtomicBool::new(false),
        }
    }

    /// Read a fresh snapshot of the cluster.
    pub async fn current_state(&self) -> Result<ClusterState> {
        if self.is_shut_down() {
            return Err(ShardError::ConnectionFailed(
                "cluster manager has been shut down".to_string(),
            ));
        }

        let state = self.coordination.read_topology().await?;
        debug!(
            live_nodes = state.live_nodes().len(),
            replicas = state.replicas().len(),
            "Read cluster state"
        );
        Ok(state)
    }

    /// Resolve a node reference against a fresh snapshot.
    pub async fn canonical_node_name(&self, reference: &str, allow_offline: bool) -> Result<NodeName> {
        let state = self.current_state().await?;
        resolve_node(&state, reference, allow_offline).await
    }

    pub async fn config_exists(&self, config_name: &str) -> Result<bool> {
        if self.is_shut_down() {
            return Err(ShardError::ConnectionFailed(
                "cluster manager has been shut down".to_string(),
            ));
        }
        self.coordination.config_exists(config_name).await
    }

    /// Management API used by actions.
    pub fn api(&self) -> &dyn ManagementApi {
        self.api.as_ref()
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Release the coordination-service connection.
    pub fn shutdown(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.coordination.close();
            debug!("Cluster manager shut down");
        }
    }
}

impl Drop for ClusterManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Resolve a node reference, falling back to DNS when the literal form
/// matches nothing.
///
/// The host part of the reference is looked up and the match retried with
/// every address it resolves to, so `search-3` finds `10.0.0.3:8983_solr`.
pub async fn resolve_node(state: &ClusterState, reference: &str, allow_offline: bool) -> Result<NodeName> {
    let err = match state.canonical_node_name(reference, allow_offline) {
        Ok(node) => return Ok(node),
        Err(e @ ShardError::NodeNotFound(_)) => e,
        Err(e) => return Err(e),
    };

    let (host, suffix) = split_host(reference);
    if host.parse::<IpAddr>().is_ok() {
        return Err(err);
    }

    let addrs = match tokio::net::lookup_host((host, 0)).await {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!(host, error = %e, "DNS lookup failed");
            return Err(err);
        }
    };

    let mut found = BTreeSet::new();
    for addr in addrs {
        let candidate = format!("{}{}", addr.ip(), suffix);
        if let Ok(node) = state.canonical_node_name(&candidate, allow_offline) {
            found.insert(node);
        }
    }

    let mut found = found.into_iter();
    match (found.next(), found.next()) {
        (None, _) => Err(err),
        (Some(node), None) => Ok(node),
        (Some(first), Some(second)) => Err(ShardError::AmbiguousNode {
            reference: reference.to_string(),
            candidates: [first, second]
                .into_iter()
                .chain(found)
                .map(|n| n.to_string())
                .collect(),
        }),
    }
}

/// Split `host:port_ctx` into (`host`, `:port_ctx`).
fn split_host(reference: &str) -> (&str, &str) {
    let reference = reference.trim();
    match reference.find(':') {
        Some(idx) => (&reference[..idx], &reference[idx..]),
        None => match reference.find('_') {
            Some(idx) => (&reference[..idx], &reference[idx..]),
            None => (reference, ""),
        },
    }
}
