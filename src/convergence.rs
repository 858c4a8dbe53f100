//! Convergence polling.
//!
//! The coordination service only offers pull-based topology reads, so
//! waiting for the cluster to settle means sampling it on a timer until a
//! condition holds or a deadline passes.

use crate::cluster::ClusterManager;
use crate::config::PollingConfig;
use crate::error::{Result, ShardError};
use crate::types::NodeName;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Timer-driven check loop with an optional deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    timeout: Option<Duration>,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.interval, config.timeout)
    }

    /// Replace the deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `check` once per interval until it returns `true`.
    ///
    /// The first check runs immediately. An error from `check` ends the loop
    /// with that error. Fails with [`ShardError::Timeout`] once the elapsed
    /// time exceeds the deadline.
    pub async fn until<F, Fut>(&self, what: &str, mut check: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let start = Instant::now();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if check().await? {
                debug!(what, elapsed_ms = start.elapsed().as_millis() as u64, "Condition reached");
                return Ok(());
            }

            if let Some(timeout) = self.timeout {
                if start.elapsed() > timeout {
                    return Err(ShardError::Timeout(format!(
                        "{} not reached after {:?}",
                        what, timeout
                    )));
                }
            }
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

/// Block until every replica hosted on the target nodes reports active.
///
/// An empty `nodes` list targets the local host. References are resolved
/// once, up front, allowing offline nodes so a restarting node can be waited
/// on. Unresolvable references fail the wait when `strict`, and are skipped
/// with a warning otherwise.
pub async fn wait_active(manager: &ClusterManager, nodes: &[String], strict: bool) -> Result<()> {
    let references: Vec<String> = if nodes.is_empty() {
        vec![local_hostname()]
    } else {
        nodes.to_vec()
    };

    let mut targets = BTreeSet::new();
    for reference in &references {
        match manager.canonical_node_name(reference, true).await {
            Ok(node) => {
                targets.insert(node);
            }
            Err(e) if strict => return Err(e),
            Err(e) => warn!(reference = %reference, error = %e, "Skipping unresolvable node"),
        }
    }

    if targets.is_empty() {
        warn!("No nodes resolved, nothing to wait for");
        return Ok(());
    }

    info!(
        nodes = ?targets.iter().map(NodeName::as_str).collect::<Vec<_>>(),
        "Waiting for replicas to become active"
    );

    let targets = &targets;
    manager
        .poller()
        .until("all replicas active", || async move {
            let state = manager.current_state().await?;
            let hosted: Vec<_> = state
                .replicas()
                .iter()
                .filter(|r| targets.contains(&r.node))
                .collect();
            let active = hosted.iter().filter(|r| r.active).count();
            info!(active, total = hosted.len(), "Replica activity");
            Ok(active == hosted.len())
        })
        .await
}

/// Best-effort name of the machine we run on.
pub fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}
