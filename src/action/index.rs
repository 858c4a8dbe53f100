//! Index transfer mutations: cross-cluster fetch, backup and restore.
//!
//! These address a single core. The core's hosting node is looked up in a
//! fresh snapshot at execution time, since a replica may have moved since
//! planning.

use super::{Mutation, PreviewRow};
use crate::cluster::{ClusterManager, ClusterState, TransferStatus};
use crate::error::{Result, ShardError};
use crate::types::NodeName;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

const DEFAULT_SOURCE_PATH: &str = "/solr";

fn hosting_node(state: &ClusterState, core: &str) -> Result<NodeName> {
    state
        .find_core(core)
        .map(|r| r.node.clone())
        .ok_or_else(|| ShardError::ReplicaNotFound(format!("core {}", core)))
}

/// Make a local core pull its index from a core on another host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchIndex {
    pub target_core: String,
    pub source_core: String,
    /// `host:port` of the node serving the source core.
    pub source_host: String,
    /// Context path on the source host; `/solr` when absent.
    pub source_path: Option<String>,
}

impl FetchIndex {
    pub fn new(
        target_core: impl Into<String>,
        source_core: impl Into<String>,
        source_host: impl Into<String>,
        source_path: Option<String>,
    ) -> Self {
        Self {
            target_core: target_core.into(),
            source_core: source_core.into(),
            source_host: source_host.into(),
            source_path,
        }
    }

    /// URL of the source core.
    pub fn source_url(&self) -> String {
        let path = self.source_path.as_deref().unwrap_or(DEFAULT_SOURCE_PATH);
        let path = path.trim_end_matches('/');
        let separator = if path.is_empty() || path.starts_with('/') { "" } else { "/" };
        format!(
            "http://{}{}{}/{}",
            self.source_host, separator, path, self.source_core
        )
    }
}

impl fmt::Display for FetchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FetchIndex {} <- {}", self.target_core, self.source_url())
    }
}

#[async_trait]
impl Mutation for FetchIndex {
    fn kind(&self) -> &'static str {
        "fetch-index"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: None,
            slice: None,
            node: None,
            detail: format!("{} <- {}", self.target_core, self.source_url()),
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        let node = hosting_node(&manager.current_state().await?, &self.target_core)?;
        let source_url = self.source_url();

        info!(core = %self.target_core, node = %node, source = %source_url, "Fetching index");
        manager
            .api()
            .fetch_index(&node, &self.target_core, &source_url)
            .await
    }
}

/// Snapshot a core's index into a directory on its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupIndex {
    pub core: String,
    pub directory: PathBuf,
    /// Poll until the backup succeeds or fails.
    pub wait: bool,
    /// Number of snapshots to retain in the directory.
    pub keep: u32,
}

impl BackupIndex {
    pub fn new(core: impl Into<String>, directory: PathBuf, wait: bool, keep: u32) -> Self {
        Self {
            core: core.into(),
            directory,
            wait,
            keep,
        }
    }
}

impl fmt::Display for BackupIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BackupIndex {} -> {} (keep {}{})",
            self.core,
            self.directory.display(),
            self.keep,
            if self.wait { ", wait" } else { "" }
        )
    }
}

#[async_trait]
impl Mutation for BackupIndex {
    fn kind(&self) -> &'static str {
        "backup-index"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: None,
            slice: None,
            node: None,
            detail: format!("{} -> {}", self.core, self.directory.display()),
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        let node = hosting_node(&manager.current_state().await?, &self.core)?;
        let location = self.directory.display().to_string();

        info!(core = %self.core, node = %node, location = %location, keep = self.keep, "Backing up index");
        manager
            .api()
            .backup_index(&node, &self.core, &location, self.keep)
            .await?;

        if !self.wait {
            return Ok(());
        }

        let (api, node, core) = (manager.api(), &node, self.core.as_str());
        manager
            .poller()
            .until("backup finished", || async move {
                let status = api.backup_status(node, core).await?;
                debug!(core, ?status, "Backup status");
                finished(core, status)
            })
            .await
    }
}

/// Restore a core from a backup directory, waiting for the restore to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreIndex {
    pub core: String,
    pub directory: PathBuf,
}

impl RestoreIndex {
    pub fn new(core: impl Into<String>, directory: PathBuf) -> Self {
        Self {
            core: core.into(),
            directory,
        }
    }
}

impl fmt::Display for RestoreIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RestoreIndex {} <- {}", self.core, self.directory.display())
    }
}

#[async_trait]
impl Mutation for RestoreIndex {
    fn kind(&self) -> &'static str {
        "restore-index"
    }

    fn preview(&self) -> PreviewRow {
        PreviewRow {
            kind: self.kind(),
            collection: None,
            slice: None,
            node: None,
            detail: format!("{} <- {}", self.core, self.directory.display()),
        }
    }

    async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        let node = hosting_node(&manager.current_state().await?, &self.core)?;
        let location = self.directory.display().to_string();

        info!(core = %self.core, node = %node, location = %location, "Restoring index");
        manager
            .api()
            .restore_index(&node, &self.core, &location)
            .await?;

        let (api, node, core) = (manager.api(), &node, self.core.as_str());
        manager
            .poller()
            .until("restore finished", || async move {
                let status = api.restore_status(node, core).await?;
                debug!(core, ?status, "Restore status");
                finished(core, status)
            })
            .await
    }
}

/// Map a transfer status onto a poll result; failure ends the poll.
fn finished(core: &str, status: TransferStatus) -> Result<bool> {
    match status {
        TransferStatus::Success => Ok(true),
        TransferStatus::Failed(message) => Err(ShardError::IndexTransfer {
            core: core.to_string(),
            message,
        }),
        TransferStatus::InProgress | TransferStatus::Unknown => Ok(false),
    }
}
