//! Command-line interface for shardctl.

mod run;

pub use run::run;

use crate::config::{humantime_serde::parse_duration, ManagerConfig};
use crate::error::{Result, ShardError};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// shardctl - plan and apply replica placement on a sharded search cluster.
#[derive(Parser, Debug)]
#[command(name = "shardctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (JSON)
    #[arg(short, long, env = "SHARDCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of any cluster node, e.g. http://10.0.0.1:8983/solr
    #[arg(short, long, env = "SHARDCTL_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SHARDCTL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "SHARDCTL_JSON_LOGS")]
    pub json_logs: bool,

    /// Time between topology samples while waiting (e.g. 5s, 500ms)
    #[arg(long, env = "SHARDCTL_POLL_INTERVAL", value_parser = parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Give up waiting for convergence after this long
    #[arg(long, env = "SHARDCTL_TIMEOUT", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the effective configuration: file (or defaults), then flags.
    pub fn load_config(&self) -> Result<ManagerConfig> {
        let mut config = match &self.config {
            Some(path) => ManagerConfig::from_file(path)?,
            None => ManagerConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.cluster.endpoint = endpoint.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if self.json_logs {
            config.observability.json_logs = true;
        }
        if let Some(interval) = self.poll_interval {
            config.polling.interval = interval;
        }
        if self.timeout.is_some() {
            config.polling.timeout = self.timeout;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Preview-only switch shared by every mutating command.
#[derive(Args, Debug, Clone, Default)]
pub struct DryRun {
    /// Print the planned actions without executing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the cluster topology
    Status,

    /// Audit replica health; exits non-zero unless healthy
    Health {
        /// Only audit this collection
        #[arg(long)]
        collection: Option<String>,

        /// Active replicas each slice should have (default: replication factor)
        #[arg(long)]
        min_active: Option<usize>,
    },

    /// Replicate a collection from its single indexer node onto every other node
    Populate {
        collection: String,

        /// Distinct slices each target node receives
        #[arg(long)]
        slices_per_node: usize,

        /// Return once replicas are requested instead of waiting for them
        #[arg(long)]
        no_wait: bool,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Add replicas until every node holds as many as the busiest one
    Fill {
        collection: String,

        /// Only place replicas on these nodes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        nodes: Vec<String>,

        #[arg(long)]
        no_wait: bool,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Delete inactive replicas of a collection
    Clean {
        collection: String,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Delete every replica on a node
    Wipe {
        node: String,

        /// Only delete replicas of this collection
        #[arg(long)]
        collection: Option<String>,

        /// Replicas each slice must keep after a deletion
        #[arg(long, default_value_t = 1)]
        safety_factor: usize,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Copy every replica on one node onto another
    Clone {
        from: String,
        onto: String,

        #[arg(long)]
        no_wait: bool,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Clone a node onto another, then wipe it
    Migrate {
        from: String,
        onto: String,

        #[arg(long, default_value_t = 1)]
        safety_factor: usize,

        #[arg(long)]
        no_wait: bool,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Load a collection's index from a node of another cluster
    Copy {
        collection: String,

        /// host:port of a node in the source cluster
        source_host: String,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Back up every slice leader to <dir>/<collection>/<slice>
    Backup {
        collection: String,
        dir: PathBuf,

        /// Backups to retain per core
        #[arg(long, default_value_t = 1)]
        keep: u32,

        /// Request every backup at once instead of one at a time
        #[arg(long)]
        parallel: bool,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Restore every replica from <dir>/<source collection>/<slice>
    Restore {
        collection: String,
        dir: PathBuf,

        /// Collection name the backup was taken under
        #[arg(long)]
        source_collection: Option<String>,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Create a collection
    Create {
        name: String,

        #[arg(long)]
        slices: u32,

        /// Config set to create the collection from
        #[arg(long)]
        config_name: String,

        #[arg(long)]
        replication_factor: Option<u32>,

        #[arg(long)]
        max_shards_per_node: Option<u32>,

        /// Restrict placement to these nodes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        nodes: Vec<String>,

        /// Submit asynchronously and return immediately
        #[arg(long = "async")]
        asynchronous: bool,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Delete a collection
    Delete {
        name: String,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Create or repoint an alias
    Alias {
        name: String,

        /// Target collections (comma-separated)
        #[arg(required = true, value_delimiter = ',')]
        collections: Vec<String>,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Delete an alias
    DeleteAlias {
        name: String,

        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Wait until every replica on the given nodes (default: this host) is active
    WaitActive {
        nodes: Vec<String>,

        /// Fail if any node cannot be resolved
        #[arg(long)]
        strict: bool,
    },
}

impl Commands {
    /// Short stable name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Status => "status",
            Commands::Health { .. } => "health",
            Commands::Populate { .. } => "populate",
            Commands::Fill { .. } => "fill",
            Commands::Clean { .. } => "clean",
            Commands::Wipe { .. } => "wipe",
            Commands::Clone { .. } => "clone",
            Commands::Migrate { .. } => "migrate",
            Commands::Copy { .. } => "copy",
            Commands::Backup { .. } => "backup",
            Commands::Restore { .. } => "restore",
            Commands::Create { .. } => "create",
            Commands::Delete { .. } => "delete",
            Commands::Alias { .. } => "alias",
            Commands::DeleteAlias { .. } => "delete-alias",
            Commands::WaitActive { .. } => "wait-active",
        }
    }

    /// Reject argument values no command can act on.
    pub fn validate(&self) -> Result<()> {
        match self {
            Commands::Health {
                min_active: Some(0),
                ..
            } => invalid("--min-active must be at least 1"),
            Commands::Populate {
                slices_per_node: 0, ..
            } => invalid("--slices-per-node must be at least 1"),
            Commands::Wipe {
                safety_factor: 0, ..
            }
            | Commands::Migrate {
                safety_factor: 0, ..
            } => invalid("--safety-factor must be at least 1"),
            Commands::Clone { from, onto, .. } | Commands::Migrate { from, onto, .. }
                if from == onto =>
            {
                invalid("source and target node must differ")
            }
            Commands::Copy { source_host, .. } if source_host.trim().is_empty() => {
                invalid("source host must not be empty")
            }
            Commands::Backup { keep: 0, .. } => invalid("--keep must be at least 1"),
            Commands::Create { slices: 0, .. } => invalid("--slices must be at least 1"),
            Commands::Create {
                replication_factor: Some(0),
                ..
            }
            | Commands::Create {
                max_shards_per_node: Some(0),
                ..
            } => invalid("replication factor and shards per node must be at least 1"),
            Commands::Alias { collections, .. }
                if collections.iter().any(|c| c.trim().is_empty()) =>
            {
                invalid("alias targets must not be empty")
            }
            _ => Ok(()),
        }
    }

    /// Whether this command only previews.
    pub fn is_dry_run(&self) -> bool {
        match self {
            Commands::Populate { dry_run, .. }
            | Commands::Fill { dry_run, .. }
            | Commands::Clean { dry_run, .. }
            | Commands::Wipe { dry_run, .. }
            | Commands::Clone { dry_run, .. }
            | Commands::Migrate { dry_run, .. }
            | Commands::Copy { dry_run, .. }
            | Commands::Backup { dry_run, .. }
            | Commands::Restore { dry_run, .. }
            | Commands::Create { dry_run, .. }
            | Commands::Delete { dry_run, .. }
            | Commands::Alias { dry_run, .. }
            | Commands::DeleteAlias { dry_run, .. } => dry_run.dry_run,
            Commands::Status | Commands::Health { .. } | Commands::WaitActive { .. } => false,
        }
    }
}

fn invalid(reason: &str) -> Result<()> {
    Err(ShardError::InvalidArgument(reason.to_string()))
}
