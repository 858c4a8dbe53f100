//! shardctl - plan and apply replica placement on a sharded search cluster.
//!
//! shardctl reads the topology of a SolrCloud-style cluster (live nodes,
//! collections split into slices, slices replicated as cores), plans the
//! mutations needed to carry out an intent such as "drain this node" or
//! "fill out this collection", and executes them through the cluster's
//! management API.
//!
//! # Features
//!
//! - **Snapshots**: immutable [`ClusterState`](cluster::ClusterState) read fresh on every call.
//! - **Planning**: pure functions from a snapshot to an [`Operation`](operation::Operation).
//! - **Safety**: replica deletions are checked against a safety factor when
//!   planned and again when executed.
//! - **Convergence**: optional waits until new replicas, backups or restores
//!   finish.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Driver: CLI | config | logging                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Planner: populate | fill | clone | wipe | migrate | copy   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Operation -> Action -> ClusterManager                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Backends: CoordinationService | ManagementApi (HTTP)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use shardctl::cluster::ClusterManager;
//! use shardctl::config::ManagerConfig;
//! use shardctl::planner;
//!
//! #[tokio::main]
//! async fn main() -> shardctl::Result<()> {
//!     let manager = ClusterManager::connect(&ManagerConfig::development()).await?;
//!     let state = manager.current_state().await?;
//!
//!     let op = planner::clean_cluster(&state, "products")?;
//!     print!("{}", op.pretty_print());
//!     op.execute(&manager).await?;
//!
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod action;
pub mod cluster;
pub mod convergence;
pub mod operation;
pub mod planner;

pub mod cli;
pub mod client;
pub mod observability;

// Re-exports
pub use error::{Result, ShardError};
pub use operation::Operation;

use cluster::ClusterManager;
use tracing::info;

/// Run one parsed command line to completion.
///
/// The cluster connection is released before returning, whether the command
/// succeeded or not.
pub async fn run(cli: cli::Cli) -> Result<()> {
    let config = cli.load_config()?;
    observability::init(&config.observability)?;
    cli.command.validate()?;

    let manager = ClusterManager::connect(&config).await?;
    info!(command = cli.command.name(), "Running command");

    let result = cli::run(&cli.command, &manager).await;
    manager.shutdown();
    result
}
