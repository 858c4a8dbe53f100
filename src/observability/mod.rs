//! Observability for shardctl.
//!
//! Logging goes through `tracing`; action outcomes are counted with
//! `metrics`. No exporter is installed here, so counters are no-ops unless
//! the embedding program installs a recorder.

use crate::config::ObservabilityConfig;
use crate::error::{Result, ShardError};
use metrics::counter;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging.
///
/// `RUST_LOG` overrides the configured level. Logs go to stderr so previews
/// and status output on stdout stay clean.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| ShardError::Internal(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| ShardError::Internal(format!("Failed to init logging: {}", e)))?;
    }

    debug!("Observability initialized");
    Ok(())
}

/// Record the outcome of one executed action.
pub fn record_action(kind: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("shardctl_actions_total", "kind" => kind, "outcome" => outcome).increment(1);
}

/// Record a planned operation and its size.
pub fn record_plan(command: &'static str, actions: usize) {
    counter!("shardctl_plans_total", "command" => command).increment(1);
    counter!("shardctl_planned_actions_total", "command" => command).increment(actions as u64);
}
