//! Command dispatch: plan, preview, then execute unless previewing.

use super::Commands;
use crate::action::CreateCollection;
use crate::cluster::{check_health, resolve_node, ClusterHealth, ClusterManager, ClusterState};
use crate::convergence::wait_active;
use crate::error::{Result, ShardError};
use crate::observability;
use crate::operation::Operation;
use crate::planner;
use crate::types::NodeName;
use tracing::info;

/// Run one command against a connected manager.
pub async fn run(command: &Commands, manager: &ClusterManager) -> Result<()> {
    command.validate()?;

    match command {
        Commands::Status => {
            print!("{}", manager.current_state().await?);
            Ok(())
        }

        Commands::Health {
            collection,
            min_active,
        } => {
            let state = manager.current_state().await?;
            let report = check_health(&state, collection.as_deref(), *min_active)?;
            println!("Cluster is {}", report.status);
            for issue in &report.issues {
                println!("  {}", issue);
            }
            match report.status {
                ClusterHealth::Healthy => Ok(()),
                status => Err(ShardError::Precondition(format!(
                    "cluster is {} ({} issue(s))",
                    status,
                    report.issues.len()
                ))),
            }
        }

        Commands::WaitActive { nodes, strict } => wait_active(manager, nodes, *strict).await,

        _ => {
            let state = manager.current_state().await?;
            let operation = plan(command, &state).await?;
            apply(command, manager, operation).await
        }
    }
}

/// Turn a mutating command into an operation against `state`.
async fn plan(command: &Commands, state: &ClusterState) -> Result<Operation> {
    match command {
        Commands::Populate {
            collection,
            slices_per_node,
            no_wait,
            ..
        } => planner::populate_cluster(state, collection, *slices_per_node, !no_wait),

        Commands::Fill {
            collection,
            nodes,
            no_wait,
            ..
        } => {
            let subset = if nodes.is_empty() {
                None
            } else {
                Some(resolve_all(state, nodes, false).await?)
            };
            planner::fill_cluster(state, collection, subset.as_deref(), !no_wait)
        }

        Commands::Clean { collection, .. } => planner::clean_cluster(state, collection),

        Commands::Wipe {
            node,
            collection,
            safety_factor,
            ..
        } => {
            let node = resolve_node(state, node, true).await?;
            planner::wipe_node(state, &node, collection.as_deref(), *safety_factor)
        }

        Commands::Clone {
            from,
            onto,
            no_wait,
            ..
        } => {
            let from = resolve_node(state, from, true).await?;
            let onto = resolve_node(state, onto, false).await?;
            planner::clone_replicas(state, &from, &onto, !no_wait)
        }

        Commands::Migrate {
            from,
            onto,
            safety_factor,
            no_wait,
            ..
        } => {
            let from = resolve_node(state, from, true).await?;
            let onto = resolve_node(state, onto, false).await?;
            planner::migrate(state, &from, &onto, *safety_factor, !no_wait)
        }

        Commands::Copy {
            collection,
            source_host,
            ..
        } => planner::deploy_from_another_cluster(state, collection, source_host),

        Commands::Backup {
            collection,
            dir,
            keep,
            parallel,
            ..
        } => planner::backup_collection(state, collection, dir, *keep, *parallel),

        Commands::Restore {
            collection,
            dir,
            source_collection,
            ..
        } => planner::restore_collection(state, collection, dir, source_collection.as_deref()),

        Commands::Create {
            name,
            slices,
            config_name,
            replication_factor,
            max_shards_per_node,
            nodes,
            asynchronous,
            ..
        } => {
            let mut request = CreateCollection::new(name.clone(), *slices, config_name.clone());
            request.replication_factor = *replication_factor;
            request.max_shards_per_node = *max_shards_per_node;
            request.asynchronous = *asynchronous;
            if !nodes.is_empty() {
                request.node_set = Some(resolve_all(state, nodes, false).await?);
            }
            planner::create_collection(state, request)
        }

        Commands::Delete { name, .. } => planner::delete_collection(state, name),

        Commands::Alias {
            name, collections, ..
        } => planner::update_alias(state, name, collections),

        Commands::DeleteAlias { name, .. } => planner::delete_alias(state, name),

        Commands::Status | Commands::Health { .. } | Commands::WaitActive { .. } => {
            Err(ShardError::Internal(format!(
                "{} does not produce an operation",
                command.name()
            )))
        }
    }
}

async fn resolve_all(state: &ClusterState, references: &[String], allow_offline: bool) -> Result<Vec<NodeName>> {
    let mut nodes = Vec::with_capacity(references.len());
    for reference in references {
        nodes.push(resolve_node(state, reference, allow_offline).await?);
    }
    Ok(nodes)
}

async fn apply(command: &Commands, manager: &ClusterManager, operation: Operation) -> Result<()> {
    observability::record_plan(command.name(), operation.len());

    if operation.is_empty() {
        println!("Nothing to do");
        return Ok(());
    }

    print!("{}", operation.pretty_print());

    if command.is_dry_run() {
        info!(command = command.name(), actions = operation.len(), "Dry run, nothing executed");
        return Ok(());
    }

    operation.execute(manager).await?;
    println!("{}", completion_message(command, &operation));
    Ok(())
}

fn completion_message(command: &Commands, operation: &Operation) -> String {
    format!(
        "{} complete: {} action(s) executed",
        command.name(),
        operation.len()
    )
}
