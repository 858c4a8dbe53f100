//! Planning: turn a snapshot plus an intent into an [`Operation`].
//!
//! Every function here is pure. It reads one [`ClusterState`], checks its
//! preconditions against it and either returns the operation that carries
//! out the intent or fails without producing anything. Node arguments are
//! canonical names; resolve user input with
//! [`ClusterManager::canonical_node_name`](crate::cluster::ClusterManager::canonical_node_name)
//! first.
//!
//! [`ClusterState`]: crate::cluster::ClusterState
//! [`Operation`]: crate::operation::Operation

mod copy;
mod drain;
mod lifecycle;
mod placement;

pub use copy::{backup_collection, deploy_from_another_cluster, first_replica_core, restore_collection};
pub use drain::{clean_cluster, clone_replicas, migrate, wipe_node};
pub use lifecycle::{create_collection, delete_alias, delete_collection, update_alias};
pub use placement::{fill_cluster, populate_cluster};
