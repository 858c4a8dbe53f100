//! Atomic cluster mutations.
//!
//! An [`Action`] is a planned request, detached from the snapshot it was
//! planned against. Executing it talks to the live cluster through the
//! [`ClusterManager`]; actions that guard against data loss re-read the
//! topology at that point rather than trusting the plan.

mod collection;
mod index;
mod replica;

pub use collection::{CreateCollection, DeleteAlias, DeleteCollection, UpdateAlias};
pub use index::{BackupIndex, FetchIndex, RestoreIndex};
pub use replica::{AddReplica, DeleteReplica};

use crate::cluster::ClusterManager;
use crate::error::Result;
use crate::observability;
use async_trait::async_trait;
use std::fmt;

/// One kind of mutation.
///
/// `Display` renders the one-line preview shown before execution.
#[async_trait]
pub trait Mutation: fmt::Display + Send + Sync {
    /// Short stable name, used in previews and metrics labels.
    fn kind(&self) -> &'static str;

    /// Tabular form of the preview line.
    fn preview(&self) -> PreviewRow;

    /// Submit the mutation and, where configured, wait for it to take effect.
    async fn execute(&self, manager: &ClusterManager) -> Result<()>;
}

/// One row of a tabular preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRow {
    pub kind: &'static str,
    pub collection: Option<String>,
    pub slice: Option<String>,
    pub node: Option<String>,
    pub detail: String,
}

/// A planned mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddReplica(AddReplica),
    DeleteReplica(DeleteReplica),
    CreateCollection(CreateCollection),
    DeleteCollection(DeleteCollection),
    UpdateAlias(UpdateAlias),
    DeleteAlias(DeleteAlias),
    FetchIndex(FetchIndex),
    BackupIndex(BackupIndex),
    RestoreIndex(RestoreIndex),
}

impl Action {
    fn mutation(&self) -> &dyn Mutation {
        match self {
            Action::AddReplica(a) => a,
            Action::DeleteReplica(a) => a,
            Action::CreateCollection(a) => a,
            Action::DeleteCollection(a) => a,
            Action::UpdateAlias(a) => a,
            Action::DeleteAlias(a) => a,
            Action::FetchIndex(a) => a,
            Action::BackupIndex(a) => a,
            Action::RestoreIndex(a) => a,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.mutation().kind()
    }

    pub fn preview(&self) -> PreviewRow {
        self.mutation().preview()
    }

    /// Execute the action and record its outcome.
    pub async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        let result = self.mutation().execute(manager).await;
        observability::record_action(self.kind(), result.is_ok());
        result
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.mutation(), f)
    }
}

macro_rules! impl_from_mutation {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Action {
                fn from(action: $variant) -> Self {
                    Action::$variant(action)
                }
            }
        )*
    };
}

impl_from_mutation!(
    AddReplica,
    DeleteReplica,
    CreateCollection,
    DeleteCollection,
    UpdateAlias,
    DeleteAlias,
    FetchIndex,
    BackupIndex,
    RestoreIndex,
);
