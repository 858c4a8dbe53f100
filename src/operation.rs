//! Ordered, composable units of work.

use crate::action::{Action, PreviewRow};
use crate::cluster::ClusterManager;
use crate::error::{Result, ShardError};
use std::fmt;
use std::ops::{Add, AddAssign};
use tracing::{error, info};

/// An ordered sequence of actions, executed as a unit.
///
/// Operations compose with `+`, which concatenates; the empty operation is
/// its identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    actions: Vec<Action>,
}

impl Operation {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn non_empty(&self) -> bool {
        !self.is_empty()
    }

    pub fn push(&mut self, action: impl Into<Action>) {
        self.actions.push(action.into());
    }

    /// Numbered, one action per line.
    pub fn pretty_print(&self) -> String {
        self.to_string()
    }

    pub fn preview_rows(&self) -> Vec<PreviewRow> {
        self.actions.iter().map(Action::preview).collect()
    }

    /// Run every action in order, stopping at the first failure.
    ///
    /// The error names the failed step by its 1-based position, matching
    /// [`pretty_print`](Self::pretty_print). Actions before it have already
    /// taken effect; nothing is rolled back.
    pub async fn execute(&self, manager: &ClusterManager) -> Result<()> {
        let total = self.actions.len();
        for (i, action) in self.actions.iter().enumerate() {
            let step = i + 1;
            info!(step, total, action = %action, "Executing action");

            if let Err(e) = action.execute(manager).await {
                error!(step, total, action = %action, error = %e, "Action failed");
                return Err(ShardError::ActionFailed {
                    index: step,
                    action: action.to_string(),
                    source: Box::new(e),
                });
            }
        }

        info!(total, "Operation complete");
        Ok(())
    }
}

impl From<Action> for Operation {
    fn from(action: Action) -> Self {
        Self::new(vec![action])
    }
}

impl FromIterator<Action> for Operation {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Add for Operation {
    type Output = Operation;

    fn add(mut self, rhs: Operation) -> Operation {
        self.actions.extend(rhs.actions);
        self
    }
}

impl AddAssign for Operation {
    fn add_assign(&mut self, rhs: Operation) {
        self.actions.extend(rhs.actions);
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.actions.is_empty() {
            return writeln!(f, "No actions");
        }
        let width = self.actions.len().to_string().len();
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "{:>width$}. {}", i + 1, action, width = width)?;
        }
        Ok(())
    }
}
