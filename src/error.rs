//! Error types for shardctl.
//!
//! This module provides a unified error type [`ShardError`] for planning and
//! executing cluster operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Planning**: a precondition of a planner does not hold (unknown
//!   collection, indivisible slice counts, ambiguous node reference). No
//!   operation is produced.
//! - **Safety**: a deletion would leave a slice with fewer replicas than its
//!   safety factor. Raised at planning time and again at execution time.
//! - **Connectivity**: the coordination service or the management API could
//!   not be reached, or rejected a request.
//! - **Execution**: wraps the failure of one action inside an operation so the
//!   caller knows which step stopped the run.
//! - **Configuration**: invalid settings or unreadable config files.
//!
//! # Example
//!
//! ```rust
//! use shardctl::error::{root_cause, ShardError};
//!
//! let err = ShardError::CollectionNotFound("products".into());
//! assert!(!err.is_retryable());
//! assert_eq!(root_cause(&err).to_string(), "Collection not found: products");
//! ```

use std::io;
use thiserror::Error;

/// Main error type for shardctl operations.
#[derive(Error, Debug)]
pub enum ShardError {
    // Planning errors
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Ambiguous node reference {reference}: matches {candidates:?}")]
    AmbiguousNode {
        reference: String,
        candidates: Vec<String>,
    },

    #[error("Replica not found: {0}")]
    ReplicaNotFound(String),

    #[error("No active leader for {collection}/{slice}")]
    NoLeader { collection: String, slice: String },

    // Safety errors
    #[error(
        "Refusing to delete replica of {collection}/{slice} on {node}: \
         {remaining} replica(s) would remain, safety factor is {safety_factor}"
    )]
    SafetyViolation {
        collection: String,
        slice: String,
        node: String,
        remaining: usize,
        safety_factor: usize,
    },

    // Connectivity and domain errors
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Management API rejected {action}: {message}")]
    ManagementApi { action: String, message: String },

    #[error("Config not found in config store: {0}")]
    ConfigNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Backup or restore failed for core {core}: {message}")]
    IndexTransfer { core: String, message: String },

    // Execution errors
    #[error("Action {index} ({action}) failed")]
    ActionFailed {
        index: usize,
        action: String,
        #[source]
        source: Box<ShardError>,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Serialization errors
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // External errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShardError {
    /// Check if error is retryable.
    ///
    /// Nothing is retried automatically; callers use this to decide whether a
    /// fresh invocation is worth attempting.
    pub fn is_retryable(&self) -> bool {
        match self {
            ShardError::ConnectionFailed(_)
            | ShardError::Network(_)
            | ShardError::Timeout(_) => true,
            ShardError::ActionFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// The error underneath any [`ShardError::ActionFailed`] wrappers.
    pub fn innermost(&self) -> &ShardError {
        match self {
            ShardError::ActionFailed { source, .. } => source.innermost(),
            other => other,
        }
    }

    /// True for failures raised while planning, before anything was mutated.
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            ShardError::Precondition(_)
                | ShardError::CollectionNotFound(_)
                | ShardError::CollectionExists(_)
                | ShardError::AliasNotFound(_)
                | ShardError::NodeNotFound(_)
                | ShardError::AmbiguousNode { .. }
                | ShardError::NoLeader { .. }
        )
    }
}

impl From<serde_json::Error> for ShardError {
    fn from(e: serde_json::Error) -> Self {
        ShardError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for ShardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            ShardError::ConnectionFailed(e.to_string())
        } else if e.is_timeout() {
            ShardError::Timeout(e.to_string())
        } else if e.is_decode() {
            ShardError::Deserialization(e.to_string())
        } else {
            ShardError::Network(e.to_string())
        }
    }
}

/// Walk the `source()` chain and return the innermost error.
pub fn root_cause<'a>(err: &'a (dyn std::error::Error + 'static)) -> &'a (dyn std::error::Error + 'static) {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current
}

/// Result type alias for shardctl operations.
pub type Result<T> = std::result::Result<T, ShardError>;
