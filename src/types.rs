//! Core type definitions for the cluster topology.
//!
//! These are the plain values a [`ClusterState`](crate::cluster::ClusterState)
//! is made of. None of them carry behaviour that talks to the cluster.
//!
//! # Key Types
//!
//! - [`NodeName`]: canonical `host:port_context` identity of a node
//! - [`Collection`] and [`Slice`]: a logical dataset and its partitions
//! - [`Replica`]: one physical core of a slice, hosted on one node
//! - [`Alias`]: a named pointer to one or more collections
//!
//! # Examples
//!
//! ```rust
//! use shardctl::types::NodeName;
//!
//! let node = NodeName::new("10.0.0.1:8983_solr");
//! assert_eq!(node.host(), "10.0.0.1");
//! assert_eq!(node.port(), Some(8983));
//! assert_eq!(node.base_url(), "http://10.0.0.1:8983/solr");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical name of a node as registered in the coordination service.
///
/// The registered form is `host:port_context`, where the context is the
/// servlet path with `/` replaced by `_` (so `/solr` becomes `_solr`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeName(String);

impl NodeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `host:port` part of the name, without the context suffix.
    pub fn host_port(&self) -> &str {
        match self.0.find('_') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Host part of the name.
    pub fn host(&self) -> &str {
        let host_port = self.host_port();
        match host_port.rfind(':') {
            Some(idx) => &host_port[..idx],
            None => host_port,
        }
    }

    /// Port, if the name carries a parseable one.
    pub fn port(&self) -> Option<u16> {
        let host_port = self.host_port();
        host_port
            .rfind(':')
            .and_then(|idx| host_port[idx + 1..].parse().ok())
    }

    /// Context path (`/solr` for `host:8983_solr`, empty when absent).
    pub fn context(&self) -> String {
        match self.0.find('_') {
            Some(idx) => format!("/{}", self.0[idx + 1..].replace('_', "/")),
            None => String::new(),
        }
    }

    /// HTTP base URL for node-level requests.
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.host_port(), self.context())
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One partition of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    /// Name, unique within its collection.
    pub name: String,
    /// Whether the slice is serving (as opposed to construction/inactive
    /// after a split).
    pub active: bool,
}

impl Slice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
        }
    }
}

/// A logical named dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    /// Slices in the order the cluster reports them.
    pub slices: Vec<Slice>,
    pub replication_factor: Option<u32>,
    pub max_shards_per_node: Option<u32>,
    /// Name of the config set the collection was created from.
    pub config_name: Option<String>,
}

impl Collection {
    pub fn new(name: impl Into<String>, slices: Vec<Slice>) -> Self {
        Self {
            name: name.into(),
            slices,
            replication_factor: None,
            max_shards_per_node: None,
            config_name: None,
        }
    }

    pub fn slice_names(&self) -> impl Iterator<Item = &str> {
        self.slices.iter().map(|s| s.name.as_str())
    }

    pub fn has_slice(&self, name: &str) -> bool {
        self.slices.iter().any(|s| s.name == name)
    }

    /// Serving slices, skipping split parents and slices under construction.
    pub fn active_slice_names(&self) -> impl Iterator<Item = &str> {
        self.slices
            .iter()
            .filter(|s| s.active)
            .map(|s| s.name.as_str())
    }

    pub fn is_active_slice(&self, name: &str) -> bool {
        self.slices.iter().any(|s| s.name == name && s.active)
    }
}

/// One physical instance of a slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Replica {
    pub collection: String,
    pub slice: String,
    /// Replica name inside the slice (e.g. `core_node3`).
    pub name: String,
    /// Core name, unique cluster-wide.
    pub core: String,
    pub node: NodeName,
    /// Reports active and sits on a live node.
    pub active: bool,
    pub leader: bool,
}

impl Replica {
    /// True when this replica belongs to the given collection and slice.
    pub fn is_of(&self, collection: &str, slice: &str) -> bool {
        self.collection == collection && self.slice == slice
    }
}

impl fmt::Display for Replica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {} on {} ({}{})",
            self.collection,
            self.slice,
            self.core,
            self.node,
            if self.active { "active" } else { "inactive" },
            if self.leader { ", leader" } else { "" }
        )
    }
}

/// A named pointer to one or more collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub collections: Vec<String>,
}
