//! HTTP client for the cluster's management API.
//!
//! [`SolrClient`] implements both backend traits: topology is read through
//! the Collections API's CLUSTERSTATUS call (which mirrors the coordination
//! service), mutations go through the Collections API and the per-core
//! replication handler.

mod status;

pub use status::{natural_cmp, ClusterStatusResponse};

use crate::cluster::{
    ClusterState, CoordinationService, CreateCollectionRequest, ManagementApi, TransferStatus,
};
use crate::config::NetworkConfig;
use crate::error::{Result, ShardError};
use crate::types::NodeName;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

/// Client for one cluster, addressed through any of its nodes.
#[derive(Clone)]
pub struct SolrClient {
    base_url: String,
    client: Client,
}

impl SolrClient {
    /// Create a client for `endpoint` (e.g. `http://host:8983/solr`).
    pub fn new(endpoint: &str, network: &NetworkConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(network.connect_timeout)
            .timeout(network.request_timeout)
            .user_agent(format!("shardctl/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call the Collections API and check the response header.
    async fn collections_api(&self, action: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/admin/collections", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("action", action.to_string()), ("wt", "json".to_string())];
        query.extend(params.iter().cloned());

        debug!(action, ?params, "Collections API request");
        self.get_json(&url, &query, action).await
    }

    /// Call a core's replication handler on a specific node.
    async fn replication_handler(
        &self,
        node: &NodeName,
        core: &str,
        command: &str,
        params: &[(&str, String)],
    ) -> Result<Value> {
        let url = format!("{}/{}/replication", node.base_url(), core);
        let mut query: Vec<(&str, String)> = vec![
            ("command", command.to_string()),
            ("wt", "json".to_string()),
            ("json.nl", "map".to_string()),
        ];
        query.extend(params.iter().cloned());

        debug!(node = %node, core, command, "Replication handler request");
        self.get_json(&url, &query, command).await
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)], action: &str) -> Result<Value> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            if status.is_success() {
                ShardError::Deserialization(e.to_string())
            } else {
                ShardError::ManagementApi {
                    action: action.to_string(),
                    message: format!("HTTP {}", status),
                }
            }
        })?;

        check_response(action, status.is_success(), &body)?;
        Ok(body)
    }

    async fn overseer(&self) -> Option<String> {
        match self.collections_api("OVERSEERSTATUS", &[]).await {
            Ok(body) => body.get("leader").and_then(Value::as_str).map(String::from),
            Err(e) => {
                warn!(error = %e, "Could not read overseer status");
                None
            }
        }
    }
}

/// Turn an error payload into [`ShardError::ManagementApi`].
fn check_response(action: &str, http_ok: bool, body: &Value) -> Result<()> {
    let header_status = body
        .pointer("/responseHeader/status")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let message = body
        .pointer("/error/msg")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| body.get("failure").map(|f| f.to_string()))
        .or_else(|| body.get("exception").and_then(Value::as_str).map(String::from));

    if !http_ok || header_status != 0 || body.get("failure").is_some() {
        return Err(ShardError::ManagementApi {
            action: action.to_string(),
            message: message.unwrap_or_else(|| format!("status {}", header_status)),
        });
    }

    Ok(())
}

#[async_trait]
impl CoordinationService for SolrClient {
    async fn read_topology(&self) -> Result<ClusterState> {
        let body = self.collections_api("CLUSTERSTATUS", &[]).await?;
        let response: ClusterStatusResponse = serde_json::from_value(body)?;
        let overseer = self.overseer().await;
        Ok(status::cluster_state_from(response, overseer))
    }

    async fn config_exists(&self, config_name: &str) -> Result<bool> {
        let url = format!("{}/admin/configs", self.base_url);
        let query = [("action", "LIST".to_string()), ("wt", "json".to_string())];
        let body = self.get_json(&url, &query, "LIST configs").await?;

        Ok(body
            .get("configSets")
            .and_then(Value::as_array)
            .map_or(false, |sets| sets.iter().any(|s| s.as_str() == Some(config_name))))
    }

    fn close(&self) {
        debug!(endpoint = %self.base_url, "Closing cluster connection");
    }
}

#[async_trait]
impl ManagementApi for SolrClient {
    async fn add_replica(&self, collection: &str, slice: &str, node: &NodeName) -> Result<()> {
        self.collections_api(
            "ADDREPLICA",
            &[
                ("collection", collection.to_string()),
                ("shard", slice.to_string()),
                ("node", node.to_string()),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn delete_replica(&self, collection: &str, slice: &str, replica: &str) -> Result<()> {
        self.collections_api(
            "DELETEREPLICA",
            &[
                ("collection", collection.to_string()),
                ("shard", slice.to_string()),
                ("replica", replica.to_string()),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<()> {
        let mut params = vec![
            ("name", request.name.clone()),
            ("numShards", request.num_slices.to_string()),
            ("collection.configName", request.config_name.clone()),
        ];
        if let Some(max) = request.max_shards_per_node {
            params.push(("maxShardsPerNode", max.to_string()));
        }
        if let Some(rf) = request.replication_factor {
            params.push(("replicationFactor", rf.to_string()));
        }
        if let Some(nodes) = &request.node_set {
            let joined = nodes.iter().map(NodeName::as_str).collect::<Vec<_>>().join(",");
            params.push(("createNodeSet", joined));
        }
        if let Some(id) = &request.async_id {
            params.push(("async", id.clone()));
        }

        self.collections_api("CREATE", &params).await.map(|_| ())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections_api("DELETE", &[("name", name.to_string())])
            .await
            .map(|_| ())
    }

    async fn create_alias(&self, alias: &str, collections: &[String]) -> Result<()> {
        self.collections_api(
            "CREATEALIAS",
            &[("name", alias.to_string()), ("collections", collections.join(","))],
        )
        .await
        .map(|_| ())
    }

    async fn delete_alias(&self, alias: &str) -> Result<()> {
        self.collections_api("DELETEALIAS", &[("name", alias.to_string())])
            .await
            .map(|_| ())
    }

    async fn fetch_index(&self, node: &NodeName, target_core: &str, source_url: &str) -> Result<()> {
        self.replication_handler(
            node,
            target_core,
            "fetchindex",
            &[
                ("masterUrl", source_url.to_string()),
                ("leaderUrl", source_url.to_string()),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn backup_index(&self, node: &NodeName, core: &str, location: &str, keep: u32) -> Result<()> {
        self.replication_handler(
            node,
            core,
            "backup",
            &[
                ("location", location.to_string()),
                ("numberToKeep", keep.to_string()),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn backup_status(&self, node: &NodeName, core: &str) -> Result<TransferStatus> {
        let body = self.replication_handler(node, core, "details", &[]).await?;
        Ok(status::backup_status_from(&body))
    }

    async fn restore_index(&self, node: &NodeName, core: &str, location: &str) -> Result<()> {
        self.replication_handler(node, core, "restore", &[("location", location.to_string())])
            .await
            .map(|_| ())
    }

    async fn restore_status(&self, node: &NodeName, core: &str) -> Result<TransferStatus> {
        let body = self.replication_handler(node, core, "restorestatus", &[]).await?;
        Ok(status::restore_status_from(&body))
    }
}
