use reqwest::Client;

use crate::auth::Credentials;
use crate::client::{build_http_client, BaseClient};
use crate::config::ClientConfig;
use crate::error::{D1Error, ExceptionKind, CLIENT_SIDE_DETAIL_CODE};
use crate::types::{NodeReference, NodeType};

use super::cnode::CNode;
use super::mnode::MNode;
use super::proxy::NodeHandle;

/// Builds node proxies that all share one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct NodeFactory {
    client: Client,
    api_version: String,
}

impl NodeFactory {
    pub fn new(client: Client, api_version: impl Into<String>) -> Self {
        NodeFactory {
            client,
            api_version: api_version.into(),
        }
    }

    /// Builds the shared pool from configuration and credentials.
    pub fn from_config(config: &ClientConfig, credentials: &Credentials) -> Result<Self, D1Error> {
        let client = build_http_client(config, credentials)?;
        Ok(Self::new(client, config.api_version.clone()))
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn base_client(&self, base_url: &str) -> Result<BaseClient, D1Error> {
        BaseClient::with_client(base_url, &self.api_version, self.client.clone())
    }

    pub fn mnode(&self, base_url: &str, node_id: Option<NodeReference>) -> Result<MNode, D1Error> {
        Ok(MNode::new(self.base_client(base_url)?, node_id))
    }

    pub fn cnode(&self, base_url: &str, node_id: Option<NodeReference>) -> Result<CNode, D1Error> {
        Ok(CNode::new(self.base_client(base_url)?, node_id))
    }

    /// Builds a proxy of the given type. Monitor nodes expose no API this
    /// client speaks and are rejected.
    pub fn build(
        &self,
        base_url: &str,
        node_type: NodeType,
        node_id: Option<NodeReference>,
    ) -> Result<NodeHandle, D1Error> {
        match node_type {
            NodeType::Member => Ok(self.mnode(base_url, node_id)?.into()),
            NodeType::Coordinating => Ok(self.cnode(base_url, node_id)?.into()),
            NodeType::Monitor => Err(D1Error::new(
                ExceptionKind::InvalidRequest,
                CLIENT_SIDE_DETAIL_CODE,
                format!("Cannot build a proxy for monitor node at {base_url}"),
            )),
        }
    }
}
