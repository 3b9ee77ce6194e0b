use std::collections::HashMap;

use crate::api::cn;
use crate::client::BaseClient;
use crate::error::D1Error;
use crate::types::{
    Identifier, NodeList, NodeReference, NodeType, ObjectFormat, ObjectFormatIdentifier,
    ObjectFormatList, ObjectLocationList, SubjectInfo,
};

use super::proxy::D1Node;

/// Proxy for a coordinating node, which holds the node registry, the format
/// list and the index of every object in the network.
#[derive(Debug, Clone)]
pub struct CNode {
    client: BaseClient,
    node_id: Option<NodeReference>,
}

impl CNode {
    pub fn new(client: BaseClient, node_id: Option<NodeReference>) -> Self {
        CNode { client, node_id }
    }

    pub async fn list_nodes(&self) -> Result<NodeList, D1Error> {
        cn::list_nodes(&self.client).await.map_err(|e| self.tag(e))
    }

    pub async fn list_formats(&self) -> Result<ObjectFormatList, D1Error> {
        cn::list_formats(&self.client)
            .await
            .map_err(|e| self.tag(e))
    }

    pub async fn get_format(
        &self,
        format_id: &ObjectFormatIdentifier,
    ) -> Result<ObjectFormat, D1Error> {
        cn::get_format(&self.client, format_id)
            .await
            .map_err(|e| self.tag(e))
    }

    pub async fn resolve(&self, pid: &Identifier) -> Result<ObjectLocationList, D1Error> {
        cn::resolve(&self.client, pid)
            .await
            .map_err(|e| self.tag(e))
    }

    pub async fn reserve_identifier(&self, pid: &Identifier) -> Result<Identifier, D1Error> {
        cn::reserve_identifier(&self.client, pid)
            .await
            .map_err(|e| self.tag(e))
    }

    pub async fn query(
        &self,
        engine: &str,
        parameters: HashMap<String, String>,
    ) -> Result<String, D1Error> {
        cn::query(&self.client, engine, parameters)
            .await
            .map_err(|e| self.tag(e))
    }

    pub async fn echo_credentials(&self) -> Result<SubjectInfo, D1Error> {
        cn::echo_credentials(&self.client)
            .await
            .map_err(|e| self.tag(e))
    }
}

impl D1Node for CNode {
    fn client(&self) -> &BaseClient {
        &self.client
    }

    fn node_id(&self) -> Option<&NodeReference> {
        self.node_id.as_ref()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Coordinating
    }
}
