use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::api::service::LogQuery;
use crate::api::read::ListObjectsQuery;
use crate::api::{authorization, read, service, storage};
use crate::client::BaseClient;
use crate::error::D1Error;
use crate::response::DescribeResponse;
use crate::types::{
    Checksum, ChecksumAlgorithm, Identifier, Log, NodeReference, NodeType, ObjectList,
    Permission, SystemMetadata,
};

use super::cnode::CNode;
use super::mnode::MNode;

/// Operations every node answers, whatever its type.
///
/// Implementors only provide access to their client and identity. Errors
/// coming back from a node are tagged with its identifier when the node did
/// not set one itself.
#[allow(async_fn_in_trait)]
pub trait D1Node {
    fn client(&self) -> &BaseClient;

    /// The node identifier, if known. Proxies built from a bare URL have
    /// none.
    fn node_id(&self) -> Option<&NodeReference>;

    fn node_type(&self) -> NodeType;

    fn base_url(&self) -> &str {
        self.client().base_url().as_str()
    }

    fn tag(&self, error: D1Error) -> D1Error {
        match (&error.node_id, self.node_id()) {
            (None, Some(node_id)) => error.with_node_id(node_id.as_str()),
            _ => error,
        }
    }

    async fn ping(&self) -> Result<Option<DateTime<Utc>>, D1Error> {
        service::ping(self.client()).await.map_err(|e| self.tag(e))
    }

    async fn get_object(&self, pid: &Identifier) -> Result<Bytes, D1Error> {
        read::get_object(self.client(), pid)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn get_object_response(&self, pid: &Identifier) -> Result<reqwest::Response, D1Error> {
        read::get_object_response(self.client(), pid)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn get_system_metadata(&self, pid: &Identifier) -> Result<SystemMetadata, D1Error> {
        read::get_system_metadata(self.client(), pid)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn describe(&self, pid: &Identifier) -> Result<DescribeResponse, D1Error> {
        read::describe(self.client(), pid)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn get_checksum(
        &self,
        pid: &Identifier,
        algorithm: Option<ChecksumAlgorithm>,
    ) -> Result<Checksum, D1Error> {
        read::get_checksum(self.client(), pid, algorithm)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn list_objects(&self, query: &ListObjectsQuery) -> Result<ObjectList, D1Error> {
        read::list_objects(self.client(), query)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn get_log_records(&self, query: &LogQuery) -> Result<Log, D1Error> {
        service::get_log_records(self.client(), query)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn is_authorized(&self, pid: &Identifier, action: Permission) -> Result<bool, D1Error> {
        authorization::is_authorized(self.client(), pid, action)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn archive(&self, pid: &Identifier) -> Result<Identifier, D1Error> {
        storage::archive(self.client(), pid)
            .await
            .map_err(|e| self.tag(e))
    }
}

/// A built proxy of either type, as stored by the locator.
#[derive(Debug, Clone)]
pub enum NodeHandle {
    Member(Arc<MNode>),
    Coordinating(Arc<CNode>),
}

impl NodeHandle {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeHandle::Member(_) => NodeType::Member,
            NodeHandle::Coordinating(_) => NodeType::Coordinating,
        }
    }

    pub fn base_url(&self) -> &str {
        match self {
            NodeHandle::Member(node) => node.base_url(),
            NodeHandle::Coordinating(node) => node.base_url(),
        }
    }

    pub fn node_id(&self) -> Option<&NodeReference> {
        match self {
            NodeHandle::Member(node) => node.node_id(),
            NodeHandle::Coordinating(node) => node.node_id(),
        }
    }

    pub fn as_member(&self) -> Option<&Arc<MNode>> {
        match self {
            NodeHandle::Member(node) => Some(node),
            NodeHandle::Coordinating(_) => None,
        }
    }

    pub fn as_coordinating(&self) -> Option<&Arc<CNode>> {
        match self {
            NodeHandle::Coordinating(node) => Some(node),
            NodeHandle::Member(_) => None,
        }
    }

    /// The client of the wrapped proxy, for calls shared by both types.
    pub fn client(&self) -> &BaseClient {
        match self {
            NodeHandle::Member(node) => node.client(),
            NodeHandle::Coordinating(node) => node.client(),
        }
    }
}

impl From<MNode> for NodeHandle {
    fn from(node: MNode) -> Self {
        NodeHandle::Member(Arc::new(node))
    }
}

impl From<CNode> for NodeHandle {
    fn from(node: CNode) -> Self {
        NodeHandle::Coordinating(Arc::new(node))
    }
}

/// Compares base URLs while ignoring a trailing slash.
pub(crate) fn same_base_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::test_utils::{error_xml, mock_client};

    #[tokio::test]
    async fn test_errors_are_tagged_with_node_id() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/object/missing");
                then.status(404)
                    .body(error_xml("NotFound", 404, "1020", "No object"));
            })
            .await;

        let node = MNode::new(mock_client(&server), Some("urn:node:TEST".into()));
        let error = node.get_object(&"missing".into()).await.unwrap_err();

        assert!(error.is_not_found());
        assert_eq!(error.node_id.as_deref(), Some("urn:node:TEST"));
    }

    #[tokio::test]
    async fn test_handle_accessors() {
        let server = MockServer::start_async().await;
        let handle: NodeHandle = CNode::new(mock_client(&server), None).into();

        assert_eq!(handle.node_type(), NodeType::Coordinating);
        assert!(handle.as_member().is_none());
        assert!(handle.as_coordinating().is_some());
        assert!(same_base_url(handle.base_url(), &server.base_url()));
    }

    #[test]
    fn test_same_base_url() {
        assert!(same_base_url("https://a.org/mn/", "https://a.org/mn"));
        assert!(!same_base_url("https://a.org/mn", "https://b.org/mn"));
    }
}
