use crate::api::{service, storage};
use crate::client::BaseClient;
use crate::error::D1Error;
use crate::file::callback::CallbackFun;
use crate::file::UploadFile;
use crate::types::{Identifier, Node, NodeReference, NodeType, SystemMetadata};

use super::proxy::D1Node;

/// Proxy for a member node, the kind of node that stores objects.
#[derive(Debug, Clone)]
pub struct MNode {
    client: BaseClient,
    node_id: Option<NodeReference>,
}

impl MNode {
    pub fn new(client: BaseClient, node_id: Option<NodeReference>) -> Self {
        MNode { client, node_id }
    }

    pub async fn get_capabilities(&self) -> Result<Node, D1Error> {
        service::get_capabilities(&self.client)
            .await
            .map_err(|e| self.tag(e))
    }

    /// See [`storage::create`].
    pub async fn create(
        &self,
        pid: &Identifier,
        object: UploadFile,
        sysmeta: &SystemMetadata,
        callbacks: Option<Vec<CallbackFun>>,
    ) -> Result<Identifier, D1Error> {
        storage::create(&self.client, pid, object, sysmeta, callbacks)
            .await
            .map_err(|e| match e.pid {
                Some(_) => self.tag(e),
                None => self.tag(e).with_pid(pid.as_str()),
            })
    }

    /// See [`storage::update`].
    pub async fn update(
        &self,
        pid: &Identifier,
        object: UploadFile,
        new_pid: &Identifier,
        sysmeta: &SystemMetadata,
        callbacks: Option<Vec<CallbackFun>>,
    ) -> Result<Identifier, D1Error> {
        storage::update(&self.client, pid, object, new_pid, sysmeta, callbacks)
            .await
            .map_err(|e| self.tag(e))
    }

    pub async fn update_system_metadata(
        &self,
        pid: &Identifier,
        sysmeta: &SystemMetadata,
    ) -> Result<(), D1Error> {
        storage::update_system_metadata(&self.client, pid, sysmeta)
            .await
            .map_err(|e| self.tag(e))
    }

    pub async fn delete(&self, pid: &Identifier) -> Result<Identifier, D1Error> {
        storage::delete(&self.client, pid)
            .await
            .map_err(|e| self.tag(e))
    }

    pub async fn generate_identifier(
        &self,
        scheme: &str,
        fragment: Option<&str>,
    ) -> Result<Identifier, D1Error> {
        storage::generate_identifier(&self.client, scheme, fragment)
            .await
            .map_err(|e| self.tag(e))
    }
}

impl D1Node for MNode {
    fn client(&self) -> &BaseClient {
        &self.client
    }

    fn node_id(&self) -> Option<&NodeReference> {
        self.node_id.as_ref()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Member
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::error::ExceptionKind;
    use crate::test_utils::{error_xml, identifier_xml, mock_client};
    use crate::types::{Checksum, ChecksumAlgorithm, Subject};

    #[tokio::test]
    async fn test_create_error_carries_pid_and_node() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/object");
                then.status(401).body(error_xml(
                    "NotAuthorized",
                    401,
                    "1100",
                    "Create not allowed",
                ));
            })
            .await;

        let node = MNode::new(mock_client(&server), Some("urn:node:TEST".into()));
        let sysmeta = SystemMetadata::new(
            "urn:uuid:1".into(),
            "text/plain".into(),
            3,
            Checksum::new(ChecksumAlgorithm::MD5, "900150983cd24fb0d6963f7d28e17f72"),
            Subject::from("uid=jdoe"),
            Subject::from("uid=jdoe"),
        );

        let error = node
            .create(
                &"urn:uuid:1".into(),
                UploadFile::from_bytes("abc.txt", "abc"),
                &sysmeta,
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind, ExceptionKind::NotAuthorized);
        assert_eq!(error.node_id.as_deref(), Some("urn:node:TEST"));
        assert_eq!(error.pid.as_deref(), Some("urn:uuid:1"));
    }

    #[tokio::test]
    async fn test_create_error_keeps_node_reported_pid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/object");
                then.status(409).body(
                    r#"<?xml version="1.0" encoding="UTF-8"?><error detailCode="1120" errorCode="409" name="IdentifierNotUnique" pid="urn:uuid:taken"><description>Identifier in use</description></error>"#,
                );
            })
            .await;

        let node = MNode::new(mock_client(&server), None);
        let sysmeta = SystemMetadata::new(
            "urn:uuid:1".into(),
            "text/plain".into(),
            3,
            Checksum::new(ChecksumAlgorithm::MD5, "900150983cd24fb0d6963f7d28e17f72"),
            Subject::from("uid=jdoe"),
            Subject::from("uid=jdoe"),
        );

        let error = node
            .create(
                &"urn:uuid:1".into(),
                UploadFile::from_bytes("abc.txt", "abc"),
                &sysmeta,
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind, ExceptionKind::IdentifierNotUnique);
        assert_eq!(error.pid.as_deref(), Some("urn:uuid:taken"));
    }

    #[tokio::test]
    async fn test_shared_and_storage_calls() {
        let server = MockServer::start_async().await;
        let archive = server
            .mock_async(|when, then| {
                when.method(PUT).path("/v2/archive/urn:uuid:1");
                then.status(200).body(identifier_xml("urn:uuid:1"));
            })
            .await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/generate");
                then.status(200).body(identifier_xml("urn:uuid:new"));
            })
            .await;

        let node = MNode::new(mock_client(&server), None);

        assert_eq!(node.archive(&"urn:uuid:1".into()).await.unwrap().as_str(), "urn:uuid:1");
        assert_eq!(
            node.generate_identifier("UUID", None).await.unwrap().as_str(),
            "urn:uuid:new"
        );
        archive.assert_async().await;
        generate.assert_async().await;
        assert_eq!(node.node_type(), NodeType::Member);
    }
}
