//! The entry point tying configuration, credentials, nodes and caches
//! together.
//!
//! A [`D1Context`] owns one HTTP connection pool shared by every node proxy,
//! the node locator seeded with the configured CN, and the local caches.
//! Create one per application and share it by reference or in an `Arc`.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::auth::Credentials;
use crate::cache::{CacheStats, ObjectCache, ObjectFormatCache, SystemMetadataCache};
use crate::config::ClientConfig;
use crate::download::download_object;
use crate::error::{D1Error, ExceptionKind, CLIENT_SIDE_DETAIL_CODE};
use crate::hasher::verify;
use crate::node::{CNode, D1Node, MNode, NodeFactory, NodeLocator};
use crate::object::D1Object;
use crate::types::{
    Identifier, NodeReference, ObjectFormat, ObjectFormatIdentifier, ObjectLocation, Subject,
    SystemMetadata,
};

/// Hit and miss counters of the context caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextCacheStats {
    pub objects: CacheStats,
    pub system_metadata: CacheStats,
}

#[derive(Debug)]
pub struct D1Context {
    config: ClientConfig,
    credentials: Credentials,
    locator: NodeLocator,
    objects: ObjectCache,
    system_metadata: SystemMetadataCache,
    formats: ObjectFormatCache,
}

impl D1Context {
    /// Creates a context, discovering credentials from the configuration
    /// and the default certificate location.
    pub fn new(config: ClientConfig) -> Result<Self, D1Error> {
        let credentials = Credentials::discover(&config)?;
        Self::with_credentials(config, credentials)
    }

    /// Creates a context from environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, D1Error> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn with_credentials(config: ClientConfig, credentials: Credentials) -> Result<Self, D1Error> {
        let factory = NodeFactory::from_config(&config, &credentials)?;
        let cn = factory.cnode(&config.cn_url, None)?;

        tracing::debug!(
            cn = %config.cn_url,
            anonymous = credentials.is_anonymous(),
            "created DataONE context"
        );

        Ok(D1Context {
            locator: NodeLocator::new(factory, cn),
            objects: ObjectCache::new(config.cache.object_capacity),
            system_metadata: SystemMetadataCache::new(config.cache.sysmeta_capacity),
            formats: ObjectFormatCache::new(config.cache.format_refresh())?,
            config,
            credentials,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn locator(&self) -> &NodeLocator {
        &self.locator
    }

    /// The configured coordinating node.
    pub fn cn(&self) -> Arc<CNode> {
        self.locator.default_cnode()
    }

    /// Returns a member node by identifier.
    ///
    /// An unknown node triggers one registry refresh from the CN before
    /// giving up.
    pub async fn mn(&self, node_id: &NodeReference) -> Result<Arc<MNode>, D1Error> {
        match self.locator.get_mnode(node_id) {
            Err(e) if e.kind == ExceptionKind::ServiceFailure && e.is_client_side() => {
                tracing::debug!(node = %node_id, "node not registered, refreshing registry");
                self.refresh_nodes().await?;
                self.locator.get_mnode(node_id)
            }
            result => result,
        }
    }

    /// Reloads the node registry from the CN.
    pub async fn refresh_nodes(&self) -> Result<usize, D1Error> {
        self.locator.refresh(&self.cn()).await
    }

    /// Retrieves system metadata from the CN, through the cache.
    pub async fn get_system_metadata(&self, pid: &Identifier) -> Result<SystemMetadata, D1Error> {
        if let Some(sysmeta) = self.system_metadata.get(pid) {
            tracing::trace!(pid = %pid, "system metadata cache hit");
            return Ok(sysmeta);
        }

        let sysmeta = self.cn().get_system_metadata(pid).await?;
        self.system_metadata.insert(pid.clone(), sysmeta.clone());
        Ok(sysmeta)
    }

    /// Retrieves the bytes of an object from wherever it is stored.
    ///
    /// The CN resolves the object's locations, which are tried in order of
    /// preference until one succeeds. When the object's system metadata is
    /// cached, the data is checked against its checksum and a mismatching
    /// copy is skipped. If every location fails, the last error is returned.
    pub async fn get(&self, pid: &Identifier) -> Result<Bytes, D1Error> {
        if let Some(data) = self.objects.get(pid) {
            tracing::trace!(pid = %pid, "object cache hit");
            return Ok(data);
        }

        let locations = self.cn().resolve(pid).await?;
        let mut last_error = None;

        for location in locations.by_preference() {
            let result = match self.location_node(location) {
                Ok(node) => node.get_object(pid).await,
                Err(e) => Err(e),
            };

            match result.and_then(|data| self.check_integrity(pid, data)) {
                Ok(data) => {
                    self.objects.insert(pid.clone(), data.clone());
                    return Ok(data);
                }
                Err(e) => {
                    tracing::warn!(
                        pid = %pid,
                        node = %location.node_identifier,
                        error = %e,
                        "could not read object from location"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            D1Error::new(
                ExceptionKind::NotFound,
                CLIENT_SIDE_DETAIL_CODE,
                format!("No locations known for {pid}"),
            )
            .with_pid(pid.as_str())
        }))
    }

    /// Downloads an object to a file, verifying it against the checksum in
    /// its system metadata. Locations are tried like in [`D1Context::get`].
    pub async fn download(&self, pid: &Identifier, out_path: &Path) -> Result<u64, D1Error> {
        let sysmeta = self.get_system_metadata(pid).await?;
        let locations = self.cn().resolve(pid).await?;
        let mut last_error = None;

        for location in locations.by_preference() {
            let result = match self.location_node(location) {
                Ok(node) => {
                    download_object(node.as_ref(), pid, out_path, Some(&sysmeta.checksum)).await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(written) => return Ok(written),
                Err(e) => {
                    tracing::warn!(
                        pid = %pid,
                        node = %location.node_identifier,
                        error = %e,
                        "could not download object from location"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            D1Error::new(
                ExceptionKind::NotFound,
                CLIENT_SIDE_DETAIL_CODE,
                format!("No locations known for {pid}"),
            )
            .with_pid(pid.as_str())
        }))
    }

    /// Creates an object on a member node and caches its system metadata.
    pub async fn create(
        &self,
        node_id: &NodeReference,
        object: D1Object,
    ) -> Result<Identifier, D1Error> {
        let mn = self.mn(node_id).await?;
        let D1Object { data, sysmeta } = object;

        let pid = mn.create(&sysmeta.identifier, data, &sysmeta, None).await?;
        tracing::info!(pid = %pid, node = %node_id, "created object");

        self.system_metadata.insert(pid.clone(), sysmeta);
        Ok(pid)
    }

    /// Replaces `pid` with a new version on a member node.
    ///
    /// The new system metadata is marked as obsoleting `pid` unless it
    /// already names a predecessor.
    pub async fn update(
        &self,
        node_id: &NodeReference,
        pid: &Identifier,
        object: D1Object,
    ) -> Result<Identifier, D1Error> {
        let mn = self.mn(node_id).await?;
        let D1Object { data, mut sysmeta } = object;
        if sysmeta.obsoletes.is_none() {
            sysmeta.obsoletes = Some(pid.clone());
        }

        let new_pid = sysmeta.identifier.clone();
        let new_pid = mn.update(pid, data, &new_pid, &sysmeta, None).await?;
        tracing::info!(pid = %pid, new_pid = %new_pid, node = %node_id, "updated object");

        self.system_metadata.remove(pid);
        self.system_metadata.insert(new_pid.clone(), sysmeta);
        Ok(new_pid)
    }

    /// Archives an object on a member node and drops it from the caches.
    pub async fn archive(
        &self,
        node_id: &NodeReference,
        pid: &Identifier,
    ) -> Result<Identifier, D1Error> {
        let mn = self.mn(node_id).await?;
        let archived = mn.archive(pid).await?;

        self.objects.remove(pid);
        self.system_metadata.remove(pid);
        Ok(archived)
    }

    /// Looks up an object format, refreshing the format list from the CN
    /// when it is stale.
    pub async fn format(&self, format_id: &ObjectFormatIdentifier) -> Result<ObjectFormat, D1Error> {
        self.formats.get_format(format_id, &self.cn()).await
    }

    /// The subject requests are made as.
    ///
    /// Token credentials carry their subject. Certificates are resolved by
    /// asking the CN. Anonymous callers are `public`.
    pub async fn whoami(&self) -> Result<Subject, D1Error> {
        if let Some(subject) = self.credentials.subject() {
            return Ok(subject);
        }
        if self.credentials.is_anonymous() {
            return Ok(Subject::public());
        }

        let info = self.cn().echo_credentials().await?;
        Ok(info
            .person
            .first()
            .map(|person| person.subject.clone())
            .or_else(|| info.group.first().map(|group| group.subject.clone()))
            .unwrap_or_else(Subject::public))
    }

    pub fn cache_stats(&self) -> ContextCacheStats {
        ContextCacheStats {
            objects: self.objects.stats(),
            system_metadata: self.system_metadata.stats(),
        }
    }

    /// Drops every cached object and system metadata record.
    pub fn clear_caches(&self) {
        self.objects.clear();
        self.system_metadata.clear();
    }

    /// The proxy for a resolved location. Nodes missing from the registry
    /// are reached through the base URL the CN reported.
    fn location_node(&self, location: &ObjectLocation) -> Result<Arc<MNode>, D1Error> {
        match self.locator.get_mnode(&location.node_identifier) {
            Ok(node) => Ok(node),
            Err(_) => self
                .locator
                .factory()
                .mnode(&location.base_url, Some(location.node_identifier.clone()))
                .map(Arc::new),
        }
    }

    fn check_integrity(&self, pid: &Identifier, data: Bytes) -> Result<Bytes, D1Error> {
        let Some(sysmeta) = self.system_metadata.peek(pid) else {
            return Ok(data);
        };

        match verify(&sysmeta.checksum, &data) {
            Ok(false) => Err(D1Error::client_message(format!(
                "Checksum mismatch for {pid}, expected {}",
                sysmeta.checksum
            ))
            .with_pid(pid.as_str())),
            Ok(true) => Ok(data),
            Err(e) => {
                tracing::debug!(pid = %pid, error = %e, "skipping checksum verification");
                Ok(data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::auth::token::tests::make_token;
    use crate::hasher::checksum_bytes;
    use crate::test_utils::{error_xml, identifier_xml};
    use crate::types::ChecksumAlgorithm;

    const CONTENT: &str = "site,depth\nA,3\n";

    fn context(server: &MockServer) -> D1Context {
        let config = ClientConfig {
            cn_url: server.url("/cn"),
            ..Default::default()
        };
        D1Context::with_credentials(config, Credentials::Anonymous).unwrap()
    }

    fn node_list(server: &MockServer) -> String {
        format!(
            r#"<ns2:nodeList xmlns:ns2="http://ns.dataone.org/service/types/v2.0">
                <node replicate="false" synchronize="false" type="cn" state="up">
                    <identifier>urn:node:CN</identifier>
                    <name>Test CN</name>
                    <baseURL>{}</baseURL>
                </node>
                <node replicate="true" synchronize="true" type="mn" state="up">
                    <identifier>urn:node:MN</identifier>
                    <name>Test MN</name>
                    <baseURL>{}</baseURL>
                </node>
            </ns2:nodeList>"#,
            server.url("/cn"),
            server.url("/mn")
        )
    }

    fn locations(server: &MockServer) -> String {
        format!(
            r#"<d1:objectLocationList xmlns:d1="http://ns.dataone.org/service/types/v1">
                <identifier>urn:uuid:1</identifier>
                <objectLocation>
                    <nodeIdentifier>urn:node:BROKEN</nodeIdentifier>
                    <baseURL>{broken}</baseURL>
                    <url>{broken}/v2/object/urn:uuid:1</url>
                    <preference>10</preference>
                </objectLocation>
                <objectLocation>
                    <nodeIdentifier>urn:node:MN</nodeIdentifier>
                    <baseURL>{mn}</baseURL>
                    <url>{mn}/v2/object/urn:uuid:1</url>
                    <preference>5</preference>
                </objectLocation>
            </d1:objectLocationList>"#,
            broken = server.url("/broken"),
            mn = server.url("/mn")
        )
    }

    fn sysmeta_xml(checksum: &str) -> String {
        format!(
            r#"<d1:systemMetadata xmlns:d1="http://ns.dataone.org/service/types/v2.0">
                <serialVersion>1</serialVersion>
                <identifier>urn:uuid:1</identifier>
                <formatId>text/csv</formatId>
                <size>{}</size>
                <checksum algorithm="MD5">{checksum}</checksum>
                <rightsHolder>uid=jdoe</rightsHolder>
            </d1:systemMetadata>"#,
            CONTENT.len()
        )
    }

    async fn mock_locations(server: &MockServer) {
        let body = locations(server);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cn/v2/resolve/urn:uuid:1");
                then.status(303).body(body);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken/v2/object/urn:uuid:1");
                then.status(500)
                    .body(error_xml("ServiceFailure", 500, "1030", "Disk error"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_get_falls_through_locations_and_caches() {
        let server = MockServer::start_async().await;
        mock_locations(&server).await;
        let object = server
            .mock_async(|when, then| {
                when.method(GET).path("/mn/v2/object/urn:uuid:1");
                then.status(200).body(CONTENT);
            })
            .await;

        let context = context(&server);
        let first = context.get(&"urn:uuid:1".into()).await.unwrap();
        let second = context.get(&"urn:uuid:1".into()).await.unwrap();

        assert_eq!(first, Bytes::from(CONTENT));
        assert_eq!(first, second);
        object.assert_hits_async(1).await;

        let stats = context.cache_stats();
        assert_eq!(stats.objects.hits, 1);
        assert_eq!(stats.objects.misses, 1);
    }

    #[tokio::test]
    async fn test_get_returns_last_error() {
        let server = MockServer::start_async().await;
        mock_locations(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/mn/v2/object/urn:uuid:1");
                then.status(401)
                    .body(error_xml("NotAuthorized", 401, "1000", "read denied"));
            })
            .await;

        let error = context(&server)
            .get(&"urn:uuid:1".into())
            .await
            .unwrap_err();

        assert_eq!(error.kind, ExceptionKind::NotAuthorized);
        assert_eq!(error.node_id.as_deref(), Some("urn:node:MN"));
    }

    #[tokio::test]
    async fn test_get_skips_corrupt_copy() {
        let server = MockServer::start_async().await;
        mock_locations(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/mn/v2/object/urn:uuid:1");
                then.status(200).body("tampered");
            })
            .await;
        let expected = checksum_bytes(ChecksumAlgorithm::MD5, CONTENT.as_bytes());
        let sysmeta_body = sysmeta_xml(&expected.value);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cn/v2/meta/urn:uuid:1");
                then.status(200).body(sysmeta_body);
            })
            .await;

        let context = context(&server);
        context.get_system_metadata(&"urn:uuid:1".into()).await.unwrap();
        let error = context.get(&"urn:uuid:1".into()).await.unwrap_err();

        assert!(error.is_client_side());
        assert!(error.description.contains("Checksum mismatch"));
    }

    #[tokio::test]
    async fn test_system_metadata_is_cached() {
        let server = MockServer::start_async().await;
        let body = sysmeta_xml("f1d2d2f924e986ac86fdf7b36c94bcdf");
        let meta = server
            .mock_async(|when, then| {
                when.method(GET).path("/cn/v2/meta/urn:uuid:1");
                then.status(200).body(body);
            })
            .await;

        let context = context(&server);
        let first = context.get_system_metadata(&"urn:uuid:1".into()).await.unwrap();
        let second = context.get_system_metadata(&"urn:uuid:1".into()).await.unwrap();

        meta.assert_hits_async(1).await;
        assert_eq!(first, second);
        assert_eq!(context.cache_stats().system_metadata.hits, 1);
    }

    #[tokio::test]
    async fn test_download_verifies_against_sysmeta() {
        let server = MockServer::start_async().await;
        mock_locations(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/mn/v2/object/urn:uuid:1");
                then.status(200).body(CONTENT);
            })
            .await;
        let expected = checksum_bytes(ChecksumAlgorithm::MD5, CONTENT.as_bytes());
        let sysmeta_body = sysmeta_xml(&expected.value);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cn/v2/meta/urn:uuid:1");
                then.status(200).body(sysmeta_body);
            })
            .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let out_path = temp_dir.path().join("site.csv");

        let written = context(&server)
            .download(&"urn:uuid:1".into(), &out_path)
            .await
            .unwrap();

        assert_eq!(written, CONTENT.len() as u64);
        assert_eq!(std::fs::read_to_string(&out_path).unwrap(), CONTENT);
    }

    #[tokio::test]
    async fn test_mn_refreshes_registry_once() {
        let server = MockServer::start_async().await;
        let body = node_list(&server);
        let registry = server
            .mock_async(|when, then| {
                when.method(GET).path("/cn/v2/node");
                then.status(200).body(body);
            })
            .await;

        let context = context(&server);
        let mn = context.mn(&"urn:node:MN".into()).await.unwrap();
        let error = context.mn(&"urn:node:NOPE".into()).await.unwrap_err();
        let cn_as_mn = context.mn(&"urn:node:CN".into()).await.unwrap_err();

        assert_eq!(mn.node_id().map(|n| n.as_str()), Some("urn:node:MN"));
        assert!(error.is_client_side());
        assert_eq!(cn_as_mn.kind, ExceptionKind::InvalidRequest);
        registry.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_create_update_archive() {
        let server = MockServer::start_async().await;
        let body = node_list(&server);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cn/v2/node");
                then.status(200).body(body);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/mn/v2/object");
                then.status(200).body(identifier_xml("urn:uuid:1"));
            })
            .await;
        let update = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/mn/v2/object/urn:uuid:1")
                    .body_contains("<obsoletes>urn:uuid:1</obsoletes>");
                then.status(200).body(identifier_xml("urn:uuid:2"));
            })
            .await;
        let archive = server
            .mock_async(|when, then| {
                when.method(PUT).path("/mn/v2/archive/urn:uuid:2");
                then.status(200).body(identifier_xml("urn:uuid:2"));
            })
            .await;

        let context = context(&server);
        let node: NodeReference = "urn:node:MN".into();
        let object = |pid: &str, content: &'static str| {
            D1Object::from_bytes(
                pid.into(),
                "site.csv",
                content,
                "text/csv".into(),
                "uid=jdoe".into(),
                "uid=jdoe".into(),
                ChecksumAlgorithm::MD5,
            )
        };

        let created = context.create(&node, object("urn:uuid:1", CONTENT)).await.unwrap();
        let updated = context
            .update(&node, &created, object("urn:uuid:2", "site,depth\nA,4\n"))
            .await
            .unwrap();
        let archived = context.archive(&node, &updated).await.unwrap();

        create.assert_async().await;
        update.assert_async().await;
        archive.assert_async().await;
        assert_eq!(archived.as_str(), "urn:uuid:2");
        assert_eq!(context.cache_stats().system_metadata.size, 0);
    }

    #[tokio::test]
    async fn test_whoami() {
        let server = MockServer::start_async().await;
        let config = ClientConfig {
            cn_url: server.url("/cn"),
            ..Default::default()
        };

        let anonymous = D1Context::with_credentials(config.clone(), Credentials::Anonymous).unwrap();
        assert!(anonymous.whoami().await.unwrap().is_public());

        let token = make_token(&serde_json::json!({ "sub": "http://orcid.org/0000-0002-1825-0097" }));
        let with_token =
            D1Context::with_credentials(config, Credentials::from_token(token).unwrap()).unwrap();
        assert_eq!(
            with_token.whoami().await.unwrap().as_str(),
            "http://orcid.org/0000-0002-1825-0097"
        );
    }

    #[tokio::test]
    async fn test_format_lookup() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cn/v2/formats");
                then.status(503);
            })
            .await;

        let format = context(&server)
            .format(&"text/csv".into())
            .await
            .unwrap();

        assert_eq!(format.format_id.as_str(), "text/csv");
    }
}
