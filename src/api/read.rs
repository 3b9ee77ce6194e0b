use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::client::{evaluate_bytes, evaluate_status, evaluate_xml, BaseClient};
use crate::error::D1Error;
use crate::request::RequestType;
use crate::response::DescribeResponse;
use crate::types::{
    datetime, Checksum, ChecksumAlgorithm, Identifier, ObjectFormatIdentifier, ObjectList,
    SystemMetadata,
};

/// Downloads the bytes of an object.
///
/// The whole object is held in memory. Use [`get_object_response`] or
/// [`crate::download::download_object`] for large objects.
///
/// # Arguments
///
/// * `client` - A reference to the `BaseClient` of the node.
/// * `pid` - The identifier of the object.
pub async fn get_object(client: &BaseClient, pid: &Identifier) -> Result<Bytes, D1Error> {
    let response = client
        .get(&["object", pid.as_str()], None, RequestType::Plain, None)
        .await?;
    evaluate_bytes(response).await
}

/// Starts downloading an object and returns the response with its body
/// unread, for streaming.
pub async fn get_object_response(
    client: &BaseClient,
    pid: &Identifier,
) -> Result<reqwest::Response, D1Error> {
    let response = client
        .get(&["object", pid.as_str()], None, RequestType::Plain, None)
        .await?;
    evaluate_status(response).await
}

/// Retrieves the system metadata of an object.
pub async fn get_system_metadata(
    client: &BaseClient,
    pid: &Identifier,
) -> Result<SystemMetadata, D1Error> {
    let response = client
        .get(&["meta", pid.as_str()], None, RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}

/// Describes an object from the headers of a `HEAD` request.
///
/// Errors come back as `DataONE-Exception-*` headers since `HEAD` carries
/// no body.
pub async fn describe(client: &BaseClient, pid: &Identifier) -> Result<DescribeResponse, D1Error> {
    let response = client
        .head(&["object", pid.as_str()], None, None)
        .await?;
    let response = evaluate_status(response).await?;
    DescribeResponse::from_headers(response.headers())
}

/// Asks the node to compute the checksum of an object.
///
/// # Arguments
///
/// * `client` - A reference to the `BaseClient` of the node.
/// * `pid` - The identifier of the object.
/// * `algorithm` - The algorithm to use, the node's default if `None`.
pub async fn get_checksum(
    client: &BaseClient,
    pid: &Identifier,
    algorithm: Option<ChecksumAlgorithm>,
) -> Result<Checksum, D1Error> {
    let parameters = algorithm.map(|algorithm| {
        HashMap::from([("checksumAlgorithm".to_string(), algorithm.to_string())])
    });

    let response = client
        .get(&["checksum", pid.as_str()], parameters, RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}

/// Filters for [`list_objects`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsQuery {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub format_id: Option<ObjectFormatIdentifier>,
    /// Restrict to an identifier or series identifier.
    pub identifier: Option<Identifier>,
    /// Include replicas held by the node, not only its own objects.
    pub replica_status: Option<bool>,
    pub start: Option<u32>,
    pub count: Option<u32>,
}

impl ListObjectsQuery {
    /// A page of the unfiltered listing.
    pub fn page(start: u32, count: u32) -> Self {
        ListObjectsQuery {
            start: Some(start),
            count: Some(count),
            ..Default::default()
        }
    }

    pub(crate) fn to_parameters(&self) -> HashMap<String, String> {
        let mut parameters = HashMap::new();

        if let Some(from) = &self.from_date {
            parameters.insert("fromDate".to_string(), datetime::format(from));
        }
        if let Some(to) = &self.to_date {
            parameters.insert("toDate".to_string(), datetime::format(to));
        }
        if let Some(format_id) = &self.format_id {
            parameters.insert("formatId".to_string(), format_id.to_string());
        }
        if let Some(identifier) = &self.identifier {
            parameters.insert("identifier".to_string(), identifier.to_string());
        }
        if let Some(replica_status) = self.replica_status {
            parameters.insert("replicaStatus".to_string(), replica_status.to_string());
        }
        if let Some(start) = self.start {
            parameters.insert("start".to_string(), start.to_string());
        }
        if let Some(count) = self.count {
            parameters.insert("count".to_string(), count.to_string());
        }

        parameters
    }
}

/// Lists the objects held by a node, one page at a time.
pub async fn list_objects(
    client: &BaseClient,
    query: &ListObjectsQuery,
) -> Result<ObjectList, D1Error> {
    let response = client
        .get(&["object"], Some(query.to_parameters()), RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;

    use super::*;
    use crate::error::ExceptionKind;
    use crate::test_utils::{error_xml, fixture, mock_client};

    const PID: &str = "urn:uuid:8bd5aa2b-6a59-4f1f-9a0e-2f2b8e3f2d0a";

    #[tokio::test]
    async fn test_get_object() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/v2/object/{PID}"));
                then.status(200).body("a,b\n1,2\n");
            })
            .await;

        let bytes = get_object(&mock_client(&server), &PID.into()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(&bytes[..], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_get_object_encodes_identifier() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/v2/object/doi:10.5063");
                then.status(200).body("data");
            })
            .await;

        let response = get_object_response(&mock_client(&server), &"doi:10.5063/F1 X".into())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.text().await.unwrap(), "data");
    }

    #[tokio::test]
    async fn test_get_object_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/object/missing");
                then.status(404)
                    .body(error_xml("NotFound", 404, "1020", "No object could be found"));
            })
            .await;

        let error = get_object(&mock_client(&server), &"missing".into())
            .await
            .unwrap_err();

        assert!(error.is_not_found());
        assert_eq!(error.detail_code, "1020");
    }

    #[tokio::test]
    async fn test_get_system_metadata() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/v2/meta/{PID}"));
                then.status(200).body(fixture("sysmeta.xml"));
            })
            .await;

        let sysmeta = get_system_metadata(&mock_client(&server), &PID.into())
            .await
            .unwrap();

        assert_eq!(sysmeta.identifier.as_str(), PID);
        assert_eq!(sysmeta.size, 2048);
    }

    #[tokio::test]
    async fn test_describe() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(HEAD).path(format!("/v2/object/{PID}"));
                then.status(200)
                    .header("DataONE-ObjectFormat", "text/csv")
                    .header("DataONE-Checksum", "MD5,0d3b2f6c4b8a6f6a5c1e0b8c3a4e9d71")
                    .header("DataONE-SerialVersion", "3");
            })
            .await;

        let description = describe(&mock_client(&server), &PID.into()).await.unwrap();

        assert_eq!(description.format_id.as_str(), "text/csv");
        assert_eq!(description.serial_version, Some(3));
        assert_eq!(
            description.checksum.unwrap().value,
            "0d3b2f6c4b8a6f6a5c1e0b8c3a4e9d71"
        );
    }

    #[tokio::test]
    async fn test_describe_error_headers() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(HEAD).path("/v2/object/secret");
                then.status(401)
                    .header("DataONE-Exception-Name", "NotAuthorized")
                    .header("DataONE-Exception-DetailCode", "1340")
                    .header("DataONE-Exception-Description", "READ not allowed")
                    .header("DataONE-Exception-PID", "secret");
            })
            .await;

        let error = describe(&mock_client(&server), &"secret".into())
            .await
            .unwrap_err();

        assert_eq!(error.kind, ExceptionKind::NotAuthorized);
        assert_eq!(error.detail_code, "1340");
        assert_eq!(error.pid.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_get_checksum() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/v2/checksum/{PID}"))
                    .query_param("checksumAlgorithm", "SHA-1");
                then.status(200).body(
                    r#"<d1:checksum xmlns:d1="http://ns.dataone.org/service/types/v1" algorithm="SHA-1">2fd4e1c67a2d28fced849ee1bb76e7391b93eb12</d1:checksum>"#,
                );
            })
            .await;

        let checksum = get_checksum(
            &mock_client(&server),
            &PID.into(),
            Some(ChecksumAlgorithm::SHA1),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(checksum.algorithm_kind().unwrap(), ChecksumAlgorithm::SHA1);
        assert_eq!(checksum.value, "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12");
    }

    #[tokio::test]
    async fn test_list_objects() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2/object")
                    .query_param("start", "0")
                    .query_param("count", "2")
                    .query_param("formatId", "text/csv");
                then.status(200).body(fixture("objectlist.xml"));
            })
            .await;

        let query = ListObjectsQuery {
            format_id: Some("text/csv".into()),
            ..ListObjectsQuery::page(0, 2)
        };
        let list = list_objects(&mock_client(&server), &query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(list.object_info.len(), 2);
        assert!(list.has_more());
    }
}
