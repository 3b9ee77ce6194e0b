use crate::client::{evaluate_identifier, evaluate_response, BaseClient};
use crate::error::D1Error;
use crate::file::callback::CallbackFun;
use crate::file::UploadFile;
use crate::request::{FilePart, RequestType};
use crate::types::{Identifier, SystemMetadata};

const SYSMETA_FILE_NAME: &str = "sysmeta.xml";

fn sysmeta_part(sysmeta: &SystemMetadata) -> Result<FilePart, D1Error> {
    Ok(FilePart::xml(SYSMETA_FILE_NAME, sysmeta.to_xml()?))
}

fn data_part(object: UploadFile, callbacks: Option<Vec<CallbackFun>>) -> FilePart {
    let part = FilePart::data(object);
    match callbacks {
        Some(callbacks) => part.with_callbacks(callbacks),
        None => part,
    }
}

/// Creates an object on a member node.
///
/// The object and its system metadata are sent together as a multipart
/// body with the `pid`, `object` and `sysmeta` parts.
///
/// # Arguments
///
/// * `client` - A reference to the `BaseClient` of the member node.
/// * `pid` - The identifier of the new object.
/// * `object` - The object bytes.
/// * `sysmeta` - The system metadata; its identifier must equal `pid`.
/// * `callbacks` - Optional callbacks fed with every uploaded chunk.
///
/// # Returns
///
/// The identifier the node stored the object under.
pub async fn create(
    client: &BaseClient,
    pid: &Identifier,
    object: UploadFile,
    sysmeta: &SystemMetadata,
    callbacks: Option<Vec<CallbackFun>>,
) -> Result<Identifier, D1Error> {
    if &sysmeta.identifier != pid {
        return Err(D1Error::new(
            crate::error::ExceptionKind::InvalidSystemMetadata,
            crate::error::CLIENT_SIDE_DETAIL_CODE,
            format!(
                "System metadata identifier {} does not match {pid}",
                sysmeta.identifier
            ),
        ));
    }

    let context = RequestType::multipart()
        .text("pid", pid.as_str())
        .file("object", data_part(object, callbacks))
        .file("sysmeta", sysmeta_part(sysmeta)?);

    let response = client.post(&["object"], None, context, None).await?;
    evaluate_identifier(response).await
}

/// Replaces an object with a new version.
///
/// The old object is obsoleted by `new_pid`. The system metadata describes
/// the new object and should name `pid` in `obsoletes`.
pub async fn update(
    client: &BaseClient,
    pid: &Identifier,
    object: UploadFile,
    new_pid: &Identifier,
    sysmeta: &SystemMetadata,
    callbacks: Option<Vec<CallbackFun>>,
) -> Result<Identifier, D1Error> {
    let context = RequestType::multipart()
        .text("newPid", new_pid.as_str())
        .file("file", data_part(object, callbacks))
        .file("sysmeta", sysmeta_part(sysmeta)?);

    let response = client
        .put(&["object", pid.as_str()], None, context, None)
        .await?;
    evaluate_identifier(response).await
}

/// Replaces the system metadata of an existing object.
///
/// The node rejects the call unless `serial_version` matches its copy.
pub async fn update_system_metadata(
    client: &BaseClient,
    pid: &Identifier,
    sysmeta: &SystemMetadata,
) -> Result<(), D1Error> {
    let context = RequestType::multipart()
        .text("pid", pid.as_str())
        .file("sysmeta", sysmeta_part(sysmeta)?);

    let response = client.put(&["meta"], None, context, None).await?;
    evaluate_response(response).await.map(|_| ())
}

/// Deletes an object from a member node. Usually reserved to
/// administrators; owners should [`archive`] instead.
pub async fn delete(client: &BaseClient, pid: &Identifier) -> Result<Identifier, D1Error> {
    let response = client
        .delete(&["object", pid.as_str()], None, RequestType::Plain, None)
        .await?;
    evaluate_identifier(response).await
}

/// Hides an object from search while keeping it resolvable.
pub async fn archive(client: &BaseClient, pid: &Identifier) -> Result<Identifier, D1Error> {
    let response = client
        .put(&["archive", pid.as_str()], None, RequestType::Plain, None)
        .await?;
    evaluate_identifier(response).await
}

/// Asks a member node to mint a unique identifier.
///
/// # Arguments
///
/// * `client` - A reference to the `BaseClient` of the member node.
/// * `scheme` - The identifier scheme, e.g. `UUID` or `DOI`.
/// * `fragment` - Optional fragment the identifier should contain.
pub async fn generate_identifier(
    client: &BaseClient,
    scheme: &str,
    fragment: Option<&str>,
) -> Result<Identifier, D1Error> {
    let mut context = RequestType::multipart().text("scheme", scheme);
    if let Some(fragment) = fragment {
        context = context.text("fragment", fragment);
    }

    let response = client.post(&["generate"], None, context, None).await?;
    evaluate_identifier(response).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use httpmock::prelude::*;

    use super::*;
    use crate::error::ExceptionKind;
    use crate::test_utils::{error_xml, identifier_xml, mock_client};
    use crate::types::{Checksum, ChecksumAlgorithm, Subject};

    fn sysmeta(pid: &str) -> SystemMetadata {
        SystemMetadata::new(
            Identifier::from(pid),
            "text/plain".into(),
            16,
            Checksum::new(ChecksumAlgorithm::MD5, "b4b6e6e0f1d1d3b2c6e7f1a9b8d7c6e5"),
            Subject::from("uid=jdoe"),
            Subject::from("uid=jdoe"),
        )
    }

    #[tokio::test]
    async fn test_create() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/object")
                    .body_contains("name=\"pid\"")
                    .body_contains("name=\"object\"")
                    .body_contains("name=\"sysmeta\"")
                    .body_contains("<identifier>urn:uuid:1</identifier>")
                    .body_contains("Hello, DataONE!");
                then.status(200).body(identifier_xml("urn:uuid:1"));
            })
            .await;

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let callback = CallbackFun::wrap(move |chunk| {
            counter_clone.fetch_add(chunk.len(), Ordering::SeqCst);
        });

        let object = UploadFile::from_path("tests/fixtures/file.txt").await.unwrap();
        let pid = create(
            &mock_client(&server),
            &"urn:uuid:1".into(),
            object,
            &sysmeta("urn:uuid:1"),
            Some(vec![callback]),
        )
        .await
        .expect("Create failed");

        mock.assert_async().await;
        assert_eq!(pid.as_str(), "urn:uuid:1");
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn test_create_rejects_mismatched_sysmeta() {
        let server = MockServer::start_async().await;
        let object = UploadFile::from_bytes("data.txt", "abc");

        let error = create(
            &mock_client(&server),
            &"urn:uuid:1".into(),
            object,
            &sysmeta("urn:uuid:2"),
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(error.kind, ExceptionKind::InvalidSystemMetadata);
        assert!(error.is_client_side());
    }

    #[tokio::test]
    async fn test_create_identifier_not_unique() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/object");
                then.status(409).body(error_xml(
                    "IdentifierNotUnique",
                    409,
                    "1190",
                    "Identifier is already in use",
                ));
            })
            .await;

        let error = create(
            &mock_client(&server),
            &"urn:uuid:1".into(),
            UploadFile::from_bytes("data.txt", "abc"),
            &sysmeta("urn:uuid:1"),
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(error.kind, ExceptionKind::IdentifierNotUnique);
        assert_eq!(error.http_status, Some(409));
    }

    #[tokio::test]
    async fn test_update() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/v2/object/urn:uuid:1")
                    .body_contains("name=\"newPid\"")
                    .body_contains("urn:uuid:2")
                    .body_contains("name=\"file\"");
                then.status(200).body(identifier_xml("urn:uuid:2"));
            })
            .await;

        let mut new_sysmeta = sysmeta("urn:uuid:2");
        new_sysmeta.obsoletes = Some("urn:uuid:1".into());

        let pid = update(
            &mock_client(&server),
            &"urn:uuid:1".into(),
            UploadFile::from_bytes("data.txt", "new content"),
            &"urn:uuid:2".into(),
            &new_sysmeta,
            None,
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(pid.as_str(), "urn:uuid:2");
    }

    #[tokio::test]
    async fn test_update_system_metadata() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/v2/meta")
                    .body_contains("name=\"pid\"")
                    .body_contains("<serialVersion>1</serialVersion>");
                then.status(200).body("true");
            })
            .await;

        update_system_metadata(&mock_client(&server), &"urn:uuid:1".into(), &sysmeta("urn:uuid:1"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_and_archive() {
        let server = MockServer::start_async().await;
        let delete_mock = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v2/object/urn:uuid:1");
                then.status(200).body(identifier_xml("urn:uuid:1"));
            })
            .await;
        let archive_mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/v2/archive/urn:uuid:2");
                then.status(200).body(identifier_xml("urn:uuid:2"));
            })
            .await;

        let client = mock_client(&server);
        let deleted = delete(&client, &"urn:uuid:1".into()).await.unwrap();
        let archived = archive(&client, &"urn:uuid:2".into()).await.unwrap();

        delete_mock.assert_async().await;
        archive_mock.assert_async().await;
        assert_eq!(deleted.as_str(), "urn:uuid:1");
        assert_eq!(archived.as_str(), "urn:uuid:2");
    }

    #[tokio::test]
    async fn test_generate_identifier() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/generate")
                    .body_contains("name=\"scheme\"")
                    .body_contains("UUID")
                    .body_contains("name=\"fragment\"");
                then.status(200)
                    .body(identifier_xml("urn:uuid:6f2a1c4e-0000-4000-8000-000000000000"));
            })
            .await;

        let pid = generate_identifier(&mock_client(&server), "UUID", Some("survey"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(pid.as_str().starts_with("urn:uuid:"));
    }
}
