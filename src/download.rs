//! Streaming object downloads to disk.

use std::path::Path;

use crate::error::D1Error;
use crate::file::filestream::stream_file;
use crate::hasher::{FileHash, Hasher};
use crate::node::D1Node;
use crate::types::{Checksum, Identifier};
use crate::utils::validate_directory;

/// Downloads an object from a node to a file.
///
/// The body is streamed to disk with a progress bar. When a checksum is
/// expected, the data is hashed on the fly and compared once the download
/// completes.
///
/// # Arguments
///
/// * `node` - The node to download from.
/// * `pid` - The identifier of the object.
/// * `out_path` - Destination file; missing parent directories are created.
/// * `expected` - Optional checksum the downloaded data must match.
///
/// # Returns
///
/// The number of bytes written.
///
/// # Errors
///
/// The node's exception if the object cannot be read, or a client-side
/// `ServiceFailure` if the output cannot be written or the checksum does
/// not match. A partial or mismatching file is removed.
pub async fn download_object<N: D1Node>(
    node: &N,
    pid: &Identifier,
    out_path: &Path,
    expected: Option<&Checksum>,
) -> Result<u64, D1Error> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            validate_directory(parent).await?;
        }
    }

    let hasher = expected
        .map(|checksum| {
            checksum.algorithm_kind().map(FileHash::new).map_err(|e| {
                D1Error::client_message(format!("Cannot verify {pid}: {e}"))
                    .with_pid(pid.as_str())
            })
        })
        .transpose()?;

    let response = node.get_object_response(pid).await?;
    let size = response.content_length().unwrap_or(0);
    let callbacks = hasher.as_ref().map(|h| vec![h.to_callback()]);

    let written = stream_file(response, out_path, size, callbacks).await?;

    if let (Some(expected), Some(hasher)) = (expected, hasher) {
        let actual = hasher.to_checksum();
        if !expected.matches(&actual) {
            tokio::fs::remove_file(out_path).await?;
            return Err(D1Error::client_message(format!(
                "Checksum mismatch for {pid}: expected {expected}, got {actual}"
            ))
            .with_pid(pid.as_str()));
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::hasher::checksum_bytes;
    use crate::node::mnode::MNode;
    use crate::client::BaseClient;
    use crate::test_utils::{error_xml, mock_client, truncated_body_server};
    use crate::types::ChecksumAlgorithm;

    const CONTENT: &[u8] = b"station,temp\nA,12.5\nB,13.1\n";

    async fn serve(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/object/urn:uuid:1");
                then.status(200).body(CONTENT);
            })
            .await;
    }

    #[tokio::test]
    async fn test_download_verified() {
        let server = MockServer::start_async().await;
        serve(&server).await;

        let temp_dir = tempfile::tempdir().unwrap();
        let out_path = temp_dir.path().join("nested/obs.csv");
        let expected = checksum_bytes(ChecksumAlgorithm::SHA256, CONTENT);

        let node = MNode::new(mock_client(&server), None);
        let written = download_object(&node, &"urn:uuid:1".into(), &out_path, Some(&expected))
            .await
            .unwrap();

        assert_eq!(written, CONTENT.len() as u64);
        assert_eq!(std::fs::read(&out_path).unwrap(), CONTENT);
    }

    #[tokio::test]
    async fn test_download_checksum_mismatch_removes_file() {
        let server = MockServer::start_async().await;
        serve(&server).await;

        let temp_dir = tempfile::tempdir().unwrap();
        let out_path = temp_dir.path().join("obs.csv");
        let expected = checksum_bytes(ChecksumAlgorithm::MD5, b"something else");

        let node = MNode::new(mock_client(&server), None);
        let error = download_object(&node, &"urn:uuid:1".into(), &out_path, Some(&expected))
            .await
            .unwrap_err();

        assert!(error.is_client_side());
        assert_eq!(error.pid.as_deref(), Some("urn:uuid:1"));
        assert!(!out_path.exists());
    }

    #[tokio::test]
    async fn test_download_connection_lost_removes_file() {
        let base_url = truncated_body_server("station,temp\n", 1000).await;
        let client = BaseClient::with_client(&base_url, "v2", reqwest::Client::new()).unwrap();

        let temp_dir = tempfile::tempdir().unwrap();
        let out_path = temp_dir.path().join("obj.bin");
        let expected = checksum_bytes(ChecksumAlgorithm::MD5, CONTENT);

        let node = MNode::new(client, None);
        let error = download_object(&node, &"urn:uuid:1".into(), &out_path, Some(&expected))
            .await
            .unwrap_err();

        assert!(error.is_client_side());
        assert!(!out_path.exists());
    }

    #[tokio::test]
    async fn test_download_not_found_writes_nothing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/object/missing");
                then.status(404)
                    .body(error_xml("NotFound", 404, "1020", "No such object"));
            })
            .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let out_path = temp_dir.path().join("missing.bin");

        let node = MNode::new(mock_client(&server), None);
        let error = download_object(&node, &"missing".into(), &out_path, None)
            .await
            .unwrap_err();

        assert!(error.is_not_found());
        assert!(!out_path.exists());
    }
}
