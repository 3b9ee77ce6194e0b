//! Streaming of response bodies to disk.

use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::D1Error;
use crate::file::callback::CallbackFun;
use crate::progress::setup_progress_log;

/// Writes a response body to `out_path`, chunk by chunk.
///
/// Parent directories are created as needed and an existing file is
/// truncated. Each chunk is passed to the callbacks after it was written.
/// If the body cannot be read to the end, the partial file is removed.
///
/// # Arguments
///
/// * `response` - The successful response whose body is written.
/// * `out_path` - Destination file.
/// * `file_size` - Expected size for the progress bar, `0` shows a spinner.
/// * `callbacks` - Optional chunk callbacks, such as a hasher.
///
/// # Returns
///
/// The number of bytes written.
pub(crate) async fn stream_file(
    response: reqwest::Response,
    out_path: &Path,
    file_size: u64,
    callbacks: Option<Vec<CallbackFun>>,
) -> Result<u64, D1Error> {
    create_dirs_from_path(out_path).await?;
    let file = File::create(out_path).await.map_err(|e| {
        D1Error::client_side(format!("Could not create {out_path:?}"), Some(e))
    })?;

    match write_body(response, file, out_path, file_size, callbacks).await {
        Ok(written) => Ok(written),
        Err(e) => {
            if let Err(remove_error) = tokio::fs::remove_file(out_path).await {
                tracing::warn!(path = ?out_path, error = %remove_error, "could not remove partial download");
            }
            Err(e)
        }
    }
}

async fn write_body(
    response: reqwest::Response,
    mut file: File,
    out_path: &Path,
    file_size: u64,
    callbacks: Option<Vec<CallbackFun>>,
) -> Result<u64, D1Error> {
    let name = out_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let pb = setup_progress_log(file_size, None, name);

    let mut written = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(item) = stream.next().await {
        let chunk = item.map_err(|e| {
            D1Error::client_side(format!("Connection lost while downloading {name}"), Some(e))
        })?;

        file.write_all(&chunk).await?;
        CallbackFun::call_all(&callbacks, &chunk);
        written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    pb.finish_and_clear();

    tracing::debug!(path = ?out_path, bytes = written, "download written");

    Ok(written)
}

/// Creates all parent directories of a file path.
pub(crate) async fn create_dirs_from_path(out_path: &Path) -> Result<(), D1Error> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
