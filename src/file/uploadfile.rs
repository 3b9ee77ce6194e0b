use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::TryStreamExt;
use indicatif::ProgressBar;
use lazy_static::lazy_static;
use reqwest::Body;
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::error::D1Error;
use crate::file::callback::CallbackFun;

lazy_static! {
    static ref BUFFER_SIZE: usize = std::env::var("D1_BUFFER_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(2 * 1024 * 1024); // 2 MiB if unset or invalid
}

/// Where the bytes of an upload come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A local file, streamed from disk when the request is sent
    Path(PathBuf),
    /// Content already held in memory
    Bytes(Bytes),
}

/// The payload of an object upload, or of a system metadata document.
///
/// An `UploadFile` is the single type passed to the multipart builder, the
/// hasher and [`crate::object::D1Object`], so local files and in-memory
/// content are handled the same way everywhere.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name sent with the multipart part.
    pub name: String,
    /// The source of the data.
    pub file: FileSource,
    /// The size in bytes.
    pub size: u64,
}

impl UploadFile {
    /// Creates an `UploadFile` for a local file.
    ///
    /// # Arguments
    /// * `path` - Path to the file.
    ///
    /// # Returns
    /// The upload, or a client-side error if the file cannot be inspected.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, D1Error> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                D1Error::client_message(format!("Could not extract file name from {path:?}"))
            })?
            .to_string();

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            D1Error::client_side(format!("Could not read metadata of {path:?}"), Some(e))
        })?;

        if !metadata.is_file() {
            return Err(D1Error::client_message(format!("{path:?} is not a file")));
        }

        Ok(UploadFile {
            name,
            file: FileSource::Path(path.to_path_buf()),
            size: metadata.len(),
        })
    }

    /// Creates an `UploadFile` from content held in memory.
    pub fn from_bytes(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        UploadFile {
            name: name.into(),
            size: content.len() as u64,
            file: FileSource::Bytes(content),
        }
    }

    /// Reads the whole content into memory.
    pub async fn read_all(&self) -> Result<Bytes, D1Error> {
        match &self.file {
            FileSource::Bytes(content) => Ok(content.clone()),
            FileSource::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }

    /// Creates a request `Body` from the source.
    ///
    /// Every chunk is passed to the callbacks before it is sent, and the
    /// progress bar, if any, advances by the chunk length.
    ///
    /// # Arguments
    /// * `callbacks` - Optional chunk callbacks, such as a hasher.
    /// * `pb` - Optional progress bar.
    pub async fn create_body(
        self,
        callbacks: Option<Vec<CallbackFun>>,
        pb: Option<ProgressBar>,
    ) -> Result<Body, D1Error> {
        match self.file {
            FileSource::Bytes(content) => {
                CallbackFun::call_all(&callbacks, &content);
                if let Some(pb) = pb {
                    pb.inc(content.len() as u64);
                }
                Ok(Body::from(content))
            }
            FileSource::Path(path) => {
                let file = File::open(&path).await.map_err(|e| {
                    D1Error::client_side(format!("Could not open {path:?}"), Some(e))
                })?;
                Ok(Self::create_file_stream(callbacks, pb, file))
            }
        }
    }

    fn create_file_stream(
        callbacks: Option<Vec<CallbackFun>>,
        pb: Option<ProgressBar>,
        file: File,
    ) -> Body {
        let stream = FramedRead::with_capacity(file, BytesCodec::new(), *BUFFER_SIZE)
            .map_ok(Bytes::from)
            .inspect_ok(move |chunk| {
                CallbackFun::call_all(&callbacks, chunk);
                if let Some(pb) = &pb {
                    pb.inc(chunk.len() as u64);
                }
            });

        Body::wrap_stream(stream)
    }
}
