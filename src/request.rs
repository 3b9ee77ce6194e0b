use std::collections::BTreeMap;

use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;

use crate::error::D1Error;
use crate::file::callback::CallbackFun;
use crate::file::UploadFile;

/// Mime type of the `sysmeta` part of storage calls.
pub const XML_MIME: &str = "text/xml";

/// Mime type of object data parts.
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// A file part of a multipart request.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file: UploadFile,
    pub mime: &'static str,
    /// Callbacks receiving every chunk of this part while it is sent.
    pub callbacks: Option<Vec<CallbackFun>>,
}

impl FilePart {
    /// An object data part (`application/octet-stream`).
    pub fn data(file: UploadFile) -> Self {
        FilePart {
            file,
            mime: OCTET_STREAM_MIME,
            callbacks: None,
        }
    }

    /// An XML document part (`text/xml`), such as system metadata.
    pub fn xml(name: &str, document: String) -> Self {
        FilePart {
            file: UploadFile::from_bytes(name, document),
            mime: XML_MIME,
            callbacks: None,
        }
    }

    pub fn with_callbacks(mut self, callbacks: Vec<CallbackFun>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }
}

/// The body of a request sent to a node.
#[derive(Debug, Default)]
pub enum RequestType {
    /// A request with no body.
    #[default]
    Plain,

    /// A `multipart/form-data` request with text fields and file parts.
    ///
    /// Parts are emitted in key order, texts first.
    Multipart {
        texts: BTreeMap<String, String>,
        files: BTreeMap<String, FilePart>,
    },
}

impl RequestType {
    /// Starts an empty multipart body.
    pub fn multipart() -> Self {
        RequestType::Multipart {
            texts: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    /// Adds a text field. No-op on a plain request.
    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        if let RequestType::Multipart { texts, .. } = &mut self {
            texts.insert(key.to_string(), value.into());
        }
        self
    }

    /// Adds a file part. No-op on a plain request.
    pub fn file(mut self, key: &str, part: FilePart) -> Self {
        if let RequestType::Multipart { files, .. } = &mut self {
            files.insert(key.to_string(), part);
        }
        self
    }

    /// Applies the body to a request builder.
    ///
    /// # Arguments
    /// * `request` - The request builder.
    ///
    /// # Returns
    /// The builder carrying the body, or a client-side error if a file part
    /// could not be opened.
    pub async fn to_request(self, request: RequestBuilder) -> Result<RequestBuilder, D1Error> {
        match self {
            RequestType::Plain => Ok(request),
            RequestType::Multipart { texts, files } => {
                let form = Self::build_form(texts, files).await?;
                Ok(request.multipart(form))
            }
        }
    }

    async fn build_form(
        texts: BTreeMap<String, String>,
        files: BTreeMap<String, FilePart>,
    ) -> Result<Form, D1Error> {
        let mut form = Form::new();

        for (key, value) in texts {
            form = form.text(key, value);
        }

        for (key, part) in files {
            form = form.part(key, Self::assemble_file_part(part).await?);
        }

        Ok(form)
    }

    async fn assemble_file_part(part: FilePart) -> Result<Part, D1Error> {
        let FilePart {
            file,
            mime,
            callbacks,
        } = part;

        let name = file.name.clone();
        let size = file.size;
        let body = file.create_body(callbacks, None).await?;

        Part::stream_with_length(body, size)
            .file_name(name)
            .mime_str(mime)
            .map_err(|e| D1Error::client_side(format!("Invalid mime type {mime}"), Some(e)))
    }
}
