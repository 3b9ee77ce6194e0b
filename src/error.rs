//! The DataONE exception taxonomy.
//!
//! Every failed call surfaces as a [`D1Error`]. Server-side failures carry
//! the exception name, detail code and description mirrored from the
//! response (either the XML `<error>` envelope or, for `HEAD` requests,
//! the `DataONE-Exception-*` headers). Failures that happen before a
//! response exists (connection errors, malformed URLs, local I/O) are
//! recast into a `ServiceFailure` with detail code
//! [`CLIENT_SIDE_DETAIL_CODE`] and the original error as source.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use thiserror::Error;

/// Detail code used for errors raised on the client before a server replied.
pub const CLIENT_SIDE_DETAIL_CODE: &str = "0";

/// Longest body excerpt kept as description when the server sent no envelope.
const MAX_BODY_EXCERPT: usize = 512;

const HEADER_EXCEPTION_NAME: &str = "DataONE-Exception-Name";
const HEADER_EXCEPTION_DETAIL_CODE: &str = "DataONE-Exception-DetailCode";
const HEADER_EXCEPTION_DESCRIPTION: &str = "DataONE-Exception-Description";
const HEADER_EXCEPTION_PID: &str = "DataONE-Exception-PID";

/// The flat set of exceptions a DataONE node can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    AuthenticationTimeout,
    IdentifierNotUnique,
    InsufficientResources,
    InvalidCredentials,
    InvalidRequest,
    InvalidSystemMetadata,
    InvalidToken,
    NotAuthorized,
    NotFound,
    NotImplemented,
    ServiceFailure,
    SynchronizationFailed,
    UnsupportedMetadataType,
    UnsupportedType,
    VersionMismatch,
}

impl ExceptionKind {
    /// The HTTP status code a node answers with for this exception.
    pub fn http_status(&self) -> u16 {
        match self {
            ExceptionKind::AuthenticationTimeout => 408,
            ExceptionKind::IdentifierNotUnique => 409,
            ExceptionKind::InsufficientResources => 413,
            ExceptionKind::InvalidCredentials => 401,
            ExceptionKind::InvalidRequest => 400,
            ExceptionKind::InvalidSystemMetadata => 400,
            ExceptionKind::InvalidToken => 401,
            ExceptionKind::NotAuthorized => 401,
            ExceptionKind::NotFound => 404,
            ExceptionKind::NotImplemented => 501,
            ExceptionKind::ServiceFailure => 500,
            ExceptionKind::SynchronizationFailed => 500,
            ExceptionKind::UnsupportedMetadataType => 400,
            ExceptionKind::UnsupportedType => 400,
            ExceptionKind::VersionMismatch => 409,
        }
    }

    /// The exception name as it appears in the `name` attribute of the envelope.
    pub fn name(&self) -> &'static str {
        match self {
            ExceptionKind::AuthenticationTimeout => "AuthenticationTimeout",
            ExceptionKind::IdentifierNotUnique => "IdentifierNotUnique",
            ExceptionKind::InsufficientResources => "InsufficientResources",
            ExceptionKind::InvalidCredentials => "InvalidCredentials",
            ExceptionKind::InvalidRequest => "InvalidRequest",
            ExceptionKind::InvalidSystemMetadata => "InvalidSystemMetadata",
            ExceptionKind::InvalidToken => "InvalidToken",
            ExceptionKind::NotAuthorized => "NotAuthorized",
            ExceptionKind::NotFound => "NotFound",
            ExceptionKind::NotImplemented => "NotImplemented",
            ExceptionKind::ServiceFailure => "ServiceFailure",
            ExceptionKind::SynchronizationFailed => "SynchronizationFailed",
            ExceptionKind::UnsupportedMetadataType => "UnsupportedMetadataType",
            ExceptionKind::UnsupportedType => "UnsupportedType",
            ExceptionKind::VersionMismatch => "VersionMismatch",
        }
    }

    /// Picks an exception for a bare status code, used when the server sent
    /// neither an envelope nor exception headers.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ExceptionKind::InvalidRequest,
            401 | 403 => ExceptionKind::NotAuthorized,
            404 => ExceptionKind::NotFound,
            408 => ExceptionKind::AuthenticationTimeout,
            409 => ExceptionKind::IdentifierNotUnique,
            413 => ExceptionKind::InsufficientResources,
            501 => ExceptionKind::NotImplemented,
            _ => ExceptionKind::ServiceFailure,
        }
    }
}

impl FromStr for ExceptionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Some nodes send fully qualified Java class names
        let name = s.rsplit('.').next().unwrap_or(s).trim();
        match name {
            "AuthenticationTimeout" => Ok(ExceptionKind::AuthenticationTimeout),
            "IdentifierNotUnique" => Ok(ExceptionKind::IdentifierNotUnique),
            "InsufficientResources" => Ok(ExceptionKind::InsufficientResources),
            "InvalidCredentials" => Ok(ExceptionKind::InvalidCredentials),
            "InvalidRequest" => Ok(ExceptionKind::InvalidRequest),
            "InvalidSystemMetadata" => Ok(ExceptionKind::InvalidSystemMetadata),
            "InvalidToken" => Ok(ExceptionKind::InvalidToken),
            "NotAuthorized" => Ok(ExceptionKind::NotAuthorized),
            "NotFound" => Ok(ExceptionKind::NotFound),
            "NotImplemented" => Ok(ExceptionKind::NotImplemented),
            "ServiceFailure" => Ok(ExceptionKind::ServiceFailure),
            "SynchronizationFailed" => Ok(ExceptionKind::SynchronizationFailed),
            "UnsupportedMetadataType" => Ok(ExceptionKind::UnsupportedMetadataType),
            "UnsupportedType" => Ok(ExceptionKind::UnsupportedType),
            "VersionMismatch" => Ok(ExceptionKind::VersionMismatch),
            other => Err(format!("Unknown DataONE exception: {other}")),
        }
    }
}

impl Display for ExceptionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An exception raised by a DataONE node or by the client itself.
#[derive(Debug, Error)]
#[error("{kind} ({detail_code}): {description}")]
pub struct D1Error {
    /// Which exception of the taxonomy this is
    pub kind: ExceptionKind,
    /// Node specific detail code, `0` for client-side failures
    pub detail_code: String,
    /// Human readable description
    pub description: String,
    /// Identifier the exception refers to, if any
    pub pid: Option<String>,
    /// Node that raised the exception, if known
    pub node_id: Option<String>,
    /// Free form trace information sent by the node
    pub trace_information: Option<String>,
    /// HTTP status of the response, `None` for client-side failures
    pub http_status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl D1Error {
    pub fn new(
        kind: ExceptionKind,
        detail_code: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        D1Error {
            kind,
            detail_code: detail_code.into(),
            description: description.into(),
            pid: None,
            node_id: None,
            trace_information: None,
            http_status: None,
            source: None,
        }
    }

    /// Recasts a local failure into a `ServiceFailure`.
    pub fn client_side<E>(description: impl Into<String>, cause: Option<E>) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        let mut error = Self::new(
            ExceptionKind::ServiceFailure,
            CLIENT_SIDE_DETAIL_CODE,
            description,
        );
        error.source = cause.map(Into::into);
        error
    }

    /// A client-side failure with no underlying error.
    pub fn client_message(description: impl Into<String>) -> Self {
        Self::client_side::<std::io::Error>(description, None)
    }

    pub fn with_pid(mut self, pid: impl Into<String>) -> Self {
        self.pid = Some(pid.into());
        self
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Returns true if the error was produced locally rather than by a node.
    pub fn is_client_side(&self) -> bool {
        self.http_status.is_none() && self.detail_code == CLIENT_SIDE_DETAIL_CODE
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ExceptionKind::NotFound
    }

    /// Builds the exception for a failed response.
    ///
    /// The XML envelope in the body wins, then the `DataONE-Exception-*`
    /// headers (the only channel for `HEAD`), then the status code.
    pub fn from_response_parts(status: u16, headers: &HeaderMap, body: &[u8]) -> Self {
        let mut error = Self::from_envelope(body)
            .or_else(|| Self::from_headers(headers))
            .unwrap_or_else(|| Self::from_status(status, body));

        error.http_status = Some(status);
        error
    }

    fn from_envelope(body: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(body).ok()?;
        if !text.contains("<error") {
            return None;
        }

        let envelope: ErrorEnvelope = quick_xml::de::from_str(text).ok()?;
        let kind = envelope
            .name
            .parse::<ExceptionKind>()
            .ok()
            .or_else(|| envelope.error_code.map(ExceptionKind::from_status))?;

        Some(D1Error {
            kind,
            detail_code: envelope.detail_code.unwrap_or_default(),
            description: envelope
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            pid: envelope.pid,
            node_id: envelope.node_id,
            trace_information: envelope.trace_information.map(|t| t.trim().to_string()),
            http_status: None,
            source: None,
        })
    }

    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        let kind = header(HEADER_EXCEPTION_NAME)?.parse::<ExceptionKind>().ok()?;
        let mut error = D1Error::new(
            kind,
            header(HEADER_EXCEPTION_DETAIL_CODE).unwrap_or_default(),
            header(HEADER_EXCEPTION_DESCRIPTION).unwrap_or_default(),
        );
        error.pid = header(HEADER_EXCEPTION_PID);

        Some(error)
    }

    fn from_status(status: u16, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let mut excerpt = crate::utils::excerpt(text.trim(), MAX_BODY_EXCERPT);
        if excerpt.is_empty() {
            excerpt = format!("Node answered with HTTP status {status}");
        }

        D1Error::new(ExceptionKind::from_status(status), status.to_string(), excerpt)
    }
}

/// The `<error>` document DataONE nodes send with failed responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@detailCode", default)]
    detail_code: Option<String>,
    #[serde(rename = "@errorCode", default)]
    error_code: Option<u16>,
    #[serde(rename = "@pid", default)]
    pid: Option<String>,
    #[serde(rename = "@nodeId", default)]
    node_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "traceInformation", default)]
    trace_information: Option<String>,
}

impl From<reqwest::Error> for D1Error {
    fn from(err: reqwest::Error) -> Self {
        let description = match err.url() {
            Some(url) => format!("HTTP request to {url} failed: {err}"),
            None => format!("HTTP request failed: {err}"),
        };
        D1Error::client_side(description, Some(err))
    }
}

impl From<url::ParseError> for D1Error {
    fn from(err: url::ParseError) -> Self {
        D1Error::client_side(format!("Malformed URL: {err}"), Some(err))
    }
}

impl From<std::io::Error> for D1Error {
    fn from(err: std::io::Error) -> Self {
        D1Error::client_side(format!("I/O error: {err}"), Some(err))
    }
}

impl From<quick_xml::DeError> for D1Error {
    fn from(err: quick_xml::DeError) -> Self {
        D1Error::client_side(format!("Could not process XML document: {err}"), Some(err))
    }
}
