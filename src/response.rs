//! Decoding of successful node responses.
//!
//! Most calls answer with an XML document, some with a bare identifier
//! document (`<d1:identifier>…</d1:identifier>`), and `describe` answers
//! with headers only.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, LAST_MODIFIED};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::D1Error;
use crate::types::{Checksum, Identifier, ObjectFormatIdentifier};

const HEADER_OBJECT_FORMAT: &str = "DataONE-ObjectFormat";
const HEADER_CHECKSUM: &str = "DataONE-Checksum";
const HEADER_SERIAL_VERSION: &str = "DataONE-SerialVersion";

/// Decodes an XML document into one of the DataONE types.
///
/// # Arguments
///
/// * `body` - The raw response body.
///
/// # Returns
///
/// The decoded value, or a client-side `ServiceFailure` naming the target
/// type if the document does not match.
pub fn decode_xml<T: DeserializeOwned>(body: &[u8]) -> Result<T, D1Error> {
    let text = std::str::from_utf8(body).map_err(|e| {
        D1Error::client_side("Response body is not valid UTF-8", Some(e))
    })?;

    quick_xml::de::from_str::<T>(text).map_err(|e| {
        D1Error::client_side(
            format!(
                "Could not decode response as {}: {e}",
                std::any::type_name::<T>()
            ),
            Some(e),
        )
    })
}

/// Root documents that only carry text, such as `<d1:identifier>`.
#[derive(Debug, Deserialize)]
struct TextDocument {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Decodes an identifier document as returned by `create`, `update`,
/// `delete`, `archive` and friends.
pub fn decode_identifier(body: &[u8]) -> Result<Identifier, D1Error> {
    let document: TextDocument = decode_xml(body)?;
    let value = document.value.trim();

    if value.is_empty() {
        return Err(D1Error::client_message(
            "Node answered with an empty identifier document",
        ));
    }

    Ok(Identifier::from(value))
}

/// The object description carried by the headers of a `HEAD object/{pid}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeResponse {
    pub format_id: ObjectFormatIdentifier,
    pub size: Option<u64>,
    pub checksum: Option<Checksum>,
    pub last_modified: Option<DateTime<Utc>>,
    pub serial_version: Option<u64>,
}

impl DescribeResponse {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, D1Error> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let format_id = header(HEADER_OBJECT_FORMAT).ok_or_else(|| {
            D1Error::client_message(format!(
                "Describe response is missing the {HEADER_OBJECT_FORMAT} header"
            ))
        })?;

        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        let last_modified = headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(DescribeResponse {
            format_id: ObjectFormatIdentifier::from(format_id.trim()),
            size,
            checksum: header(HEADER_CHECKSUM).and_then(Checksum::from_header),
            last_modified,
            serial_version: header(HEADER_SERIAL_VERSION).and_then(|v| v.trim().parse().ok()),
        })
    }
}
