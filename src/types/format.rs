use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{skip_serializing_none, DeserializeFromStr, SerializeDisplay};

use super::identifiers::ObjectFormatIdentifier;

/// The broad class of an object format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum FormatType {
    Data,
    Metadata,
    Resource,
}

impl FromStr for FormatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DATA" => Ok(FormatType::Data),
            "METADATA" => Ok(FormatType::Metadata),
            "RESOURCE" => Ok(FormatType::Resource),
            other => Err(format!("Unknown format type: {other}")),
        }
    }
}

impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FormatType::Data => "DATA",
            FormatType::Metadata => "METADATA",
            FormatType::Resource => "RESOURCE",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTypeProperty {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "$text")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "property", default)]
    pub property: Vec<MediaTypeProperty>,
}

impl MediaType {
    pub fn new(name: impl Into<String>) -> Self {
        MediaType {
            name: name.into(),
            property: Vec::new(),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFormat {
    pub format_id: ObjectFormatIdentifier,
    pub format_name: String,
    pub format_type: FormatType,
    pub media_type: Option<MediaType>,
    pub extension: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectFormatList {
    #[serde(rename = "@count", default)]
    pub count: u32,
    #[serde(rename = "@start", default)]
    pub start: u32,
    #[serde(rename = "@total", default)]
    pub total: u32,
    #[serde(rename = "objectFormat", default)]
    pub object_format: Vec<ObjectFormat>,
}

impl ObjectFormatList {
    pub fn find(&self, id: &ObjectFormatIdentifier) -> Option<&ObjectFormat> {
        self.object_format.iter().find(|f| &f.format_id == id)
    }
}
