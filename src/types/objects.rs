//! Listing and lookup documents: object lists, resolve results and access logs.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{skip_serializing_none, DeserializeFromStr, SerializeDisplay};

use super::checksum::Checksum;
use super::datetime;
use super::identifiers::{Identifier, NodeReference, ObjectFormatIdentifier, Subject};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub identifier: Identifier,
    pub format_id: ObjectFormatIdentifier,
    pub checksum: Checksum,
    #[serde(with = "datetime")]
    pub date_sys_metadata_modified: DateTime<Utc>,
    pub size: u64,
}

/// One page of a `listObjects` result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectList {
    #[serde(rename = "@count", default)]
    pub count: u32,
    #[serde(rename = "@start", default)]
    pub start: u32,
    #[serde(rename = "@total", default)]
    pub total: u32,
    #[serde(rename = "objectInfo", default)]
    pub object_info: Vec<ObjectInfo>,
}

impl ObjectList {
    /// True if more entries exist past this page.
    pub fn has_more(&self) -> bool {
        self.start + self.count < self.total
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    #[serde(rename = "nodeIdentifier")]
    pub node_identifier: NodeReference,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(rename = "version", default)]
    pub version: Vec<String>,
    pub url: String,
    pub preference: Option<i32>,
}

/// The locations a CN knows for an object, as returned by `resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocationList {
    pub identifier: Identifier,
    #[serde(rename = "objectLocation", default)]
    pub object_location: Vec<ObjectLocation>,
}

impl ObjectLocationList {
    /// Locations ordered by preference, highest first. Entries without a
    /// preference keep their document order after the ranked ones.
    pub fn by_preference(&self) -> Vec<&ObjectLocation> {
        let mut locations: Vec<&ObjectLocation> = self.object_location.iter().collect();
        locations.sort_by(|a, b| match (a.preference, b.preference) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        locations
    }
}

/// Events recorded in node access logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Event {
    Create,
    Read,
    Update,
    Delete,
    Replicate,
    SynchronizationFailed,
    ReplicationFailed,
    /// Any event name this client does not know about
    Other(String),
}

impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "create" => Event::Create,
            "read" => Event::Read,
            "update" => Event::Update,
            "delete" => Event::Delete,
            "replicate" => Event::Replicate,
            "synchronization_failed" => Event::SynchronizationFailed,
            "replication_failed" => Event::ReplicationFailed,
            other => Event::Other(other.to_string()),
        })
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Event::Create => "create",
            Event::Read => "read",
            Event::Update => "update",
            Event::Delete => "delete",
            Event::Replicate => "replicate",
            Event::SynchronizationFailed => "synchronization_failed",
            Event::ReplicationFailed => "replication_failed",
            Event::Other(other) => other.as_str(),
        };
        write!(f, "{name}")
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub entry_id: String,
    pub identifier: Identifier,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub subject: Subject,
    pub event: Event,
    #[serde(with = "datetime")]
    pub date_logged: DateTime<Utc>,
    pub node_identifier: NodeReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Log {
    #[serde(rename = "@count", default)]
    pub count: u32,
    #[serde(rename = "@start", default)]
    pub start: u32,
    #[serde(rename = "@total", default)]
    pub total: u32,
    #[serde(rename = "logEntry", default)]
    pub log_entry: Vec<LogEntry>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub subject: Subject,
    #[serde(default)]
    pub given_name: Vec<String>,
    pub family_name: Option<String>,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub is_member_of: Vec<Subject>,
    #[serde(default)]
    pub equivalent_identity: Vec<Subject>,
    pub verified: Option<bool>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub subject: Subject,
    pub group_name: Option<String>,
    #[serde(default)]
    pub has_member: Vec<Subject>,
    #[serde(default)]
    pub rights_holder: Vec<Subject>,
}

/// Identity information about a subject, as returned by `echoCredentials`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubjectInfo {
    #[serde(default)]
    pub person: Vec<Person>,
    #[serde(default)]
    pub group: Vec<Group>,
}

impl SubjectInfo {
    /// Every subject this identity can act as: people, their equivalent
    /// identities and group memberships, and listed groups.
    pub fn all_subjects(&self) -> Vec<Subject> {
        let mut subjects = Vec::new();
        for person in &self.person {
            subjects.push(person.subject.clone());
            subjects.extend(person.equivalent_identity.iter().cloned());
            subjects.extend(person.is_member_of.iter().cloned());
        }
        subjects.extend(self.group.iter().map(|g| g.subject.clone()));
        subjects.sort();
        subjects.dedup();
        subjects
    }
}
