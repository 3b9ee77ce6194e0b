use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{skip_serializing_none, DeserializeFromStr, SerializeDisplay};

use crate::error::D1Error;

use super::access::AccessPolicy;
use super::checksum::Checksum;
use super::datetime;
use super::format::MediaType;
use super::identifiers::{Identifier, NodeReference, ObjectFormatIdentifier, Subject};

/// Namespace of the v2 service types.
pub const TYPES_V2_NAMESPACE: &str = "http://ns.dataone.org/service/types/v2.0";

/// Root element name used when sending system metadata to a node.
pub(crate) const SYSMETA_ROOT: &str = "d1:systemMetadata";

fn types_v2_namespace() -> String {
    TYPES_V2_NAMESPACE.to_string()
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplicationPolicy {
    #[serde(rename = "@replicationAllowed")]
    pub replication_allowed: Option<bool>,
    #[serde(rename = "@numberReplicas")]
    pub number_replicas: Option<u32>,
    #[serde(rename = "preferredMemberNode", default)]
    pub preferred_member_node: Vec<NodeReference>,
    #[serde(rename = "blockedMemberNode", default)]
    pub blocked_member_node: Vec<NodeReference>,
}

impl ReplicationPolicy {
    pub fn disabled() -> Self {
        ReplicationPolicy {
            replication_allowed: Some(false),
            number_replicas: Some(0),
            ..Default::default()
        }
    }

    pub fn allowed(number_replicas: u32) -> Self {
        ReplicationPolicy {
            replication_allowed: Some(true),
            number_replicas: Some(number_replicas),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum ReplicationStatus {
    Queued,
    Requested,
    Completed,
    Failed,
    Invalidated,
}

impl FromStr for ReplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(ReplicationStatus::Queued),
            "requested" => Ok(ReplicationStatus::Requested),
            "completed" => Ok(ReplicationStatus::Completed),
            "failed" => Ok(ReplicationStatus::Failed),
            "invalidated" => Ok(ReplicationStatus::Invalidated),
            other => Err(format!("Unknown replication status: {other}")),
        }
    }
}

impl Display for ReplicationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReplicationStatus::Queued => "queued",
            ReplicationStatus::Requested => "requested",
            ReplicationStatus::Completed => "completed",
            ReplicationStatus::Failed => "failed",
            ReplicationStatus::Invalidated => "invalidated",
        };
        write!(f, "{name}")
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replica {
    pub replica_member_node: NodeReference,
    pub replication_status: ReplicationStatus,
    #[serde(default, with = "datetime::option")]
    pub replica_verified: Option<DateTime<Utc>>,
}

/// The metadata record describing a stored object.
///
/// Field order matches the schema sequence, which nodes validate strictly.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetadata {
    #[serde(rename = "@xmlns:d1", default = "types_v2_namespace")]
    pub namespace: String,
    pub serial_version: Option<u64>,
    pub identifier: Identifier,
    pub format_id: ObjectFormatIdentifier,
    pub size: u64,
    pub checksum: Checksum,
    pub submitter: Option<Subject>,
    pub rights_holder: Subject,
    pub access_policy: Option<AccessPolicy>,
    pub replication_policy: Option<ReplicationPolicy>,
    pub obsoletes: Option<Identifier>,
    pub obsoleted_by: Option<Identifier>,
    pub archived: Option<bool>,
    #[serde(default, with = "datetime::option")]
    pub date_uploaded: Option<DateTime<Utc>>,
    #[serde(default, with = "datetime::option")]
    pub date_sys_metadata_modified: Option<DateTime<Utc>>,
    pub origin_member_node: Option<NodeReference>,
    pub authoritative_member_node: Option<NodeReference>,
    #[serde(default)]
    pub replica: Vec<Replica>,
    pub series_id: Option<Identifier>,
    pub media_type: Option<MediaType>,
    pub file_name: Option<String>,
}

impl SystemMetadata {
    /// Creates the minimal record a member node accepts on `create`.
    pub fn new(
        identifier: Identifier,
        format_id: ObjectFormatIdentifier,
        size: u64,
        checksum: Checksum,
        submitter: Subject,
        rights_holder: Subject,
    ) -> Self {
        SystemMetadata {
            namespace: types_v2_namespace(),
            serial_version: Some(1),
            identifier,
            format_id,
            size,
            checksum,
            submitter: Some(submitter),
            rights_holder,
            access_policy: None,
            replication_policy: None,
            obsoletes: None,
            obsoleted_by: None,
            archived: None,
            date_uploaded: None,
            date_sys_metadata_modified: None,
            origin_member_node: None,
            authoritative_member_node: None,
            replica: Vec::new(),
            series_id: None,
            media_type: None,
            file_name: None,
        }
    }

    pub fn from_xml(xml: &str) -> Result<Self, D1Error> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    pub fn to_xml(&self) -> Result<String, D1Error> {
        quick_xml::se::to_string_with_root(SYSMETA_ROOT, self).map_err(|e| {
            D1Error::client_side(
                format!("Could not serialize system metadata for {}", self.identifier),
                Some(e),
            )
        })
    }

    pub fn is_archived(&self) -> bool {
        self.archived.unwrap_or(false)
    }

    /// True if a newer version of this object exists.
    pub fn is_obsolete(&self) -> bool {
        self.obsoleted_by.is_some()
    }
}
