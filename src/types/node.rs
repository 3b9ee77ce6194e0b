use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{skip_serializing_none, DeserializeFromStr, SerializeDisplay};

use super::identifiers::{NodeReference, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum NodeType {
    /// A member node, which stores objects
    Member,
    /// A coordinating node, which indexes and replicates across member nodes
    Coordinating,
    Monitor,
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mn" => Ok(NodeType::Member),
            "cn" => Ok(NodeType::Coordinating),
            "monitor" => Ok(NodeType::Monitor),
            other => Err(format!("Unknown node type: {other}")),
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeType::Member => "mn",
            NodeType::Coordinating => "cn",
            NodeType::Monitor => "Monitor",
        };
        write!(f, "{name}")
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, SerializeDisplay, DeserializeFromStr,
)]
pub enum NodeState {
    Up,
    Down,
    #[default]
    Unknown,
}

impl FromStr for NodeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(NodeState::Up),
            "down" => Ok(NodeState::Down),
            "unknown" => Ok(NodeState::Unknown),
            other => Err(format!("Unknown node state: {other}")),
        }
    }
}

impl Display for NodeState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeState::Up => "up",
            NodeState::Down => "down",
            NodeState::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(rename = "@available")]
    pub available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Services {
    #[serde(rename = "service", default)]
    pub service: Vec<Service>,
}

/// A node's self description, as found in the CN registry or returned by
/// an MN's capabilities call.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "@replicate", default)]
    pub replicate: bool,
    #[serde(rename = "@synchronize", default)]
    pub synchronize: bool,
    #[serde(rename = "@type")]
    pub node_type: NodeType,
    #[serde(rename = "@state", default)]
    pub state: NodeState,
    pub identifier: NodeReference,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(default)]
    pub services: Option<Services>,
    #[serde(rename = "subject", default)]
    pub subject: Vec<Subject>,
    #[serde(rename = "contactSubject", default)]
    pub contact_subject: Vec<Subject>,
}

impl Node {
    /// Checks whether the node advertises `service` at `version`, e.g.
    /// `supports("MNStorage", "v2")`. Services not explicitly marked
    /// unavailable count as available.
    pub fn supports(&self, service: &str, version: &str) -> bool {
        self.services
            .as_ref()
            .map(|services| {
                services.service.iter().any(|s| {
                    s.name == service && s.version == version && s.available.unwrap_or(true)
                })
            })
            .unwrap_or(false)
    }

    pub fn is_up(&self) -> bool {
        self.state == NodeState::Up
    }
}

/// The registry of nodes published by a coordinating node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeList {
    #[serde(rename = "node", default)]
    pub node: Vec<Node>,
}

impl NodeList {
    pub fn get(&self, id: &NodeReference) -> Option<&Node> {
        self.node.iter().find(|n| &n.identifier == id)
    }

    pub fn of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.node.iter().filter(move |n| n.node_type == node_type)
    }
}
