//! Maps node identifiers to proxies.
//!
//! The locator keeps two tables: the base URL and type of every known node,
//! usually loaded from a CN's registry, and the proxies built so far.
//! Proxies are built lazily on first lookup and then reused.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{D1Error, ExceptionKind, CLIENT_SIDE_DETAIL_CODE};
use crate::types::{NodeList, NodeReference, NodeType};

use super::cnode::CNode;
use super::factory::NodeFactory;
use super::mnode::MNode;
use super::proxy::{same_base_url, NodeHandle};

#[derive(Debug, Default)]
struct Registry {
    base_urls: HashMap<NodeReference, (String, NodeType)>,
    nodes: HashMap<NodeReference, NodeHandle>,
}

impl Registry {
    /// Drops a built proxy if it no longer points at `base_url`.
    fn invalidate_if_moved(&mut self, node_id: &NodeReference, base_url: &str) {
        let moved = self
            .nodes
            .get(node_id)
            .is_some_and(|handle| !same_base_url(handle.base_url(), base_url));

        if moved {
            tracing::debug!(node = %node_id, "base URL changed, dropping proxy");
            self.nodes.remove(node_id);
        }
    }
}

#[derive(Debug)]
pub struct NodeLocator {
    factory: NodeFactory,
    registry: RwLock<Registry>,
    default_cn: Arc<CNode>,
}

impl NodeLocator {
    /// Creates a locator whose registry is filled from `default_cn`.
    pub fn new(factory: NodeFactory, default_cn: CNode) -> Self {
        NodeLocator {
            factory,
            registry: RwLock::new(Registry::default()),
            default_cn: Arc::new(default_cn),
        }
    }

    pub fn factory(&self) -> &NodeFactory {
        &self.factory
    }

    /// The CN the locator was configured with.
    pub fn default_cnode(&self) -> Arc<CNode> {
        Arc::clone(&self.default_cn)
    }

    /// Registers where a node lives. A proxy built for an older URL is
    /// discarded.
    pub fn put_base_url(
        &self,
        node_id: NodeReference,
        base_url: impl Into<String>,
        node_type: NodeType,
    ) {
        let base_url = base_url.into();
        let mut registry = self.registry.write();
        registry.invalidate_if_moved(&node_id, &base_url);
        registry.base_urls.insert(node_id, (base_url, node_type));
    }

    /// Registers an already built proxy.
    pub fn put_node(&self, node_id: NodeReference, handle: NodeHandle) {
        let mut registry = self.registry.write();
        registry.base_urls.insert(
            node_id.clone(),
            (handle.base_url().to_string(), handle.node_type()),
        );
        registry.nodes.insert(node_id, handle);
    }

    pub fn remove(&self, node_id: &NodeReference) {
        let mut registry = self.registry.write();
        registry.base_urls.remove(node_id);
        registry.nodes.remove(node_id);
    }

    pub fn clear(&self) {
        let mut registry = self.registry.write();
        registry.base_urls.clear();
        registry.nodes.clear();
    }

    /// Returns the proxy of a node, building it on first use.
    ///
    /// Fails with a client-side `ServiceFailure` if the node is not
    /// registered.
    pub fn get_node(&self, node_id: &NodeReference) -> Result<NodeHandle, D1Error> {
        if let Some(handle) = self.registry.read().nodes.get(node_id) {
            return Ok(handle.clone());
        }

        let mut registry = self.registry.write();

        // Another caller may have built it while we waited for the lock
        if let Some(handle) = registry.nodes.get(node_id) {
            return Ok(handle.clone());
        }

        let (base_url, node_type) = registry.base_urls.get(node_id).cloned().ok_or_else(|| {
            D1Error::client_message(format!("Node {node_id} is not registered"))
                .with_node_id(node_id.as_str())
        })?;

        let handle = self
            .factory
            .build(&base_url, node_type, Some(node_id.clone()))
            .map_err(|e| e.with_node_id(node_id.as_str()))?;

        tracing::debug!(node = %node_id, base_url = %base_url, "built node proxy");
        registry.nodes.insert(node_id.clone(), handle.clone());

        Ok(handle)
    }

    pub fn get_mnode(&self, node_id: &NodeReference) -> Result<Arc<MNode>, D1Error> {
        match self.get_node(node_id)? {
            NodeHandle::Member(node) => Ok(node),
            NodeHandle::Coordinating(_) => Err(type_mismatch(node_id, NodeType::Member)),
        }
    }

    pub fn get_cnode(&self, node_id: &NodeReference) -> Result<Arc<CNode>, D1Error> {
        match self.get_node(node_id)? {
            NodeHandle::Coordinating(node) => Ok(node),
            NodeHandle::Member(_) => Err(type_mismatch(node_id, NodeType::Coordinating)),
        }
    }

    /// Registered node identifiers, optionally of one type, sorted.
    pub fn node_ids(&self, node_type: Option<NodeType>) -> Vec<NodeReference> {
        let registry = self.registry.read();
        let mut ids: Vec<NodeReference> = registry
            .base_urls
            .iter()
            .filter(|(_, (_, t))| node_type.map_or(true, |wanted| *t == wanted))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn base_url(&self, node_id: &NodeReference) -> Option<String> {
        self.registry
            .read()
            .base_urls
            .get(node_id)
            .map(|(url, _)| url.clone())
    }

    /// Registers every node of a registry document.
    ///
    /// Nodes missing from the list stay registered. Returns the number of
    /// nodes loaded.
    pub fn load_node_list(&self, nodes: &NodeList) -> usize {
        let mut registry = self.registry.write();

        for node in &nodes.node {
            registry.invalidate_if_moved(&node.identifier, &node.base_url);
            registry.base_urls.insert(
                node.identifier.clone(),
                (node.base_url.clone(), node.node_type),
            );
        }

        nodes.node.len()
    }

    /// Reloads the registry from a CN.
    pub async fn refresh(&self, cn: &CNode) -> Result<usize, D1Error> {
        let nodes = cn.list_nodes().await?;
        let count = self.load_node_list(&nodes);
        tracing::info!(nodes = count, "refreshed node registry");
        Ok(count)
    }
}

fn type_mismatch(node_id: &NodeReference, expected: NodeType) -> D1Error {
    D1Error::new(
        ExceptionKind::InvalidRequest,
        CLIENT_SIDE_DETAIL_CODE,
        format!("Node {node_id} is not of type {expected}"),
    )
    .with_node_id(node_id.as_str())
}
