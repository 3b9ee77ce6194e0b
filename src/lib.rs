//! A Rust client library for the DataONE REST API.
//!
//! DataONE federates data repositories (member nodes) behind a set of
//! coordinating nodes that index, resolve and replicate their objects. This
//! crate talks to both kinds of nodes: it builds the REST calls, maps the
//! XML documents to typed structures and DataONE exceptions to [`error::D1Error`],
//! and finds out which node a call has to go to.
//!
//! Most applications start from a [`context::D1Context`], which holds the
//! shared connection pool, credentials, node registry and caches. The free
//! functions in [`api`] work on a single node's [`client::BaseClient`].

#![warn(unused_crate_dependencies)]

/// REST client shared by all node proxies
pub mod client;

/// Client configuration from files and environment
pub mod config;

/// The explicit client context
pub mod context;

/// Streaming downloads with checksum verification
pub mod download;

/// DataONE exception taxonomy
pub mod error;

/// Checksum computation
pub mod hasher;

/// Tracing setup
pub mod logging;

/// Macros for declaring DataONE types
pub mod macros;

/// Objects bundled with their system metadata
pub mod object;

/// Progress tracking utilities
pub(crate) mod progress;

/// Types for making requests to DataONE nodes
pub mod request;

/// Decoding of node responses
pub mod response;

/// General utility functions
pub(crate) mod utils;

/// DataONE data types
pub mod types {
    pub use access::{AccessPolicy, AccessRule, Permission};
    pub use checksum::{Checksum, ChecksumAlgorithm};
    pub use format::{FormatType, MediaType, MediaTypeProperty, ObjectFormat, ObjectFormatList};
    pub use identifiers::{
        Identifier, NodeReference, ObjectFormatIdentifier, Subject, AUTHENTICATED_USER_SUBJECT,
        PUBLIC_SUBJECT,
    };
    pub use node::{Node, NodeList, NodeState, NodeType, Service, Services};
    pub use objects::{
        Event, Group, Log, LogEntry, ObjectInfo, ObjectList, ObjectLocation, ObjectLocationList,
        Person, SubjectInfo,
    };
    pub use sysmeta::{
        Replica, ReplicationPolicy, ReplicationStatus, SystemMetadata, TYPES_V2_NAMESPACE,
    };

    /// Access policies and permissions
    pub mod access;
    /// Checksums and algorithms
    pub mod checksum;
    /// Lenient `xs:dateTime` handling
    pub mod datetime;
    /// Object formats
    pub mod format;
    /// Identifier newtypes
    pub mod identifiers;
    /// Node registry documents
    pub mod node;
    /// Object listings, locations and logs
    pub mod objects;
    /// System metadata
    pub mod sysmeta;
}

/// File handling functionality
pub mod file {
    pub use uploadfile::{FileSource, UploadFile};

    /// Callback functionality for file operations
    pub mod callback;
    /// File streaming utilities
    pub(crate) mod filestream;
    /// File upload functionality
    pub mod uploadfile;
}

/// Credentials, tokens and stored profiles
pub mod auth {
    pub use credentials::Credentials;
    pub use profile::AuthProfile;
    pub use token::TokenClaims;

    /// Credential discovery and application
    pub mod credentials;
    /// Keyring stored profiles
    pub mod profile;
    /// Bearer token claims
    pub mod token;
}

/// Typed REST operations on a single node
pub mod api {
    pub use authorization::is_authorized;
    pub use cn::{
        echo_credentials, get_format, list_formats, list_nodes, query, reserve_identifier,
        resolve,
    };
    pub use service::{get_capabilities, get_log_records, ping, LogQuery};
    pub use read::{
        describe, get_checksum, get_object, get_object_response, get_system_metadata,
        list_objects, ListObjectsQuery,
    };
    pub use storage::{
        archive, create, delete, generate_identifier, update, update_system_metadata,
    };

    /// Authorization checks
    pub mod authorization;
    /// Coordinating node services
    pub mod cn;
    /// Object retrieval
    pub mod read;
    /// Node health, capabilities and logs
    pub mod service;
    /// Member node storage
    pub mod storage;
}

/// Node proxies and the node locator
pub mod node {
    pub use cnode::CNode;
    pub use factory::NodeFactory;
    pub use locator::NodeLocator;
    pub use mnode::MNode;
    pub use proxy::{D1Node, NodeHandle};

    /// Coordinating node proxy
    pub mod cnode;
    /// Proxy construction
    pub mod factory;
    /// Node registry and lookup
    pub mod locator;
    /// Member node proxy
    pub mod mnode;
    /// Shared node operations
    pub mod proxy;
}

/// Local caches
pub mod cache {
    pub use formats::ObjectFormatCache;
    pub use local::{CacheStats, LocalCache, ObjectCache, SystemMetadataCache};

    /// Object format cache
    pub mod formats;
    /// Bounded LRU caches
    pub mod local;
}

/// Commonly used types and functions
pub mod prelude {
    pub use crate::file::callback::CallbackFun;

    pub use super::auth::Credentials;
    pub use super::client::BaseClient;
    pub use super::config::ClientConfig;
    pub use super::context::D1Context;
    pub use super::error::{D1Error, ExceptionKind};
    pub use super::file::UploadFile;
    pub use super::node::{CNode, D1Node, MNode};
    pub use super::object::D1Object;
    pub use super::types::{
        AccessPolicy, Checksum, ChecksumAlgorithm, Identifier, NodeReference,
        ObjectFormatIdentifier, Permission, Subject, SystemMetadata,
    };
}

/// Test utilities
#[cfg(test)]
mod test_utils;
