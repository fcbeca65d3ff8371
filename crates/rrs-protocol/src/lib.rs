//! Repository protocol rules for the rrs server.
//!
//! Maps REST requests from the restic backup client onto a type-partitioned
//! repository layout. Everything here is pure: no I/O, no HTTP types, so the
//! rules can be tested without a transport.
//!
//! # Key Types
//!
//! - [`ObjectType`]: the closed set of repository object types
//! - [`Route`]: a parsed request target with an explicit optional repository
//! - [`AccessMode`]: read-write or append-only delete policy
//! - [`BasicCredentials`]: decoded `Authorization: Basic` header
//!
//! # Layout
//!
//! ```text
//! <repo>/config
//! <repo>/data/<name[0..2]>/<name>
//! <repo>/{index,keys,locks,snapshots}/<name>
//! ```

pub mod auth;
pub mod endpoint;
pub mod error;
pub mod object_type;
pub mod policy;
pub mod resolve;
pub mod route;
pub mod validate;

pub use auth::BasicCredentials;
pub use endpoint::{endpoints, is_create_confirmed, SHARD_COUNT};
pub use error::{ProtocolError, ProtocolResult};
pub use object_type::ObjectType;
pub use policy::AccessMode;
pub use resolve::{
    repository_layout, resolve_blob_path, resolve_type_path, shard_names, shard_prefix, ROOT,
};
pub use route::{ObjectRef, Operation, Route, Verb};
