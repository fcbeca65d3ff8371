//! Hierarchical object storage for the rrs repository server.
//!
//! The server never touches a filesystem or bucket directly. Every read,
//! write, listing and directory creation goes through the [`ObjectStore`]
//! trait, addressed by slash-separated paths relative to the store root.
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`LocalObjectStore`] -- a directory on the local filesystem
//!
//! # Contract
//!
//! 1. `mkdir` is idempotent and creates missing parents.
//! 2. `put` creates missing parent directories and replaces existing objects.
//! 3. `list` returns the direct children of a directory sorted by name.
//! 4. Paths are relative; `.` and empty components are ignored and `..` is
//!    rejected.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod local;
pub mod memory;
pub mod path;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;
pub use traits::{DirEntry, EntryKind, ObjectMeta, ObjectReader, ObjectStore};
