use serde::{Deserialize, Serialize};

use crate::object_type::ObjectType;

/// Process-wide access policy.
///
/// Writes are never restricted. In append-only mode deletes are refused for
/// every type except `locks`, so stale locks can still be cleaned up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    #[default]
    ReadWrite,
    AppendOnly,
}

impl AccessMode {
    pub fn from_append_only(append_only: bool) -> Self {
        if append_only {
            Self::AppendOnly
        } else {
            Self::ReadWrite
        }
    }

    pub fn is_append_only(&self) -> bool {
        matches!(self, Self::AppendOnly)
    }

    pub fn allows_write(&self, _object_type: ObjectType) -> bool {
        true
    }

    pub fn allows_delete(&self, object_type: ObjectType) -> bool {
        match self {
            Self::ReadWrite => true,
            Self::AppendOnly => object_type == ObjectType::Locks,
        }
    }
}
