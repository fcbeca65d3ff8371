use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// One of the fixed kinds of object a repository holds.
///
/// The set is closed: a type segment that does not parse into one of these
/// never reaches storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Data,
    Index,
    Keys,
    Locks,
    Snapshots,
    Config,
}

impl ObjectType {
    /// Every object type, in repository-creation order.
    pub const ALL: [ObjectType; 6] = [
        Self::Data,
        Self::Index,
        Self::Keys,
        Self::Locks,
        Self::Snapshots,
        Self::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Index => "index",
            Self::Keys => "keys",
            Self::Locks => "locks",
            Self::Snapshots => "snapshots",
            Self::Config => "config",
        }
    }

    /// Whether names of this type are spread over two-character shard
    /// directories. Only `data` is sharded.
    pub fn is_sharded(&self) -> bool {
        matches!(self, Self::Data)
    }

    /// Whether this type is a single file rather than a directory of named
    /// objects. Only `config` is.
    pub fn is_single_file(&self) -> bool {
        matches!(self, Self::Config)
    }

    /// Types stored as directories, in repository-creation order.
    pub fn directories() -> impl Iterator<Item = ObjectType> {
        Self::ALL.into_iter().filter(|t| !t.is_single_file())
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidType(s.to_string()))
    }
}
