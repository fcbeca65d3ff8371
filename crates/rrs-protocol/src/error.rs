use thiserror::Error;

/// Errors raised while mapping a request onto the repository layout.
///
/// All variants are caused by the client and are reported as bad requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid object type: {0:?}")]
    InvalidType(String),

    #[error("object name {name:?} is too short for a sharded type (min {min})")]
    NameTooShort { name: String, min: usize },

    #[error("object type {0} is a single file and has no named entries")]
    NotACollection(String),

    #[error("invalid path segment {segment:?}: {reason}")]
    InvalidSegment { segment: String, reason: String },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
