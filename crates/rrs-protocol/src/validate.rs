//! Request validation ahead of path resolution.
//!
//! Path segments taken from a request (repository name, object name) must:
//! - Be non-empty
//! - Not be `.` or `..`
//! - Not contain `/`, `\` or NUL
//!
//! Names of sharded types must additionally be at least
//! [`MIN_SHARDED_NAME_LEN`] characters long.

use crate::error::{ProtocolError, ProtocolResult};
use crate::object_type::ObjectType;

/// Minimum length of a name whose type is sharded.
pub const MIN_SHARDED_NAME_LEN: usize = 2;

/// Characters that are forbidden anywhere in a path segment.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0'];

/// Confirm that `s` names one of the six object types.
pub fn validate_type(s: &str) -> ProtocolResult<ObjectType> {
    s.parse()
}

/// Validate a single path segment taken from a request.
pub fn validate_segment(segment: &str) -> ProtocolResult<()> {
    if segment.is_empty() {
        return Err(ProtocolError::InvalidSegment {
            segment: segment.to_string(),
            reason: "segment must not be empty".into(),
        });
    }

    if segment == "." || segment == ".." {
        return Err(ProtocolError::InvalidSegment {
            segment: segment.to_string(),
            reason: "relative directory references are not allowed".into(),
        });
    }

    for ch in FORBIDDEN_CHARS {
        if segment.contains(*ch) {
            return Err(ProtocolError::InvalidSegment {
                segment: segment.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    Ok(())
}

/// Validate a repository segment. `None` (the storage root) is always valid.
pub fn validate_repo(repo: Option<&str>) -> ProtocolResult<()> {
    match repo {
        Some(r) => validate_segment(r),
        None => Ok(()),
    }
}

/// Validate an object name for the given type.
///
/// The length rule for sharded types is checked first, so a one-character
/// `data` name is reported as too short rather than as a bad segment.
pub fn validate_name(object_type: ObjectType, name: &str) -> ProtocolResult<()> {
    if object_type.is_single_file() {
        return Err(ProtocolError::NotACollection(object_type.to_string()));
    }
    if object_type.is_sharded() && name.chars().count() < MIN_SHARDED_NAME_LEN {
        return Err(ProtocolError::NameTooShort {
            name: name.to_string(),
            min: MIN_SHARDED_NAME_LEN,
        });
    }
    validate_segment(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_segments() {
        assert!(validate_segment("myrepo").is_ok());
        assert!(validate_segment("host-01.backup").is_ok());
        assert!(validate_segment("ab12cd").is_ok());
        assert!(validate_segment("...").is_ok());
    }

    #[test]
    fn reject_empty_segment() {
        assert!(validate_segment("").is_err());
    }

    #[test]
    fn reject_dot_segments() {
        assert!(validate_segment(".").is_err());
        assert!(validate_segment("..").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        assert!(validate_segment("a/b").is_err());
        assert!(validate_segment("a\\b").is_err());
        assert!(validate_segment("a\0b").is_err());
    }

    #[test]
    fn root_repo_is_valid() {
        assert!(validate_repo(None).is_ok());
        assert!(validate_repo(Some("..")).is_err());
    }

    #[test]
    fn short_data_names() {
        assert_eq!(
            validate_name(ObjectType::Data, "a"),
            Err(ProtocolError::NameTooShort { name: "a".into(), min: 2 })
        );
        assert!(matches!(
            validate_name(ObjectType::Data, ""),
            Err(ProtocolError::NameTooShort { .. })
        ));
        assert!(validate_name(ObjectType::Data, "ab").is_ok());
    }

    #[test]
    fn short_names_allowed_for_unsharded_types() {
        assert!(validate_name(ObjectType::Locks, "a").is_ok());
        assert!(validate_name(ObjectType::Keys, "k").is_ok());
    }

    #[test]
    fn config_has_no_names() {
        assert_eq!(
            validate_name(ObjectType::Config, "x"),
            Err(ProtocolError::NotACollection("config".into()))
        );
    }

    #[test]
    fn type_whitelist() {
        assert_eq!(validate_type("index").unwrap(), ObjectType::Index);
        assert!(validate_type("tmp").is_err());
    }
}
