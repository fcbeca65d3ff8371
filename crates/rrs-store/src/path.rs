//! Store path normalisation shared by all backends.
//!
//! Store paths are slash-separated and relative to the store root. The root
//! itself is spelled `.` (or the empty string).

use crate::error::{StoreError, StoreResult};

/// Normalise a store path into its components.
///
/// Empty and `.` components are dropped, so `./data//ab` becomes
/// `["data", "ab"]` and `.` becomes `[]`. A `..` component is rejected.
pub fn components(path: &str) -> StoreResult<Vec<&str>> {
    let mut out = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                return Err(StoreError::InvalidPath {
                    path: path.to_string(),
                    reason: "parent directory components are not allowed".into(),
                })
            }
            p if p.contains('\0') || p.contains('\\') => {
                return Err(StoreError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("component contains a forbidden character: {p:?}"),
                })
            }
            p => out.push(p),
        }
    }
    Ok(out)
}

/// Normalise a store path into its canonical string form.
///
/// The root normalises to the empty string.
pub fn normalize(path: &str) -> StoreResult<String> {
    Ok(components(path)?.join("/"))
}

/// Join a normalised directory and a child name.
pub fn child(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// The parent of a normalised path, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map_or("", |(dir, _)| dir))
}

/// The final component of a path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
