//! Canonical storage paths for repository objects.
//!
//! Resolution is a pure function of (repository, type, name). Paths are
//! slash-joined with `.` components collapsed, so objects of the root
//! repository resolve to `data/ab/ab12…` rather than `./data/ab/ab12…`.

use crate::error::ProtocolResult;
use crate::object_type::ObjectType;
use crate::validate::{validate_name, validate_segment, validate_type};

/// Repository prefix naming the storage root.
pub const ROOT: &str = ".";

/// Number of shard directories under `data`.
pub const SHARD_COUNT: usize = 256;

/// Join path components, dropping empty and `.` components.
///
/// Returns [`ROOT`] when nothing remains.
fn join(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|c| !c.is_empty() && *c != ".")
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ROOT.to_string()
    } else {
        joined
    }
}

fn check_repo(repo: &str) -> ProtocolResult<()> {
    if repo == ROOT {
        Ok(())
    } else {
        validate_segment(repo)
    }
}

/// The shard directory for a sharded name: its first two characters.
pub fn shard_prefix(name: &str) -> ProtocolResult<&str> {
    validate_name(ObjectType::Data, name)?;
    let end = name
        .char_indices()
        .nth(2)
        .map_or(name.len(), |(i, _)| i);
    Ok(&name[..end])
}

/// Path of a type's directory (or of the config file) inside `repo`.
pub fn resolve_type_path(repo: &str, object_type: &str) -> ProtocolResult<String> {
    let t = validate_type(object_type)?;
    check_repo(repo)?;
    Ok(join(&[repo, t.as_str()]))
}

/// Path of a named object inside `repo`.
///
/// `data` names are placed in the shard directory named after their first
/// two characters; every other type stores names directly under the type
/// directory.
pub fn resolve_blob_path(repo: &str, object_type: &str, name: &str) -> ProtocolResult<String> {
    let t = validate_type(object_type)?;
    check_repo(repo)?;
    validate_name(t, name)?;
    if t.is_sharded() {
        let shard = shard_prefix(name)?;
        Ok(join(&[repo, t.as_str(), shard, name]))
    } else {
        Ok(join(&[repo, t.as_str(), name]))
    }
}

/// The 256 shard directory names, `00` through `ff`.
pub fn shard_names() -> impl Iterator<Item = String> {
    (0..SHARD_COUNT).map(|i| format!("{i:02x}"))
}

/// Directories created by repository initialisation, in creation order:
/// the repository root, every non-config type directory, then every shard
/// under `data`.
pub fn repository_layout(repo: &str) -> ProtocolResult<Vec<String>> {
    check_repo(repo)?;
    let mut dirs = Vec::with_capacity(1 + 5 + SHARD_COUNT);
    dirs.push(join(&[repo]));
    for t in ObjectType::directories() {
        dirs.push(join(&[repo, t.as_str()]));
    }
    let data = ObjectType::Data.as_str();
    for shard in shard_names() {
        dirs.push(join(&[repo, data, &shard]));
    }
    Ok(dirs)
}
