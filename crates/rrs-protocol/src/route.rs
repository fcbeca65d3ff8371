//! Request routing.
//!
//! A request path has an optional leading repository segment. Routing
//! resolves it once into a [`Route`] whose `repo` field says explicitly
//! whether a repository was named, so handlers never re-inspect the path.
//!
//! | verb          | path                     | operation            |
//! |---------------|--------------------------|----------------------|
//! | HEAD/GET/POST/DELETE | `/[repo/]config`  | config object        |
//! | GET           | `/[repo/]type/`          | list                 |
//! | HEAD/GET/POST/DELETE | `/[repo/]type/name` | named object       |
//! | POST          | `/[repo][/]`             | create repository    |
//!
//! A two-segment path ending in `config` is the config of a repository,
//! never an object called `config`.

use crate::object_type::ObjectType;
use crate::resolve::ROOT;

/// The HTTP verbs the protocol uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Head,
    Get,
    Post,
    Delete,
}

/// The object an operation targets: the config file, or a named object of
/// some type. The type segment is kept verbatim; it is validated during
/// path resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    pub object_type: String,
    pub name: Option<String>,
}

impl ObjectRef {
    pub fn config() -> Self {
        Self {
            object_type: ObjectType::Config.as_str().to_string(),
            name: None,
        }
    }

    pub fn blob(object_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            name: Some(name.into()),
        }
    }

    pub fn is_config(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    CheckExists(ObjectRef),
    Get(ObjectRef),
    Put(ObjectRef),
    Delete(ObjectRef),
    List { object_type: String },
    CreateRepository,
}

impl Operation {
    /// Name used in diagnostic logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckExists(r) if r.is_config() => "CheckConfig",
            Self::CheckExists(_) => "CheckBlob",
            Self::Get(r) if r.is_config() => "GetConfig",
            Self::Get(_) => "GetBlob",
            Self::Put(r) if r.is_config() => "SaveConfig",
            Self::Put(_) => "SaveBlob",
            Self::Delete(r) if r.is_config() => "DeleteConfig",
            Self::Delete(_) => "DeleteBlob",
            Self::List { .. } => "ListBlobs",
            Self::CreateRepository => "CreateRepo",
        }
    }

    /// The raw type segment the operation addresses, if any.
    pub fn object_type(&self) -> Option<&str> {
        match self {
            Self::CheckExists(r) | Self::Get(r) | Self::Put(r) | Self::Delete(r) => {
                Some(&r.object_type)
            }
            Self::List { object_type } => Some(object_type),
            Self::CreateRepository => None,
        }
    }

    fn on_object(verb: Verb, target: ObjectRef) -> Self {
        match verb {
            Verb::Head => Self::CheckExists(target),
            Verb::Get => Self::Get(target),
            Verb::Post => Self::Put(target),
            Verb::Delete => Self::Delete(target),
        }
    }
}

/// A routed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// The repository segment, or `None` for the storage root.
    pub repo: Option<String>,
    pub operation: Operation,
}

impl Route {
    /// Route a request path. Returns `None` when no route matches.
    ///
    /// Segments are percent-decoded; the query string must already have
    /// been stripped.
    pub fn parse(verb: Verb, path: &str) -> Option<Route> {
        let rest = path.strip_prefix('/')?;
        let segments = rest
            .split('/')
            .map(|s| urlencoding::decode(s).ok().map(|c| c.into_owned()))
            .collect::<Option<Vec<String>>>()?;
        let segs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let config = ObjectType::Config.as_str();

        let (repo, operation) = match (verb, segs.as_slice()) {
            (v, [c]) if *c == config => (None, Operation::on_object(v, ObjectRef::config())),
            (v, [repo, c]) if *c == config => {
                (Some(*repo), Operation::on_object(v, ObjectRef::config()))
            }
            (Verb::Get, [ty, ""]) if !ty.is_empty() => (
                None,
                Operation::List {
                    object_type: ty.to_string(),
                },
            ),
            (Verb::Get, [repo, ty, ""]) if !repo.is_empty() && !ty.is_empty() => (
                Some(*repo),
                Operation::List {
                    object_type: ty.to_string(),
                },
            ),
            (Verb::Post, [""]) => (None, Operation::CreateRepository),
            (Verb::Post, [repo]) | (Verb::Post, [repo, ""]) => {
                (Some(*repo), Operation::CreateRepository)
            }
            (v, [ty, name]) if !ty.is_empty() && !name.is_empty() => {
                (None, Operation::on_object(v, ObjectRef::blob(*ty, *name)))
            }
            (v, [repo, ty, name]) if !repo.is_empty() && !ty.is_empty() && !name.is_empty() => (
                Some(*repo),
                Operation::on_object(v, ObjectRef::blob(*ty, *name)),
            ),
            _ => return None,
        };

        Some(Route {
            repo: repo.map(str::to_string),
            operation,
        })
    }

    /// The repository prefix for path resolution: the repository segment,
    /// or [`ROOT`].
    pub fn repo_prefix(&self) -> &str {
        self.repo.as_deref().unwrap_or(ROOT)
    }

    /// The type label for metrics; empty for repository creation.
    pub fn type_label(&self) -> &str {
        self.operation.object_type().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(verb: Verb, path: &str) -> Route {
        Route::parse(verb, path).unwrap_or_else(|| panic!("no route for {verb:?} {path}"))
    }

    #[test]
    fn config_routes() {
        let r = route(Verb::Head, "/config");
        assert_eq!(r.repo, None);
        assert_eq!(r.operation, Operation::CheckExists(ObjectRef::config()));

        let r = route(Verb::Delete, "/repo/config");
        assert_eq!(r.repo.as_deref(), Some("repo"));
        assert_eq!(r.operation, Operation::Delete(ObjectRef::config()));
        assert_eq!(r.operation.name(), "DeleteConfig");
    }

    #[test]
    fn two_segment_config_is_repo_config() {
        let r = route(Verb::Get, "/data/config");
        assert_eq!(r.repo.as_deref(), Some("data"));
        assert_eq!(r.operation, Operation::Get(ObjectRef::config()));
    }

    #[test]
    fn list_routes() {
        let r = route(Verb::Get, "/snapshots/");
        assert_eq!(r.repo, None);
        assert_eq!(
            r.operation,
            Operation::List {
                object_type: "snapshots".into()
            }
        );

        let r = route(Verb::Get, "/repo/data/");
        assert_eq!(r.repo.as_deref(), Some("repo"));
        assert_eq!(r.type_label(), "data");
    }

    #[test]
    fn blob_routes() {
        let r = route(Verb::Post, "/data/ab12");
        assert_eq!(r.repo, None);
        assert_eq!(r.operation, Operation::Put(ObjectRef::blob("data", "ab12")));
        assert_eq!(r.operation.name(), "SaveBlob");

        let r = route(Verb::Head, "/repo/locks/l1");
        assert_eq!(r.repo_prefix(), "repo");
        assert_eq!(r.operation, Operation::CheckExists(ObjectRef::blob("locks", "l1")));
    }

    #[test]
    fn create_routes() {
        assert_eq!(route(Verb::Post, "/").operation, Operation::CreateRepository);
        assert_eq!(route(Verb::Post, "/").repo_prefix(), ROOT);
        let r = route(Verb::Post, "/repo");
        assert_eq!(r.repo.as_deref(), Some("repo"));
        assert_eq!(r.operation, Operation::CreateRepository);
        assert_eq!(route(Verb::Post, "/repo/").operation, Operation::CreateRepository);
        assert_eq!(route(Verb::Post, "/repo/").type_label(), "");
    }

    #[test]
    fn post_to_type_with_slash_is_create() {
        let r = route(Verb::Post, "/data/");
        assert_eq!(r.repo.as_deref(), Some("data"));
        assert_eq!(r.operation, Operation::CreateRepository);
    }

    #[test]
    fn percent_decoding() {
        let r = route(Verb::Get, "/my%20repo/keys/k%31");
        assert_eq!(r.repo.as_deref(), Some("my repo"));
        assert_eq!(r.operation, Operation::Get(ObjectRef::blob("keys", "k1")));
    }

    #[test]
    fn unmatched_routes() {
        assert!(Route::parse(Verb::Get, "/").is_none());
        assert!(Route::parse(Verb::Delete, "/repo").is_none());
        assert!(Route::parse(Verb::Get, "/a/b/c/d").is_none());
        assert!(Route::parse(Verb::Head, "/data/").is_none());
        assert!(Route::parse(Verb::Get, "//data/x").is_none());
        assert!(Route::parse(Verb::Get, "no-slash").is_none());
    }

    #[test]
    fn unknown_types_still_route() {
        // Type validation happens during resolution, not routing.
        let r = route(Verb::Get, "/bogus/x");
        assert_eq!(r.type_label(), "bogus");
    }
}
