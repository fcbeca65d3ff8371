use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rrs_protocol::BasicCredentials;
use tracing::{debug, warn};

use crate::error::ServerError;

/// Decides whether a user name and password pair is acceptable.
///
/// The gate does not care where credentials live; a file, a map, or an
/// external service all work.
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, username: &str, password: &str) -> bool;
}

/// Plain in-memory credentials, for tests and embedding.
#[derive(Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }
}

impl CredentialValidator for StaticCredentials {
    fn validate(&self, username: &str, password: &str) -> bool {
        self.users.get(username).is_some_and(|p| p == password)
    }
}

/// Basic-auth credentials from the request headers, if any.
pub fn request_credentials(headers: &HeaderMap) -> Option<BasicCredentials> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(BasicCredentials::from_header)
}

/// User name for metric labels: the basic-auth user, or empty.
pub fn request_user(headers: &HeaderMap) -> String {
    request_credentials(headers)
        .map(|c| c.username)
        .unwrap_or_default()
}

/// Axum middleware that rejects requests without valid basic credentials
/// before any handler runs.
///
/// Validation may involve password hashing, so it runs on the blocking pool.
pub async fn basic_auth(
    State(validator): State<Arc<dyn CredentialValidator>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(creds) = request_credentials(req.headers()) else {
        debug!(uri = %req.uri(), "request without credentials");
        return ServerError::Unauthorized.into_response();
    };

    let username = creds.username.clone();
    let valid = tokio::task::spawn_blocking(move || {
        validator.validate(&creds.username, &creds.password)
    })
    .await
    .unwrap_or(false);

    if !valid {
        warn!(user = %username, "authentication failed");
        return ServerError::Unauthorized.into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn static_credentials() {
        let creds = StaticCredentials::new().with_user("alice", "pw");
        assert!(creds.validate("alice", "pw"));
        assert!(!creds.validate("alice", "nope"));
        assert!(!creds.validate("bob", "pw"));
    }

    #[test]
    fn user_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_user(&headers), "");

        let value = BasicCredentials {
            username: "alice".into(),
            password: "pw".into(),
        }
        .to_header();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        assert_eq!(request_user(&headers), "alice");
    }
}
