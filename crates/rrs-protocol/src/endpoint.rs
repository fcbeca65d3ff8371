/// Fixed paths and parameters of the REST protocol.
pub mod endpoints {
    /// Prometheus scrape endpoint, served only when metrics are enabled.
    pub const METRICS: &str = "/metrics";
    /// Query parameter confirming repository creation.
    pub const CREATE_PARAM: &str = "create";
    /// The only value of [`CREATE_PARAM`] that confirms creation.
    pub const CREATE_CONFIRM: &str = "true";
    /// Credential file looked up under the storage root.
    pub const CREDENTIALS_FILE: &str = ".htpasswd";
    /// Realm announced in basic-auth challenges.
    pub const AUTH_REALM: &str = "restic";
    /// Default TLS key file name under the storage root.
    pub const TLS_KEY_FILE: &str = "private_key";
    /// Default TLS certificate file name under the storage root.
    pub const TLS_CERT_FILE: &str = "public_key";
}

pub use crate::resolve::SHARD_COUNT;

/// Whether the `create` query parameter confirms repository creation.
///
/// Only the literal string `true` counts.
pub fn is_create_confirmed(create: Option<&str>) -> bool {
    create == Some(endpoints::CREATE_CONFIRM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_confirmation_is_literal() {
        assert!(is_create_confirmed(Some("true")));
        assert!(!is_create_confirmed(Some("True")));
        assert!(!is_create_confirmed(Some("1")));
        assert!(!is_create_confirmed(Some("")));
        assert!(!is_create_confirmed(None));
    }

    #[test]
    fn endpoint_constants() {
        assert_eq!(endpoints::METRICS, "/metrics");
        assert_eq!(endpoints::CREDENTIALS_FILE, ".htpasswd");
        assert_eq!(SHARD_COUNT, 256);
    }
}
