use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Credentials carried in an `Authorization: Basic …` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    /// Decode an `Authorization` header value.
    ///
    /// Returns `None` if the scheme is not `Basic`, the payload is not valid
    /// base64/UTF-8, or there is no `:` separator.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, payload) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(payload.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Encode as an `Authorization` header value.
    pub fn to_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_basic_header() {
        // "alice:s3cr:et"
        let creds = BasicCredentials::from_header("Basic YWxpY2U6czNjcjpldA==").unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "s3cr:et");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let creds = BasicCredentials {
            username: "bob".into(),
            password: "pw".into(),
        };
        let header = creds.to_header().replacen("Basic", "basic", 1);
        assert_eq!(BasicCredentials::from_header(&header), Some(creds));
    }

    #[test]
    fn reject_other_schemes() {
        assert!(BasicCredentials::from_header("Bearer abc").is_none());
        assert!(BasicCredentials::from_header("Basic").is_none());
        assert!(BasicCredentials::from_header("Basic !!!").is_none());
        // "nocolon"
        assert!(BasicCredentials::from_header("Basic bm9jb2xvbg==").is_none());
    }

    #[test]
    fn debug_redacts_password() {
        let creds = BasicCredentials {
            username: "u".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
