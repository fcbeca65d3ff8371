//! File-backed credentials in htpasswd format.
//!
//! Each non-empty, non-comment line is `user:hash`. Supported hashes:
//! - Argon2 PHC strings (`$argon2id$v=19$…`), as produced by [`hash_password`]
//! - `{SHA256}` followed by the base64 SHA-256 digest of the password
//!
//! Lines with any other scheme are kept but never validate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::auth::CredentialValidator;
use crate::error::{ServerError, ServerResult};

const SHA256_PREFIX: &str = "{SHA256}";

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 under a random key that never leaves the process.
///
/// Secrets are only held as tags, and tags are compared in constant time.
struct SecretKey([u8; 32]);

impl SecretKey {
    fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    fn mac(&self, data: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("HMAC key length ok");
        mac.update(data);
        mac
    }

    fn tag(&self, data: &[u8]) -> [u8; 32] {
        self.mac(data).finalize().into_bytes().into()
    }

    fn matches(&self, data: &[u8], tag: &[u8]) -> bool {
        self.mac(data).verify_slice(tag).is_ok()
    }
}

#[derive(Clone, Debug)]
enum StoredHash {
    Argon2(String),
    /// Tag of the stored SHA-256 digest.
    Sha256([u8; 32]),
    Unsupported,
}

impl StoredHash {
    fn parse(hash: &str, key: &SecretKey) -> Self {
        if hash.starts_with("$argon2") {
            Self::Argon2(hash.to_string())
        } else if let Some(b64) = hash.strip_prefix(SHA256_PREFIX) {
            match STANDARD.decode(b64) {
                Ok(digest) if digest.len() == 32 => Self::Sha256(key.tag(&digest)),
                _ => Self::Unsupported,
            }
        } else {
            Self::Unsupported
        }
    }

    fn verify(&self, password: &str, key: &SecretKey) -> bool {
        match self {
            Self::Argon2(phc) => match PasswordHash::new(phc) {
                Ok(parsed) => Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
                Err(_) => false,
            },
            Self::Sha256(tag) => key.matches(&Sha256::digest(password.as_bytes()), tag),
            Self::Unsupported => false,
        }
    }
}

/// Credentials loaded from an htpasswd file.
///
/// Successful verifications are cached as keyed tags of the password so
/// repeated requests skip the Argon2 work.
pub struct HtpasswdFile {
    key: SecretKey,
    users: HashMap<String, StoredHash>,
    verified: Mutex<HashMap<String, [u8; 32]>>,
}

impl HtpasswdFile {
    /// Load and parse the file at `path`.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// Parse htpasswd content. Malformed lines are skipped with a warning.
    pub fn parse(contents: &str) -> Self {
        let key = SecretKey::generate();
        let mut users = HashMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once(':') {
                Some((user, hash)) if !user.is_empty() => {
                    let stored = StoredHash::parse(hash, &key);
                    if matches!(stored, StoredHash::Unsupported) {
                        warn!(line = lineno + 1, user, "unsupported password hash scheme");
                    }
                    users.insert(user.to_string(), stored);
                }
                _ => warn!(line = lineno + 1, "malformed htpasswd line"),
            }
        }
        Self {
            key,
            users,
            verified: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn contains_user(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    fn is_cached(&self, username: &str, password: &str) -> bool {
        let verified = self.verified.lock().expect("lock poisoned");
        verified
            .get(username)
            .is_some_and(|tag| self.key.matches(password.as_bytes(), tag))
    }
}

impl CredentialValidator for HtpasswdFile {
    fn validate(&self, username: &str, password: &str) -> bool {
        let Some(stored) = self.users.get(username) else {
            return false;
        };
        if self.is_cached(username, password) {
            return true;
        }
        if !stored.verify(password, &self.key) {
            return false;
        }
        let tag = self.key.tag(password.as_bytes());
        self.verified
            .lock()
            .expect("lock poisoned")
            .insert(username.to_string(), tag);
        true
    }
}

/// Hash a password with Argon2id into a PHC string.
pub fn hash_password(password: &str) -> ServerResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServerError::Internal(format!("failed to hash password: {e}")))
}

/// Build an htpasswd line for `username`.
pub fn htpasswd_line(username: &str, password: &str) -> ServerResult<String> {
    if username.is_empty() || username.contains(':') {
        return Err(ServerError::BadRequest(format!(
            "invalid user name {username:?}"
        )));
    }
    Ok(format!("{username}:{}", hash_password(password)?))
}
