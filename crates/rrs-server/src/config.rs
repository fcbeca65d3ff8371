use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rrs_protocol::{endpoints, AccessMode};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Process-wide server configuration.
///
/// Built once at startup and shared read-only with every request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Storage root. Also where the credential file and default TLS files
    /// are looked up.
    pub root: PathBuf,
    /// Append requests in combined log format to this file.
    pub log_path: Option<PathBuf>,
    pub tls: bool,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub append_only: bool,
    pub metrics: bool,
    /// Log every operation and the underlying cause of failures.
    pub debug: bool,
    /// Longest wait, in seconds, for the next chunk of a request or
    /// response body. `None` or 0 disables it.
    pub idle_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            root: PathBuf::from("/tmp/restic"),
            log_path: None,
            tls: false,
            tls_cert: None,
            tls_key: None,
            append_only: false,
            metrics: false,
            debug: false,
            idle_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn access_mode(&self) -> AccessMode {
        AccessMode::from_append_only(self.append_only)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    /// Location of the optional credential file.
    pub fn credentials_path(&self) -> PathBuf {
        self.root.join(endpoints::CREDENTIALS_FILE)
    }

    /// Resolve the TLS key and certificate paths.
    ///
    /// Returns `None` when TLS is off. With TLS on, unset paths default to
    /// `private_key` and `public_key` under the storage root. Supplying
    /// either path with TLS off is an error.
    pub fn tls_settings(&self) -> ServerResult<Option<TlsConfig>> {
        if !self.tls {
            if self.tls_key.is_some() || self.tls_cert.is_some() {
                return Err(ServerError::Config(
                    "TLS key or certificate given but TLS is not enabled".into(),
                ));
            }
            return Ok(None);
        }
        let key_path = self
            .tls_key
            .clone()
            .unwrap_or_else(|| self.root.join(endpoints::TLS_KEY_FILE));
        let cert_path = self
            .tls_cert
            .clone()
            .unwrap_or_else(|| self.root.join(endpoints::TLS_CERT_FILE));
        Ok(Some(TlsConfig {
            cert_path,
            key_path,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Parse a listen address. A bare `:port` binds all interfaces.
pub fn parse_listen_addr(s: &str) -> ServerResult<SocketAddr> {
    let full = if s.starts_with(':') {
        format!("0.0.0.0{s}")
    } else {
        s.to_string()
    };
    full.parse()
        .map_err(|e| ServerError::Config(format!("invalid listen address {s:?}: {e}")))
}
