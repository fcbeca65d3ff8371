//! HTTP server for rrs.
//!
//! Serves restic repositories over the REST backend protocol from any
//! [`rrs_store::ObjectStore`], with optional basic authentication,
//! append-only mode, a request log and Prometheus counters.

pub mod access_log;
pub mod auth;
pub mod body;
pub mod config;
pub mod error;
pub mod handlers;
pub mod htpasswd;
pub mod metrics;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{CredentialValidator, StaticCredentials};
pub use config::{parse_listen_addr, ServerConfig, TlsConfig};
pub use error::{ServerError, ServerResult};
pub use htpasswd::{hash_password, htpasswd_line, HtpasswdFile};
pub use metrics::{CounterMetrics, MetricLabels, MetricsSink, NoopMetrics};
pub use server::{load_credentials, RrsServer};
pub use state::AppState;
