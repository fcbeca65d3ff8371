use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use rrs_store::ObjectStore;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::access_log::AccessLog;
use crate::auth::CredentialValidator;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::htpasswd::HtpasswdFile;
use crate::metrics::{CounterMetrics, MetricsSink, NoopMetrics};
use crate::router::build_router;
use crate::state::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Restic REST repository server.
pub struct RrsServer {
    config: Arc<ServerConfig>,
    store: Arc<dyn ObjectStore>,
    metrics: Arc<dyn MetricsSink>,
    credentials: Option<Arc<dyn CredentialValidator>>,
}

impl RrsServer {
    /// Create a server over `store`. Authentication is off until
    /// credentials are attached.
    pub fn new(config: ServerConfig, store: Arc<dyn ObjectStore>) -> ServerResult<Self> {
        let metrics: Arc<dyn MetricsSink> = if config.metrics {
            Arc::new(CounterMetrics::new()?)
        } else {
            Arc::new(NoopMetrics)
        };
        Ok(Self {
            config: Arc::new(config),
            store,
            metrics,
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialValidator>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<dyn MetricsSink> {
        Arc::clone(&self.metrics)
    }

    fn state(&self) -> AppState {
        AppState::new(
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            Arc::clone(&self.metrics),
        )
    }

    /// Build the router without a request log (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state(), self.credentials.clone())
    }

    /// Serve until interrupted, over TLS when configured.
    pub async fn serve(self) -> ServerResult<()> {
        let tls = self.config.tls_settings()?;
        let mut state = self.state();
        if let Some(path) = &self.config.log_path {
            state = state.with_access_log(AccessLog::open(path).await?);
            info!(path = %path.display(), "request log enabled");
        }
        let app = build_router(state, self.credentials.clone())
            .into_make_service_with_connect_info::<SocketAddr>();
        let addr = self.config.bind_addr;

        match tls {
            Some(tls) => {
                let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                    .await
                    .map_err(|e| {
                        ServerError::Config(format!(
                            "failed to load TLS key {} / certificate {}: {e}",
                            tls.key_path.display(),
                            tls.cert_path.display()
                        ))
                    })?;
                let handle = axum_server::Handle::new();
                let on_signal = handle.clone();
                tokio::spawn(async move {
                    shutdown_signal().await;
                    on_signal.graceful_shutdown(Some(SHUTDOWN_GRACE));
                });
                info!(%addr, "listening on https://{addr}");
                axum_server::bind_rustls(addr, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                let listener = TcpListener::bind(addr).await?;
                info!(%addr, "listening on http://{addr}");
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await?;
            }
        }
        info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Load the credential file under the storage root, if there is one.
///
/// A missing file disables authentication; an unreadable one is an error.
pub fn load_credentials(config: &ServerConfig) -> ServerResult<Option<Arc<dyn CredentialValidator>>> {
    let path = config.credentials_path();
    match HtpasswdFile::load(&path) {
        Ok(file) => {
            info!(path = %path.display(), users = file.len(), "Authentication enabled");
            Ok(Some(Arc::new(file)))
        }
        Err(ServerError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            info!("Authentication disabled");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
