use std::sync::Arc;

use rrs_protocol::AccessMode;
use rrs_store::ObjectStore;

use crate::access_log::AccessLog;
use crate::config::ServerConfig;
use crate::metrics::MetricsSink;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn ObjectStore>,
    pub metrics: Arc<dyn MetricsSink>,
    pub access_log: Option<AccessLog>,
}

impl AppState {
    pub fn new(
        config: Arc<ServerConfig>,
        store: Arc<dyn ObjectStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            store,
            metrics,
            access_log: None,
        }
    }

    pub fn with_access_log(mut self, log: AccessLog) -> Self {
        self.access_log = Some(log);
        self
    }

    pub fn access_mode(&self) -> AccessMode {
        self.config.access_mode()
    }

    pub fn debug(&self) -> bool {
        self.config.debug
    }
}
