//! HTTP server wiring.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use autodeck_core::Orchestrator;

use crate::routes::create_router;
use crate::state::AppState;

/// Listen address configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8320,
        }
    }
}

/// The API server. Owns the shared state handed to every route.
pub struct ApiServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            state: Arc::new(AppState::new(orchestrator)),
        }
    }

    /// The configured listen address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Bind and serve until the process exits.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let app = create_router(self.state.clone());

        let addr: SocketAddr = self.addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("api server listening on {addr}");
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodeck_core::mock_provider::MockProvider;
    use autodeck_core::{MemoryWorkflowStore, OrchestratorConfig};

    fn test_orchestrator() -> Arc<Orchestrator> {
        Orchestrator::new(
            Arc::new(MockProvider::new()),
            Arc::new(MemoryWorkflowStore::new()),
            OrchestratorConfig::default(),
        )
    }

    #[test]
    fn test_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8320);
    }

    #[test]
    fn test_config_new() {
        let config = ApiConfig::new("0.0.0.0", 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_server_addr_format() {
        let server = ApiServer::new(ApiConfig::new("192.168.1.7", 443), test_orchestrator());
        assert_eq!(server.addr(), "192.168.1.7:443");
    }

    #[test]
    fn test_server_default_addr() {
        let server = ApiServer::new(ApiConfig::default(), test_orchestrator());
        assert_eq!(server.addr(), "127.0.0.1:8320");
    }
}
