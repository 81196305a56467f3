//! Application state for the API server

use pool_core::LedgerService;
use std::env;
use std::sync::Arc;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Ledger service
    pub service: Arc<LedgerService>,
    /// API version
    pub version: String,
}

impl AppState {
    pub fn new(service: Arc<LedgerService>) -> Self {
        Self {
            service,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - POOL_API_HOST: bind host
    /// - POOL_API_PORT: bind port
    /// - POOL_API_ENABLE_CORS: "true"/"false"
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = env::var("POOL_API_HOST").unwrap_or(defaults.host);
        let port = env::var("POOL_API_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let enable_cors = env::var("POOL_API_ENABLE_CORS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.enable_cors);

        Self {
            host,
            port,
            enable_cors,
        }
    }
}
