// Configuration module entry point
// Loads startup configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, RoutesConfig, ServerConfig};

/// Config file used when none is given on the command line (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; `SERVER_*` environment variables override it
    /// (nested keys use `__`, e.g. `SERVER_SERVER__PORT=9000`).
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.root", ".")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("http.server_name", "precomp-server/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("routes.index_files", vec!["index.html", "index.htm"])?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| Error::InvalidAddress { addr, source })
    }

    /// Limit on waiting for request headers, `None` when disabled
    pub const fn header_read_timeout(&self) -> Option<Duration> {
        match self.performance.header_read_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
