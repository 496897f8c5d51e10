// Application state module
// Shared, read-only runtime state handed to every connection

use std::path::PathBuf;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Serving root, resolved once at startup
    pub root: PathBuf,
}

impl AppState {
    /// Create `AppState`, canonicalizing the serving root when possible
    ///
    /// A root that cannot be canonicalized is kept as configured; the file
    /// responder then answers 404 for every request under it.
    pub fn new(config: &Config) -> Self {
        let root = config
            .server
            .root
            .canonicalize()
            .unwrap_or_else(|_| config.server.root.clone());

        Self {
            config: config.clone(),
            root,
        }
    }

    pub fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
