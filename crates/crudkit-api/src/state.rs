//! Application state shared across all handlers and middleware.

use std::fmt;
use std::sync::Arc;

use crudkit_core::config::AppConfig;
use crudkit_core::traits::SessionFactory;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Opens one storage session per request
    pub sessions: Arc<dyn SessionFactory>,
}

impl AppState {
    /// Creates the state from loaded configuration and an opened store.
    pub fn new(config: AppConfig, sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.config.environment)
            .field("backend", &self.sessions.backend())
            .finish()
    }
}
