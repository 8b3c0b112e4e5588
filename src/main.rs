//! CrudKit server entry point.
//!
//! Loads configuration, initializes logging and serves the API.

use std::backtrace::Backtrace;

use tracing_subscriber::{EnvFilter, fmt};

use crudkit_core::config::{AppConfig, Environment};
use crudkit_core::error::AppError;

/// Environment variable selecting the `config/{env}.toml` overlay.
const ENV_VAR: &str = "CRUDKIT_ENV";

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    install_panic_hook();

    if let Err(e) = crudkit_api::run_server(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration for the environment named by `CRUDKIT_ENV`.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = match std::env::var(ENV_VAR) {
        Ok(name) => name.parse::<Environment>()?,
        Err(_) => Environment::default(),
    };
    AppConfig::load(env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.is_json() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Log panics with a full backtrace before the HTTP layer answers them.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        tracing::error!(panic = %info, backtrace = %backtrace, "Unhandled panic");
    }));
}
