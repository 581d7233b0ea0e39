//! In-memory election system
//!
//! Candidate registration, voter registration, vote casting and tallying,
//! gated by a four-phase election lifecycle.

pub mod audit;
pub mod auth;
pub mod config;
pub mod console;
pub mod election;
pub mod errors;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use election::Election;
pub use errors::{Error, Result};

use config::LoggingConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default filter
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "election=info".into()),
        )
        .try_init()
        .map_err(|e| Error::internal(format!("Logging already initialized: {e}")))?;

    tracing::info!("🗳️  Election system v{} initialized", VERSION);
    Ok(())
}

/// Initialize logging from configuration
///
/// `RUST_LOG` still takes precedence over the configured level.
pub fn init_with(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("election={}", logging.level).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format.as_str() {
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
    installed.map_err(|e| Error::internal(format!("Logging already initialized: {e}")))?;

    tracing::info!("🗳️  Election system v{} initialized", VERSION);
    Ok(())
}
