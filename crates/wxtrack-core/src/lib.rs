pub mod config;
pub mod error;

pub use config::{
    AliasConfig, Config, ConfigIssue, DatabaseConfig, LoggingConfig, StorageBackend,
    TrackingConfig, ValidationResult, MAX_REFRESH_HOURS, MAX_RETENTION_DAYS,
};
pub use error::{AppError, ConfigError, DatabaseError, RusqliteErrorExt};

use anyhow::Result;

/// Initialize logging.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("wxtrack core initialized");
    Ok(())
}
