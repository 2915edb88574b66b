pub mod config;
pub mod error;

pub use config::{CacheConfig, Config, DatabaseConfig, ProviderConfig, ValidationResult};
pub use error::{
    CacheError, ConfigError, PersistenceError, ProviderError, ServiceError, ValidationError,
};

use anyhow::Result;

/// Initialize process-wide logging.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("vane core initialized");
    Ok(())
}
