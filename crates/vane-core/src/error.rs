//! Centralized error types for the vane weather service.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the pipeline
//! - Provides user-friendly messages suitable for API responses
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level service error type.
///
/// All errors raised by the weather pipeline are convertible to this type.
/// Use `user_message()` to get a response-appropriate message.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    /// Returns a user-friendly message suitable for an API error body.
    pub fn user_message(&self) -> &'static str {
        match self {
            ServiceError::Validation(e) => e.user_message(),
            ServiceError::Config(e) => e.user_message(),
            ServiceError::Provider(e) => e.user_message(),
            ServiceError::Persistence(e) => e.user_message(),
            ServiceError::Cache(e) => e.user_message(),
            ServiceError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Request validation errors (missing or unusable coordinates).
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Latitude absent, or exactly zero. Zero is treated as missing; the
    /// equator is rejected at this boundary.
    #[error("latitude is missing")]
    MissingLatitude,

    /// Longitude absent, or exactly zero.
    #[error("longitude is missing")]
    MissingLongitude,

    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::MissingLatitude => "Latitude is required.",
            ValidationError::MissingLongitude => "Longitude is required.",
            ValidationError::NotFinite { .. } => "Coordinates must be finite numbers.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::Parse(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Upstream weather provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a status other than 200.
    #[error("weather cannot fetch, status code: {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid provider payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::Status(status) if *status >= 500 => {
                "The weather provider is experiencing issues. Please try again later."
            }
            ProviderError::Status(_) => "The weather provider rejected the request.",
            ProviderError::Network(_) => "Unable to reach the weather provider.",
            ProviderError::Decode(_) => "The weather provider returned an unexpected response.",
        }
    }
}

/// Relational store errors. Any failure during the aggregate write rolls
/// the whole transaction back before this error surfaces.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl PersistenceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            PersistenceError::ConnectionFailed(_) => {
                "Unable to access weather storage. Try again later."
            }
            PersistenceError::QueryFailed(_) => "Saving weather data failed. Please try again.",
            PersistenceError::Corruption(_) => {
                "Weather storage may be corrupted. Contact the operator."
            }
        }
    }
}

/// Cache errors. `NotConfigured` is fatal at construction time; `Backend`
/// covers runtime I/O failures of the backing store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cache backend configured")]
    NotConfigured,

    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CacheError::NotConfigured => "The service cache is not configured.",
            CacheError::Backend(_) => "Cached weather data is unavailable.",
        }
    }
}

/// Extension trait for converting reqwest errors to provider errors.
pub trait ReqwestErrorExt {
    fn into_provider_error(self) -> ProviderError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_provider_error(self) -> ProviderError {
        ProviderError::Network(self)
    }
}

/// Extension trait for converting rusqlite errors to persistence errors.
pub trait RusqliteErrorExt {
    fn into_persistence_error(self) -> PersistenceError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_persistence_error(self) -> PersistenceError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                PersistenceError::Corruption(self.to_string())
            }
            _ => PersistenceError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_conversion() {
        let err: ServiceError = ValidationError::MissingLatitude.into();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::MissingLatitude)
        ));
    }

    #[test]
    fn test_provider_status_message() {
        let err = ProviderError::Status(500);
        assert_eq!(err.to_string(), "weather cannot fetch, status code: 500");
        assert!(err.user_message().contains("provider"));
    }

    #[test]
    fn test_user_message_propagation() {
        let err = ServiceError::Validation(ValidationError::MissingLatitude);
        assert_eq!(err.user_message(), "Latitude is required.");

        let err = ServiceError::Cache(CacheError::NotConfigured);
        assert_eq!(err.user_message(), "The service cache is not configured.");
    }

    #[test]
    fn test_rusqlite_error_mapping() {
        let err = rusqlite::Error::QueryReturnedNoRows.into_persistence_error();
        assert!(matches!(err, PersistenceError::QueryFailed(_)));
    }
}
