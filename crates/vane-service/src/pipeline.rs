//! The fetch-cache-persist pipeline.
//!
//! One invocation runs: Validating → CacheLookup → {CacheHit | Fetching} →
//! Persisting → Done, failing out of any step with a typed error.
//! Invocations are independent; concurrent misses for the same coordinate
//! may both reach the provider and race to fill the cache (last write
//! wins — there is no single-flight coalescing).

use vane_core::{Config, ProviderError, ServiceError, ValidationError};
use vane_store::{WeatherAggregate, WeatherStore};
use vane_weather::{CacheClient, TimelineClient, TimelinePayload, WEATHER_TTL_SECS};

/// Orchestrates the provider client, the response cache, and the
/// relational store for one coordinate lookup.
#[derive(Clone)]
pub struct WeatherPipeline {
    provider: TimelineClient,
    cache: CacheClient,
    store: WeatherStore,
    ttl_secs: u64,
}

impl WeatherPipeline {
    /// Assemble a pipeline from already-constructed clients.
    pub fn new(provider: TimelineClient, cache: CacheClient, store: WeatherStore) -> Self {
        Self {
            provider,
            cache,
            store,
            ttl_secs: WEATHER_TTL_SECS,
        }
    }

    /// Build every client from configuration.
    ///
    /// Missing credentials, provider URL, or backing stores fail here,
    /// before any request is accepted.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let provider = TimelineClient::from_config(&config.provider)?;
        let cache = CacheClient::from_config(&config.cache)?;
        let store = WeatherStore::from_config(&config.database)?;
        Ok(Self {
            provider,
            cache,
            store,
            ttl_secs: config.cache.ttl_secs,
        })
    }

    /// Fetch, cache, and persist the weather for one coordinate, returning
    /// the persisted aggregate.
    pub async fn get_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherAggregate, ServiceError> {
        validate_coordinates(latitude, longitude)?;

        let key = cache_key(latitude, longitude);
        let payload: TimelinePayload = match self.cache.get(&key).await? {
            Some(raw) => {
                tracing::debug!("Cache hit for {}", key);
                serde_json::from_str(&raw).map_err(ProviderError::Decode)?
            }
            None => {
                tracing::debug!("Cache miss for {}", key);
                let raw = self.provider.fetch(latitude, longitude).await?;
                let payload = serde_json::from_str(&raw).map_err(ProviderError::Decode)?;
                // Only a successfully fetched and decoded body is cached.
                self.cache.set(&key, &raw, self.ttl_secs).await?;
                payload
            }
        };

        let aggregate = self.store.map_and_persist(payload).await?;
        tracing::info!(
            "Persisted weather {} for {},{}",
            aggregate.weather.id,
            latitude,
            longitude
        );
        Ok(aggregate)
    }
}

/// Cache key for a coordinate pair.
///
/// The raw values are interpolated verbatim, so two textual
/// representations of the same coordinate miss independently.
pub fn cache_key(latitude: f64, longitude: f64) -> String {
    format!("weather:{latitude}:{longitude}")
}

/// A coordinate of exactly zero is rejected as missing, so the equator and
/// the prime meridian are unreachable through this pipeline.
fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !latitude.is_finite() {
        return Err(ValidationError::NotFinite { field: "latitude" });
    }
    if !longitude.is_finite() {
        return Err(ValidationError::NotFinite { field: "longitude" });
    }
    if latitude == 0.0 {
        return Err(ValidationError::MissingLatitude);
    }
    if longitude == 0.0 {
        return Err(ValidationError::MissingLongitude);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_cache_key_uses_raw_values() {
        assert_eq!(cache_key(28.6, 77.2), "weather:28.6:77.2");
        // Numerically equal, textually different representations produce
        // distinct keys.
        assert_ne!(cache_key(28.60, 77.2), cache_key(28.600001, 77.2));
    }

    #[test]
    fn test_zero_latitude_rejected() {
        let result = validate_coordinates(0.0, 77.2);
        assert!(matches!(result, Err(ValidationError::MissingLatitude)));
    }

    #[test]
    fn test_zero_longitude_rejected() {
        let result = validate_coordinates(28.6, 0.0);
        assert!(matches!(result, Err(ValidationError::MissingLongitude)));
    }

    #[test]
    fn test_nan_rejected() {
        let result = validate_coordinates(f64::NAN, 77.2);
        assert!(matches!(
            result,
            Err(ValidationError::NotFinite { field: "latitude" })
        ));
    }

    #[test]
    fn test_negative_coordinates_accepted() {
        assert!(validate_coordinates(-33.9, -70.6).is_ok());
    }
}
