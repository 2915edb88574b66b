//! HTTP client for the timeline weather provider.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use vane_core::{ConfigError, ProviderConfig, ProviderError, ServiceError};

/// Client for the provider's timeline endpoint.
///
/// Issues exactly one GET per [`fetch`](Self::fetch) call and treats any
/// status other than 200 as a hard failure. Retries are the caller's
/// decision; none happen here.
#[derive(Debug, Clone)]
pub struct TimelineClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl TimelineClient {
    /// Build a client from configuration.
    ///
    /// Both the base URL and the API key are required; missing either is a
    /// configuration error raised here, before any request is made.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ServiceError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| ConfigError::MissingSetting("provider.base_url".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingSetting("provider.api_key".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key,
        })
    }

    /// Fetch the raw timeline document for a coordinate.
    ///
    /// The provider addresses locations as `longitude,latitude` and the
    /// unit system is fixed to US units. Returns the raw body so the
    /// caller can cache it verbatim.
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> Result<String, ProviderError> {
        let url = format!(
            "{}/rest/services/timeline/{}%2C{}?unitGroup=us&key={}&contentType=json",
            self.base_url, longitude, latitude, self.api_key
        );

        tracing::debug!("Fetching timeline for {},{}", latitude, longitude);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status.as_u16() != 200 {
            tracing::warn!("Timeline request failed with status {}", status);
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        tracing::debug!("Timeline response: {} bytes", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> TimelineClient {
        TimelineClient::from_config(&ProviderConfig {
            base_url: Some(base_url.to_string()),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_missing_api_key_fails_construction() {
        let result = TimelineClient::from_config(&ProviderConfig {
            base_url: Some("https://weather.example.com".to_string()),
            api_key: None,
            timeout_secs: 5,
        });
        assert!(matches!(
            result,
            Err(ServiceError::Config(ConfigError::MissingSetting(_)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_builds_longitude_first_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/rest/services/timeline/77\.2(,|%2C)28\.6$"))
            .and(query_param("unitGroup", "us"))
            .and(query_param("key", "test-key"))
            .and(query_param("contentType", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"latitude": 28.6}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let body = client.fetch(28.6, 77.2).await.unwrap();
        assert!(body.contains("28.6"));
    }

    #[tokio::test]
    async fn test_non_200_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.fetch(28.6, 77.2).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status(500)));
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.fetch(28.6, 77.2).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status(204)));
    }
}
