//! Envelope types exchanged with the HTTP layer.
//!
//! The routing layer itself lives elsewhere; these types define the
//! consumed contract: a JSON body with a coordinate pair in, and a
//! `{"status": ..., "data" | "error": ...}` document out.

use serde::{Deserialize, Serialize};
use vane_core::{ServiceError, ValidationError};
use vane_store::WeatherAggregate;

/// Inbound request body.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl WeatherRequest {
    /// Extract the coordinate pair, rejecting absent fields explicitly.
    pub fn coordinates(&self) -> Result<(f64, f64), ValidationError> {
        let latitude = self.latitude.ok_or(ValidationError::MissingLatitude)?;
        let longitude = self.longitude.ok_or(ValidationError::MissingLongitude)?;
        Ok((latitude, longitude))
    }
}

/// Outbound response body. Exactly one of `data` / `error` is present.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<WeatherAggregate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Successful response carrying the persisted aggregate.
    pub fn ok(aggregate: WeatherAggregate) -> Self {
        Self {
            status: true,
            data: Some(aggregate),
            error: None,
        }
    }

    /// Failure response; the transport status code is the router's call.
    pub fn failure(error: &ServiceError) -> Self {
        Self {
            status: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}
