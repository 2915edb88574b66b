//! Payload types for the upstream timeline weather API.
//!
//! These mirror the provider's JSON document: top-level query metadata, an
//! optional `currentConditions` snapshot, `days[]` each optionally carrying
//! `hours[]`, and a `stations` mapping of station id to attributes.
//!
//! Fields the provider always supplies default to zero/empty when absent;
//! semantically optional fields stay `None`.

use serde::Deserialize;
use std::collections::HashMap;

/// Top-level timeline response document.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelinePayload {
    #[serde(rename = "queryCost", default)]
    pub query_cost: i64,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    #[serde(rename = "resolvedAddress", default)]
    pub resolved_address: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub timezone: String,

    #[serde(default)]
    pub tzoffset: f64,

    #[serde(default)]
    pub description: String,

    /// Opaque alerts payload, stored as given.
    #[serde(default)]
    pub alerts: Option<serde_json::Value>,

    #[serde(rename = "currentConditions", default)]
    pub current_conditions: Option<SnapshotPayload>,

    #[serde(default)]
    pub days: Vec<SnapshotPayload>,

    /// Station id -> attributes. Iteration order is not significant.
    #[serde(default)]
    pub stations: HashMap<String, StationPayload>,
}

/// One weather snapshot at any granularity (current / day / hour).
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPayload {
    /// ISO-ish timestamp string; days carry a date, hours a time of day.
    #[serde(default)]
    pub datetime: Option<String>,

    #[serde(rename = "datetimeEpoch", default)]
    pub datetime_epoch: Option<i64>,

    #[serde(default)]
    pub temp: f64,

    #[serde(default)]
    pub feelslike: f64,

    #[serde(default)]
    pub humidity: f64,

    #[serde(default)]
    pub dew: f64,

    #[serde(default)]
    pub precip: Option<f64>,

    #[serde(default)]
    pub precipprob: f64,

    #[serde(default)]
    pub snow: f64,

    #[serde(default)]
    pub snowdepth: f64,

    /// List of precipitation kinds; flattened to a comma-joined string on
    /// persistence.
    #[serde(default)]
    pub preciptype: Option<Vec<String>>,

    #[serde(default)]
    pub windgust: Option<f64>,

    #[serde(default)]
    pub windspeed: f64,

    #[serde(default)]
    pub winddir: f64,

    #[serde(default)]
    pub pressure: f64,

    #[serde(default)]
    pub visibility: f64,

    #[serde(default)]
    pub cloudcover: f64,

    #[serde(default)]
    pub solarradiation: f64,

    #[serde(default)]
    pub solarenergy: f64,

    #[serde(default)]
    pub uvindex: i64,

    #[serde(default)]
    pub conditions: String,

    #[serde(default)]
    pub icon: String,

    /// Ids of the stations contributing to this snapshot.
    #[serde(default)]
    pub stations: Option<serde_json::Value>,

    #[serde(default)]
    pub source: String,

    /// Bare time of day, e.g. "06:12:43".
    #[serde(default)]
    pub sunrise: Option<String>,

    #[serde(rename = "sunriseEpoch", default)]
    pub sunrise_epoch: Option<i64>,

    #[serde(default)]
    pub sunset: Option<String>,

    #[serde(rename = "sunsetEpoch", default)]
    pub sunset_epoch: Option<i64>,

    #[serde(default)]
    pub moonphase: Option<f64>,

    #[serde(default)]
    pub tempmax: Option<f64>,

    #[serde(default)]
    pub tempmin: Option<f64>,

    #[serde(default)]
    pub feelslikemax: Option<f64>,

    #[serde(default)]
    pub feelslikemin: Option<f64>,

    #[serde(default)]
    pub precipcover: Option<f64>,

    #[serde(default)]
    pub severerisk: Option<f64>,

    #[serde(default)]
    pub description: Option<String>,

    /// Hourly snapshots nested under a day entry.
    #[serde(default)]
    pub hours: Vec<SnapshotPayload>,
}

/// Attributes of a contributing ground station. The station's external id
/// is the key of the enclosing `stations` map, not a field here.
#[derive(Debug, Clone, Deserialize)]
pub struct StationPayload {
    #[serde(default)]
    pub distance: f64,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    #[serde(rename = "useCount", default)]
    pub use_count: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub quality: i64,

    #[serde(default)]
    pub contribution: f64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_timeline_deserialization() {
        let json = r#"{
            "queryCost": 1,
            "latitude": 28.6,
            "longitude": 77.2,
            "resolvedAddress": "28.6,77.2",
            "address": "28.6,77.2",
            "timezone": "Asia/Kolkata",
            "tzoffset": 5.5,
            "description": "Clear conditions throughout the day.",
            "days": [
                {
                    "datetime": "2026-08-01",
                    "datetimeEpoch": 1753986600,
                    "temp": 89.1,
                    "hours": [
                        {"datetime": "00:00:00", "datetimeEpoch": 1753986600, "temp": 84.0}
                    ]
                }
            ],
            "currentConditions": {
                "datetime": "11:45:00",
                "datetimeEpoch": 1754028900,
                "temp": 91.3,
                "preciptype": ["rain"]
            },
            "stations": {
                "VIDP": {
                    "distance": 12000.0,
                    "latitude": 28.57,
                    "longitude": 77.1,
                    "useCount": 0,
                    "name": "VIDP",
                    "quality": 50,
                    "contribution": 0.0
                }
            }
        }"#;

        let payload: TimelinePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.query_cost, 1);
        assert_eq!(payload.days.len(), 1);
        assert_eq!(payload.days[0].hours.len(), 1);
        assert_eq!(payload.stations["VIDP"].quality, 50);
        let current = payload.current_conditions.unwrap();
        assert_eq!(current.preciptype.as_deref(), Some(&["rain".to_string()][..]));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let payload: TimelinePayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.query_cost, 0);
        assert_eq!(payload.resolved_address, "");
        assert!(payload.alerts.is_none());
        assert!(payload.current_conditions.is_none());
        assert!(payload.days.is_empty());
        assert!(payload.stations.is_empty());
    }

    #[test]
    fn test_snapshot_optional_fields_stay_none() {
        let snapshot: SnapshotPayload =
            serde_json::from_str(r#"{"datetimeEpoch": 100, "temp": 70.0}"#).unwrap();
        assert!(snapshot.precip.is_none());
        assert!(snapshot.windgust.is_none());
        assert!(snapshot.preciptype.is_none());
        assert!(snapshot.moonphase.is_none());
        assert_eq!(snapshot.precipprob, 0.0);
        assert_eq!(snapshot.conditions, "");
        assert!(snapshot.hours.is_empty());
    }

    #[test]
    fn test_explicit_null_optional_field() {
        let snapshot: SnapshotPayload =
            serde_json::from_str(r#"{"precip": null, "windgust": 21.5}"#).unwrap();
        assert!(snapshot.precip.is_none());
        assert_eq!(snapshot.windgust, Some(21.5));
    }
}
