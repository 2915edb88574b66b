//! Persisted weather records and the aggregate document shape.
//!
//! Snapshot rows form a flat arena addressed by id: days and the current
//! snapshot have no parent, hours point at their day through `parent_id`.
//! [`WeatherAggregate::assemble`] derives the nested document from the
//! arena on read.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Root weather row. One per pipeline invocation; owns its snapshots and
/// stations.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherRecord {
    pub id: String,
    pub query_cost: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub resolved_address: String,
    pub address: String,
    pub timezone: String,
    pub tzoffset: f64,
    pub description: String,
    pub alerts: Option<serde_json::Value>,

    /// Designated current-conditions snapshot, if the provider sent one.
    /// Always names a snapshot row of this weather.
    #[serde(skip)]
    pub current_conditions_id: Option<String>,

    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

/// One weather snapshot row (current / day / hour granularity).
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRecord {
    pub id: String,
    pub datetime: DateTime<Utc>,
    pub datetime_epoch: i64,
    pub temp: f64,
    pub feelslike: f64,
    pub humidity: f64,
    pub dew: f64,
    pub precip: Option<f64>,
    pub precipprob: f64,
    pub snow: f64,
    pub snowdepth: f64,
    pub preciptype: Option<String>,
    pub windgust: Option<f64>,
    pub windspeed: f64,
    pub winddir: f64,
    pub pressure: f64,
    pub visibility: f64,
    pub cloudcover: f64,
    pub solarradiation: f64,
    pub solarenergy: f64,
    pub uvindex: i64,
    pub conditions: String,
    pub icon: String,
    pub stations: Option<serde_json::Value>,
    pub source: String,
    /// Time of day projected onto a fixed reference date.
    pub sunrise: Option<NaiveDateTime>,
    pub sunrise_epoch: Option<i64>,
    pub sunset: Option<NaiveDateTime>,
    pub sunset_epoch: Option<i64>,
    pub moonphase: Option<f64>,
    pub tempmax: Option<f64>,
    pub tempmin: Option<f64>,
    pub feelslikemax: Option<f64>,
    pub feelslikemin: Option<f64>,
    pub precipcover: Option<f64>,
    pub severerisk: Option<f64>,
    pub description: Option<String>,

    #[serde(skip)]
    pub weather_id: String,

    /// Set on hourly rows only; names the owning day row.
    #[serde(skip)]
    pub parent_id: Option<String>,

    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,

    /// Hourly children, populated during aggregate assembly. Empty on
    /// storage rows and on the current-conditions snapshot.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hours: Vec<SnapshotRecord>,
}

/// A ground station contributing to the observation.
#[derive(Debug, Clone, Serialize)]
pub struct StationRecord {
    pub id: String,
    pub distance: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub use_count: i64,
    /// External identifier: the key of the provider's `stations` mapping.
    pub station_id: String,
    pub name: String,
    pub quality: i64,
    pub contribution: f64,

    #[serde(skip)]
    pub weather_id: String,

    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

/// Flat persistence graph: the rows exactly as they are written, snapshots
/// in insertion order (current first, then each day followed by its hours).
#[derive(Debug, Clone)]
pub struct WeatherGraph {
    pub weather: WeatherRecord,
    pub snapshots: Vec<SnapshotRecord>,
    pub stations: Vec<StationRecord>,
}

/// The nested document returned to callers and serialized as the API
/// `data` payload: weather fields flattened, `current_conditions` nested
/// or null, `days` with nested `hours`, stations unordered.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherAggregate {
    #[serde(flatten)]
    pub weather: WeatherRecord,
    pub current_conditions: Option<SnapshotRecord>,
    pub days: Vec<SnapshotRecord>,
    pub stations: Vec<StationRecord>,
}

impl WeatherAggregate {
    /// Build the nested aggregate from a flat graph.
    ///
    /// Hours are grouped under their day via the parent index; day order
    /// follows the graph. The day whose id matches the designated
    /// current-conditions snapshot is excluded from `days` so the snapshot
    /// is not reported twice.
    pub fn assemble(graph: WeatherGraph) -> Self {
        let WeatherGraph {
            weather,
            snapshots,
            stations,
        } = graph;

        let mut children: HashMap<String, Vec<SnapshotRecord>> = HashMap::new();
        let mut roots: Vec<SnapshotRecord> = Vec::new();
        for snapshot in snapshots {
            match snapshot.parent_id.clone() {
                Some(parent) => children.entry(parent).or_default().push(snapshot),
                None => roots.push(snapshot),
            }
        }

        let mut current_conditions = None;
        let mut days = Vec::new();
        for mut root in roots {
            if weather.current_conditions_id.as_deref() == Some(root.id.as_str()) {
                current_conditions = Some(root);
            } else {
                root.hours = children.remove(&root.id).unwrap_or_default();
                days.push(root);
            }
        }

        Self {
            weather,
            current_conditions,
            days,
            stations,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;

    fn weather(id: &str, current_conditions_id: Option<&str>) -> WeatherRecord {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        WeatherRecord {
            id: id.to_string(),
            query_cost: 1,
            latitude: 28.6,
            longitude: 77.2,
            resolved_address: "28.6,77.2".to_string(),
            address: "28.6,77.2".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            tzoffset: 5.5,
            description: "Clear.".to_string(),
            alerts: None,
            current_conditions_id: current_conditions_id.map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot(id: &str, weather_id: &str, parent_id: Option<&str>) -> SnapshotRecord {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        SnapshotRecord {
            id: id.to_string(),
            datetime: now,
            datetime_epoch: now.timestamp(),
            temp: 90.0,
            feelslike: 95.0,
            humidity: 60.0,
            dew: 70.0,
            precip: None,
            precipprob: 0.0,
            snow: 0.0,
            snowdepth: 0.0,
            preciptype: None,
            windgust: None,
            windspeed: 5.0,
            winddir: 180.0,
            pressure: 1002.0,
            visibility: 3.0,
            cloudcover: 25.0,
            solarradiation: 500.0,
            solarenergy: 18.0,
            uvindex: 7,
            conditions: "Clear".to_string(),
            icon: "clear-day".to_string(),
            stations: None,
            source: "obs".to_string(),
            sunrise: None,
            sunrise_epoch: None,
            sunset: None,
            sunset_epoch: None,
            moonphase: None,
            tempmax: None,
            tempmin: None,
            feelslikemax: None,
            feelslikemin: None,
            precipcover: None,
            severerisk: None,
            description: None,
            weather_id: weather_id.to_string(),
            parent_id: parent_id.map(String::from),
            created_at: now,
            updated_at: now,
            hours: Vec::new(),
        }
    }

    #[test]
    fn test_assemble_groups_hours_under_day() {
        let graph = WeatherGraph {
            weather: weather("w1", None),
            snapshots: vec![
                snapshot("day1", "w1", None),
                snapshot("h1", "w1", Some("day1")),
                snapshot("h2", "w1", Some("day1")),
            ],
            stations: Vec::new(),
        };

        let aggregate = WeatherAggregate::assemble(graph);
        assert!(aggregate.current_conditions.is_none());
        assert_eq!(aggregate.days.len(), 1);
        assert_eq!(aggregate.days[0].hours.len(), 2);
        assert_eq!(aggregate.days[0].hours[0].id, "h1");
        assert_eq!(
            aggregate.days[0].hours[1].parent_id.as_deref(),
            Some("day1")
        );
    }

    #[test]
    fn test_assemble_excludes_current_conditions_from_days() {
        let graph = WeatherGraph {
            weather: weather("w1", Some("cc")),
            snapshots: vec![
                snapshot("cc", "w1", None),
                snapshot("day1", "w1", None),
            ],
            stations: Vec::new(),
        };

        let aggregate = WeatherAggregate::assemble(graph);
        assert_eq!(
            aggregate.current_conditions.as_ref().map(|c| c.id.as_str()),
            Some("cc")
        );
        assert_eq!(aggregate.days.len(), 1);
        assert_eq!(aggregate.days[0].id, "day1");
    }

    #[test]
    fn test_serialized_shape() {
        let station = StationRecord {
            id: "s1".to_string(),
            distance: 12000.0,
            latitude: 28.57,
            longitude: 77.1,
            use_count: 0,
            station_id: "VIDP".to_string(),
            name: "VIDP".to_string(),
            quality: 50,
            contribution: 0.0,
            weather_id: "w1".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
        };

        let graph = WeatherGraph {
            weather: weather("w1", Some("cc")),
            snapshots: vec![
                snapshot("cc", "w1", None),
                snapshot("day1", "w1", None),
                snapshot("h1", "w1", Some("day1")),
            ],
            stations: vec![station],
        };

        let value = serde_json::to_value(WeatherAggregate::assemble(graph)).unwrap();

        // Weather fields are flattened at the top level.
        assert_eq!(value["id"], "w1");
        assert_eq!(value["latitude"], 28.6);
        // Bookkeeping columns never serialize.
        assert!(value.get("current_conditions_id").is_none());
        assert!(value.get("created_at").is_none());
        // Nesting and de-duplication.
        assert_eq!(value["current_conditions"]["id"], "cc");
        assert!(value["current_conditions"].get("hours").is_none());
        assert_eq!(value["days"].as_array().unwrap().len(), 1);
        assert_eq!(value["days"][0]["hours"][0]["id"], "h1");
        // Hours themselves have no hours key.
        assert!(value["days"][0]["hours"][0].get("hours").is_none());
        assert_eq!(value["stations"][0]["station_id"], "VIDP");
    }
}
