//! Translation from the provider's payload into the persistence graph.
//!
//! Conversion is deliberately permissive: a snapshot timestamp resolves
//! epoch-first, then the ISO-ish string, then the current wall-clock time,
//! and any parse failure falls through silently rather than failing the
//! record. Sunrise/sunset are bare times of day projected onto a fixed
//! reference date; unparseable values map to null.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::models::{SnapshotRecord, StationRecord, WeatherGraph, WeatherRecord};
use vane_weather::{SnapshotPayload, StationPayload, TimelinePayload};

/// Reference date carrying parsed sunrise/sunset times of day.
const TIME_REFERENCE_DATE: (i32, u32, u32) = (1900, 1, 1);

/// Build the full persistence graph for one timeline document.
///
/// Row identities are assigned here so children can reference parents
/// before anything touches the database. Snapshots land in insertion
/// order: the current snapshot first, then each day followed by its hours.
pub fn build_graph(payload: &TimelinePayload) -> WeatherGraph {
    let now = Utc::now();
    let weather_id = Uuid::new_v4().to_string();

    let mut snapshots = Vec::new();
    let mut current_conditions_id = None;

    if let Some(current) = &payload.current_conditions {
        let row = snapshot_row(current, &weather_id, None, now);
        current_conditions_id = Some(row.id.clone());
        snapshots.push(row);
    }

    for day in &payload.days {
        let day_row = snapshot_row(day, &weather_id, None, now);
        let day_id = day_row.id.clone();
        snapshots.push(day_row);
        for hour in &day.hours {
            snapshots.push(snapshot_row(hour, &weather_id, Some(day_id.clone()), now));
        }
    }

    let stations = payload
        .stations
        .iter()
        .map(|(key, station)| station_row(key, station, &weather_id, now))
        .collect();

    let weather = WeatherRecord {
        id: weather_id,
        query_cost: payload.query_cost,
        latitude: payload.latitude,
        longitude: payload.longitude,
        resolved_address: payload.resolved_address.clone(),
        address: payload.address.clone(),
        timezone: payload.timezone.clone(),
        tzoffset: payload.tzoffset,
        description: payload.description.clone(),
        alerts: payload.alerts.clone(),
        current_conditions_id,
        created_at: now,
        updated_at: now,
    };

    WeatherGraph {
        weather,
        snapshots,
        stations,
    }
}

fn snapshot_row(
    payload: &SnapshotPayload,
    weather_id: &str,
    parent_id: Option<String>,
    now: DateTime<Utc>,
) -> SnapshotRecord {
    SnapshotRecord {
        id: Uuid::new_v4().to_string(),
        datetime: resolve_datetime(payload.datetime_epoch, payload.datetime.as_deref(), now),
        datetime_epoch: payload.datetime_epoch.unwrap_or(0),
        temp: payload.temp,
        feelslike: payload.feelslike,
        humidity: payload.humidity,
        dew: payload.dew,
        precip: payload.precip,
        precipprob: payload.precipprob,
        snow: payload.snow,
        snowdepth: payload.snowdepth,
        preciptype: join_preciptype(payload.preciptype.as_deref()),
        windgust: payload.windgust,
        windspeed: payload.windspeed,
        winddir: payload.winddir,
        pressure: payload.pressure,
        visibility: payload.visibility,
        cloudcover: payload.cloudcover,
        solarradiation: payload.solarradiation,
        solarenergy: payload.solarenergy,
        uvindex: payload.uvindex,
        conditions: payload.conditions.clone(),
        icon: payload.icon.clone(),
        stations: payload.stations.clone(),
        source: payload.source.clone(),
        sunrise: payload.sunrise.as_deref().and_then(parse_time_of_day),
        sunrise_epoch: payload.sunrise_epoch,
        sunset: payload.sunset.as_deref().and_then(parse_time_of_day),
        sunset_epoch: payload.sunset_epoch,
        moonphase: payload.moonphase,
        tempmax: payload.tempmax,
        tempmin: payload.tempmin,
        feelslikemax: payload.feelslikemax,
        feelslikemin: payload.feelslikemin,
        precipcover: payload.precipcover,
        severerisk: payload.severerisk,
        description: payload.description.clone(),
        weather_id: weather_id.to_string(),
        parent_id,
        created_at: now,
        updated_at: now,
        hours: Vec::new(),
    }
}

fn station_row(
    key: &str,
    payload: &StationPayload,
    weather_id: &str,
    now: DateTime<Utc>,
) -> StationRecord {
    StationRecord {
        id: Uuid::new_v4().to_string(),
        distance: payload.distance,
        latitude: payload.latitude,
        longitude: payload.longitude,
        use_count: payload.use_count,
        station_id: key.to_string(),
        name: payload.name.clone(),
        quality: payload.quality,
        contribution: payload.contribution,
        weather_id: weather_id.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Resolve a snapshot timestamp: epoch seconds win, then the ISO-ish
/// string, then the current time. Parse failures fall through silently.
fn resolve_datetime(
    epoch: Option<i64>,
    datetime: Option<&str>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if let Some(epoch) = epoch {
        if let Some(resolved) = DateTime::from_timestamp(epoch, 0) {
            return resolved;
        }
    }

    if let Some(raw) = datetime {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return parsed.with_timezone(&Utc);
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return parsed.and_utc();
        }
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
                return midnight.and_utc();
            }
        }
    }

    now
}

/// Parse a bare `HH:MM:SS` time of day onto the reference date.
fn parse_time_of_day(raw: &str) -> Option<NaiveDateTime> {
    let time = NaiveTime::parse_from_str(raw, "%H:%M:%S").ok()?;
    let (year, month, day) = TIME_REFERENCE_DATE;
    Some(NaiveDate::from_ymd_opt(year, month, day)?.and_time(time))
}

/// Flatten the precipitation-type list to a comma-joined string; empty or
/// absent lists map to null.
fn join_preciptype(preciptype: Option<&[String]>) -> Option<String> {
    match preciptype {
        Some(kinds) if !kinds.is_empty() => Some(kinds.join(",")),
        _ => None,
    }
}
