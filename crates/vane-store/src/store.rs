//! SQLite persistence for weather aggregates.
//!
//! `SqliteWeatherStore` is the blocking store; `WeatherStore` is the
//! cloneable async facade that runs it on the blocking pool. The aggregate
//! write is a single transaction: either the weather row, every snapshot,
//! and every station commit together, or the transaction rolls back and
//! nothing is visible.

use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::mapper;
use crate::models::{SnapshotRecord, StationRecord, WeatherAggregate, WeatherGraph, WeatherRecord};
use vane_core::error::RusqliteErrorExt;
use vane_core::{ConfigError, DatabaseConfig, PersistenceError, ServiceError};
use vane_weather::TimelinePayload;

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Blocking SQLite store for weather aggregates.
pub struct SqliteWeatherStore {
    conn: Connection,
}

impl SqliteWeatherStore {
    /// Open (or create) the weather database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)
            .map_err(|e| PersistenceError::ConnectionFailed(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PersistenceError::ConnectionFailed(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), PersistenceError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS weather (
                    id TEXT PRIMARY KEY,
                    query_cost INTEGER NOT NULL,
                    latitude REAL NOT NULL,
                    longitude REAL NOT NULL,
                    resolved_address TEXT NOT NULL,
                    address TEXT NOT NULL,
                    timezone TEXT NOT NULL,
                    tzoffset REAL NOT NULL,
                    description TEXT NOT NULL,
                    alerts TEXT,
                    current_conditions_id TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS current_conditions (
                    id TEXT PRIMARY KEY,
                    datetime TEXT NOT NULL,
                    datetime_epoch INTEGER NOT NULL,
                    temp REAL NOT NULL,
                    feelslike REAL NOT NULL,
                    humidity REAL NOT NULL,
                    dew REAL NOT NULL,
                    precip REAL,
                    precipprob REAL NOT NULL,
                    snow REAL NOT NULL,
                    snowdepth REAL NOT NULL,
                    preciptype TEXT,
                    windgust REAL,
                    windspeed REAL NOT NULL,
                    winddir REAL NOT NULL,
                    pressure REAL NOT NULL,
                    visibility REAL NOT NULL,
                    cloudcover REAL NOT NULL,
                    solarradiation REAL NOT NULL,
                    solarenergy REAL NOT NULL,
                    uvindex INTEGER NOT NULL,
                    conditions TEXT NOT NULL,
                    icon TEXT NOT NULL,
                    stations TEXT,
                    source TEXT NOT NULL,
                    sunrise TEXT,
                    sunrise_epoch INTEGER,
                    sunset TEXT,
                    sunset_epoch INTEGER,
                    moonphase REAL,
                    tempmax REAL,
                    tempmin REAL,
                    feelslikemax REAL,
                    feelslikemin REAL,
                    precipcover REAL,
                    severerisk REAL,
                    description TEXT,
                    weather_id TEXT NOT NULL,
                    parent_id TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS station (
                    id TEXT PRIMARY KEY,
                    distance REAL NOT NULL,
                    latitude REAL NOT NULL,
                    longitude REAL NOT NULL,
                    use_count INTEGER NOT NULL,
                    station_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    quality INTEGER NOT NULL,
                    contribution REAL NOT NULL,
                    weather_id TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_conditions_weather
                    ON current_conditions(weather_id);
                CREATE INDEX IF NOT EXISTS idx_conditions_parent
                    ON current_conditions(parent_id);
                CREATE INDEX IF NOT EXISTS idx_station_weather
                    ON station(weather_id);
                "#,
            )
            .map_err(|e| e.into_persistence_error())
    }

    /// Write a whole graph in one transaction.
    ///
    /// The weather row goes first so children can reference it; the
    /// designated current-conditions back-reference is set once its row
    /// exists. Any failure rolls everything back.
    pub fn insert_graph(&mut self, graph: &WeatherGraph) -> Result<(), PersistenceError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| e.into_persistence_error())?;

        let weather = &graph.weather;
        tx.execute(
            r#"
            INSERT INTO weather
            (id, query_cost, latitude, longitude, resolved_address, address, timezone,
             tzoffset, description, alerts, current_conditions_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?11, ?12)
            "#,
            params![
                weather.id,
                weather.query_cost,
                weather.latitude,
                weather.longitude,
                weather.resolved_address,
                weather.address,
                weather.timezone,
                weather.tzoffset,
                weather.description,
                weather.alerts.as_ref().map(|v| v.to_string()),
                weather.created_at.to_rfc3339(),
                weather.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| e.into_persistence_error())?;

        for snapshot in &graph.snapshots {
            tx.execute(
                r#"
                INSERT INTO current_conditions
                (id, datetime, datetime_epoch, temp, feelslike, humidity, dew, precip,
                 precipprob, snow, snowdepth, preciptype, windgust, windspeed, winddir,
                 pressure, visibility, cloudcover, solarradiation, solarenergy, uvindex,
                 conditions, icon, stations, source, sunrise, sunrise_epoch, sunset,
                 sunset_epoch, moonphase, tempmax, tempmin, feelslikemax, feelslikemin,
                 precipcover, severerisk, description, weather_id, parent_id,
                 created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                        ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26,
                        ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34, ?35, ?36, ?37, ?38,
                        ?39, ?40, ?41)
                "#,
                params![
                    snapshot.id,
                    snapshot.datetime.to_rfc3339(),
                    snapshot.datetime_epoch,
                    snapshot.temp,
                    snapshot.feelslike,
                    snapshot.humidity,
                    snapshot.dew,
                    snapshot.precip,
                    snapshot.precipprob,
                    snapshot.snow,
                    snapshot.snowdepth,
                    snapshot.preciptype,
                    snapshot.windgust,
                    snapshot.windspeed,
                    snapshot.winddir,
                    snapshot.pressure,
                    snapshot.visibility,
                    snapshot.cloudcover,
                    snapshot.solarradiation,
                    snapshot.solarenergy,
                    snapshot.uvindex,
                    snapshot.conditions,
                    snapshot.icon,
                    snapshot.stations.as_ref().map(|v| v.to_string()),
                    snapshot.source,
                    snapshot.sunrise.map(|dt| dt.format(NAIVE_FORMAT).to_string()),
                    snapshot.sunrise_epoch,
                    snapshot.sunset.map(|dt| dt.format(NAIVE_FORMAT).to_string()),
                    snapshot.sunset_epoch,
                    snapshot.moonphase,
                    snapshot.tempmax,
                    snapshot.tempmin,
                    snapshot.feelslikemax,
                    snapshot.feelslikemin,
                    snapshot.precipcover,
                    snapshot.severerisk,
                    snapshot.description,
                    snapshot.weather_id,
                    snapshot.parent_id,
                    snapshot.created_at.to_rfc3339(),
                    snapshot.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| e.into_persistence_error())?;
        }

        if let Some(current_id) = &weather.current_conditions_id {
            tx.execute(
                "UPDATE weather SET current_conditions_id = ?1 WHERE id = ?2",
                params![current_id, weather.id],
            )
            .map_err(|e| e.into_persistence_error())?;
        }

        for station in &graph.stations {
            tx.execute(
                r#"
                INSERT INTO station
                (id, distance, latitude, longitude, use_count, station_id, name,
                 quality, contribution, weather_id, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    station.id,
                    station.distance,
                    station.latitude,
                    station.longitude,
                    station.use_count,
                    station.station_id,
                    station.name,
                    station.quality,
                    station.contribution,
                    station.weather_id,
                    station.created_at.to_rfc3339(),
                    station.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| e.into_persistence_error())?;
        }

        tx.commit().map_err(|e| e.into_persistence_error())?;

        tracing::debug!(
            "Persisted weather {} ({} snapshots, {} stations)",
            graph.weather.id,
            graph.snapshots.len(),
            graph.stations.len()
        );
        Ok(())
    }

    /// Load one aggregate by weather id, rebuilding the day/hour nesting.
    pub fn get_weather(&self, id: &str) -> Result<Option<WeatherAggregate>, PersistenceError> {
        let weather = self
            .conn
            .query_row(
                "SELECT id, query_cost, latitude, longitude, resolved_address, address,
                        timezone, tzoffset, description, alerts, current_conditions_id,
                        created_at, updated_at
                 FROM weather WHERE id = ?1",
                params![id],
                Self::row_to_weather,
            )
            .optional()
            .map_err(|e| e.into_persistence_error())?;

        let Some(weather) = weather else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, datetime, datetime_epoch, temp, feelslike, humidity, dew,
                        precip, precipprob, snow, snowdepth, preciptype, windgust,
                        windspeed, winddir, pressure, visibility, cloudcover,
                        solarradiation, solarenergy, uvindex, conditions, icon, stations,
                        source, sunrise, sunrise_epoch, sunset, sunset_epoch, moonphase,
                        tempmax, tempmin, feelslikemax, feelslikemin, precipcover,
                        severerisk, description, weather_id, parent_id, created_at,
                        updated_at
                 FROM current_conditions WHERE weather_id = ?1 ORDER BY rowid",
            )
            .map_err(|e| e.into_persistence_error())?;
        let snapshots = stmt
            .query_map(params![id], Self::row_to_snapshot)
            .map_err(|e| e.into_persistence_error())?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.into_persistence_error())?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, distance, latitude, longitude, use_count, station_id, name,
                        quality, contribution, weather_id, created_at, updated_at
                 FROM station WHERE weather_id = ?1",
            )
            .map_err(|e| e.into_persistence_error())?;
        let stations = stmt
            .query_map(params![id], Self::row_to_station)
            .map_err(|e| e.into_persistence_error())?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.into_persistence_error())?;

        Ok(Some(WeatherAggregate::assemble(WeatherGraph {
            weather,
            snapshots,
            stations,
        })))
    }

    /// Delete one aggregate: the weather row and every snapshot and
    /// station it owns, in one transaction.
    pub fn delete_weather(&mut self, id: &str) -> Result<bool, PersistenceError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| e.into_persistence_error())?;

        tx.execute(
            "DELETE FROM current_conditions WHERE weather_id = ?1",
            params![id],
        )
        .map_err(|e| e.into_persistence_error())?;
        tx.execute("DELETE FROM station WHERE weather_id = ?1", params![id])
            .map_err(|e| e.into_persistence_error())?;
        let deleted = tx
            .execute("DELETE FROM weather WHERE id = ?1", params![id])
            .map_err(|e| e.into_persistence_error())?;

        tx.commit().map_err(|e| e.into_persistence_error())?;
        Ok(deleted > 0)
    }

    /// Number of persisted weather aggregates.
    pub fn count(&self) -> Result<usize, PersistenceError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM weather", [], |row| row.get(0))
            .map_err(|e| e.into_persistence_error())?;
        Ok(count as usize)
    }

    fn row_to_weather(row: &rusqlite::Row) -> rusqlite::Result<WeatherRecord> {
        let alerts: Option<String> = row.get(9)?;
        let created_at: String = row.get(11)?;
        let updated_at: String = row.get(12)?;
        Ok(WeatherRecord {
            id: row.get(0)?,
            query_cost: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            resolved_address: row.get(4)?,
            address: row.get(5)?,
            timezone: row.get(6)?,
            tzoffset: row.get(7)?,
            description: row.get(8)?,
            alerts: alerts.and_then(|raw| serde_json::from_str(&raw).ok()),
            current_conditions_id: row.get(10)?,
            created_at: parse_utc(&created_at),
            updated_at: parse_utc(&updated_at),
        })
    }

    fn row_to_snapshot(row: &rusqlite::Row) -> rusqlite::Result<SnapshotRecord> {
        let datetime: String = row.get(1)?;
        let stations: Option<String> = row.get(23)?;
        let sunrise: Option<String> = row.get(25)?;
        let sunset: Option<String> = row.get(27)?;
        let created_at: String = row.get(39)?;
        let updated_at: String = row.get(40)?;
        Ok(SnapshotRecord {
            id: row.get(0)?,
            datetime: parse_utc(&datetime),
            datetime_epoch: row.get(2)?,
            temp: row.get(3)?,
            feelslike: row.get(4)?,
            humidity: row.get(5)?,
            dew: row.get(6)?,
            precip: row.get(7)?,
            precipprob: row.get(8)?,
            snow: row.get(9)?,
            snowdepth: row.get(10)?,
            preciptype: row.get(11)?,
            windgust: row.get(12)?,
            windspeed: row.get(13)?,
            winddir: row.get(14)?,
            pressure: row.get(15)?,
            visibility: row.get(16)?,
            cloudcover: row.get(17)?,
            solarradiation: row.get(18)?,
            solarenergy: row.get(19)?,
            uvindex: row.get(20)?,
            conditions: row.get(21)?,
            icon: row.get(22)?,
            stations: stations.and_then(|raw| serde_json::from_str(&raw).ok()),
            source: row.get(24)?,
            sunrise: sunrise.and_then(parse_naive),
            sunrise_epoch: row.get(26)?,
            sunset: sunset.and_then(parse_naive),
            sunset_epoch: row.get(28)?,
            moonphase: row.get(29)?,
            tempmax: row.get(30)?,
            tempmin: row.get(31)?,
            feelslikemax: row.get(32)?,
            feelslikemin: row.get(33)?,
            precipcover: row.get(34)?,
            severerisk: row.get(35)?,
            description: row.get(36)?,
            weather_id: row.get(37)?,
            parent_id: row.get(38)?,
            created_at: parse_utc(&created_at),
            updated_at: parse_utc(&updated_at),
            hours: Vec::new(),
        })
    }

    fn row_to_station(row: &rusqlite::Row) -> rusqlite::Result<StationRecord> {
        let created_at: String = row.get(10)?;
        let updated_at: String = row.get(11)?;
        Ok(StationRecord {
            id: row.get(0)?,
            distance: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            use_count: row.get(4)?,
            station_id: row.get(5)?,
            name: row.get(6)?,
            quality: row.get(7)?,
            contribution: row.get(8)?,
            weather_id: row.get(9)?,
            created_at: parse_utc(&created_at),
            updated_at: parse_utc(&updated_at),
        })
    }
}

fn parse_utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_naive(raw: String) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&raw, NAIVE_FORMAT).ok()
}

/// Cloneable async facade over the blocking weather store.
#[derive(Clone)]
pub struct WeatherStore {
    inner: Arc<Mutex<SqliteWeatherStore>>,
}

impl WeatherStore {
    /// Wrap an already-open store.
    pub fn new(store: SqliteWeatherStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Build the store from configuration.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ServiceError> {
        let path = config
            .db_path
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSetting("database.db_path".to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::ConnectionFailed(e.to_string()))?;
        }
        Ok(Self::new(SqliteWeatherStore::new(path)?))
    }

    /// Map a provider payload into the relational model and persist it in
    /// one transaction, returning the assembled aggregate.
    pub async fn map_and_persist(
        &self,
        payload: TimelinePayload,
    ) -> Result<WeatherAggregate, ServiceError> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let graph = mapper::build_graph(&payload);
            inner.lock().insert_graph(&graph)?;
            Ok(WeatherAggregate::assemble(graph))
        })
        .await
        .map_err(|e| anyhow::anyhow!("persistence task failed: {e}"))?
    }

    /// Load one aggregate by weather id.
    pub async fn get_weather(&self, id: &str) -> Result<Option<WeatherAggregate>, ServiceError> {
        let inner = self.inner.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || Ok(inner.lock().get_weather(&id)?))
            .await
            .map_err(|e| anyhow::anyhow!("persistence task failed: {e}"))?
    }

    /// Delete one aggregate and everything it owns.
    pub async fn delete_weather(&self, id: &str) -> Result<bool, ServiceError> {
        let inner = self.inner.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || Ok(inner.lock().delete_weather(&id)?))
            .await
            .map_err(|e| anyhow::anyhow!("persistence task failed: {e}"))?
    }

    /// Number of persisted weather aggregates.
    pub async fn count(&self) -> Result<usize, ServiceError> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || Ok(inner.lock().count()?))
            .await
            .map_err(|e| anyhow::anyhow!("persistence task failed: {e}"))?
    }
}
