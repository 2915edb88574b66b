//! Relational side of the vane weather service: domain records, the
//! payload-to-graph mapper, and the transactional SQLite store.

pub mod mapper;
pub mod models;
pub mod store;

pub use mapper::build_graph;
pub use models::{
    SnapshotRecord, StationRecord, WeatherAggregate, WeatherGraph, WeatherRecord,
};
pub use store::{SqliteWeatherStore, WeatherStore};
