//! Upstream-facing side of the vane weather service: provider payload
//! types, the timeline HTTP client, and the expiring response cache.

pub mod cache;
pub mod provider;
pub mod types;

pub use cache::{CacheClient, SqliteCacheStore, WEATHER_TTL_SECS};
pub use provider::TimelineClient;
pub use types::{SnapshotPayload, StationPayload, TimelinePayload};
