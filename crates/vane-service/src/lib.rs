//! Pipeline orchestration for the vane weather service.
//!
//! Wires the provider client, response cache, and relational store into
//! one `get_weather` call, and defines the envelope types the HTTP layer
//! consumes.

pub mod api;
pub mod pipeline;

pub use api::{ApiResponse, WeatherRequest};
pub use pipeline::{cache_key, WeatherPipeline};
