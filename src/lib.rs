//! `weathergrid` - land and sea weather around a center point
//!
//! This library turns a center coordinate and a radius into the cities
//! inside that radius and/or a regular grid of sample points, fetches
//! weather for them, and merges both sets for combined land/sea queries.

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod geo;
pub mod grid;
pub mod merge;
pub mod models;
pub mod query;
pub mod weather;

// Re-export core types for public API
pub use catalog::{City, CityCatalog};
pub use config::AppConfig;
pub use error::{DataSourceError, WeatherGridError};
pub use export::export_json;
pub use geo::{BoundingBox, bounding_box, destination_point, great_circle_distance};
pub use grid::generate_grid;
pub use merge::{merge_cities_and_points, merge_excluding};
pub use models::{Coordinate, LocationKey, LocationMap, WeatherMap, WeatherRecord};
pub use query::{QueryMode, QueryPlan, SearchArea};
pub use weather::{OpenMeteoClient, WeatherSource, collect_weather};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherGridError>;
