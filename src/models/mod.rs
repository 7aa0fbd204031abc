//! Data models for the weathergrid library
//!
//! - Location: coordinates and namespaced location keys
//! - Weather: opaque weather records keyed by location

pub mod location;
pub mod weather;

pub use location::{Coordinate, LocationKey, LocationMap};
pub use weather::{WeatherMap, WeatherRecord};
