//! Weather record attached to a named location

use super::location::{Coordinate, LocationKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Weather observed and forecast at one location.
///
/// The geometry code only moves records around by key; `attributes` is
/// whatever the weather source put there.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherRecord {
    /// Coordinate the weather was fetched for
    pub coord: Coordinate,
    /// Current and forecast fields
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl WeatherRecord {
    #[must_use]
    pub fn new(coord: Coordinate) -> Self {
        Self {
            coord,
            attributes: Map::new(),
        }
    }

    /// Builder-style attribute insertion
    #[must_use]
    pub fn with_attribute<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Weather results keyed by location
pub type WeatherMap = BTreeMap<LocationKey, WeatherRecord>;
