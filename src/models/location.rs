//! Location model: coordinates and the namespaced keys that name them

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A point on the globe in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees, positive north
    pub latitude: f64,
    /// Longitude in decimal degrees, positive east
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether the coordinate lies strictly inside (-90, 90) x (-180, 180)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude > -90.0
            && self.latitude < 90.0
            && self.longitude > -180.0
            && self.longitude < 180.0
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.format_coordinates())
    }
}

/// Name of a location in a result set.
///
/// Cities and generated grid points live in separate namespaces, so a city
/// that happens to be called `point7` never collides with grid point 7.
/// Cities sort before points; points sort by their numeric index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocationKey {
    City(String),
    Point(u32),
}

impl LocationKey {
    #[must_use]
    pub fn city<S: Into<String>>(name: S) -> Self {
        Self::City(name.into())
    }

    #[must_use]
    pub const fn point(index: u32) -> Self {
        Self::Point(index)
    }

    #[must_use]
    pub const fn is_point(&self) -> bool {
        matches!(self, Self::Point(_))
    }

    /// Flat label used in exported output: the city name or `point<N>`
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKey::City(name) => f.write_str(name),
            LocationKey::Point(index) => write!(f, "point{index}"),
        }
    }
}

impl Serialize for LocationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Named locations produced by the city catalog or the grid builder
pub type LocationMap = BTreeMap<LocationKey, Coordinate>;
