//! City catalog
//!
//! Loads the static world-cities table once and answers bounding-box
//! queries against it.

use crate::error::DataSourceError;
use crate::geo::BoundingBox;
use crate::models::{Coordinate, LocationKey, LocationMap};
use crate::Result;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

const REQUIRED_COLUMNS: [&str; 3] = ["city", "lat", "lng"];

/// One row of the dataset. Extra columns in the file are ignored.
#[derive(Debug, Deserialize)]
struct CityRow {
    city: String,
    lat: f64,
    lng: f64,
}

/// A named city and where it is
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub name: String,
    pub coord: Coordinate,
}

impl City {
    #[must_use]
    pub fn new<S: Into<String>>(name: S, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            coord: Coordinate::new(latitude, longitude),
        }
    }
}

/// In-memory city table, in file order
#[derive(Debug, Clone, Default)]
pub struct CityCatalog {
    cities: Vec<City>,
}

impl CityCatalog {
    /// Build a catalog from cities already in memory
    #[must_use]
    pub fn from_cities(cities: Vec<City>) -> Self {
        Self { cities }
    }

    /// Load a CSV file with at least the columns `city`, `lat` and `lng`.
    ///
    /// A missing file, a file with no data rows, and a file that cannot be
    /// parsed each map to their own [`DataSourceError`]; nothing is
    /// returned from a partially readable file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading city dataset from {}", path.display());

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DataSourceError::not_found(path).into());
            }
            Err(e) => return Err(DataSourceError::malformed(path, e.to_string()).into()),
        };

        let catalog = Self::parse(path, &content)?;
        info!(
            "Loaded {} cities from {}",
            catalog.cities.len(),
            path.display()
        );
        Ok(catalog)
    }

    fn parse(path: &Path, content: &str) -> std::result::Result<Self, DataSourceError> {
        if content.trim().is_empty() {
            return Err(DataSourceError::empty(path));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| DataSourceError::malformed(path, e.to_string()))?;
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !headers.iter().any(|h| h == **column))
        {
            return Err(DataSourceError::malformed(
                path,
                format!("missing column `{missing}`"),
            ));
        }

        let mut cities = Vec::new();
        for row in reader.deserialize::<CityRow>() {
            let row = row.map_err(|e| DataSourceError::malformed(path, e.to_string()))?;
            cities.push(City::new(row.city, row.lat, row.lng));
        }

        if cities.is_empty() {
            return Err(DataSourceError::empty(path));
        }

        Ok(Self { cities })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &City> {
        self.cities.iter()
    }

    /// Cities inside `bbox` (inclusive rectangle, not a circle).
    ///
    /// Rows sharing a name collapse to one entry holding the last row's
    /// coordinate.
    #[must_use]
    pub fn cities_within(&self, bbox: &BoundingBox) -> LocationMap {
        let mut found = LocationMap::new();
        for city in self.cities.iter().filter(|c| bbox.contains(&c.coord)) {
            found.insert(LocationKey::city(city.name.clone()), city.coord);
        }

        debug!(
            "{} of {} cities fall inside {:?}",
            found.len(),
            self.cities.len(),
            bbox
        );
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeatherGridError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn spain_box() -> BoundingBox {
        BoundingBox {
            lat_max: 41.0,
            lat_min: 39.0,
            lon_max: -2.0,
            lon_min: -4.0,
        }
    }

    #[test]
    fn test_load_ignores_extra_columns() {
        let file = write_csv(
            "city,city_ascii,lat,lng,country\n\
             Madrid,Madrid,40.4168,-3.7038,Spain\n\
             Toledo,Toledo,39.8628,-4.0273,Spain\n",
        );
        let catalog = CityCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.iter().next(),
            Some(&City::new("Madrid", 40.4168, -3.7038))
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = CityCatalog::load("/definitely/not/here/worldcities.csv").unwrap_err();
        assert!(matches!(
            err,
            WeatherGridError::DataSource(DataSourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_directory_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let err = CityCatalog::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            WeatherGridError::DataSource(DataSourceError::Malformed { .. })
        ));
    }

    #[test]
    fn test_load_empty_file() {
        let file = write_csv("  \n");
        let err = CityCatalog::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            WeatherGridError::DataSource(DataSourceError::Empty { .. })
        ));
    }

    #[test]
    fn test_load_header_only_is_empty() {
        let file = write_csv("city,lat,lng\n");
        let err = CityCatalog::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            WeatherGridError::DataSource(DataSourceError::Empty { .. })
        ));
    }

    #[test]
    fn test_load_missing_column() {
        let file = write_csv("city,latitude,lng\nMadrid,40.4,-3.7\n");
        let err = CityCatalog::load(file.path()).unwrap_err();
        match err {
            WeatherGridError::DataSource(DataSourceError::Malformed { reason, .. }) => {
                assert!(reason.contains("`lat`"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_unparseable_row() {
        let file = write_csv("city,lat,lng\nMadrid,40.4,-3.7\nNowhere,north,-3.7\n");
        let err = CityCatalog::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            WeatherGridError::DataSource(DataSourceError::Malformed { .. })
        ));
    }

    #[test]
    fn test_cities_within_box() {
        let catalog = CityCatalog::from_cities(vec![
            City::new("Madrid", 40.4168, -3.7038),
            City::new("Barcelona", 41.3874, 2.1686),
            City::new("Edge", 41.0, -2.0),
        ]);

        let found = catalog.cities_within(&spain_box());
        assert_eq!(found.len(), 2);
        assert!(found.contains_key(&LocationKey::city("Madrid")));
        assert!(found.contains_key(&LocationKey::city("Edge")));
        assert!(!found.contains_key(&LocationKey::city("Barcelona")));
    }

    #[test]
    fn test_duplicate_names_last_row_wins() {
        let catalog = CityCatalog::from_cities(vec![
            City::new("Springfield", 40.0, -3.0),
            City::new("Springfield", 39.5, -2.5),
        ]);

        let found = catalog.cities_within(&spain_box());
        assert_eq!(found.len(), 1);
        assert_eq!(
            found.get(&LocationKey::city("Springfield")),
            Some(&Coordinate::new(39.5, -2.5))
        );
    }

    #[test]
    fn test_duplicate_outside_box_does_not_override() {
        let catalog = CityCatalog::from_cities(vec![
            City::new("Springfield", 40.0, -3.0),
            City::new("Springfield", 10.0, 10.0),
        ]);

        let found = catalog.cities_within(&spain_box());
        assert_eq!(
            found.get(&LocationKey::city("Springfield")),
            Some(&Coordinate::new(40.0, -3.0))
        );
    }
}
