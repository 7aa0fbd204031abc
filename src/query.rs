//! Land/sea weather queries
//!
//! Validates the user's search area, works out which cities and grid points
//! to query, fetches their weather and combines the results.

use crate::catalog::CityCatalog;
use crate::geo::{BoundingBox, bounding_box};
use crate::grid::generate_grid;
use crate::merge::{merge_excluding, points_near_cities};
use crate::models::{Coordinate, LocationKey, LocationMap, WeatherMap};
use crate::weather::{WeatherSource, collect_weather};
use crate::{Result, WeatherGridError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, instrument};

/// Smallest accepted search radius in km
pub const MIN_RADIUS_KM: f64 = 10.0;
/// Largest accepted search radius in km
pub const MAX_RADIUS_KM: f64 = 500.0;
/// Smallest accepted distance between grid points in km
pub const MIN_SPACING_KM: f64 = 10.0;

/// Which locations a query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Only cities from the catalog
    Cities,
    /// Only the generated grid
    Points,
    /// Cities, plus grid points that are away from every city
    Both,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Cities => f.write_str("cities"),
            QueryMode::Points => f.write_str("points"),
            QueryMode::Both => f.write_str("both"),
        }
    }
}

/// A validated center point and search radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchArea {
    center: Coordinate,
    radius_km: f64,
}

impl SearchArea {
    /// Latitude and longitude must be strictly inside their ranges and the
    /// radius within [`MIN_RADIUS_KM`, `MAX_RADIUS_KM`].
    pub fn new(center: Coordinate, radius_km: f64) -> Result<Self> {
        if !(center.latitude > -90.0 && center.latitude < 90.0) {
            return Err(WeatherGridError::invalid_input(format!(
                "latitude must be between -90 and 90, exclusive, got {}",
                center.latitude
            )));
        }
        if !(center.longitude > -180.0 && center.longitude < 180.0) {
            return Err(WeatherGridError::invalid_input(format!(
                "longitude must be between -180 and 180, exclusive, got {}",
                center.longitude
            )));
        }
        if !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&radius_km) {
            return Err(WeatherGridError::invalid_input(format!(
                "distance from the center point must be between {MIN_RADIUS_KM} and {MAX_RADIUS_KM} km, got {radius_km}"
            )));
        }
        Ok(Self { center, radius_km })
    }

    #[must_use]
    pub fn center(&self) -> Coordinate {
        self.center
    }

    #[must_use]
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn bounding_box(&self) -> Result<BoundingBox> {
        bounding_box(&self.center, self.radius_km)
    }
}

/// Smallest grid spacing allowed for `radius_km`: a fifth of the radius,
/// rounded, and never below [`MIN_SPACING_KM`].
#[must_use]
pub fn minimum_spacing(radius_km: f64) -> f64 {
    (radius_km / 5.0).round().max(MIN_SPACING_KM)
}

/// Spacing must be at least [`minimum_spacing`] and less than the radius
pub fn validate_spacing(area: &SearchArea, spacing_km: f64) -> Result<()> {
    let minimum = minimum_spacing(area.radius_km);
    if !spacing_km.is_finite() || spacing_km < minimum || spacing_km >= area.radius_km {
        return Err(WeatherGridError::invalid_input(format!(
            "distance between points must be at least {minimum} km and less than the distance from the center point ({} km), got {spacing_km}",
            area.radius_km
        )));
    }
    Ok(())
}

/// City names are letters and spaces; country codes are 2 or 3 letters (ISO 3166)
pub fn validate_city_input(city: &str, country_code: &str) -> Result<()> {
    let city = city.trim();
    if city.is_empty() || !city.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        return Err(WeatherGridError::invalid_input(
            "the city name must contain only letters",
        ));
    }
    let code = country_code.trim();
    if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(WeatherGridError::invalid_input(format!(
            "'{country_code}' is not a valid ISO 3166 country code"
        )));
    }
    Ok(())
}

/// The locations a query will fetch weather for
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    pub mode: QueryMode,
    pub bbox: BoundingBox,
    pub spacing_km: Option<f64>,
    pub cities: LocationMap,
    pub points: LocationMap,
    /// Points closer than the spacing to a city; only filled in `Both` mode
    #[serde(skip)]
    near_cities: BTreeSet<LocationKey>,
}

impl QueryPlan {
    /// Resolve cities and/or grid points for `mode` inside `area`.
    ///
    /// `spacing_km` is required for [`QueryMode::Points`] and
    /// [`QueryMode::Both`], where it is also the dedup radius.
    #[instrument(skip(catalog))]
    pub fn build(
        mode: QueryMode,
        area: &SearchArea,
        spacing_km: Option<f64>,
        catalog: &CityCatalog,
    ) -> Result<Self> {
        let bbox = area.bounding_box()?;
        info!(
            "Search box around {}: lat {}..{}, lon {}..{}",
            area.center, bbox.lat_min, bbox.lat_max, bbox.lon_min, bbox.lon_max
        );

        let cities = match mode {
            QueryMode::Cities | QueryMode::Both => catalog.cities_within(&bbox),
            QueryMode::Points => LocationMap::new(),
        };

        let (spacing_km, points) = match mode {
            QueryMode::Cities => (None, LocationMap::new()),
            QueryMode::Points | QueryMode::Both => {
                let spacing = spacing_km.ok_or_else(|| {
                    WeatherGridError::invalid_input(format!(
                        "a distance between points is required for the {mode} query"
                    ))
                })?;
                validate_spacing(area, spacing)?;
                (Some(spacing), generate_grid(&bbox, spacing)?)
            }
        };

        let near_cities = match (mode, spacing_km) {
            (QueryMode::Both, Some(spacing)) => points_near_cities(&cities, &points, spacing),
            _ => BTreeSet::new(),
        };

        info!(
            "{} query covers {} cities and {} grid points ({} near a city)",
            mode,
            cities.len(),
            points.len(),
            near_cities.len()
        );

        Ok(Self {
            mode,
            bbox,
            spacing_km,
            cities,
            points,
            near_cities,
        })
    }

    /// Grid points dropped in favour of a nearby city
    #[must_use]
    pub fn points_near_cities(&self) -> &BTreeSet<LocationKey> {
        &self.near_cities
    }

    /// Grid points that will end up in the result
    #[must_use]
    pub fn points_to_fetch(&self) -> LocationMap {
        self.points
            .iter()
            .filter(|(key, _)| !self.near_cities.contains(*key))
            .map(|(key, coord)| (key.clone(), *coord))
            .collect()
    }

    /// Fetch weather for the planned locations and combine it.
    ///
    /// In [`QueryMode::Both`] only the points that survive deduplication are
    /// fetched; the dropped ones would be discarded by the merge anyway.
    #[instrument(skip_all, fields(mode = %self.mode))]
    pub fn execute<S: WeatherSource + ?Sized>(&self, source: &mut S) -> Result<WeatherMap> {
        match self.mode {
            QueryMode::Cities => collect_weather(&self.cities, source),
            QueryMode::Points => collect_weather(&self.points, source),
            QueryMode::Both => {
                let city_weather = collect_weather(&self.cities, source)?;
                let point_weather = collect_weather(&self.points_to_fetch(), source)?;
                Ok(merge_excluding(
                    &self.points,
                    &city_weather,
                    &point_weather,
                    &self.near_cities,
                ))
            }
        }
    }
}
