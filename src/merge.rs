//! Combining city weather with grid-point weather
//!
//! Over land the cities already cover their surroundings, so grid points
//! near a city are dropped; out at sea there are no cities and every grid
//! point is kept.

use crate::geo::great_circle_distance;
use crate::models::{LocationKey, LocationMap, WeatherMap};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Grid points closer than `dedup_radius_km` to at least one city.
///
/// A point exactly `dedup_radius_km` away is not too close.
#[must_use]
pub fn points_near_cities(
    city_coords: &LocationMap,
    point_coords: &LocationMap,
    dedup_radius_km: f64,
) -> BTreeSet<LocationKey> {
    point_coords
        .iter()
        .filter(|(_, point)| {
            city_coords
                .values()
                .any(|city| great_circle_distance(city, point) < dedup_radius_km)
        })
        .map(|(key, _)| key.clone())
        .collect()
}

/// Fold grid-point weather into city weather.
///
/// With no city weather the point weather is returned as is. Otherwise every
/// point at or beyond `dedup_radius_km` from all cities is added to the city
/// results under its own key; points without a weather record are skipped.
/// Neither input map is modified.
#[must_use]
pub fn merge_cities_and_points(
    city_coords: &LocationMap,
    point_coords: &LocationMap,
    city_weather: &WeatherMap,
    point_weather: &WeatherMap,
    dedup_radius_km: f64,
) -> WeatherMap {
    if city_weather.is_empty() {
        info!("No city weather in range, returning {} grid points", point_weather.len());
        return point_weather.clone();
    }

    let too_close = points_near_cities(city_coords, point_coords, dedup_radius_km);
    debug!(
        "{} of {} grid points lie within {} km of a city",
        too_close.len(),
        point_coords.len(),
        dedup_radius_km
    );
    merge_excluding(point_coords, city_weather, point_weather, &too_close)
}

/// Same as [`merge_cities_and_points`] with the too-close points already known
#[must_use]
pub fn merge_excluding(
    point_coords: &LocationMap,
    city_weather: &WeatherMap,
    point_weather: &WeatherMap,
    too_close: &BTreeSet<LocationKey>,
) -> WeatherMap {
    if city_weather.is_empty() {
        return point_weather.clone();
    }

    let mut merged = city_weather.clone();
    let mut added = 0usize;
    for key in point_coords.keys().filter(|key| !too_close.contains(*key)) {
        if let Some(record) = point_weather.get(key) {
            merged.insert(key.clone(), record.clone());
            added += 1;
        }
    }

    info!(
        "Merged {} cities with {} remote grid points",
        city_weather.len(),
        added
    );
    merged
}
