//! Spherical geometry on a 6371 km Earth
//!
//! Great-circle distance, destination-point projection and the search
//! bounding box derived from a center point and a radius.

use crate::models::Coordinate;
use crate::{Result, WeatherGridError};
use haversine::{Location as HaversineLocation, Units, distance};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Bearing due north, in radians
pub const NORTH: f64 = 0.0;
/// Bearing due east, in radians
pub const EAST: f64 = FRAC_PI_2;
/// Bearing due south, in radians
pub const SOUTH: f64 = PI;

/// Round `value` to `places` decimal places
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let multiplier = 10_f64.powi(places);
    (value * multiplier).round() / multiplier
}

/// Haversine distance between two coordinates in km, rounded to 2 decimals
#[must_use]
pub fn great_circle_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let km = distance(
        HaversineLocation {
            latitude: a.latitude,
            longitude: a.longitude,
        },
        HaversineLocation {
            latitude: b.latitude,
            longitude: b.longitude,
        },
        Units::Kilometers,
    );
    round_to(km, 2)
}

/// Point reached by travelling `distance_km` from `origin` along the
/// initial bearing `bearing` (radians, 0 = north, clockwise).
///
/// Longitudes are not normalized; callers stay clear of the anti-meridian.
#[must_use]
pub fn destination_point(origin: &Coordinate, distance_km: f64, bearing: f64) -> Coordinate {
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();
    let angular = distance_km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinate::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Axis-aligned latitude/longitude rectangle around a search center
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_max: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lon_min: f64,
}

impl BoundingBox {
    /// Inclusive rectangular membership test
    #[must_use]
    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&coord.latitude)
            && (self.lon_min..=self.lon_max).contains(&coord.longitude)
    }

    /// Reject boxes that are not finite or whose bounds are inverted
    pub fn ensure_valid(&self) -> Result<()> {
        let bounds = [self.lat_max, self.lat_min, self.lon_max, self.lon_min];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(WeatherGridError::invalid_input(format!(
                "bounding box has non-finite bounds: {self:?}"
            )));
        }
        if self.lat_max < self.lat_min || self.lon_max < self.lon_min {
            return Err(WeatherGridError::invalid_input(format!(
                "bounding box bounds are inverted: {self:?}"
            )));
        }
        Ok(())
    }
}

/// Bounding box for `radius_km` around `center`.
///
/// The north and east edges are projected geodesically; the south and west
/// edges mirror them across the center, so the box is exactly centered in
/// degree space. This is an approximation and not a true geodesic box: at
/// high latitudes the mirrored south edge is slightly closer than `radius_km`.
/// All four bounds are rounded to 4 decimals.
pub fn bounding_box(center: &Coordinate, radius_km: f64) -> Result<BoundingBox> {
    if !center.is_valid() {
        return Err(WeatherGridError::invalid_input(format!(
            "center {center} is outside (-90, 90) x (-180, 180)"
        )));
    }
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(WeatherGridError::invalid_input(format!(
            "radius must be a non-negative number of km, got {radius_km}"
        )));
    }

    let lat_max = destination_point(center, radius_km, NORTH).latitude;
    let lat_min = center.latitude - (lat_max - center.latitude).abs();

    let lon_max = destination_point(center, radius_km, EAST).longitude;
    let lon_min = center.longitude - (lon_max - center.longitude).abs();

    Ok(BoundingBox {
        lat_max: round_to(lat_max, 4),
        lat_min: round_to(lat_min, 4),
        lon_max: round_to(lon_max, 4),
        lon_min: round_to(lon_min, 4),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-3.00005, 4), -3.0001);
    }

    #[rstest]
    #[case(Coordinate::new(40.0, -3.0), Coordinate::new(41.38, 2.17))]
    #[case(Coordinate::new(-33.86, 151.2), Coordinate::new(-37.81, 144.96))]
    #[case(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0))]
    fn test_distance_is_symmetric(#[case] a: Coordinate, #[case] b: Coordinate) {
        assert_eq!(great_circle_distance(&a, &b), great_circle_distance(&b, &a));
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = Coordinate::new(46.8182, 8.2275);
        assert_eq!(great_circle_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_one_degree_of_longitude_at_equator() {
        let d = great_circle_distance(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 1.0));
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_madrid_to_barcelona() {
        let d = great_circle_distance(
            &Coordinate::new(40.4168, -3.7038),
            &Coordinate::new(41.3874, 2.1686),
        );
        assert!((d - 505.0).abs() < 5.0, "got {d}");
    }

    #[rstest]
    #[case(NORTH)]
    #[case(EAST)]
    #[case(SOUTH)]
    #[case(1.0)]
    #[case(4.2)]
    fn test_destination_lies_at_requested_distance(#[case] bearing: f64) {
        let origin = Coordinate::new(40.0, -3.0);
        for km in [0.0, 10.0, 50.0, 250.0] {
            let dest = destination_point(&origin, km, bearing);
            let measured = great_circle_distance(&origin, &dest);
            assert!(
                (measured - km).abs() <= 0.01,
                "bearing {bearing}, expected {km}, measured {measured}"
            );
        }
    }

    #[test]
    fn test_destination_cardinal_directions() {
        let origin = Coordinate::new(10.0, 20.0);

        let north = destination_point(&origin, 100.0, NORTH);
        assert!(north.latitude > origin.latitude);
        assert!((north.longitude - origin.longitude).abs() < 1e-9);

        let south = destination_point(&origin, 100.0, SOUTH);
        assert!(south.latitude < origin.latitude);

        let east = destination_point(&origin, 100.0, EAST);
        assert!(east.longitude > origin.longitude);
    }

    #[test]
    fn test_bounding_box_is_centered() {
        let center = Coordinate::new(40.0, -3.0);
        let bbox = bounding_box(&center, 50.0).unwrap();

        let north = bbox.lat_max - center.latitude;
        let south = center.latitude - bbox.lat_min;
        assert!((north - south).abs() < 1e-9, "{north} vs {south}");

        let east = bbox.lon_max - center.longitude;
        let west = center.longitude - bbox.lon_min;
        assert!((east - west).abs() < 1e-9, "{east} vs {west}");
    }

    #[test]
    fn test_bounding_box_extent() {
        let bbox = bounding_box(&Coordinate::new(40.0, -3.0), 50.0).unwrap();
        // 50 km is ~0.4497 degrees of latitude
        assert_eq!(bbox.lat_max, 40.4497);
        assert_eq!(bbox.lat_min, 39.5503);
        // and wider in longitude because of meridian convergence
        assert!(bbox.lon_max - bbox.lon_min > bbox.lat_max - bbox.lat_min);
    }

    #[test]
    fn test_bounding_box_bounds_are_rounded() {
        let bbox = bounding_box(&Coordinate::new(12.3456, 65.4321), 37.0).unwrap();
        for b in [bbox.lat_max, bbox.lat_min, bbox.lon_max, bbox.lon_min] {
            assert_eq!(b, round_to(b, 4));
        }
    }

    #[rstest]
    #[case(Coordinate::new(95.0, 0.0), 50.0)]
    #[case(Coordinate::new(0.0, 0.0), -1.0)]
    #[case(Coordinate::new(0.0, 0.0), f64::NAN)]
    fn test_bounding_box_rejects_bad_input(#[case] center: Coordinate, #[case] radius: f64) {
        assert!(matches!(
            bounding_box(&center, radius),
            Err(WeatherGridError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_box_contains_is_inclusive() {
        let bbox = BoundingBox {
            lat_max: 1.0,
            lat_min: -1.0,
            lon_max: 2.0,
            lon_min: -2.0,
        };
        assert!(bbox.contains(&Coordinate::new(1.0, 2.0)));
        assert!(bbox.contains(&Coordinate::new(-1.0, -2.0)));
        assert!(!bbox.contains(&Coordinate::new(1.0001, 0.0)));
        assert!(!bbox.contains(&Coordinate::new(0.0, -2.0001)));
    }

    #[test]
    fn test_inverted_box_is_invalid() {
        let bbox = BoundingBox {
            lat_max: -1.0,
            lat_min: 1.0,
            lon_max: 2.0,
            lon_min: -2.0,
        };
        assert!(bbox.ensure_valid().is_err());
    }
}
