//! Sample-point grid covering a bounding box
//!
//! Rows run north to south and columns west to east. Steps are projected
//! on the sphere, so neighbours are `spacing_km` apart on the ground
//! rather than a fixed number of degrees.

use crate::geo::{BoundingBox, EAST, SOUTH, destination_point, round_to};
use crate::models::{Coordinate, LocationKey, LocationMap};
use crate::{Result, WeatherGridError};
use tracing::{debug, info};

/// Decimal places kept on every generated coordinate
const GRID_PRECISION: i32 = 4;

/// Upper bound on the points one grid may hold. A 500 km radius at the
/// 10 km minimum spacing needs about 10,000.
pub const MAX_GRID_POINTS: usize = 100_000;

/// Generate `point1`, `point2`, ... covering `bbox`, `spacing_km` apart.
///
/// The scan starts at the north-west corner `(lat_max, lon_min)`. Within a
/// row the latitude is fixed and each step east is projected from the
/// current point, keeping only the new longitude. Each new row is projected
/// due south from the west edge of the previous one. A row is emitted while
/// its latitude is `>= lat_min`; a column while its longitude is `<= lon_max`.
///
/// Fails with `InvalidInput` for a non-positive spacing, an invalid box, a
/// spacing so small that a step vanishes at grid precision, or a grid that
/// would exceed [`MAX_GRID_POINTS`].
pub fn generate_grid(bbox: &BoundingBox, spacing_km: f64) -> Result<LocationMap> {
    bbox.ensure_valid()?;
    if !spacing_km.is_finite() || spacing_km <= 0.0 {
        return Err(WeatherGridError::invalid_input(format!(
            "grid spacing must be a positive number of km, got {spacing_km}"
        )));
    }

    let mut points = LocationMap::new();
    let mut index: u32 = 0;
    let mut row_lat = bbox.lat_max;

    while row_lat >= bbox.lat_min {
        let mut lon = bbox.lon_min;
        let row_start = index;

        while lon <= bbox.lon_max {
            if points.len() >= MAX_GRID_POINTS {
                return Err(WeatherGridError::invalid_input(format!(
                    "grid spacing {spacing_km} km gives more than {MAX_GRID_POINTS} points"
                )));
            }
            index += 1;
            points.insert(LocationKey::point(index), Coordinate::new(row_lat, lon));

            let next = round_to(
                destination_point(&Coordinate::new(row_lat, lon), spacing_km, EAST).longitude,
                GRID_PRECISION,
            );
            if next <= lon {
                return Err(stalled(spacing_km));
            }
            lon = next;
        }
        debug!(
            "Grid row at lat {:.4}: {} points",
            row_lat,
            index - row_start
        );

        let next_row = round_to(
            destination_point(&Coordinate::new(row_lat, bbox.lon_min), spacing_km, SOUTH)
                .latitude,
            GRID_PRECISION,
        );
        if next_row >= row_lat {
            return Err(stalled(spacing_km));
        }
        row_lat = next_row;
    }

    info!(
        "Generated {} grid points at {} km spacing",
        points.len(),
        spacing_km
    );
    Ok(points)
}

fn stalled(spacing_km: f64) -> WeatherGridError {
    WeatherGridError::invalid_input(format!(
        "grid spacing {spacing_km} km is too small to advance at {GRID_PRECISION}-decimal precision"
    ))
}
