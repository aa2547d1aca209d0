//! Geohash range planning for radius queries.
//!
//! # Responsibility
//! - Turn `(center, radius)` into a small set of inclusive key ranges whose
//!   union covers the whole search circle.
//!
//! # Invariants
//! - Output is deterministic for identical inputs.
//! - Ranges over-include near the bounding-box corners; exact filtering is
//!   the caller's job.
//! - A non-positive radius yields no bounds.
//! - A search box reaching a pole, or spanning half the globe in longitude,
//!   plans the whole key space as one range.

use crate::error::FeedError;
use crate::geo::distance::miles_to_meters;
use crate::geo::geohash::{
    geohash_for_location, prefix_range, BASE32, BITS_PER_CHAR, MAXIMUM_BITS_PRECISION,
    RANGE_END_SENTINEL,
};
use crate::model::record::Coordinate;
use log::debug;

const EARTH_EQ_RADIUS_METERS: f64 = 6_378_137.0;
const EARTH_MERIDIONAL_CIRCUMFERENCE_METERS: f64 = 40_007_860.0;
const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.0;
/// Squared eccentricity of the WGS84 ellipsoid.
const E2: f64 = 0.006_694_478_197_99;
const EPSILON: f64 = 1e-12;

/// Inclusive range of locality keys for one range query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bound {
    pub start: String,
    pub end: String,
}

/// Plans the geohash ranges covering `radius_miles` around `center`.
///
/// Returns an empty list for a non-positive or non-finite radius.
pub fn plan_bounds(center: Coordinate, radius_miles: f64) -> Vec<Bound> {
    if !radius_miles.is_finite() || radius_miles <= 0.0 {
        let err = FeedError::EmptyBounds { radius_miles };
        debug!("event=plan_bounds module=geo status=empty reason={err}");
        return Vec::new();
    }

    let radius = miles_to_meters(radius_miles);
    if covers_all_longitudes(center, radius) {
        debug!(
            "event=plan_bounds module=geo status=ok radius_miles={radius_miles} query_bits=0 bounds=1 reason=polar"
        );
        return vec![Bound {
            start: char::from(BASE32[0]).to_string(),
            end: RANGE_END_SENTINEL.to_string(),
        }];
    }

    let query_bits = bounding_box_bits(center, radius).max(1);
    let precision = query_bits.div_ceil(BITS_PER_CHAR) as usize;

    let mut bounds: Vec<Bound> = Vec::with_capacity(9);
    for point in bounding_box_points(center, radius) {
        let (start, end) = prefix_range(&geohash_for_location(point, precision), query_bits);
        let bound = Bound { start, end };
        if !bounds.contains(&bound) {
            bounds.push(bound);
        }
    }

    debug!(
        "event=plan_bounds module=geo status=ok radius_miles={radius_miles} query_bits={query_bits} bounds={}",
        bounds.len()
    );
    bounds
}

/// Whether the circle can contain points at every longitude.
fn covers_all_longitudes(center: Coordinate, radius: f64) -> bool {
    let lat_degrees = radius / METERS_PER_DEGREE_LATITUDE;
    if center.lat + lat_degrees >= 90.0 || center.lat - lat_degrees <= -90.0 {
        return true;
    }
    let lng_degrees = meters_to_longitude_degrees(radius, center.lat + lat_degrees)
        .max(meters_to_longitude_degrees(radius, center.lat - lat_degrees));
    lng_degrees >= 180.0
}

fn meters_to_longitude_degrees(distance: f64, latitude: f64) -> f64 {
    let radians = latitude.to_radians();
    let num = radians.cos() * EARTH_EQ_RADIUS_METERS * std::f64::consts::PI / 180.0;
    let denom = 1.0 / (1.0 - E2 * radians.sin() * radians.sin()).sqrt();
    let delta_deg = num * denom;
    if delta_deg < EPSILON {
        if distance > 0.0 {
            360.0
        } else {
            0.0
        }
    } else {
        (distance / delta_deg).min(360.0)
    }
}

fn longitude_bits_for_resolution(resolution: f64, latitude: f64) -> f64 {
    let degrees = meters_to_longitude_degrees(resolution, latitude);
    if degrees.abs() > 0.000_001 {
        (360.0 / degrees).log2().max(1.0)
    } else {
        1.0
    }
}

fn latitude_bits_for_resolution(resolution: f64) -> f64 {
    (EARTH_MERIDIONAL_CIRCUMFERENCE_METERS / 2.0 / resolution)
        .log2()
        .min(f64::from(MAXIMUM_BITS_PRECISION))
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let adjusted = longitude + 180.0;
    if adjusted > 0.0 {
        (adjusted % 360.0) - 180.0
    } else {
        180.0 - (-adjusted % 360.0)
    }
}

/// Number of geohash bits whose cells are at least as large as the box.
fn bounding_box_bits(center: Coordinate, size: f64) -> u32 {
    let lat_delta = size / METERS_PER_DEGREE_LATITUDE;
    let latitude_north = (center.lat + lat_delta).min(90.0);
    let latitude_south = (center.lat - lat_delta).max(-90.0);
    let bits_lat = latitude_bits_for_resolution(size).floor() * 2.0;
    let bits_lng_north = longitude_bits_for_resolution(size, latitude_north).floor() * 2.0 - 1.0;
    let bits_lng_south = longitude_bits_for_resolution(size, latitude_south).floor() * 2.0 - 1.0;

    let bits = bits_lat
        .min(bits_lng_north)
        .min(bits_lng_south)
        .min(f64::from(MAXIMUM_BITS_PRECISION));
    if bits <= 0.0 {
        0
    } else {
        bits as u32
    }
}

/// Center, edge midpoints and corners of the radius bounding box.
fn bounding_box_points(center: Coordinate, radius: f64) -> [Coordinate; 9] {
    let lat_degrees = radius / METERS_PER_DEGREE_LATITUDE;
    let latitude_north = (center.lat + lat_degrees).min(90.0);
    let latitude_south = (center.lat - lat_degrees).max(-90.0);
    let lng_degrees = meters_to_longitude_degrees(radius, latitude_north)
        .max(meters_to_longitude_degrees(radius, latitude_south));
    let west = wrap_longitude(center.lng - lng_degrees);
    let east = wrap_longitude(center.lng + lng_degrees);

    [
        Coordinate::new(center.lat, center.lng),
        Coordinate::new(center.lat, west),
        Coordinate::new(center.lat, east),
        Coordinate::new(latitude_north, center.lng),
        Coordinate::new(latitude_north, west),
        Coordinate::new(latitude_south, center.lng),
        Coordinate::new(latitude_south, west),
        Coordinate::new(latitude_north, east),
        Coordinate::new(latitude_south, east),
    ]
}

#[cfg(test)]
mod tests {
    use super::{plan_bounds, wrap_longitude};
    use crate::geo::distance::EARTH_RADIUS_MILES;
    use crate::geo::geohash::{geohash_for_location, GEOHASH_PRECISION};
    use crate::model::record::Coordinate;

    fn covered(bounds: &[super::Bound], key: &str) -> bool {
        bounds
            .iter()
            .any(|bound| bound.start.as_str() <= key && key <= bound.end.as_str())
    }

    #[test]
    fn non_positive_radius_yields_no_bounds() {
        let center = Coordinate::new(40.0, -73.0);
        assert!(plan_bounds(center, 0.0).is_empty());
        assert!(plan_bounds(center, -5.0).is_empty());
        assert!(plan_bounds(center, f64::NAN).is_empty());
    }

    #[test]
    fn planning_is_deterministic() {
        let center = Coordinate::new(40.0, -73.0);
        assert_eq!(plan_bounds(center, 20.0), plan_bounds(center, 20.0));
    }

    #[test]
    fn bounds_are_unique_and_ordered_pairs() {
        let bounds = plan_bounds(Coordinate::new(51.5, -0.12), 20.0);
        assert!(!bounds.is_empty());
        assert!(bounds.len() <= 9);
        for (index, bound) in bounds.iter().enumerate() {
            assert!(bound.start < bound.end);
            assert!(!bounds[..index].contains(bound));
        }
    }

    #[test]
    fn bounds_cover_points_on_the_search_circle() {
        let center = Coordinate::new(40.0, -73.0);
        let bounds = plan_bounds(center, 20.0);
        // ~19.9 miles in each cardinal direction
        let lat_step = 19.9 / 69.09;
        let lng_step = 19.9 / (69.17 * center.lat.to_radians().cos());
        for point in [
            center,
            Coordinate::new(center.lat + lat_step, center.lng),
            Coordinate::new(center.lat - lat_step, center.lng),
            Coordinate::new(center.lat, center.lng + lng_step),
            Coordinate::new(center.lat, center.lng - lng_step),
        ] {
            let key = geohash_for_location(point, GEOHASH_PRECISION);
            assert!(covered(&bounds, &key), "{key} not covered by {bounds:?}");
        }
    }

    /// Point `miles` from `origin` along the initial `bearing` (degrees).
    fn destination(origin: Coordinate, bearing: f64, miles: f64) -> Coordinate {
        let delta = miles / EARTH_RADIUS_MILES;
        let (lat1, lng1, theta) = (
            origin.lat.to_radians(),
            origin.lng.to_radians(),
            bearing.to_radians(),
        );
        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lng2 = lng1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());
        let lng = (lng2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
        Coordinate::new(lat2.to_degrees(), lng)
    }

    #[test]
    fn bounds_cover_circles_reaching_a_pole() {
        for (center, radius) in [
            (Coordinate::new(89.8, 0.0), 20.0),
            (Coordinate::new(89.8, 0.0), 100.0),
            (Coordinate::new(-89.8, 45.0), 20.0),
            (Coordinate::new(-89.8, 45.0), 100.0),
        ] {
            let bounds = plan_bounds(center, radius);
            for step in 0..360 {
                for fraction in [0.3, 0.7, 0.99] {
                    let point = destination(center, f64::from(step), radius * fraction);
                    let key = geohash_for_location(point, GEOHASH_PRECISION);
                    assert!(
                        covered(&bounds, &key),
                        "{key} ({point:?}) not covered around {center:?} r={radius}"
                    );
                }
            }
        }

        let across_pole = geohash_for_location(Coordinate::new(89.995, 126.23), GEOHASH_PRECISION);
        assert!(covered(&plan_bounds(Coordinate::new(89.8, 0.0), 20.0), &across_pole));
    }

    #[test]
    fn mid_latitude_bounds_stay_narrow() {
        let bounds = plan_bounds(Coordinate::new(40.0, -73.0), 20.0);
        assert!(bounds.iter().all(|bound| bound.start.len() > 1));
    }

    #[test]
    fn wrap_longitude_folds_into_range() {
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(45.0), 45.0);
    }
}
