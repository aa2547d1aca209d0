//! Great-circle distance.

use crate::model::record::Coordinate;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;
/// Meters in one statute mile.
pub const METERS_PER_MILE: f64 = 1609.34;

/// Haversine distance between two coordinates, in miles.
pub fn distance_miles(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    // clamp: rounding can push `h` slightly past 1 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_MILES * c
}

/// Converts miles to meters.
pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

#[cfg(test)]
mod tests {
    use super::distance_miles;
    use crate::model::record::Coordinate;

    #[test]
    fn distance_is_zero_for_same_point() {
        let point = Coordinate::new(40.0, -73.0);
        assert!(distance_miles(point, point).abs() < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(40.7128, -74.0060);
        let b = Coordinate::new(34.0522, -118.2437);
        assert!((distance_miles(a, b) - distance_miles(b, a)).abs() < 1e-9);
    }

    #[test]
    fn new_york_to_los_angeles_is_about_2445_miles() {
        let nyc = Coordinate::new(40.7128, -74.0060);
        let la = Coordinate::new(34.0522, -118.2437);
        let miles = distance_miles(nyc, la);
        assert!((miles - 2445.0).abs() < 10.0, "got {miles}");
    }

    #[test]
    fn one_degree_of_latitude_is_about_69_miles() {
        let a = Coordinate::new(40.0, -73.0);
        let b = Coordinate::new(41.0, -73.0);
        let miles = distance_miles(a, b);
        assert!((miles - 69.09).abs() < 0.1, "got {miles}");
    }
}
