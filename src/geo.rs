use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance using the haversine formula.
/// Input lat/lon in degrees. Output in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// GeoJSON position: `[longitude, latitude]`.
pub type Position = [f64; 2];

/// A point on the globe in degrees. Ranges are not validated.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reads a lon-first GeoJSON position.
    pub fn from_position(position: Position) -> Self {
        Self {
            lat: position[1],
            lon: position[0],
        }
    }

    pub fn to_position(self) -> Position {
        [self.lon, self.lat]
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_meters(self.lat, self.lon, other.lat, other.lon)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const MONTREAL: Coordinate = Coordinate::new(45.5017, -73.5673);

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_meters(45.5017, -73.5673, 45.5017, -73.5673), 0.0);
        assert_eq!(MONTREAL.distance_to(&MONTREAL), 0.0);
        let pole = Coordinate::new(90.0, 12.0);
        assert_eq!(pole.distance_to(&pole), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = haversine_meters(0.0, 0.0, 0.0, 1.0);
        assert_abs_diff_eq!(d, 111_195.0, epsilon = 50.0);
    }

    #[test]
    fn symmetric() {
        let points = [
            MONTREAL,
            Coordinate::new(0.0, 0.0),
            Coordinate::new(-33.8688, 151.2093),
            Coordinate::new(51.5074, -0.1278),
            Coordinate::new(-89.5, 179.9),
        ];
        for a in &points {
            for b in &points {
                assert_eq!(a.distance_to(b), b.distance_to(a));
            }
        }
    }

    #[test]
    fn nyc_to_la() {
        let nyc = Coordinate::new(40.7128, -74.0060);
        let la = Coordinate::new(34.0522, -118.2437);
        assert_abs_diff_eq!(nyc.distance_to(&la), 3_936_000.0, epsilon = 50_000.0);
    }

    #[test]
    fn position_is_lon_first() {
        let c = Coordinate::from_position([-73.5673, 45.5017]);
        assert_eq!(c, MONTREAL);
        assert_eq!(MONTREAL.to_position(), [-73.5673, 45.5017]);
    }
}
