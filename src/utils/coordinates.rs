use crate::error::{ProcessingError, Result};
use crate::utils::constants::{RD_MAX_LAT, RD_MAX_LON, RD_MIN_LAT, RD_MIN_LON};

/// Amersfoort reference point of the RD grid in WGS84 degrees
const RD_REF_LAT: f64 = 52.155_174_40;
const RD_REF_LON: f64 = 5.387_206_21;

/// Amersfoort reference point in RD meters
const RD_REF_X: f64 = 155_000.0;
const RD_REF_Y: f64 = 463_000.0;

/// (p, q, coefficient) terms of the WGS84 -> RD polynomial, in dlat^p * dlon^q
const RD_X_TERMS: [(i32, i32, f64); 9] = [
    (0, 1, 190_094.945),
    (1, 1, -11_832.228),
    (2, 1, -114.221),
    (0, 3, -32.391),
    (1, 0, -0.705),
    (3, 1, -2.340),
    (1, 3, -0.608),
    (0, 2, -0.008),
    (2, 3, 0.148),
];

const RD_Y_TERMS: [(i32, i32, f64); 10] = [
    (1, 0, 309_056.544),
    (0, 2, 3_638.893),
    (2, 0, 73.077),
    (1, 2, -157.984),
    (3, 0, 59.788),
    (0, 1, 0.433),
    (2, 2, -6.439),
    (1, 1, -0.032),
    (0, 4, 0.092),
    (1, 4, -0.054),
];

/// (p, q, coefficient) terms of the RD -> WGS84 polynomial, in dx^p * dy^q
const WGS_LAT_TERMS: [(i32, i32, f64); 11] = [
    (0, 1, 3_235.653_89),
    (2, 0, -32.582_97),
    (0, 2, -0.247_50),
    (2, 1, -0.849_78),
    (0, 3, -0.065_50),
    (2, 2, -0.017_09),
    (1, 0, -0.007_38),
    (4, 0, 0.005_30),
    (2, 3, -0.000_39),
    (4, 1, 0.000_33),
    (1, 1, -0.000_12),
];

const WGS_LON_TERMS: [(i32, i32, f64); 12] = [
    (1, 0, 5_260.529_16),
    (1, 1, 105.946_84),
    (1, 2, 2.456_56),
    (3, 0, -0.818_85),
    (1, 3, 0.055_94),
    (3, 1, -0.056_07),
    (0, 1, 0.011_99),
    (3, 2, -0.002_56),
    (1, 4, 0.001_28),
    (0, 2, 0.000_22),
    (2, 0, -0.000_22),
    (5, 0, 0.000_26),
];

fn polynomial(terms: &[(i32, i32, f64)], a: f64, b: f64) -> f64 {
    terms
        .iter()
        .map(|&(p, q, coefficient)| coefficient * a.powi(p) * b.powi(q))
        .sum()
}

/// Convert WGS84 latitude/longitude to RD New (EPSG:28992) easting/northing in meters.
///
/// Uses the RD/WGS84 approximation polynomials, accurate to well under a
/// meter inside the Netherlands.
///
/// # Examples
/// ```
/// use pfas_cleaner::utils::wgs84_to_rd;
///
/// let (x, y) = wgs84_to_rd(52.155_174_40, 5.387_206_21);
/// assert!((x - 155_000.0).abs() < 0.01);
/// assert!((y - 463_000.0).abs() < 0.01);
/// ```
pub fn wgs84_to_rd(lat: f64, lon: f64) -> (f64, f64) {
    let dlat = 0.36 * (lat - RD_REF_LAT);
    let dlon = 0.36 * (lon - RD_REF_LON);

    let x = RD_REF_X + polynomial(&RD_X_TERMS, dlat, dlon);
    let y = RD_REF_Y + polynomial(&RD_Y_TERMS, dlat, dlon);
    (x, y)
}

/// Convert RD New easting/northing in meters back to WGS84 latitude/longitude.
pub fn rd_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let dx = (x - RD_REF_X) * 1e-5;
    let dy = (y - RD_REF_Y) * 1e-5;

    let lat = RD_REF_LAT + polynomial(&WGS_LAT_TERMS, dx, dy) / 3600.0;
    let lon = RD_REF_LON + polynomial(&WGS_LON_TERMS, dx, dy) / 3600.0;
    (lat, lon)
}

/// Validate that a latitude/longitude pair lies on the WGS84 globe
pub fn validate_wgs84_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Latitude {} is outside [-90, 90]",
            latitude
        )));
    }

    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Longitude {} is outside [-180, 180]",
            longitude
        )));
    }

    Ok(())
}

/// Whether a WGS84 position is inside the area the RD polynomials are valid for
pub fn is_within_rd_domain(latitude: f64, longitude: f64) -> bool {
    (RD_MIN_LAT..=RD_MAX_LAT).contains(&latitude) && (RD_MIN_LON..=RD_MAX_LON).contains(&longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_point_maps_to_grid_origin() {
        let (x, y) = wgs84_to_rd(RD_REF_LAT, RD_REF_LON);
        assert!((x - 155_000.0).abs() < 1e-6);
        assert!((y - 463_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_amsterdam_dam_square() {
        // Dam square is roughly at RD (121 360, 487 360)
        let (x, y) = wgs84_to_rd(52.3731, 4.8932);
        assert!((x - 121_358.4).abs() < 1.0, "x = {}", x);
        assert!((y - 487_361.6).abs() < 1.0, "y = {}", y);
    }

    #[test]
    fn test_rd_round_trip() {
        for (lat, lon) in [(52.3731, 4.8932), (51.4416, 5.4697), (53.2194, 6.5665)] {
            let (x, y) = wgs84_to_rd(lat, lon);
            let (back_lat, back_lon) = rd_to_wgs84(x, y);
            assert!((back_lat - lat).abs() < 1e-5);
            assert!((back_lon - lon).abs() < 1e-5);
        }
    }

    #[test]
    fn test_metric_scale_near_amsterdam() {
        // 0.01 degree of latitude is about 1.1 km
        let (_, y1) = wgs84_to_rd(52.30, 4.90);
        let (_, y2) = wgs84_to_rd(52.31, 4.90);
        assert!(((y2 - y1) - 1_112.0).abs() < 5.0);
    }

    #[test]
    fn test_wgs84_validation() {
        assert!(validate_wgs84_coordinates(52.3, 4.9).is_ok());
        assert!(validate_wgs84_coordinates(91.0, 4.9).is_err());
        assert!(validate_wgs84_coordinates(52.3, -181.0).is_err());
        assert!(validate_wgs84_coordinates(f64::NAN, 4.9).is_err());
    }

    #[test]
    fn test_rd_domain() {
        assert!(is_within_rd_domain(52.3731, 4.8932));
        assert!(!is_within_rd_domain(48.8566, 2.3522)); // Paris
        assert!(!is_within_rd_domain(-33.86, 151.21));
    }
}
