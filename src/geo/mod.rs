// Earth's mean radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometers,
/// rounded to two decimal places.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    // haversine: a = sin²(Δφ/2) + cos φ1 × cos φ2 × sin²(Δλ/2)
    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round2(EARTH_RADIUS_KM * c)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_zero_for_identical_points() {
        assert_eq!(distance_km(33.4484, -112.0740, 33.4484, -112.0740), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let forward = distance_km(33.4484, -112.0740, 33.3062, -111.8413);
        let backward = distance_km(33.3062, -111.8413, 33.4484, -112.0740);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_phoenix_to_tempe() {
        // Phoenix downtown to Tempe, roughly 12.7 km
        let distance = distance_km(33.4484, -112.0740, 33.4255, -111.9400);
        assert!(distance > 12.0 && distance < 13.5, "got {distance}");
    }

    #[test]
    fn test_result_has_two_decimal_places() {
        let distance = distance_km(33.4484, -112.0740, 33.3062, -111.8413);
        assert_eq!(distance, (distance * 100.0).round() / 100.0);
    }
}
