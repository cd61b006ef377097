use chrono::{DateTime, Utc};

use crate::error::TripError;
use crate::models::GeoPoint;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Great-circle distance in meters on a spherical Earth.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Length of the path following every waypoint in order.
pub fn total_distance_m(path: &[GeoPoint]) -> f64 {
    path.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}

/// Average speed in km/h over the elapsed wall time.
///
/// Returns [`TripError::DegenerateDuration`] when no time elapsed (or the clock
/// went backwards) instead of a non-finite value.
pub fn average_speed_kmh(
    total_distance_m: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<f64, TripError> {
    let elapsed_ms = (end - start).num_milliseconds();
    if elapsed_ms <= 0 {
        return Err(TripError::DegenerateDuration);
    }
    let hours = elapsed_ms as f64 / MS_PER_HOUR;
    Ok((total_distance_m / 1000.0) / hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint { lat, lon }
    }

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(0).unwrap()
    }

    #[test]
    fn test_haversine_same_point() {
        let p = point(45.0, 5.0);
        assert_eq!(haversine_m(p, p), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_of_longitude_on_equator() {
        let dist = haversine_m(point(0.0, 0.0), point(0.0, 1.0));
        assert!((dist - 111_195.0).abs() < 1_111.95, "got {dist}");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris -> London, roughly 344 km
        let dist = haversine_m(point(48.8566, 2.3522), point(51.5074, -0.1278));
        assert!((dist - 343_500.0).abs() < 2_000.0, "got {dist}");
    }

    #[test]
    fn test_total_distance_empty() {
        assert_eq!(total_distance_m(&[]), 0.0);
    }

    #[test]
    fn test_total_distance_single_point() {
        assert_eq!(total_distance_m(&[point(45.0, 5.0)]), 0.0);
    }

    #[test]
    fn test_total_distance_follows_the_path() {
        let a = point(0.0, 0.0);
        let b = point(1.0, 1.0);
        let c = point(0.0, 2.0);
        let along = total_distance_m(&[a, b, c]);
        assert!((along - (haversine_m(a, b) + haversine_m(b, c))).abs() < 1e-6);
        assert!(along > haversine_m(a, c));
    }

    #[test]
    fn test_average_speed_over_one_hour() {
        let speed = average_speed_kmh(2_224.0, epoch(), epoch() + Duration::hours(1)).unwrap();
        assert!((speed - 2.224).abs() < 1e-9);
    }

    #[test]
    fn test_average_speed_zero_duration() {
        let result = average_speed_kmh(1_000.0, epoch(), epoch());
        assert!(matches!(result, Err(TripError::DegenerateDuration)));
    }

    #[test]
    fn test_average_speed_clock_going_backwards() {
        let result = average_speed_kmh(1_000.0, epoch() + Duration::seconds(5), epoch());
        assert!(matches!(result, Err(TripError::DegenerateDuration)));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_point() -> impl Strategy<Value = GeoPoint> {
            (-90.0..=90.0, -180.0..=180.0).prop_map(|(lat, lon)| GeoPoint { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_haversine_non_negative(a in valid_point(), b in valid_point()) {
                prop_assert!(haversine_m(a, b) >= 0.0);
            }

            #[test]
            fn prop_haversine_symmetric(a in valid_point(), b in valid_point()) {
                let dist_ab = haversine_m(a, b);
                let dist_ba = haversine_m(b, a);
                prop_assert!((dist_ab - dist_ba).abs() < 1e-6);
            }

            #[test]
            fn prop_haversine_same_point_is_zero(p in valid_point()) {
                prop_assert_eq!(haversine_m(p, p), 0.0);
            }

            #[test]
            fn prop_haversine_bounded_by_half_circumference(a in valid_point(), b in valid_point()) {
                let max_distance = std::f64::consts::PI * EARTH_RADIUS_M;
                prop_assert!(haversine_m(a, b) <= max_distance + 1.0);
            }

            #[test]
            fn prop_total_distance_is_sum_of_legs(
                path in prop::collection::vec(valid_point(), 0..12)
            ) {
                let expected: f64 = path
                    .iter()
                    .zip(path.iter().skip(1))
                    .map(|(a, b)| haversine_m(*a, *b))
                    .sum();
                prop_assert!((total_distance_m(&path) - expected).abs() < 1e-6);
            }

            #[test]
            fn prop_total_distance_concatenation(
                first in prop::collection::vec(valid_point(), 1..5),
                second in prop::collection::vec(valid_point(), 1..5)
            ) {
                let mut combined = first.clone();
                combined.extend_from_slice(&second);

                let connection = haversine_m(*first.last().unwrap(), second[0]);
                let expected = total_distance_m(&first) + connection + total_distance_m(&second);
                prop_assert!((total_distance_m(&combined) - expected).abs() < 1e-3);
            }

            #[test]
            fn prop_average_speed_finite_for_positive_duration(
                distance in 0.0..1_000_000.0f64,
                elapsed_ms in 1i64..86_400_000
            ) {
                let speed = average_speed_kmh(
                    distance,
                    epoch(),
                    epoch() + Duration::milliseconds(elapsed_ms),
                ).unwrap();
                prop_assert!(speed.is_finite());
                prop_assert!(speed >= 0.0);
            }
        }
    }
}
