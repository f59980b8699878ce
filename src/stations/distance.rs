use crate::types::location::LatLon;
use haversine::{distance as haversine_distance, Location as HaversineLocation, Units};

/// Great-circle distance in kilometers between two points, haversine formula on
/// a sphere of radius 6371 km. Elevation is ignored.
pub fn distance(from: LatLon, to: LatLon) -> f64 {
    haversine_distance(
        HaversineLocation {
            latitude: from.0,
            longitude: from.1,
        },
        HaversineLocation {
            latitude: to.0,
            longitude: to.1,
        },
        Units::Kilometers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAIPEI: LatLon = LatLon(25.0478, 121.5170);
    const KAOHSIUNG: LatLon = LatLon(22.6394, 120.3022);

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance(TAIPEI, TAIPEI), 0.0);
        assert_eq!(distance(LatLon(-33.86, 151.2), LatLon(-33.86, 151.2)), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (TAIPEI, KAOHSIUNG),
            (LatLon(0.0, 0.0), LatLon(0.0, 180.0)),
            (LatLon(60.0, -45.0), LatLon(-12.5, 100.25)),
        ];
        for (a, b) in pairs {
            assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn known_distances() {
        // Taipei Main Station to Kaohsiung Main Station, roughly 295 km.
        let d = distance(TAIPEI, KAOHSIUNG);
        assert!((d - 295.0).abs() < 2.0, "got {d}");

        // One degree of longitude on the equator.
        let d = distance(LatLon(0.0, 0.0), LatLon(0.0, 1.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }
}
