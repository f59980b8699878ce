use crate::stations::distance::distance;
use crate::stations::error::LocateStationError;
use crate::types::location::LatLon;
use crate::types::station::Station;
use log::debug;
use ordered_float::OrderedFloat;
use std::collections::HashSet;

/// Resolves coordinates to the nearest monitoring station.
///
/// Stations on the deny-list (stations whose supplementary-data endpoints are
/// known to be missing) are dropped when the locator is built, so they can never
/// be returned even if they are geographically nearest.
#[derive(Debug, Clone)]
pub struct StationLocator {
    stations: Vec<Station>,
}

// Helper struct for tracking the best candidate during the scan
struct StationCandidate<'a> {
    distance_km: OrderedFloat<f64>,
    station: &'a Station,
}

impl StationLocator {
    pub fn new<S: AsRef<str>>(stations: Vec<Station>, deny_list: &[S]) -> Self {
        let denied: HashSet<&str> = deny_list.iter().map(|id| AsRef::<str>::as_ref(id)).collect();
        let total = stations.len();
        let stations: Vec<Station> = stations
            .into_iter()
            .filter(|station| !denied.contains(station.id.as_str()))
            .collect();
        debug!(
            "Station locator built with {} of {} stations ({} deny-listed)",
            stations.len(),
            total,
            total - stations.len()
        );
        Self { stations }
    }

    /// The candidate stations, deny-listed stations already removed.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Finds the station nearest to `target`, along with its distance in kilometers.
    ///
    /// Linear scan over all candidates. On equal distances the station listed first wins.
    ///
    /// # Errors
    ///
    /// Returns [`LocateStationError::NoStations`] if there are no candidates, and
    /// [`LocateStationError::InvalidCoordinates`] if a candidate's coordinates do not parse.
    pub fn nearest(&self, target: LatLon) -> Result<(&Station, f64), LocateStationError> {
        let mut best: Option<StationCandidate<'_>> = None;

        for station in &self.stations {
            let distance_km = OrderedFloat(distance(target, station.location()?));
            let closer = best
                .as_ref()
                .map_or(true, |current| distance_km < current.distance_km);
            if closer {
                best = Some(StationCandidate { distance_km, station });
            }
        }

        best.map(|c| (c.station, c.distance_km.into_inner()))
            .ok_or(LocateStationError::NoStations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, lat: f64, lon: f64) -> Station {
        Station {
            id: id.to_string(),
            name: format!("Station {id}"),
            county: "臺北市".to_string(),
            township: "中山區".to_string(),
            area_name: "北部空品區".to_string(),
            latitude: lat.to_string(),
            longitude: lon.to_string(),
        }
    }

    fn taipei_stations() -> Vec<Station> {
        vec![
            station("1", 25.0620, 121.5265), // Zhongshan
            station("2", 25.0463, 121.5162), // Guting-ish, close to Taipei Main
            station("3", 22.6333, 120.3470), // Kaohsiung
            station("4", 24.1510, 120.6415), // Taichung
        ]
    }

    #[test]
    fn nearest_is_no_farther_than_any_other() {
        let locator = StationLocator::new(taipei_stations(), &[] as &[&str]);
        let targets = [
            LatLon(25.0478, 121.5170),
            LatLon(22.6394, 120.3022),
            LatLon(24.0, 120.0),
            LatLon(-33.0, 151.0),
        ];
        for target in targets {
            let (nearest, nearest_km) = locator.nearest(target).unwrap();
            for other in locator.stations() {
                let other_km = distance(target, other.location().unwrap());
                assert!(
                    nearest_km <= other_km,
                    "{} at {nearest_km} km is farther than {} at {other_km} km",
                    nearest.id,
                    other.id
                );
            }
        }
        let (nearest, _) = locator.nearest(LatLon(25.0478, 121.5170)).unwrap();
        assert_eq!(nearest.id, "2");
    }

    #[test]
    fn singleton_list_returns_that_station() {
        let locator = StationLocator::new(vec![station("9", 23.0, 120.0)], &[] as &[&str]);
        let (nearest, _) = locator.nearest(LatLon(25.0, 121.5)).unwrap();
        assert_eq!(nearest.id, "9");
    }

    #[test]
    fn empty_list_is_an_error() {
        let locator = StationLocator::new(Vec::new(), &[] as &[&str]);
        let err = locator.nearest(LatLon(25.0, 121.5)).unwrap_err();
        assert!(matches!(err, LocateStationError::NoStations));
    }

    #[test]
    fn deny_listed_station_is_never_returned() {
        let locator = StationLocator::new(taipei_stations(), &["2"]);
        let (nearest, _) = locator.nearest(LatLon(25.0463, 121.5162)).unwrap();
        assert_eq!(nearest.id, "1");
        assert!(locator.stations().iter().all(|s| s.id != "2"));
    }

    #[test]
    fn everything_deny_listed_is_an_error() {
        let locator = StationLocator::new(vec![station("5", 25.0, 121.0)], &["5".to_string()]);
        assert!(matches!(
            locator.nearest(LatLon(25.0, 121.0)),
            Err(LocateStationError::NoStations)
        ));
    }

    #[test]
    fn ties_go_to_the_first_station() {
        let stations = vec![
            station("east", 0.0, 1.0),
            station("west", 0.0, -1.0),
        ];
        let locator = StationLocator::new(stations.clone(), &[] as &[&str]);
        let (nearest, _) = locator.nearest(LatLon(0.0, 0.0)).unwrap();
        assert_eq!(nearest.id, "east");

        let reversed: Vec<Station> = stations.into_iter().rev().collect();
        let locator = StationLocator::new(reversed, &[] as &[&str]);
        let (nearest, _) = locator.nearest(LatLon(0.0, 0.0)).unwrap();
        assert_eq!(nearest.id, "west");
    }

    #[test]
    fn bad_coordinates_are_reported() {
        let mut broken = station("8", 0.0, 0.0);
        broken.latitude = "N/A".to_string();
        let locator = StationLocator::new(vec![broken], &[] as &[&str]);
        assert!(matches!(
            locator.nearest(LatLon(0.0, 0.0)),
            Err(LocateStationError::InvalidCoordinates { .. })
        ));
    }
}
