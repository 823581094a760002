//! Nearest-station resolution: cheap bounding-box prefilter in SQL, then
//! haversine ranking over the candidates.

use beacon_db::Database;
use beacon_db::models::StationRow;
use tracing::warn;

/// Stations farther than this from the SOS location are never matched.
pub const SEARCH_RADIUS_KM: f64 = 10.0;

/// Kilometres per degree of latitude.
const KM_PER_DEG_LAT: f64 = 111.045;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Box of ±radius around a point. The longitude span widens by
    /// 1/cos(latitude) to account for meridian convergence.
    pub fn around(lat: f64, lon: f64, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEG_LAT;
        // cos -> 0 near the poles; clamp so the box stays finite
        let lon_delta = radius_km / (KM_PER_DEG_LAT * lat.to_radians().cos().abs().max(1e-6));
        BoundingBox {
            lat_min: lat - lat_delta,
            lat_max: lat + lat_delta,
            lon_min: lon - lon_delta,
            lon_max: lon + lon_delta,
        }
    }
}

/// Rank prefiltered candidates by haversine distance. Candidates without
/// coordinates or beyond the search radius are dropped.
pub fn rank_nearest(lat: f64, lon: f64, candidates: Vec<StationRow>) -> Option<StationRow> {
    candidates
        .into_iter()
        .filter_map(|s| match (s.latitude, s.longitude) {
            (Some(slat), Some(slon)) => Some((haversine_km(lat, lon, slat, slon), s)),
            _ => None,
        })
        .filter(|(d, _)| *d <= SEARCH_RADIUS_KM)
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, s)| s)
}

/// Resolve the nearest station within [`SEARCH_RADIUS_KM`], or `None`.
/// Any data-layer failure degrades to `None` — station resolution must
/// never abort ticket creation.
pub fn resolve_nearest(db: &Database, lat: f64, lon: f64) -> Option<StationRow> {
    let bbox = BoundingBox::around(lat, lon, SEARCH_RADIUS_KM);
    match db.stations_in_box(bbox.lat_min, bbox.lat_max, bbox.lon_min, bbox.lon_max) {
        Ok(candidates) => rank_nearest(lat, lon, candidates),
        Err(e) => {
            warn!("Station lookup failed, proceeding without responder: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, lat: f64, lon: f64) -> StationRow {
        StationRow {
            id: id.to_string(),
            name: format!("PS {}", id),
            address: "MG Road".to_string(),
            phone: "+911234567890".to_string(),
            email: format!("{}@police.example", id),
            latitude: Some(lat),
            longitude: Some(lon),
            api_key: None,
        }
    }

    #[test]
    fn haversine_known_distances() {
        // same point
        assert!(haversine_km(28.6139, 77.2090, 28.6139, 77.2090) < 1e-9);

        // one degree of latitude at the equator ≈ 111.19 km for R=6371
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.5, "got {}", d);

        // Connaught Place to India Gate is roughly 2.2 km
        let d = haversine_km(28.6315, 77.2167, 28.6129, 77.2295);
        assert!(d > 1.5 && d < 3.0, "got {}", d);
    }

    #[test]
    fn bounding_box_widens_with_latitude() {
        let equator = BoundingBox::around(0.0, 77.0, 10.0);
        let high = BoundingBox::around(60.0, 77.0, 10.0);

        let eq_span = equator.lon_max - equator.lon_min;
        let high_span = high.lon_max - high.lon_min;
        assert!(high_span > eq_span * 1.9, "{} vs {}", high_span, eq_span);

        // latitude span is latitude-independent
        let eq_lat = equator.lat_max - equator.lat_min;
        let high_lat = high.lat_max - high.lat_min;
        assert!((eq_lat - high_lat).abs() < 1e-12);
    }

    #[test]
    fn rank_picks_minimum_distance_candidate() {
        let origin = (28.6139, 77.2090);
        let near = station("near", 28.6200, 77.2100); // < 1 km
        let nearer = station("nearer", 28.6140, 77.2091); // a few metres
        let far = station("far", 28.70, 77.30); // ~13 km

        let winner = rank_nearest(
            origin.0,
            origin.1,
            vec![near.clone(), far.clone(), nearer.clone()],
        )
        .unwrap();
        assert_eq!(winner.id, "nearer");
    }

    #[test]
    fn beyond_radius_returns_none() {
        // ~15 km north of the origin — inside no 10 km radius
        let far = station("far", 28.75, 77.2090);
        assert!(rank_nearest(28.6139, 77.2090, vec![far]).is_none());
        assert!(rank_nearest(28.6139, 77.2090, vec![]).is_none());
    }

    #[test]
    fn null_coordinates_are_skipped() {
        let mut s = station("nocoords", 0.0, 0.0);
        s.latitude = None;
        s.longitude = None;
        assert!(rank_nearest(28.6139, 77.2090, vec![s]).is_none());
    }

    #[test]
    fn resolver_end_to_end_with_db() {
        let db = Database::open_in_memory().unwrap();
        for s in [
            station("a", 28.6200, 77.2100),
            station("b", 28.6500, 77.2500),
            station("c", 29.50, 78.00), // ~120 km away
        ] {
            db.create_station(&s).unwrap();
        }

        let hit = resolve_nearest(&db, 28.6139, 77.2090).unwrap();
        assert_eq!(hit.id, "a");

        // middle of nowhere: prefilter yields nothing
        assert!(resolve_nearest(&db, 10.0, 70.0).is_none());
    }
}
