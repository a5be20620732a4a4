use crate::catalog::{as_finite, Hotel};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Canonical position. Every coordinate shape the catalog produces is
/// normalized into this at the boundary so nothing downstream branches on
/// payload shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a_lat: f64, a_lon: f64, b_lat: f64, b_lon: f64) -> f64 {
    let d_lat = (b_lat - a_lat).to_radians();
    let d_lon = (b_lon - a_lon).to_radians();
    let lat1 = a_lat.to_radians();
    let lat2 = b_lat.to_radians();

    let s = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // clamp before asin: floating point can overshoot 1.0 near antipodes
    2.0 * EARTH_RADIUS_KM * s.sqrt().min(1.0).asin()
}

/// Tries the four positional shapes in a fixed order and returns the first
/// candidate where both values are finite numbers. An exact `(0, 0)` pair is
/// a placeholder in the catalog data and is rejected. `None` is a normal
/// outcome, not an error: plenty of entries simply have no position.
pub fn hotel_coordinates(hotel: &Hotel) -> Option<Coordinates> {
    let geo = hotel.geo.as_ref();

    let candidates = [
        (geo.and_then(|g| g.lat.as_ref()), geo.and_then(|g| g.lon.as_ref())),
        (
            geo.and_then(|g| g.latitude.as_ref()),
            geo.and_then(|g| g.longitude.as_ref()),
        ),
        (hotel.lat.as_ref(), hotel.lon.as_ref()),
        (hotel.latitude.as_ref(), hotel.longitude.as_ref()),
    ];

    for (lat, lon) in candidates {
        let (Some(lat), Some(lon)) = (as_finite(lat), as_finite(lon)) else {
            continue;
        };
        if lat == 0.0 && lon == 0.0 {
            continue;
        }
        return Some(Coordinates { lat, lon });
    }
    None
}

pub struct Ranked<'a> {
    pub hotel: &'a Hotel,
    pub dist_km: f64,
}

/// Drops hotels without coordinates and sorts the rest ascending by distance
/// from the origin. Equal distances rank the higher-rated hotel first; this
/// ordering is part of the contract, not incidental.
pub fn rank_by_distance(hotels: &[Hotel], origin_lat: f64, origin_lon: f64) -> Vec<Ranked<'_>> {
    let mut ranked: Vec<Ranked> = hotels
        .iter()
        .filter_map(|hotel| {
            let coords = hotel_coordinates(hotel)?;
            Some(Ranked {
                hotel,
                dist_km: haversine_km(origin_lat, origin_lon, coords.lat, coords.lon),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.dist_km
            .total_cmp(&b.dist_km)
            .then(b.hotel.rating().total_cmp(&a.hotel.rating()))
    });

    ranked
}
