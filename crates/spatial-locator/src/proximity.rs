//! Great-circle distance between coordinates.

use dweather_common::Coordinate;

/// Earth radius used for storm and station distances, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Haversine distance in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Whether `point` lies strictly within `radius_km` of `centre`.
pub fn within_radius(centre: Coordinate, point: Coordinate, radius_km: f64) -> bool {
    haversine_km(centre, point) < radius_km
}

/// The `n` candidates closest to `centre`, nearest first. Ties keep input order.
pub fn n_closest<T, I>(centre: Coordinate, candidates: I, n: usize) -> Vec<T>
where
    I: IntoIterator<Item = (Coordinate, T)>,
{
    let mut ranked: Vec<(f64, T)> = candidates
        .into_iter()
        .map(|(coord, item)| (haversine_km(centre, coord), item))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked.into_iter().take(n).map(|(_, item)| item).collect()
}
