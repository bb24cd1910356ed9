// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine distance, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default search radius around a site, in kilometers.
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Arithmetic mean of a set of coordinates. `None` for an empty slice.
    pub fn centroid(points: &[LatLon]) -> Option<LatLon> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
        Some(LatLon { lat, lon })
    }
}

/// A rectangular map viewport in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

fn key_edge(value: f64) -> String {
    let edge = format!("{:.4}", value);
    // Tiny negatives round to "-0.0000"
    if edge == "-0.0000" {
        "0.0000".to_string()
    } else {
        edge
    }
}

impl Bounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Memoization key: every edge at 4 decimals, north/south/east/west.
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            key_edge(self.north),
            key_edge(self.south),
            key_edge(self.east),
            key_edge(self.west)
        )
    }

    /// True when at least one edge moved by `threshold` degrees or more.
    pub fn differs_from(&self, other: &Bounds, threshold: f64) -> bool {
        (self.north - other.north).abs() >= threshold
            || (self.south - other.south).abs() >= threshold
            || (self.east - other.east).abs() >= threshold
            || (self.west - other.west).abs() >= threshold
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.west || lon <= self.east
        } else {
            lon >= self.west && lon <= self.east
        }
    }

    pub fn center(&self) -> LatLon {
        let lat = (self.north + self.south) / 2.0;
        let lon = if self.crosses_antimeridian() {
            let mid = (self.west + self.east + 360.0) / 2.0;
            if mid > 180.0 {
                mid - 360.0
            } else {
                mid
            }
        } else {
            (self.west + self.east) / 2.0
        };
        LatLon { lat, lon }
    }
}

/// Great circle distance between two points, in kilometers.
pub fn haversine_km(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin() * EARTH_RADIUS_KM
}

/// Returns `(distance_km, item)` pairs within `radius_km` of `origin`, closest first.
pub fn within_radius<'a, T, F>(
    origin: LatLon,
    items: &'a [T],
    radius_km: f64,
    location: F,
) -> Vec<(f64, &'a T)>
where
    F: Fn(&T) -> LatLon,
{
    let mut hits: Vec<(f64, &T)> = items
        .iter()
        .map(|item| (haversine_km(origin, location(item)), item))
        .filter(|(d, _)| *d <= radius_km)
        .collect();
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_key_rounds_to_four_decimals() {
        let a = Bounds::new(10.0, 9.0, 20.0, 19.0);
        assert_eq!(a.key(), "10.0000_9.0000_20.0000_19.0000");

        // Not bit-identical, same key
        let b = Bounds::new(10.00001, 8.99999, 20.00002, 19.0);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_bounds_key_ignores_sign_of_zero() {
        let a = Bounds::new(0.00001, -1.0, 1.0, -0.00001);
        let b = Bounds::new(-0.00001, -1.0, 1.0, 0.00001);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key(), "0.0000_-1.0000_1.0000_0.0000");
        assert_eq!(Bounds::new(-0.0, 0.0, 0.0, -0.0).key(), a.key());
    }

    #[test]
    fn test_differs_from_threshold() {
        let a = Bounds::new(10.0, 9.0, 20.0, 19.0);
        let jitter = Bounds::new(10.0001, 9.0001, 20.0001, 19.0001);
        assert!(!a.differs_from(&jitter, 1e-3));

        let panned = Bounds::new(10.0, 9.0, 20.01, 19.01);
        assert!(a.differs_from(&panned, 1e-3));
    }

    #[test]
    fn test_contains_across_antimeridian() {
        let pacific = Bounds::new(60.0, 50.0, -170.0, 170.0);
        assert!(pacific.crosses_antimeridian());
        assert!(pacific.contains(55.0, 175.0));
        assert!(pacific.contains(55.0, -175.0));
        assert!(!pacific.contains(55.0, 0.0));
        assert!((pacific.center().lon.abs() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_annecy_chamonix() {
        let annecy = LatLon::new(45.899, 6.129);
        let chamonix = LatLon::new(45.924, 6.870);
        let d = haversine_km(annecy, chamonix);
        assert!(d > 55.0 && d < 60.0, "got {}", d);
        assert_eq!(haversine_km(annecy, annecy), 0.0);
    }

    #[test]
    fn test_within_radius_sorted() {
        let origin = LatLon::new(45.9, 6.1);
        let points = vec![
            LatLon::new(46.2, 6.1), // ~33 km
            LatLon::new(45.91, 6.1),
            LatLon::new(48.0, 6.1), // far
        ];
        let hits = within_radius(origin, &points, DEFAULT_SEARCH_RADIUS_KM, |p| *p);
        assert_eq!(hits.len(), 2);
        assert_eq!(*hits[0].1, points[1]);
        assert!(hits[0].0 < hits[1].0);
    }

    #[test]
    fn test_centroid() {
        assert_eq!(LatLon::centroid(&[]), None);
        let c = LatLon::centroid(&[LatLon::new(0.0, 0.0), LatLon::new(2.0, 4.0)]).unwrap();
        assert_eq!(c, LatLon::new(1.0, 2.0));
    }
}
