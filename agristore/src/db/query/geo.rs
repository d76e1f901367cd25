//! Great-circle distance and bounding-box prefilters for radius searches

use sea_query::{Cond, Condition, Expr, IntoColumnRef};

use crate::error::{Result, StoreError};

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Latitude/longitude rectangle that contains every point within a radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Box around a centre point
    ///
    /// Falls back to the full longitude range near the poles and when the
    /// box would cross the antimeridian.
    pub fn around(lat: f64, lon: f64, radius_km: f64) -> Result<Self> {
        validate_radius(radius_km)?;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(StoreError::validation("coordinates must be finite"));
        }

        let angular = radius_km / EARTH_RADIUS_KM;
        let lat_delta = angular.to_degrees();
        let min_lat = (lat - lat_delta).max(-90.0);
        let max_lat = (lat + lat_delta).min(90.0);

        let ratio = angular.sin() / lat.to_radians().cos();
        let (min_lon, max_lon) = if min_lat <= -90.0 || max_lat >= 90.0 || !(0.0..1.0).contains(&ratio) {
            (-180.0, 180.0)
        } else {
            let lon_delta = ratio.asin().to_degrees();
            if lon - lon_delta < -180.0 || lon + lon_delta > 180.0 {
                (-180.0, 180.0)
            } else {
                (lon - lon_delta, lon + lon_delta)
            }
        };

        Ok(Self::new(min_lat, max_lat, min_lon, max_lon))
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// Inclusive range condition over the given coordinate columns
    pub fn condition<C: IntoColumnRef>(&self, lat_col: C, lon_col: C) -> Condition {
        Cond::all()
            .add(Expr::col(lat_col).between(self.min_lat, self.max_lat))
            .add(Expr::col(lon_col).between(self.min_lon, self.max_lon))
    }
}

pub fn validate_radius(radius_km: f64) -> Result<()> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(StoreError::validation(format!(
            "radius must be a non-negative number of kilometres, got {radius_km}"
        )));
    }
    Ok(())
}

/// Keep the items within `radius_km` of the centre, nearest first
///
/// Items without coordinates are dropped.
pub fn within_radius<T, F>(items: Vec<T>, lat: f64, lon: f64, radius_km: f64, coords: F) -> Vec<T>
where
    F: Fn(&T) -> Option<(f64, f64)>,
{
    let mut hits: Vec<(f64, T)> = items
        .into_iter()
        .filter_map(|item| {
            let (item_lat, item_lon) = coords(&item)?;
            let distance = haversine_km(lat, lon, item_lat, item_lon);
            (distance <= radius_km).then_some((distance, item))
        })
        .collect();

    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIGALI: (f64, f64) = (-1.9441, 30.0619);
    const MUSANZE: (f64, f64) = (-1.4998, 29.6350);

    #[test]
    fn test_haversine_zero_distance() {
        assert_eq!(haversine_km(KIGALI.0, KIGALI.1, KIGALI.0, KIGALI.1), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        let d = haversine_km(KIGALI.0, KIGALI.1, MUSANZE.0, MUSANZE.1);
        assert!((60.0..70.0).contains(&d), "distance was {d}");
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_box_contains_points_inside_radius() {
        let bbox = BoundingBox::around(KIGALI.0, KIGALI.1, 80.0).unwrap();
        assert!(bbox.contains(MUSANZE.0, MUSANZE.1));
        assert!(bbox.contains(KIGALI.0, KIGALI.1));
        assert!(!bbox.contains(10.0, 30.0));
    }

    #[test]
    fn test_box_near_pole_spans_all_longitudes() {
        let bbox = BoundingBox::around(89.9, 10.0, 50.0).unwrap();
        assert_eq!(bbox.min_lon, -180.0);
        assert_eq!(bbox.max_lon, 180.0);
        assert_eq!(bbox.max_lat, 90.0);
    }

    #[test]
    fn test_box_across_antimeridian_spans_all_longitudes() {
        let bbox = BoundingBox::around(0.0, 179.9, 50.0).unwrap();
        assert_eq!((bbox.min_lon, bbox.max_lon), (-180.0, 180.0));
    }

    #[test]
    fn test_invalid_radius() {
        assert!(BoundingBox::around(0.0, 0.0, -1.0).is_err());
        assert!(BoundingBox::around(0.0, 0.0, f64::NAN).is_err());
        assert!(BoundingBox::around(0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_within_radius_sorts_nearest_first() {
        let points = vec![
            ("far", Some((MUSANZE.0, MUSANZE.1))),
            ("none", None),
            ("here", Some(KIGALI)),
            ("away", Some((10.0, 10.0))),
        ];
        let hits = within_radius(points, KIGALI.0, KIGALI.1, 100.0, |p| p.1);
        let names: Vec<_> = hits.iter().map(|p| p.0).collect();
        assert_eq!(names, vec!["here", "far"]);
    }
}
