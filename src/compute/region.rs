//! Query regions and their conservative lat/lon envelopes.

use crate::error::{BenchError, Result};
use geo::Intersects;
use geobench_types::{BoundingBox, GeoPoint, MultiPolygonQuery};

/// Padding added to circle envelopes so rounding never drops a point that
/// sits exactly on the radius.
const ENVELOPE_PAD_DEGREES: f64 = 1e-9;

/// The area a predicate matches, independent of how an index stores points.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Inclusive lat/lon rectangle
    Rect(BoundingBox),
    /// Points within `radius_meters` (haversine) of `center`
    Circle {
        center: GeoPoint,
        radius_meters: f64,
    },
    /// Union of polygons; holes are excluded and boundaries are included
    Polygons {
        shape: geo::MultiPolygon<f64>,
        bounds: BoundingBox,
    },
}

impl Region {
    pub fn rect(bounds: BoundingBox) -> Result<Self> {
        bounds.validate()?;
        Ok(Region::Rect(bounds))
    }

    pub fn circle(center: GeoPoint, radius_meters: f64) -> Result<Self> {
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            return Err(BenchError::Geometry(format!(
                "Circle radius must be a non-negative number of meters, got {}",
                radius_meters
            )));
        }
        Ok(Region::Circle {
            center,
            radius_meters,
        })
    }

    pub fn polygons(query: &MultiPolygonQuery) -> Self {
        Region::Polygons {
            shape: query.to_geo(),
            bounds: query.bounding_box(),
        }
    }

    /// Exact membership test.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        match self {
            Region::Rect(bounds) => bounds.contains(point),
            Region::Circle {
                center,
                radius_meters,
            } => center.haversine_distance(point) <= *radius_meters,
            Region::Polygons { shape, bounds } => {
                bounds.contains(point) && shape.intersects(&point.to_geo())
            }
        }
    }

    /// A lat/lon box guaranteed to cover every point the region contains.
    pub fn envelope(&self) -> BoundingBox {
        match self {
            Region::Rect(bounds) => *bounds,
            Region::Polygons { bounds, .. } => *bounds,
            Region::Circle {
                center,
                radius_meters,
            } => circle_envelope(center, *radius_meters),
        }
    }
}

fn circle_envelope(center: &GeoPoint, radius_meters: f64) -> BoundingBox {
    let angular = radius_meters / geo::Haversine.radius();
    let delta_lat = angular.to_degrees() + ENVELOPE_PAD_DEGREES;

    let min_lat = center.lat() - delta_lat;
    let max_lat = center.lat() + delta_lat;

    let full_lon = BoundingBox {
        min_lat: min_lat.max(-90.0),
        max_lat: max_lat.min(90.0),
        min_lon: -180.0,
        max_lon: 180.0,
    };

    // circle reaches a pole
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return full_lon;
    }

    let ratio = angular.sin() / center.lat().to_radians().cos();
    if angular >= std::f64::consts::FRAC_PI_2 || ratio >= 1.0 {
        return full_lon;
    }
    let delta_lon = ratio.asin().to_degrees() + ENVELOPE_PAD_DEGREES;
    let min_lon = center.lon() - delta_lon;
    let max_lon = center.lon() + delta_lon;

    // crosses the antimeridian
    if min_lon < -180.0 || max_lon > 180.0 {
        return full_lon;
    }

    BoundingBox {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    }
}
