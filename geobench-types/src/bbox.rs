use crate::point::{GeoError, GeoPoint, check_latitude, check_longitude};
use serde::{Deserialize, Serialize};

/// A latitude/longitude rectangle, inclusive on all edges.
///
/// Fields are public so constant boxes can be written as literals; use
/// [`BoundingBox::new`] or [`BoundingBox::validate`] when the values come from
/// outside.
///
/// # Examples
///
/// ```
/// use geobench_types::bbox::BoundingBox;
/// use geobench_types::point::GeoPoint;
///
/// let mut bounds = BoundingBox::from_point(&GeoPoint::new(10.0, 20.0).unwrap());
/// bounds.expand_to_include(&GeoPoint::new(-5.0, 25.0).unwrap());
/// assert_eq!(bounds.min_lat, -5.0);
/// assert_eq!(bounds.max_lon, 25.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, GeoError> {
        let bbox = Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Degenerate box covering a single point.
    pub fn from_point(point: &GeoPoint) -> Self {
        Self {
            min_lat: point.lat(),
            max_lat: point.lat(),
            min_lon: point.lon(),
            max_lon: point.lon(),
        }
    }

    /// Checks coordinate ranges and min <= max on both axes.
    pub fn validate(&self) -> Result<(), GeoError> {
        check_latitude(self.min_lat)?;
        check_latitude(self.max_lat)?;
        check_longitude(self.min_lon)?;
        check_longitude(self.max_lon)?;

        if self.min_lat > self.max_lat {
            return Err(GeoError::InvalidBounds(format!(
                "min_lat ({}) must be <= max_lat ({})",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lon > self.max_lon {
            return Err(GeoError::InvalidBounds(format!(
                "min_lon ({}) must be <= max_lon ({})",
                self.min_lon, self.max_lon
            )));
        }
        Ok(())
    }

    /// Grow the box so it covers `point`. Never shrinks.
    pub fn expand_to_include(&mut self, point: &GeoPoint) {
        self.min_lat = self.min_lat.min(point.lat());
        self.max_lat = self.max_lat.max(point.lat());
        self.min_lon = self.min_lon.min(point.lon());
        self.max_lon = self.max_lon.max(point.lon());
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    #[inline]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat() >= self.min_lat
            && point.lat() <= self.max_lat
            && point.lon() >= self.min_lon
            && point.lon() <= self.max_lon
    }

    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
    }

    /// Arithmetic midpoint of the box.
    pub fn center(&self) -> Result<GeoPoint, GeoError> {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn min_corner(&self) -> Result<GeoPoint, GeoError> {
        GeoPoint::new(self.min_lat, self.min_lon)
    }

    pub fn max_corner(&self) -> Result<GeoPoint, GeoError> {
        GeoPoint::new(self.max_lat, self.max_lon)
    }

    /// Convert into a `geo::Rect` (x = longitude, y = latitude).
    pub fn to_rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::coord! { x: self.min_lon, y: self.min_lat },
            geo::coord! { x: self.max_lon, y: self.max_lat },
        )
    }

    /// Convert from a `geo::Rect` (x = longitude, y = latitude).
    pub fn from_rect(rect: &geo::Rect<f64>) -> Self {
        Self {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lon: rect.min().x,
            max_lon: rect.max().x,
        }
    }
}

/// One rectangle of a query grid with its derived center and radius.
///
/// The radius is half the haversine distance between the minimum and maximum
/// corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    bounds: BoundingBox,
    center: GeoPoint,
    radius_meters: f64,
}

impl GridCell {
    pub fn from_bounds(bounds: BoundingBox) -> Result<Self, GeoError> {
        bounds.validate()?;
        let min = bounds.min_corner()?;
        let max = bounds.max_corner()?;
        Ok(Self {
            bounds,
            center: bounds.center()?,
            radius_meters: min.haversine_distance(&max) / 2.0,
        })
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }
}
