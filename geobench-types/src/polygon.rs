use crate::bbox::BoundingBox;
use crate::point::{GeoError, GeoPoint};
use serde::{Deserialize, Serialize};

/// A polygon with an outer ring and zero or more holes.
///
/// Rings may be given open or closed; a closing vertex equal to the first one
/// is not counted as distinct. Every ring needs at least three distinct
/// vertices.
///
/// # Examples
///
/// ```
/// use geobench_types::point::GeoPoint;
/// use geobench_types::polygon::Polygon;
///
/// let ring = vec![
///     GeoPoint::new(0.0, 0.0).unwrap(),
///     GeoPoint::new(0.0, 1.0).unwrap(),
///     GeoPoint::new(1.0, 1.0).unwrap(),
///     GeoPoint::new(0.0, 0.0).unwrap(),
/// ];
/// let triangle = Polygon::new(ring, Vec::new()).unwrap();
/// assert_eq!(triangle.exterior().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    exterior: Vec<GeoPoint>,
    holes: Vec<Vec<GeoPoint>>,
}

/// Number of distinct vertices in a ring.
pub fn distinct_vertices(ring: &[GeoPoint]) -> usize {
    let mut keys: Vec<(u64, u64)> = ring
        .iter()
        .map(|p| (p.lat().to_bits(), p.lon().to_bits()))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}

fn check_ring(ring: &[GeoPoint]) -> Result<(), GeoError> {
    let distinct = distinct_vertices(ring);
    if distinct < 3 {
        return Err(GeoError::DegenerateRing { distinct });
    }
    Ok(())
}

fn ring_to_geo(ring: &[GeoPoint]) -> geo::LineString<f64> {
    ring.iter()
        .map(|p| geo::coord! { x: p.lon(), y: p.lat() })
        .collect::<Vec<_>>()
        .into()
}

impl Polygon {
    pub fn new(exterior: Vec<GeoPoint>, holes: Vec<Vec<GeoPoint>>) -> Result<Self, GeoError> {
        check_ring(&exterior)?;
        for hole in &holes {
            check_ring(hole)?;
        }
        Ok(Self { exterior, holes })
    }

    pub fn exterior(&self) -> &[GeoPoint] {
        &self.exterior
    }

    pub fn holes(&self) -> &[Vec<GeoPoint>] {
        &self.holes
    }

    /// Total vertex count across the outer ring and all holes.
    pub fn vertex_count(&self) -> usize {
        self.exterior.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }

    /// Bounds of the outer ring. Holes lie inside it by definition.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bounds = BoundingBox::from_point(&self.exterior[0]);
        for point in &self.exterior[1..] {
            bounds.expand_to_include(point);
        }
        bounds
    }

    /// Convert into a `geo::Polygon` with interiors for the holes.
    pub fn to_geo(&self) -> geo::Polygon<f64> {
        geo::Polygon::new(
            ring_to_geo(&self.exterior),
            self.holes.iter().map(|h| ring_to_geo(h)).collect(),
        )
    }
}

/// One logical polygon query: the union of its polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygonQuery {
    polygons: Vec<Polygon>,
}

impl MultiPolygonQuery {
    pub fn new(polygons: Vec<Polygon>) -> Result<Self, GeoError> {
        if polygons.is_empty() {
            return Err(GeoError::EmptyMultiPolygon);
        }
        Ok(Self { polygons })
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(Polygon::vertex_count).sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bounds = self.polygons[0].bounding_box();
        for polygon in &self.polygons[1..] {
            bounds = bounds.union(&polygon.bounding_box());
        }
        bounds
    }

    pub fn to_geo(&self) -> geo::MultiPolygon<f64> {
        geo::MultiPolygon::new(self.polygons.iter().map(Polygon::to_geo).collect())
    }
}

impl From<Polygon> for MultiPolygonQuery {
    fn from(polygon: Polygon) -> Self {
        Self {
            polygons: vec![polygon],
        }
    }
}
