//! Points as unit-sphere vectors in a 3-D R*-tree.
//!
//! A lat/lon envelope maps to the smallest axis-aligned box in (x, y, z)
//! that holds every point of the envelope, found by evaluating the vector
//! components at the envelope's critical latitudes and longitudes.

use super::PointEncoding;
use crate::error::Result;
use crate::index::Document;
use geobench_types::{BoundingBox, GeoPoint};
use rstar::{AABB, RTree, RTreeObject};

const BOX_PAD: f64 = 1e-9;

/// Unit vector for a point: x toward (0, 0), y toward (0, 90), z toward the north pole.
pub fn unit_vector(point: &GeoPoint) -> [f64; 3] {
    let (lat, lon) = (point.lat().to_radians(), point.lon().to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Conservative 3-D box around every unit vector inside `envelope`.
pub fn envelope_to_box(envelope: &BoundingBox) -> AABB<[f64; 3]> {
    let mut lats = vec![envelope.min_lat, envelope.max_lat];
    if envelope.min_lat < 0.0 && envelope.max_lat > 0.0 {
        lats.push(0.0);
    }
    let mut lons = vec![envelope.min_lon, envelope.max_lon];
    for critical in [-180.0, -90.0, 0.0, 90.0, 180.0] {
        if envelope.min_lon < critical && critical < envelope.max_lon {
            lons.push(critical);
        }
    }

    let mut lower = [f64::INFINITY; 3];
    let mut upper = [f64::NEG_INFINITY; 3];
    for lat in &lats {
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        for lon in &lons {
            let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
            let v = [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat];
            for axis in 0..3 {
                lower[axis] = lower[axis].min(v[axis]);
                upper[axis] = upper[axis].max(v[axis]);
            }
        }
    }
    for axis in 0..3 {
        lower[axis] -= BOX_PAD;
        upper[axis] += BOX_PAD;
    }
    AABB::from_corners(lower, upper)
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector {
    position: [f64; 3],
    doc: Document,
}

impl From<Document> for IndexedVector {
    fn from(doc: Document) -> Self {
        Self {
            position: unit_vector(&doc.point),
            doc,
        }
    }
}

impl RTreeObject for IndexedVector {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Geo3dEncoding;

impl PointEncoding for Geo3dEncoding {
    type Segment = RTree<IndexedVector>;

    const NAME: &'static str = "geo3d";

    fn build_segment(&self, docs: Vec<Document>) -> Result<Self::Segment> {
        Ok(RTree::bulk_load(
            docs.into_iter().map(IndexedVector::from).collect(),
        ))
    }

    fn into_documents(&self, mut segment: Self::Segment) -> Vec<Document> {
        segment.drain().map(|indexed| indexed.doc).collect()
    }

    fn segment_len(&self, segment: &Self::Segment) -> usize {
        segment.size()
    }

    fn visit_candidates(
        &self,
        segment: &Self::Segment,
        envelope: &BoundingBox,
        visit: &mut dyn FnMut(&Document),
    ) {
        let aabb = envelope_to_box(envelope);
        for indexed in segment.locate_in_envelope_intersecting(&aabb) {
            visit(&indexed.doc);
        }
    }
}
