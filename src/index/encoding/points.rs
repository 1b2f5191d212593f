//! Longitude/latitude pairs in a 2-D R*-tree.

use super::PointEncoding;
use crate::error::Result;
use crate::index::Document;
use geobench_types::BoundingBox;
use rstar::{AABB, RTree, RTreeObject};

/// A document keyed by `[lon, lat]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    position: [f64; 2],
    doc: Document,
}

impl From<Document> for IndexedPoint {
    fn from(doc: Document) -> Self {
        Self {
            position: [doc.point.lon(), doc.point.lat()],
            doc,
        }
    }
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PointsEncoding;

impl PointEncoding for PointsEncoding {
    type Segment = RTree<IndexedPoint>;

    const NAME: &'static str = "points";
    const SUPPORTS_DISTANCE_ORDERING: bool = true;

    fn build_segment(&self, docs: Vec<Document>) -> Result<Self::Segment> {
        Ok(RTree::bulk_load(
            docs.into_iter().map(IndexedPoint::from).collect(),
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
        let aabb = AABB::from_corners(
            [envelope.min_lon, envelope.min_lat],
            [envelope.max_lon, envelope.max_lat],
        );
        for indexed in segment.locate_in_envelope_intersecting(&aabb) {
            visit(&indexed.doc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geobench_types::GeoPoint;

    #[test]
    fn test_candidates_inside_envelope() {
        let docs = vec![
            Document::new("in", GeoPoint::new(51.5, 0.0).unwrap()),
            Document::new("edge", GeoPoint::new(52.0, 1.0).unwrap()),
            Document::new("out", GeoPoint::new(40.0, -74.0).unwrap()),
        ];
        let encoding = PointsEncoding;
        let segment = encoding.build_segment(docs).unwrap();
        assert_eq!(encoding.segment_len(&segment), 3);

        let envelope = BoundingBox::new(51.0, 52.0, -1.0, 1.0).unwrap();
        let mut seen = Vec::new();
        encoding.visit_candidates(&segment, &envelope, &mut |doc| seen.push(doc.id.clone()));
        seen.sort();
        assert_eq!(seen, vec!["edge", "in"]);

        let mut ids: Vec<String> = encoding
            .into_documents(segment)
            .into_iter()
            .map(|d| d.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["edge", "in", "out"]);
    }
}
