//! Posting lists keyed by geohash cell.

use super::PointEncoding;
use crate::error::{BenchError, Result};
use crate::index::Document;
use geobench_types::BoundingBox;
use rustc_hash::FxHashMap;

/// Documents sharing one geohash cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingList {
    cell: String,
    /// Cell rectangle, widened to cover every member point
    bounds: BoundingBox,
    docs: Vec<Document>,
}

impl PostingList {
    pub fn cell(&self) -> &str {
        &self.cell
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Groups documents by geohash prefix of length `precision`.
#[derive(Debug, Clone, Copy)]
pub struct PostingsEncoding {
    precision: usize,
}

impl Default for PostingsEncoding {
    fn default() -> Self {
        Self { precision: 5 }
    }
}

impl PostingsEncoding {
    pub fn new(precision: usize) -> Result<Self> {
        if !(1..=12).contains(&precision) {
            return Err(BenchError::Configuration(format!(
                "Geohash precision must be between 1 and 12, got {}",
                precision
            )));
        }
        Ok(Self { precision })
    }

    pub fn precision(&self) -> usize {
        self.precision
    }
}

impl PointEncoding for PostingsEncoding {
    type Segment = Vec<PostingList>;

    const NAME: &'static str = "postings";

    fn build_segment(&self, docs: Vec<Document>) -> Result<Self::Segment> {
        let mut cells: FxHashMap<String, Vec<Document>> = FxHashMap::default();
        for doc in docs {
            let coord = geohash::Coord {
                x: doc.point.lon(),
                y: doc.point.lat(),
            };
            let cell = geohash::encode(coord, self.precision)
                .map_err(|e| BenchError::Index(format!("geohash encode failed: {}", e)))?;
            cells.entry(cell).or_default().push(doc);
        }

        let mut lists = Vec::with_capacity(cells.len());
        for (cell, docs) in cells {
            let rect = geohash::decode_bbox(&cell)
                .map_err(|e| BenchError::Index(format!("geohash decode failed: {}", e)))?;
            let mut bounds = BoundingBox::from_rect(&rect);
            for doc in &docs {
                bounds.expand_to_include(&doc.point);
            }
            lists.push(PostingList { cell, bounds, docs });
        }
        lists.sort_unstable_by(|a, b| a.cell.cmp(&b.cell));
        Ok(lists)
    }

    fn into_documents(&self, segment: Self::Segment) -> Vec<Document> {
        segment.into_iter().flat_map(|list| list.docs).collect()
    }

    fn segment_len(&self, segment: &Self::Segment) -> usize {
        segment.iter().map(PostingList::len).sum()
    }

    fn visit_candidates(
        &self,
        segment: &Self::Segment,
        envelope: &BoundingBox,
        visit: &mut dyn FnMut(&Document),
    ) {
        for list in segment.iter().filter(|list| list.bounds.intersects(envelope)) {
            for doc in &list.docs {
                visit(doc);
            }
        }
    }
}
