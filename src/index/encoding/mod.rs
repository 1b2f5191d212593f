//! How a segment lays out its points.
//!
//! Every encoding stores whole [`Document`]s and answers one question: which
//! documents might fall inside a lat/lon envelope. Exact filtering happens
//! afterwards in [`SegmentedIndex`](super::SegmentedIndex), so candidate
//! retrieval only has to be conservative.

mod geo3d;
mod points;
mod postings;

pub use geo3d::Geo3dEncoding;
pub use points::PointsEncoding;
pub use postings::PostingsEncoding;

use super::Document;
use crate::error::Result;
use geobench_types::BoundingBox;

pub trait PointEncoding: Send + Sync {
    /// Immutable, searchable batch of documents.
    type Segment: Send + Sync;

    /// Short name used in partition labels and logs.
    const NAME: &'static str;

    /// Whether nearest and distance-sorted queries are offered.
    const SUPPORTS_DISTANCE_ORDERING: bool = false;

    fn build_segment(&self, docs: Vec<Document>) -> Result<Self::Segment>;

    /// Tear a segment back down, e.g. for merging.
    fn into_documents(&self, segment: Self::Segment) -> Vec<Document>;

    fn segment_len(&self, segment: &Self::Segment) -> usize;

    /// Call `visit` for every document that may lie inside `envelope`. May
    /// include documents outside it, but never skips one inside.
    fn visit_candidates(
        &self,
        segment: &Self::Segment,
        envelope: &BoundingBox,
        visit: &mut dyn FnMut(&Document),
    );
}
