//! Index capabilities consumed by the loader and the harness, plus in-memory
//! implementations for each point encoding.
//!
//! [`Index`] is the write side (insert, commit, merge). [`GeoIndex`] adds
//! predicate construction and the three query forms the benchmark times.
//! Predicates are plain values, so a workload can be built once and run
//! against any encoding.

pub mod encoding;
pub mod segmented;

use crate::compute::Region;
use crate::error::{BenchError, Result};
use geobench_types::{BoundingBox, GeoPoint, MultiPolygonQuery};
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::{Hash, Hasher};

pub use encoding::{Geo3dEncoding, PointEncoding, PointsEncoding, PostingsEncoding};
pub use segmented::{Geo3dIndex, PointsIndex, PostingsIndex, SegmentedIndex};

/// One indexed point.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub point: GeoPoint,
}

impl Document {
    pub fn new(id: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            id: id.into(),
            point,
        }
    }
}

/// A document ranked by distance from a query center.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestHit {
    pub id: String,
    pub point: GeoPoint,
    pub distance_meters: f64,
}

/// Result of a distance-sorted search: the top hits plus the full match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedHits {
    pub total_hits: u64,
    pub hits: Vec<NearestHit>,
}

/// Deterministic per-document sampling keyed by id and seed.
///
/// The same document is always accepted or rejected for a given seed, and a
/// document accepted at some percentage is accepted at every higher one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomSample {
    percent: f64,
    seed: u64,
}

impl RandomSample {
    pub fn new(percent: f64, seed: u64) -> Result<Self> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(BenchError::Configuration(format!(
                "Sample percent must be within [0, 100], got {}",
                percent
            )));
        }
        Ok(Self { percent, seed })
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn accepts(&self, id: &str) -> bool {
        let mut hasher = FxHasher::default();
        self.seed.hash(&mut hasher);
        id.hash(&mut hasher);
        // Fx is weak in the low bits; finish with a splitmix64 round
        let mut z = hasher.finish().wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        let unit = (z >> 11) as f64 / (1u64 << 53) as f64;
        unit * 100.0 < self.percent
    }
}

/// A region plus an optional random sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    region: Region,
    sample: Option<RandomSample>,
}

impl Predicate {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            sample: None,
        }
    }

    pub fn with_sample(mut self, sample: RandomSample) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn sample(&self) -> Option<&RandomSample> {
        self.sample.as_ref()
    }

    /// Box every match lies in; encodings use it to prune candidates.
    pub fn envelope(&self) -> BoundingBox {
        self.region.envelope()
    }

    #[inline]
    pub fn matches(&self, doc: &Document) -> bool {
        self.region.contains(&doc.point) && self.sample.is_none_or(|s| s.accepts(&doc.id))
    }
}

/// Orders hits by haversine distance from `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSort {
    pub center: GeoPoint,
}

/// Write side of an index. Inserts may arrive from many threads at once.
pub trait Index: Send + Sync {
    /// Add one document; it becomes searchable after the next commit.
    fn bulk_insert(&self, doc: Document) -> Result<()>;

    /// Make every inserted document searchable.
    fn commit(&self) -> Result<()>;

    /// Merge all committed segments into one.
    fn force_merge(&self) -> Result<()>;

    /// Number of searchable documents.
    fn doc_count(&self) -> u64;

    fn segment_count(&self) -> usize;
}

/// Read side of an index: predicate construction and timed queries.
pub trait GeoIndex: Index {
    /// Number of documents matching `predicate`.
    fn count_matching(&self, predicate: &Predicate) -> Result<u64>;

    /// Up to `k` documents closest to `center`, nearest first.
    fn nearest(&self, center: &GeoPoint, k: usize) -> Result<Vec<NearestHit>>;

    /// Matches of `predicate` ordered by `sort`, keeping the first `top_n`.
    fn search_sorted(
        &self,
        predicate: &Predicate,
        sort: &DistanceSort,
        top_n: usize,
    ) -> Result<SortedHits>;

    fn build_box_predicate(&self, bounds: &BoundingBox) -> Result<Predicate> {
        Ok(Predicate::new(Region::rect(*bounds)?))
    }

    fn build_polygon_predicate(&self, query: &MultiPolygonQuery) -> Result<Predicate> {
        Ok(Predicate::new(Region::polygons(query)))
    }

    fn build_distance_predicate(&self, center: &GeoPoint, radius_meters: f64) -> Result<Predicate> {
        Ok(Predicate::new(Region::circle(*center, radius_meters)?))
    }

    fn build_distance_sort(&self, center: &GeoPoint) -> Result<DistanceSort> {
        Ok(DistanceSort { center: *center })
    }

    fn build_random_sample(&self, predicate: Predicate, percent: f64, seed: u64) -> Result<Predicate> {
        Ok(predicate.with_sample(RandomSample::new(percent, seed)?))
    }
}

/// Heap entry ordered by distance, then id, so ties break the same way
/// every run.
struct Ranked {
    distance: f64,
    id: String,
    point: GeoPoint,
}

impl Ranked {
    fn key_cmp(&self, distance: f64, id: &str) -> Ordering {
        self.distance
            .total_cmp(&distance)
            .then_with(|| self.id.as_str().cmp(id))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the farthest hit sits on top
        self.key_cmp(other.distance, &other.id)
    }
}

/// Bounded max-heap keeping the `k` closest documents seen.
pub(crate) struct TopHits {
    k: usize,
    heap: BinaryHeap<Ranked>,
}

impl TopHits {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.min(1024)),
        }
    }

    pub(crate) fn offer(&mut self, doc: &Document, distance: f64) {
        if self.k == 0 || !distance.is_finite() {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(Ranked {
                distance,
                id: doc.id.clone(),
                point: doc.point,
            });
        } else if let Some(worst) = self.heap.peek()
            && worst.key_cmp(distance, &doc.id) == Ordering::Greater
        {
            self.heap.pop();
            self.heap.push(Ranked {
                distance,
                id: doc.id.clone(),
                point: doc.point,
            });
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Distance of the farthest kept hit.
    pub(crate) fn worst_distance(&self) -> Option<f64> {
        self.heap.peek().map(|r| r.distance)
    }

    pub(crate) fn into_sorted(self) -> Vec<NearestHit> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| NearestHit {
                id: r.id,
                point: r.point,
                distance_meters: r.distance,
            })
            .collect()
    }
}
