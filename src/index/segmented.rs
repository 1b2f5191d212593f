//! In-memory segmented index over any [`PointEncoding`].
//!
//! Inserts land in a pending buffer. `commit` freezes the buffer into a new
//! immutable segment and `force_merge` rebuilds all segments as one. Queries
//! only see committed segments.

use super::encoding::{Geo3dEncoding, PointEncoding, PointsEncoding, PostingsEncoding};
use super::{DistanceSort, Document, GeoIndex, Index, NearestHit, Predicate, SortedHits, TopHits};
use crate::compute::Region;
use crate::error::{BenchError, Result};
use geobench_types::GeoPoint;
use parking_lot::{Mutex, RwLock};
use std::time::Instant;

/// Starting radius for the expanding nearest-neighbor search.
const NEAREST_START_RADIUS_METERS: f64 = 1_000.0;

pub type PostingsIndex = SegmentedIndex<PostingsEncoding>;
pub type Geo3dIndex = SegmentedIndex<Geo3dEncoding>;
pub type PointsIndex = SegmentedIndex<PointsEncoding>;

pub struct SegmentedIndex<E: PointEncoding> {
    name: String,
    encoding: E,
    pending: Mutex<Vec<Document>>,
    segments: RwLock<Vec<E::Segment>>,
}

impl<E: PointEncoding> SegmentedIndex<E> {
    pub fn new(name: impl Into<String>, encoding: E) -> Self {
        Self {
            name: name.into(),
            encoding,
            pending: Mutex::new(Vec::new()),
            segments: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encoding(&self) -> &E {
        &self.encoding
    }

    /// Documents inserted but not yet committed.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn require_distance_ordering(&self, what: &str) -> Result<()> {
        if E::SUPPORTS_DISTANCE_ORDERING {
            Ok(())
        } else {
            Err(BenchError::Configuration(format!(
                "{} queries are not supported by the {} encoding",
                what,
                E::NAME
            )))
        }
    }

    fn for_each_match(&self, predicate: &Predicate, mut f: impl FnMut(&Document)) {
        let envelope = predicate.envelope();
        let segments = self.segments.read();
        for segment in segments.iter() {
            self.encoding.visit_candidates(segment, &envelope, &mut |doc| {
                if predicate.matches(doc) {
                    f(doc);
                }
            });
        }
    }
}

impl<E: PointEncoding> Index for SegmentedIndex<E> {
    fn bulk_insert(&self, doc: Document) -> Result<()> {
        self.pending.lock().push(doc);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let docs = std::mem::take(&mut *self.pending.lock());
        if docs.is_empty() {
            return Ok(());
        }
        let count = docs.len();
        let start = Instant::now();
        let segment = self.encoding.build_segment(docs)?;
        let mut segments = self.segments.write();
        segments.push(segment);
        log::debug!(
            "{}: committed {} documents into segment {} in {:?}",
            self.name,
            count,
            segments.len() - 1,
            start.elapsed()
        );
        Ok(())
    }

    fn force_merge(&self) -> Result<()> {
        let mut segments = self.segments.write();
        if segments.len() <= 1 {
            return Ok(());
        }
        let before = segments.len();
        let mut docs = Vec::new();
        for segment in segments.drain(..) {
            docs.extend(self.encoding.into_documents(segment));
        }
        segments.push(self.encoding.build_segment(docs)?);
        log::debug!("{}: merged {} segments into 1", self.name, before);
        Ok(())
    }

    fn doc_count(&self) -> u64 {
        self.segments
            .read()
            .iter()
            .map(|segment| self.encoding.segment_len(segment) as u64)
            .sum()
    }

    fn segment_count(&self) -> usize {
        self.segments.read().len()
    }
}

impl<E: PointEncoding> GeoIndex for SegmentedIndex<E> {
    fn count_matching(&self, predicate: &Predicate) -> Result<u64> {
        let mut count = 0u64;
        self.for_each_match(predicate, |_| count += 1);
        Ok(count)
    }

    /// Expanding-circle search: collect everything within a radius, and
    /// double the radius until `k` hits all lie inside it.
    fn nearest(&self, center: &GeoPoint, k: usize) -> Result<Vec<NearestHit>> {
        self.require_distance_ordering("Nearest")?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let half_circumference = std::f64::consts::PI * geo::Haversine.radius();
        let mut radius = NEAREST_START_RADIUS_METERS;
        loop {
            let predicate = Predicate::new(Region::circle(*center, radius)?);
            let mut top = TopHits::new(k);
            self.for_each_match(&predicate, |doc| {
                top.offer(doc, center.haversine_distance(&doc.point));
            });

            let covered = top.is_full() && top.worst_distance().is_some_and(|d| d <= radius);
            if covered || radius >= half_circumference {
                return Ok(top.into_sorted());
            }
            radius *= 2.0;
        }
    }

    fn search_sorted(
        &self,
        predicate: &Predicate,
        sort: &DistanceSort,
        top_n: usize,
    ) -> Result<SortedHits> {
        self.require_distance_ordering("Distance-sorted")?;
        let mut total_hits = 0u64;
        let mut top = TopHits::new(top_n);
        self.for_each_match(predicate, |doc| {
            total_hits += 1;
            top.offer(doc, sort.center.haversine_distance(&doc.point));
        });
        Ok(SortedHits {
            total_hits,
            hits: top.into_sorted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geobench_types::BoundingBox;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn grid_docs() -> Vec<Document> {
        let mut docs = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                let lat = 51.0 + i as f64 * 0.05;
                let lon = -0.5 + j as f64 * 0.05;
                docs.push(Document::new(format!("{}-{}", i, j), pt(lat, lon)));
            }
        }
        docs
    }

    fn loaded<E: PointEncoding>(encoding: E) -> SegmentedIndex<E> {
        let index = SegmentedIndex::new("test", encoding);
        for (n, doc) in grid_docs().into_iter().enumerate() {
            index.bulk_insert(doc).unwrap();
            if n % 150 == 149 {
                index.commit().unwrap();
            }
        }
        index.commit().unwrap();
        index
    }

    #[test]
    fn test_commit_and_merge() {
        let index = SegmentedIndex::new("test", PointsEncoding);
        index.bulk_insert(Document::new("a", pt(1.0, 1.0))).unwrap();
        assert_eq!(index.doc_count(), 0);
        assert_eq!(index.pending_count(), 1);

        index.commit().unwrap();
        index.bulk_insert(Document::new("b", pt(2.0, 2.0))).unwrap();
        index.commit().unwrap();
        index.commit().unwrap();
        assert_eq!(index.segment_count(), 2);
        assert_eq!(index.doc_count(), 2);

        index.force_merge().unwrap();
        assert_eq!(index.segment_count(), 1);
        assert_eq!(index.doc_count(), 2);
    }

    #[test]
    fn test_encodings_agree_on_counts() {
        let postings = loaded(PostingsEncoding::default());
        let geo3d = loaded(Geo3dEncoding);
        let points = loaded(PointsEncoding);
        assert_eq!(points.segment_count(), 3);

        let predicates = [
            points
                .build_box_predicate(&BoundingBox::new(51.2, 51.5, -0.3, 0.1).unwrap())
                .unwrap(),
            points
                .build_distance_predicate(&pt(51.5, 0.0), 12_000.0)
                .unwrap(),
        ];
        for predicate in &predicates {
            let expected = grid_docs().iter().filter(|d| predicate.matches(d)).count() as u64;
            assert!(expected > 0);
            assert_eq!(postings.count_matching(predicate).unwrap(), expected);
            assert_eq!(geo3d.count_matching(predicate).unwrap(), expected);
            assert_eq!(points.count_matching(predicate).unwrap(), expected);
        }
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let index = loaded(PointsEncoding);
        let center = pt(51.47, -0.02);
        let hits = index.nearest(&center, 5).unwrap();
        assert_eq!(hits.len(), 5);

        let mut brute: Vec<f64> = grid_docs()
            .iter()
            .map(|d| center.haversine_distance(&d.point))
            .collect();
        brute.sort_by(f64::total_cmp);
        let got: Vec<f64> = hits.iter().map(|h| h.distance_meters).collect();
        assert_eq!(got, brute[..5].to_vec());
    }

    #[test]
    fn test_nearest_returns_everything_when_k_exceeds_count() {
        let index = SegmentedIndex::new("tiny", PointsEncoding);
        index.bulk_insert(Document::new("a", pt(10.0, 10.0))).unwrap();
        index.bulk_insert(Document::new("b", pt(-10.0, -10.0))).unwrap();
        index.commit().unwrap();
        let hits = index.nearest(&pt(0.0, 0.0), 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_search_sorted_counts_all_and_keeps_top() {
        let index = loaded(PointsEncoding);
        let center = pt(51.5, 0.0);
        let predicate = index.build_distance_predicate(&center, 20_000.0).unwrap();
        let sort = index.build_distance_sort(&center).unwrap();
        let sorted = index.search_sorted(&predicate, &sort, 10).unwrap();

        assert_eq!(sorted.total_hits, index.count_matching(&predicate).unwrap());
        assert_eq!(sorted.hits.len(), 10);
        assert!(
            sorted
                .hits
                .windows(2)
                .all(|w| w[0].distance_meters <= w[1].distance_meters)
        );
    }

    #[test]
    fn test_distance_ordering_unsupported() {
        let index = loaded(Geo3dEncoding);
        let center = pt(51.5, 0.0);
        assert!(matches!(
            index.nearest(&center, 3),
            Err(BenchError::Configuration(_))
        ));
        let predicate = index.build_distance_predicate(&center, 1000.0).unwrap();
        let sort = index.build_distance_sort(&center).unwrap();
        assert!(index.search_sorted(&predicate, &sort, 10).is_err());
    }

    #[test]
    fn test_concurrent_inserts() {
        let index = SegmentedIndex::new("threads", PostingsEncoding::default());
        std::thread::scope(|s| {
            for t in 0..4 {
                let index = &index;
                s.spawn(move || {
                    for i in 0..250 {
                        let doc = Document::new(format!("{}:{}", t, i), pt(51.0, 0.0));
                        index.bulk_insert(doc).unwrap();
                    }
                });
            }
        });
        index.commit().unwrap();
        assert_eq!(index.doc_count(), 1000);
    }
}
