//! Query workloads: grid sweeps and poly files.
//!
//! A grid workload divides the configured bounds into `steps × steps` lines
//! and visits every rectangle `(lat_step, lon_step) .. (lat_step_end,
//! lon_step_end)` with `lat_step < lat_step_end` and `lon_step < lon_step_end`,
//! in nested ascending order. Each rectangle yields one query of the
//! configured family. The same configuration always yields the same sequence.

use crate::codec::PolyFileReader;
use crate::compute::PolygonSynthesizer;
use crate::config::{BenchConfig, GridConfig, QueryKind};
use crate::error::{BenchError, Result};
use crate::index::{DistanceSort, GeoIndex, Predicate, RandomSample};
use geobench_types::{BoundingBox, GeoPoint, GridCell, MultiPolygonQuery};
use std::borrow::Cow;
use std::io::BufRead;

/// Hits kept by a distance-sorted search.
pub const DISTANCE_SORT_TOP_N: usize = 10;

/// The geometry of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryShape {
    Box(BoundingBox),
    Distance {
        center: GeoPoint,
        radius_meters: f64,
    },
    Polygon(MultiPolygonQuery),
    Nearest {
        center: GeoPoint,
        top_n: usize,
    },
}

/// A query plus the grid cell it came from, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadQuery {
    pub shape: QueryShape,
    pub cell: Option<GridCell>,
}

/// A query turned into index-level values, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedQuery {
    Count(Predicate),
    Sorted(Predicate, DistanceSort),
    Nearest { center: GeoPoint, top_n: usize },
}

/// Produces the grid-driven query sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadGenerator {
    grid: GridConfig,
    query: QueryKind,
    synthesizer: PolygonSynthesizer,
}

impl WorkloadGenerator {
    pub fn new(config: &BenchConfig) -> Result<Self> {
        if let QueryKind::PolyFile { .. } = config.query {
            return Err(BenchError::Configuration(
                "Poly file queries are not generated from a grid".into(),
            ));
        }
        Ok(Self {
            grid: config.grid.clone(),
            query: config.query.clone(),
            synthesizer: PolygonSynthesizer::from_config(&config.synthesis),
        })
    }

    fn grid_line(min: f64, max: f64, step: usize, steps: usize) -> f64 {
        min + step as f64 * (max - min) / steps as f64
    }

    /// Every grid rectangle in query order.
    pub fn grid_cells(&self) -> Result<Vec<GridCell>> {
        let steps = self.grid.steps;
        let b = &self.grid.bounds;
        let lat_line = |step| Self::grid_line(b.min_lat, b.max_lat, step, steps);
        let lon_line = |step| Self::grid_line(b.min_lon, b.max_lon, step, steps);

        let mut cells = Vec::new();
        for lat_step in 0..steps {
            for lon_step in 0..steps {
                for lat_step_end in lat_step + 1..=steps {
                    for lon_step_end in lon_step + 1..=steps {
                        let bounds = BoundingBox::new(
                            lat_line(lat_step),
                            lat_line(lat_step_end),
                            lon_line(lon_step),
                            lon_line(lon_step_end),
                        )?;
                        cells.push(GridCell::from_bounds(bounds)?);
                    }
                }
            }
        }
        Ok(cells)
    }

    /// The query this generator's family derives from `cell`.
    pub fn shape_for(&self, cell: &GridCell) -> Result<QueryShape> {
        let shape = match &self.query {
            QueryKind::Rect => QueryShape::Box(*cell.bounds()),
            QueryKind::Distance => QueryShape::Distance {
                center: cell.center(),
                radius_meters: cell.radius_meters(),
            },
            QueryKind::Polygon { gons } => {
                let polygon = self.synthesizer.synthesize_polygon(
                    cell.center(),
                    cell.radius_meters(),
                    *gons,
                )?;
                QueryShape::Polygon(polygon.into())
            }
            QueryKind::Nearest { top_n } => QueryShape::Nearest {
                center: cell.center(),
                top_n: *top_n,
            },
            QueryKind::PolyFile { .. } => {
                return Err(BenchError::Configuration(
                    "Poly file queries are not generated from a grid".into(),
                ));
            }
        };
        Ok(shape)
    }

    pub fn generate(&self) -> Result<Vec<WorkloadQuery>> {
        self.grid_cells()?
            .into_iter()
            .map(|cell| {
                Ok(WorkloadQuery {
                    shape: self.shape_for(&cell)?,
                    cell: Some(cell),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
enum QuerySource {
    /// Built once, before timing
    Fixed(Vec<WorkloadQuery>),
    /// Rebuilt inside every timed iteration
    Regenerated(WorkloadGenerator),
}

/// An ordered query sequence plus the options applied to every query.
#[derive(Debug, Clone)]
pub struct Workload {
    source: QuerySource,
    filter: Option<RandomSample>,
    distance_sort: bool,
}

impl Workload {
    /// A workload over an explicit query list.
    pub fn fixed(queries: Vec<WorkloadQuery>) -> Self {
        Self {
            source: QuerySource::Fixed(queries),
            filter: None,
            distance_sort: false,
        }
    }

    /// A grid workload rebuilt on every call to [`queries`](Self::queries).
    pub fn regenerated(generator: WorkloadGenerator) -> Self {
        Self {
            source: QuerySource::Regenerated(generator),
            filter: None,
            distance_sort: false,
        }
    }

    pub fn with_filter(mut self, sample: RandomSample) -> Self {
        self.filter = Some(sample);
        self
    }

    pub fn with_distance_sort(mut self, enabled: bool) -> Self {
        self.distance_sort = enabled;
        self
    }

    /// Build the workload `config` describes. Poly files are decoded here.
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        let workload = match &config.query {
            QueryKind::PolyFile { path } => Self::from_poly_file(PolyFileReader::open(path)?)?,
            _ => {
                let generator = WorkloadGenerator::new(config)?;
                if config.pre_build_queries {
                    Self::fixed(generator.generate()?)
                } else {
                    Self::regenerated(generator)
                }
            }
        };

        let workload = match config.filter_percent {
            Some(percent) => workload.with_filter(RandomSample::new(percent, config.filter_seed)?),
            None => workload,
        };
        Ok(workload.with_distance_sort(config.distance_sort))
    }

    /// One polygon query per decoded record.
    pub fn from_poly_file<R: BufRead>(mut reader: PolyFileReader<R>) -> Result<Self> {
        let mut queries = Vec::new();
        for query in reader.by_ref() {
            queries.push(WorkloadQuery {
                shape: QueryShape::Polygon(query?),
                cell: None,
            });
        }
        if queries.is_empty() {
            return Err(BenchError::Configuration(
                "Poly file contains no queries".into(),
            ));
        }
        log::info!(
            "Loaded {} poly file queries with {} vertices, bounds {:?}",
            queries.len(),
            reader.total_vertices(),
            reader.bounds()
        );
        Ok(Self::fixed(queries))
    }

    /// Whether queries are built once rather than per iteration.
    pub fn is_fixed(&self) -> bool {
        matches!(self.source, QuerySource::Fixed(_))
    }

    pub fn filter(&self) -> Option<&RandomSample> {
        self.filter.as_ref()
    }

    pub fn distance_sort(&self) -> bool {
        self.distance_sort
    }

    /// The query sequence; regenerated workloads build it on every call.
    pub fn queries(&self) -> Result<Cow<'_, [WorkloadQuery]>> {
        match &self.source {
            QuerySource::Fixed(queries) => Ok(Cow::Borrowed(queries)),
            QuerySource::Regenerated(generator) => Ok(Cow::Owned(generator.generate()?)),
        }
    }

    /// Build the predicate (and sort) for `query` through `index`.
    pub fn prepare<G: GeoIndex + ?Sized>(
        &self,
        index: &G,
        query: &WorkloadQuery,
    ) -> Result<PreparedQuery> {
        let predicate = match &query.shape {
            QueryShape::Nearest { center, top_n } => {
                return Ok(PreparedQuery::Nearest {
                    center: *center,
                    top_n: *top_n,
                });
            }
            QueryShape::Box(bounds) => index.build_box_predicate(bounds)?,
            QueryShape::Distance {
                center,
                radius_meters,
            } => index.build_distance_predicate(center, *radius_meters)?,
            QueryShape::Polygon(polygons) => index.build_polygon_predicate(polygons)?,
        };

        let predicate = match &self.filter {
            Some(sample) => index.build_random_sample(predicate, sample.percent(), sample.seed())?,
            None => predicate,
        };

        if self.distance_sort {
            let cell = query.cell.as_ref().ok_or_else(|| {
                BenchError::Configuration("Distance sort needs grid queries".into())
            })?;
            let sort = index.build_distance_sort(&cell.center())?;
            return Ok(PreparedQuery::Sorted(predicate, sort));
        }
        Ok(PreparedQuery::Count(predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LONDON_BOUNDS;
    use crate::index::{PointsEncoding, SegmentedIndex};

    fn config(query: QueryKind) -> BenchConfig {
        BenchConfig::default().with_query(query)
    }

    #[test]
    fn test_grid_order_and_size() {
        let generator = WorkloadGenerator::new(&config(QueryKind::Rect)).unwrap();
        let cells = generator.grid_cells().unwrap();
        // (5 + 4 + 3 + 2 + 1)^2
        assert_eq!(cells.len(), 225);

        let first = cells[0].bounds();
        assert_eq!(first.min_lat, LONDON_BOUNDS.min_lat);
        assert_eq!(first.min_lon, LONDON_BOUNDS.min_lon);
        let lat_step = (LONDON_BOUNDS.max_lat - LONDON_BOUNDS.min_lat) / 5.0;
        assert!((first.max_lat - (LONDON_BOUNDS.min_lat + lat_step)).abs() < 1e-12);

        // second cell widens longitude first
        assert_eq!(cells[1].bounds().max_lat, first.max_lat);
        assert!(cells[1].bounds().max_lon > first.max_lon);

        let last = cells.last().unwrap().bounds();
        assert!((last.max_lat - LONDON_BOUNDS.max_lat).abs() < 1e-12);
        assert!((last.max_lon - LONDON_BOUNDS.max_lon).abs() < 1e-12);
    }

    #[test]
    fn test_generation_is_deterministic() {
        for query in [
            QueryKind::Rect,
            QueryKind::Distance,
            QueryKind::Polygon { gons: 5 },
            QueryKind::Nearest { top_n: 3 },
        ] {
            let generator = WorkloadGenerator::new(&config(query)).unwrap();
            assert_eq!(generator.generate().unwrap(), generator.generate().unwrap());
        }
    }

    #[test]
    fn test_shapes_follow_cell() {
        let generator = WorkloadGenerator::new(&config(QueryKind::Polygon { gons: 8 })).unwrap();
        let queries = generator.generate().unwrap();
        let query = &queries[7];
        let cell = query.cell.unwrap();
        match &query.shape {
            QueryShape::Polygon(polygons) => {
                let ring = polygons.polygons()[0].exterior();
                assert_eq!(ring.len(), 9);
                for vertex in ring {
                    let d = cell.center().haversine_distance(vertex);
                    assert!((d - cell.radius_meters()).abs() < 0.1);
                }
            }
            other => panic!("unexpected shape {:?}", other),
        }

        let generator = WorkloadGenerator::new(&config(QueryKind::Distance)).unwrap();
        let query = &generator.generate().unwrap()[3];
        assert_eq!(
            query.shape,
            QueryShape::Distance {
                center: query.cell.unwrap().center(),
                radius_meters: query.cell.unwrap().radius_meters(),
            }
        );
    }

    #[test]
    fn test_pre_built_vs_regenerated() {
        let pre = Workload::from_config(&config(QueryKind::Rect).with_pre_build_queries(true)).unwrap();
        let regen = Workload::from_config(&config(QueryKind::Rect)).unwrap();
        assert!(pre.is_fixed());
        assert!(!regen.is_fixed());
        assert_eq!(pre.queries().unwrap(), regen.queries().unwrap());
    }

    #[test]
    fn test_prepare_applies_filter_and_sort() {
        let index = SegmentedIndex::new("prep", PointsEncoding);
        let workload = Workload::from_config(
            &config(QueryKind::Distance)
                .with_filter(50.0, 3)
                .with_distance_sort(true),
        )
        .unwrap();
        let queries = workload.queries().unwrap();
        match workload.prepare(&index, &queries[0]).unwrap() {
            PreparedQuery::Sorted(predicate, sort) => {
                assert!(predicate.sample().is_some());
                assert_eq!(sort.center, queries[0].cell.unwrap().center());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_poly_file_workload() {
        let text = "count=1\n  poly count=1\n    vertex count=3\n      lats 51.2 51.2 51.4\n      lons 0.0 0.2 0.1\n";
        let workload = Workload::from_poly_file(PolyFileReader::new(text.as_bytes())).unwrap();
        assert!(workload.is_fixed());
        assert_eq!(workload.queries().unwrap().len(), 1);

        let empty = Workload::from_poly_file(PolyFileReader::new(&b""[..]));
        assert!(matches!(empty, Err(BenchError::Configuration(_))));
    }
}
