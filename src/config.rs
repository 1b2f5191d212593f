//! Benchmark configuration.
//!
//! One [`BenchConfig`] is built (or loaded from JSON/TOML), validated once, and
//! then passed by reference to every component. Option conflicts are reported
//! as [`BenchError::Configuration`] before any ingestion or query work starts.
use crate::error::{BenchError, Result};
use geobench_types::BoundingBox;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Grid bounds used when none are configured: greater London.
pub const LONDON_BOUNDS: BoundingBox = BoundingBox {
    min_lat: 51.0919106,
    max_lat: 51.6542719,
    min_lon: -0.3867282,
    max_lon: 0.8492337,
};

/// Largest document count the first partition will ingest.
pub const DEFAULT_DOC_CAP: u64 = 2_000_000_000;

/// How points are laid out inside an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingKind {
    /// Posting lists keyed by geohash cell
    Postings,
    /// Unit-sphere vectors in a 3-D R*-tree
    Geo3d,
    /// Longitude/latitude pairs in a 2-D R*-tree
    #[default]
    Points,
}

impl EncodingKind {
    pub fn name(&self) -> &'static str {
        match self {
            EncodingKind::Postings => "postings",
            EncodingKind::Geo3d => "geo3d",
            EncodingKind::Points => "points",
        }
    }

    /// Whether nearest-neighbor and distance-sorted queries are available.
    pub fn supports_distance_ordering(&self) -> bool {
        matches!(self, EncodingKind::Points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// One partition
    #[default]
    Small,
    /// Two partitions; the first stops at the document cap
    Full,
}

impl Dataset {
    pub fn partitions(&self) -> usize {
        match self {
            Dataset::Small => 1,
            Dataset::Full => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dataset::Small => "small",
            Dataset::Full => "large",
        }
    }
}

/// Which family of queries the workload runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryKind {
    /// Grid cell rectangles
    #[default]
    #[serde(rename = "box")]
    Rect,
    /// Circles around each grid cell center
    Distance,
    /// Regular polygons synthesized around each grid cell center
    Polygon {
        #[serde(default = "QueryKind::default_gons")]
        gons: usize,
    },
    /// k nearest documents to each grid cell center
    Nearest {
        #[serde(default = "QueryKind::default_top_n")]
        top_n: usize,
    },
    /// Polygons decoded from a poly file
    PolyFile { path: PathBuf },
}

impl QueryKind {
    const fn default_gons() -> usize {
        10
    }

    const fn default_top_n() -> usize {
        10
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::Rect => "box",
            QueryKind::Distance => "distance",
            QueryKind::Polygon { .. } => "polygon",
            QueryKind::Nearest { .. } => "nearest",
            QueryKind::PolyFile { .. } => "poly_file",
        }
    }
}

/// Query grid over a bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    #[serde(default = "GridConfig::default_steps")]
    pub steps: usize,

    #[serde(default = "GridConfig::default_bounds")]
    pub bounds: BoundingBox,
}

impl GridConfig {
    const fn default_steps() -> usize {
        5
    }

    const fn default_bounds() -> BoundingBox {
        LONDON_BOUNDS
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            steps: Self::default_steps(),
            bounds: Self::default_bounds(),
        }
    }
}

/// Settings for the concurrent bulk loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    #[serde(default = "IngestConfig::default_workers")]
    pub workers: usize,

    /// Lines claimed per lock acquisition
    #[serde(default = "IngestConfig::default_batch_size")]
    pub batch_size: usize,

    /// Cap on documents for the first partition
    #[serde(default = "IngestConfig::default_doc_cap")]
    pub doc_cap: Option<u64>,

    /// Merge each partition down to one segment after commit
    #[serde(default)]
    pub force_merge: bool,
}

impl IngestConfig {
    const fn default_workers() -> usize {
        4
    }

    const fn default_batch_size() -> usize {
        10_000
    }

    const fn default_doc_cap() -> Option<u64> {
        Some(DEFAULT_DOC_CAP)
    }

    /// A single worker, for comparing against the parallel loader.
    pub fn baseline() -> Self {
        Self {
            workers: 1,
            ..Self::default()
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            batch_size: Self::default_batch_size(),
            doc_cap: Self::default_doc_cap(),
            force_merge: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisConfig {
    /// Accepted error between a vertex's distance and the target radius
    #[serde(default = "SynthesisConfig::default_tolerance_meters")]
    pub tolerance_meters: f64,

    /// Refinement steps allowed per vertex
    #[serde(default = "SynthesisConfig::default_max_iterations")]
    pub max_iterations: usize,
}

impl SynthesisConfig {
    const fn default_tolerance_meters() -> f64 {
        0.1
    }

    const fn default_max_iterations() -> usize {
        10_000
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            tolerance_meters: Self::default_tolerance_meters(),
            max_iterations: Self::default_max_iterations(),
        }
    }
}

/// Full benchmark configuration.
///
/// # Examples
///
/// ```
/// use geobench::config::{BenchConfig, EncodingKind, QueryKind};
///
/// let config = BenchConfig::default()
///     .with_encoding(EncodingKind::Postings)
///     .with_query(QueryKind::Polygon { gons: 6 })
///     .with_pre_build_queries(true);
/// assert!(config.validate().is_ok());
///
/// // Sorting by distance needs the points encoding.
/// let sorted = config.clone().with_pre_build_queries(false).with_distance_sort(true);
/// assert!(sorted.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default)]
    pub encoding: EncodingKind,

    #[serde(default)]
    pub dataset: Dataset,

    #[serde(default)]
    pub query: QueryKind,

    /// Build grid queries once instead of inside every timed iteration
    #[serde(default)]
    pub pre_build_queries: bool,

    /// Percentage of documents a random-sample filter keeps
    #[serde(default)]
    pub filter_percent: Option<f64>,

    #[serde(default)]
    pub filter_seed: u64,

    /// Return the ten matches closest to the query center
    #[serde(default)]
    pub distance_sort: bool,

    #[serde(default = "BenchConfig::default_iterations")]
    pub iterations: usize,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Geohash length for the postings encoding
    #[serde(default = "BenchConfig::default_postings_precision")]
    pub postings_precision: usize,
}

impl BenchConfig {
    const fn default_iterations() -> usize {
        20
    }

    const fn default_postings_precision() -> usize {
        5
    }

    pub fn with_encoding(mut self, encoding: EncodingKind) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_query(mut self, query: QueryKind) -> Self {
        self.query = query;
        self
    }

    pub fn with_pre_build_queries(mut self, pre_build: bool) -> Self {
        self.pre_build_queries = pre_build;
        self
    }

    pub fn with_filter(mut self, percent: f64, seed: u64) -> Self {
        self.filter_percent = Some(percent);
        self.filter_seed = seed;
        self
    }

    pub fn with_distance_sort(mut self, enabled: bool) -> Self {
        self.distance_sort = enabled;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn with_synthesis(mut self, synthesis: SynthesisConfig) -> Self {
        if synthesis.tolerance_meters > 100.0 {
            log::warn!(
                "Synthesis tolerance of {} m is very loose; polygon radii will be approximate",
                synthesis.tolerance_meters
            );
        }
        self.synthesis = synthesis;
        self
    }

    pub fn with_postings_precision(mut self, precision: usize) -> Self {
        self.postings_precision = precision;
        self
    }

    /// Path of the poly file when the workload is file driven.
    pub fn poly_file(&self) -> Option<&Path> {
        match &self.query {
            QueryKind::PolyFile { path } => Some(path),
            _ => None,
        }
    }

    /// Label for partition `part`, e.g. `osm0.points.small`.
    pub fn partition_name(&self, part: usize) -> String {
        format!(
            "osm{}.{}.{}",
            part,
            self.encoding.name(),
            self.dataset.label()
        )
    }

    /// Reject out-of-range values and option combinations that cannot run.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(BenchError::Configuration(msg));

        if self.iterations == 0 {
            return fail("Iterations must be greater than zero".into());
        }
        if self.grid.steps == 0 {
            return fail("Grid steps must be greater than zero".into());
        }
        self.grid
            .bounds
            .validate()
            .map_err(|e| BenchError::Configuration(format!("Grid bounds: {}", e)))?;
        if self.ingest.workers == 0 {
            return fail("Ingest workers must be greater than zero".into());
        }
        if self.ingest.batch_size == 0 {
            return fail("Ingest batch size must be greater than zero".into());
        }
        if !(self.synthesis.tolerance_meters.is_finite() && self.synthesis.tolerance_meters > 0.0)
        {
            return fail(format!(
                "Synthesis tolerance must be a positive number of meters, got {}",
                self.synthesis.tolerance_meters
            ));
        }
        if self.synthesis.max_iterations == 0 {
            return fail("Synthesis max iterations must be greater than zero".into());
        }
        if !(1..=12).contains(&self.postings_precision) {
            return fail(format!(
                "Postings precision must be between 1 and 12, got {}",
                self.postings_precision
            ));
        }

        match &self.query {
            QueryKind::Polygon { gons } if *gons < 3 => {
                return fail(format!("Polygon queries need at least 3 gons, got {}", gons));
            }
            QueryKind::Nearest { top_n } if *top_n == 0 => {
                return fail("Nearest queries need top_n of at least 1".into());
            }
            _ => {}
        }

        let file_driven = self.poly_file().is_some();
        let nearest = matches!(self.query, QueryKind::Nearest { .. });

        if let Some(percent) = self.filter_percent {
            if !(0.0..=100.0).contains(&percent) {
                return fail(format!(
                    "Filter percent must be within [0, 100], got {}",
                    percent
                ));
            }
            if self.pre_build_queries {
                return fail("Random filtering cannot be combined with pre-built queries".into());
            }
            if file_driven {
                return fail("Random filtering cannot be combined with poly file queries".into());
            }
            if nearest {
                return fail("Random filtering cannot be combined with nearest queries".into());
            }
        }

        if self.distance_sort {
            if nearest {
                return fail("Distance sort cannot be combined with nearest queries".into());
            }
            if self.pre_build_queries {
                return fail("Distance sort cannot be combined with pre-built queries".into());
            }
            if file_driven {
                return fail("Distance sort cannot be combined with poly file queries".into());
            }
        }

        if nearest && self.pre_build_queries {
            return fail("Nearest queries cannot be pre-built".into());
        }

        if (nearest || self.distance_sort) && !self.encoding.supports_distance_ordering() {
            return fail(format!(
                "{} queries require the points encoding, not {}",
                if nearest { "Nearest" } else { "Distance-sorted" },
                self.encoding.name()
            ));
        }

        if nearest && self.dataset.partitions() != 1 {
            return fail("Nearest queries support a single partition only".into());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: BenchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: BenchConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BenchError::Configuration(e.to_string()))
    }

    /// Load a config file, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&text),
            #[cfg(feature = "toml")]
            Some("toml") => Self::from_toml(&text),
            _ => Err(BenchError::Configuration(format!(
                "Unsupported config file: {}",
                path.display()
            ))),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingKind::default(),
            dataset: Dataset::default(),
            query: QueryKind::default(),
            pre_build_queries: false,
            filter_percent: None,
            filter_seed: 0,
            distance_sort: false,
            iterations: Self::default_iterations(),
            grid: GridConfig::default(),
            ingest: IngestConfig::default(),
            synthesis: SynthesisConfig::default(),
            postings_precision: Self::default_postings_precision(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BenchConfig::default();
        assert_eq!(config.encoding, EncodingKind::Points);
        assert_eq!(config.query, QueryKind::Rect);
        assert_eq!(config.iterations, 20);
        assert_eq!(config.grid.steps, 5);
        assert_eq!(config.grid.bounds, LONDON_BOUNDS);
        assert_eq!(config.ingest.workers, 4);
        assert_eq!(config.ingest.batch_size, 10_000);
        assert_eq!(config.ingest.doc_cap, Some(DEFAULT_DOC_CAP));
        assert_eq!(config.synthesis.tolerance_meters, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = BenchConfig::default()
            .with_encoding(EncodingKind::Geo3d)
            .with_query(QueryKind::Polygon { gons: 7 })
            .with_filter(25.0, 42)
            .with_iterations(3);

        let json = config.to_json().unwrap();
        let deserialized = BenchConfig::from_json(&json).unwrap();
        assert_eq!(deserialized.encoding, EncodingKind::Geo3d);
        assert_eq!(deserialized.query, QueryKind::Polygon { gons: 7 });
        assert_eq!(deserialized.filter_percent, Some(25.0));
        assert_eq!(deserialized.filter_seed, 42);
        assert_eq!(deserialized.iterations, 3);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml() {
        let text = r#"
            encoding = "postings"
            dataset = "full"
            iterations = 5

            [query]
            kind = "distance"

            [ingest]
            workers = 1
        "#;
        let config = BenchConfig::from_toml(text).unwrap();
        assert_eq!(config.encoding, EncodingKind::Postings);
        assert_eq!(config.dataset.partitions(), 2);
        assert_eq!(config.query, QueryKind::Distance);
        assert_eq!(config.ingest, IngestConfig::baseline());

        let again = BenchConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = BenchConfig::from_json(r#"{"iterationz": 3}"#).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_partition_name() {
        let config = BenchConfig::default()
            .with_encoding(EncodingKind::Postings)
            .with_dataset(Dataset::Full);
        assert_eq!(config.partition_name(1), "osm1.postings.large");
    }

    #[test]
    fn test_query_defaults_from_json() {
        let config = BenchConfig::from_json(r#"{"query": {"kind": "polygon"}}"#).unwrap();
        assert_eq!(config.query, QueryKind::Polygon { gons: 10 });
        let config = BenchConfig::from_json(r#"{"query": {"kind": "box"}}"#).unwrap();
        assert_eq!(config.query, QueryKind::Rect);
    }

    #[test]
    fn test_config_validation_conflicts() {
        let base = BenchConfig::default();
        let rejected = [
            base.clone().with_query(QueryKind::Polygon { gons: 2 }),
            base.clone().with_query(QueryKind::Nearest { top_n: 0 }),
            base.clone().with_filter(101.0, 0),
            base.clone().with_filter(f64::NAN, 0),
            base.clone().with_filter(10.0, 0).with_pre_build_queries(true),
            base.clone().with_distance_sort(true).with_pre_build_queries(true),
            base.clone()
                .with_distance_sort(true)
                .with_encoding(EncodingKind::Geo3d),
            base.clone()
                .with_query(QueryKind::Nearest { top_n: 5 })
                .with_pre_build_queries(true),
            base.clone()
                .with_query(QueryKind::Nearest { top_n: 5 })
                .with_dataset(Dataset::Full),
            base.clone()
                .with_query(QueryKind::Nearest { top_n: 5 })
                .with_filter(50.0, 1),
            base.clone().with_iterations(0),
        ];
        for config in rejected {
            assert!(
                matches!(config.validate(), Err(BenchError::Configuration(_))),
                "accepted {:?}",
                config
            );
        }

        assert!(
            base.clone()
                .with_query(QueryKind::Nearest { top_n: 5 })
                .validate()
                .is_ok()
        );
        assert!(base.clone().with_distance_sort(true).validate().is_ok());
        assert!(
            base.clone()
                .with_distance_sort(true)
                .with_dataset(Dataset::Full)
                .validate()
                .is_ok()
        );
        assert!(base.with_filter(0.0, 9).validate().is_ok());
    }
}
