//! Point-location query throughput benchmark over in-memory geo indexes.
//!
//! ```rust
//! use geobench::prelude::*;
//! use std::io::Cursor;
//!
//! let config = BenchConfig::default().with_iterations(1);
//! let mut points = Cursor::new("a,51.5,-0.12\nb,51.4,0.01\n");
//! let report = geobench::run(config, &mut points)?;
//! assert_eq!(report.total_docs(), 2);
//! # Ok::<(), geobench::BenchError>(())
//! ```

pub mod codec;
pub mod compute;
pub mod config;
pub mod error;
pub mod harness;
pub mod index;
pub mod ingest;
pub mod runner;
pub mod workload;

pub use config::{BenchConfig, Dataset, EncodingKind, QueryKind};
pub use error::{BenchError, Result};

pub use geobench_types::{
    BestThroughput, BoundingBox, GeoPoint, GridCell, IterationStats, MultiPolygonQuery, Polygon,
};

pub use codec::PolyFileReader;
pub use compute::{PolygonSynthesizer, Region};
pub use harness::{ThroughputHarness, ThroughputReport};
pub use index::{GeoIndex, Index, SegmentedIndex};
pub use ingest::BulkLoader;
pub use runner::{BenchReport, BenchRunner, run};
pub use workload::{Workload, WorkloadGenerator};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{BenchConfig, BenchError, BenchRunner, Result};

    pub use crate::{Dataset, EncodingKind, QueryKind};

    pub use crate::{BoundingBox, GeoPoint, MultiPolygonQuery, Polygon};

    pub use crate::index::{Document, GeoIndex, Index};

    pub use crate::{PolygonSynthesizer, ThroughputHarness, Workload};
}
