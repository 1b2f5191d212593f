//! # geobench-types
//!
//! Geometry and measurement types shared by the geobench crates.
//!
//! - **Points**: `GeoPoint`, validated on construction
//! - **Shapes**: `Polygon` (outer ring plus holes), `MultiPolygonQuery`
//! - **Bounds**: `BoundingBox`, `GridCell`
//! - **Measurements**: `IterationStats`, `BestThroughput`
//!
//! All types are serializable with Serde and convert into the `geo` crate's
//! primitives for distance and containment math.
//!
//! ## Examples
//!
//! ```rust
//! use geobench_types::point::GeoPoint;
//! use geobench_types::bbox::BoundingBox;
//!
//! let london = GeoPoint::new(51.5074, -0.1278).unwrap();
//! let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
//! assert!(london.haversine_distance(&paris) > 340_000.0);
//!
//! let bbox = BoundingBox::new(51.0, 52.0, -1.0, 1.0).unwrap();
//! assert!(bbox.contains(&london));
//! ```

pub mod bbox;
pub mod point;
pub mod polygon;
pub mod stats;

pub use bbox::{BoundingBox, GridCell};
pub use point::{GeoError, GeoPoint};
pub use polygon::{MultiPolygonQuery, Polygon};
pub use stats::{BestThroughput, IterationStats};
