//! Geometry computation: regular polygon synthesis and query regions.

pub mod region;
pub mod synthesis;

pub use region::Region;
pub use synthesis::PolygonSynthesizer;
