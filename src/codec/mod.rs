//! Text codecs for query geometry.

pub mod poly_file;

pub use poly_file::{PolyFileReader, decode, encode};
