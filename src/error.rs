//! Error type shared by every geobench component.

use geobench_types::GeoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    /// Polygon file grammar violation
    #[error("Format error at line {line}: {message}")]
    Format { line: usize, message: String },

    /// Invalid coordinates or shapes, including synthesis that failed to converge
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Malformed `id,lat,lon` record
    #[error("Ingestion parse error at line {line}: {message}")]
    IngestionParse { line: u64, message: String },

    /// Conflicting or invalid benchmark options
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by an index implementation
    #[error("Index error: {0}")]
    Index(String),
}

impl From<GeoError> for BenchError {
    fn from(err: GeoError) -> Self {
        BenchError::Geometry(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Configuration(err.to_string())
    }
}

#[cfg(feature = "toml")]
impl From<toml::de::Error> for BenchError {
    fn from(err: toml::de::Error) -> Self {
        BenchError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_error_becomes_geometry() {
        let err: BenchError = GeoError::InvalidLatitude(91.0).into();
        assert!(matches!(err, BenchError::Geometry(msg) if msg.contains("91")));
    }

    #[test]
    fn test_display_includes_line() {
        let err = BenchError::Format {
            line: 7,
            message: "expected \"      lats \"".into(),
        };
        assert!(err.to_string().contains("line 7"));
    }
}
