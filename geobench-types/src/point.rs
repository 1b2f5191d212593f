use serde::{Deserialize, Serialize};

/// Error type for invalid coordinates and degenerate shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or not finite
    InvalidLatitude(f64),
    /// Longitude outside [-180, 180] or not finite
    InvalidLongitude(f64),
    /// Ring with fewer than three distinct vertices
    DegenerateRing { distinct: usize },
    /// Multi-polygon with no polygons
    EmptyMultiPolygon,
    /// Bounding box whose minimum exceeds its maximum
    InvalidBounds(String),
}

impl std::fmt::Display for GeoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLatitude(lat) => {
                write!(f, "Latitude out of range [-90.0, 90.0]: {}", lat)
            }
            Self::InvalidLongitude(lon) => {
                write!(f, "Longitude out of range [-180.0, 180.0]: {}", lon)
            }
            Self::DegenerateRing { distinct } => write!(
                f,
                "Ring needs at least 3 distinct vertices, got {}",
                distinct
            ),
            Self::EmptyMultiPolygon => write!(f, "Multi-polygon query contains no polygons"),
            Self::InvalidBounds(msg) => write!(f, "Invalid bounding box: {}", msg),
        }
    }
}

impl std::error::Error for GeoError {}

/// Checks a latitude is finite and within [-90, 90].
#[inline]
pub fn check_latitude(lat: f64) -> Result<f64, GeoError> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(lat)
    } else {
        Err(GeoError::InvalidLatitude(lat))
    }
}

/// Checks a longitude is finite and within [-180, 180].
#[inline]
pub fn check_longitude(lon: f64) -> Result<f64, GeoError> {
    if lon.is_finite() && (-180.0..=180.0).contains(&lon) {
        Ok(lon)
    } else {
        Err(GeoError::InvalidLongitude(lon))
    }
}

/// A validated latitude/longitude pair in degrees.
///
/// Construction rejects out-of-range and non-finite coordinates, so every
/// `GeoPoint` in the system lies on the globe.
///
/// # Examples
///
/// ```
/// use geobench_types::point::GeoPoint;
///
/// let nyc = GeoPoint::new(40.7128, -74.0060).unwrap();
/// assert_eq!(nyc.lat(), 40.7128);
/// assert_eq!(nyc.lon(), -74.0060);
///
/// assert!(GeoPoint::new(95.0, 0.0).is_err());
/// assert!(GeoPoint::new(0.0, 181.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint", into = "RawPoint")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Deserialize)]
struct RawPoint {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lon)
    }
}

impl From<GeoPoint> for RawPoint {
    fn from(point: GeoPoint) -> Self {
        RawPoint {
            lat: point.lat,
            lon: point.lon,
        }
    }
}

impl GeoPoint {
    /// Create a point, validating both coordinates.
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        Ok(Self {
            lat: check_latitude(lat)?,
            lon: check_longitude(lon)?,
        })
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Convert into a `geo::Point` (x = longitude, y = latitude).
    #[inline]
    pub fn to_geo(&self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }

    /// Great-circle distance to another point in meters.
    ///
    /// # Examples
    ///
    /// ```
    /// use geobench_types::point::GeoPoint;
    ///
    /// let a = GeoPoint::new(51.5, 0.0).unwrap();
    /// let b = GeoPoint::new(51.5, 0.0).unwrap();
    /// assert_eq!(a.haversine_distance(&b), 0.0);
    /// ```
    #[inline]
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        use geo::Distance;
        geo::Haversine.distance(self.to_geo(), other.to_geo())
    }
}
