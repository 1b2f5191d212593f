//! Regular polygons at a fixed geodesic radius.
//!
//! Each vertex is found by walking out along its spoke in degree space and
//! refining the walk length until the haversine distance to the center is
//! within tolerance of the target radius. There is no closed-form inversion;
//! the refinement moves by a step that halves every time the correction
//! changes direction.

use crate::config::SynthesisConfig;
use crate::error::{BenchError, Result};
use geobench_types::{GeoPoint, Polygon};

/// Radii above this are accepted but logged, since spokes this long start to
/// wrap in degree space.
const LARGE_RADIUS_METERS: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Correction {
    None,
    Shrink,
    Grow,
}

/// Builds closed regular n-gon rings around a center point.
///
/// # Examples
///
/// ```
/// use geobench::compute::PolygonSynthesizer;
/// use geobench_types::GeoPoint;
///
/// let center = GeoPoint::new(51.5, 0.0).unwrap();
/// let ring = PolygonSynthesizer::default().synthesize(center, 1000.0, 4).unwrap();
/// assert_eq!(ring.len(), 5);
/// assert_eq!(ring.first(), ring.last());
/// for vertex in &ring {
///     assert!((center.haversine_distance(vertex) - 1000.0).abs() < 0.1);
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSynthesizer {
    tolerance_meters: f64,
    max_iterations: usize,
}

impl Default for PolygonSynthesizer {
    fn default() -> Self {
        Self::from_config(&SynthesisConfig::default())
    }
}

impl PolygonSynthesizer {
    pub fn new(tolerance_meters: f64, max_iterations: usize) -> Self {
        Self {
            tolerance_meters,
            max_iterations,
        }
    }

    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self::new(config.tolerance_meters, config.max_iterations)
    }

    pub fn tolerance_meters(&self) -> f64 {
        self.tolerance_meters
    }

    /// Ring of `vertex_count + 1` points with the first repeated at the end.
    ///
    /// Vertices are placed on bearings spaced `360 / vertex_count` degrees
    /// apart, starting at 360 and decreasing.
    pub fn synthesize(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        vertex_count: usize,
    ) -> Result<Vec<GeoPoint>> {
        if vertex_count < 3 {
            return Err(BenchError::Geometry(format!(
                "Regular polygon needs at least 3 vertices, got {}",
                vertex_count
            )));
        }
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(BenchError::Geometry(format!(
                "Polygon radius must be a positive number of meters, got {}",
                radius_meters
            )));
        }
        if radius_meters > LARGE_RADIUS_METERS {
            log::warn!(
                "Synthesizing polygon with radius {} m; vertices far from the center may not converge",
                radius_meters
            );
        }

        let spacing = 360.0 / vertex_count as f64;
        let mut ring = Vec::with_capacity(vertex_count + 1);
        for i in 0..vertex_count {
            let bearing = 360.0 - i as f64 * spacing;
            ring.push(self.place_vertex(center, radius_meters, bearing)?);
        }
        ring.push(ring[0]);
        Ok(ring)
    }

    /// Same as [`synthesize`](Self::synthesize), wrapped as a hole-free polygon.
    pub fn synthesize_polygon(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        vertex_count: usize,
    ) -> Result<Polygon> {
        let ring = self.synthesize(center, radius_meters, vertex_count)?;
        Ok(Polygon::new(ring, Vec::new())?)
    }

    fn place_vertex(&self, center: GeoPoint, radius_meters: f64, bearing: f64) -> Result<GeoPoint> {
        let theta = bearing.to_radians();
        // x moves longitude, y moves latitude
        let (dx, dy) = (theta.cos(), theta.sin());

        let mut factor = 1.0;
        let mut step = 1.0;
        let mut last = Correction::None;

        for _ in 0..self.max_iterations {
            let lat = center.lat() + dy * factor;
            let lon = center.lon() + dx * factor;
            let trial = GeoPoint::new(lat, lon).map_err(|e| {
                BenchError::Geometry(format!(
                    "Vertex at bearing {} left the globe while refining: {}",
                    bearing, e
                ))
            })?;

            let distance = center.haversine_distance(&trial);
            if (distance - radius_meters).abs() < self.tolerance_meters {
                return Ok(trial);
            }

            if distance > radius_meters {
                factor -= step;
                if last == Correction::Grow {
                    step /= 2.0;
                }
                last = Correction::Shrink;
            } else {
                factor += step;
                if last == Correction::Shrink {
                    step /= 2.0;
                }
                last = Correction::Grow;
            }
        }

        Err(BenchError::Geometry(format!(
            "Vertex at bearing {} did not converge to {} m within {} iterations",
            bearing, radius_meters, self.max_iterations
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> GeoPoint {
        GeoPoint::new(51.5, 0.0).unwrap()
    }

    #[test]
    fn test_square_around_london() {
        let ring = PolygonSynthesizer::default()
            .synthesize(london(), 1000.0, 4)
            .unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        for vertex in &ring {
            let d = london().haversine_distance(vertex);
            assert!((d - 1000.0).abs() < 0.1, "vertex {:?} at {} m", vertex, d);
        }
    }

    #[test]
    fn test_radius_and_vertex_extremes_across_centers() {
        let synth = PolygonSynthesizer::default();
        let centers = [(40.7, -74.0), (-33.9, 151.2), (60.0, 100.0), (51.5, 0.0)];
        for (lat, lon) in centers {
            let center = GeoPoint::new(lat, lon).unwrap();
            for radius in [1.0, 1_000_000.0] {
                for gons in [3, 64] {
                    let ring = synth.synthesize(center, radius, gons).unwrap();
                    assert_eq!(ring.len(), gons + 1);
                    assert_eq!(ring[0], ring[gons]);
                    for vertex in &ring {
                        let d = center.haversine_distance(vertex);
                        assert!(
                            (d - radius).abs() < 0.1,
                            "center ({}, {}) radius {} gons {}: vertex at {} m",
                            lat,
                            lon,
                            radius,
                            gons,
                            d
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_first_vertex_is_due_east() {
        // bearing 360 gives (cos, sin) = (1, ~0), so only longitude moves
        let ring = PolygonSynthesizer::default()
            .synthesize(london(), 5000.0, 6)
            .unwrap();
        assert!((ring[0].lat() - 51.5).abs() < 1e-9);
        assert!(ring[0].lon() > 0.0);
    }

    #[test]
    fn test_many_gons_all_within_tolerance() {
        let center = GeoPoint::new(51.37, 0.23).unwrap();
        let synth = PolygonSynthesizer::default();
        for radius in [10.0, 2_500.0, 40_000.0] {
            let ring = synth.synthesize(center, radius, 17).unwrap();
            assert_eq!(ring.len(), 18);
            for vertex in &ring {
                assert!((center.haversine_distance(vertex) - radius).abs() < 0.1);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let synth = PolygonSynthesizer::default();
        let a = synth.synthesize(london(), 1234.5, 9).unwrap();
        let b = synth.synthesize(london(), 1234.5, 9).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let synth = PolygonSynthesizer::default();
        assert!(matches!(
            synth.synthesize(london(), 1000.0, 2),
            Err(BenchError::Geometry(_))
        ));
        assert!(matches!(
            synth.synthesize(london(), 0.0, 4),
            Err(BenchError::Geometry(_))
        ));
        assert!(matches!(
            synth.synthesize(london(), f64::NAN, 4),
            Err(BenchError::Geometry(_))
        ));
    }

    #[test]
    fn test_trial_off_the_globe_fails() {
        let near_pole = GeoPoint::new(89.9, 0.0).unwrap();
        let result = PolygonSynthesizer::default().synthesize(near_pole, 500_000.0, 4);
        assert!(matches!(result, Err(BenchError::Geometry(_))));
    }

    #[test]
    fn test_iteration_guard() {
        // tolerance this tight cannot be met in two refinements
        let synth = PolygonSynthesizer::new(1e-9, 2);
        let result = synth.synthesize(london(), 1000.0, 4);
        assert!(matches!(result, Err(BenchError::Geometry(msg)) if msg.contains("converge")));
    }

    #[test]
    fn test_synthesize_polygon() {
        let polygon = PolygonSynthesizer::default()
            .synthesize_polygon(london(), 800.0, 5)
            .unwrap();
        assert_eq!(polygon.exterior().len(), 6);
        assert!(polygon.holes().is_empty());
    }
}
