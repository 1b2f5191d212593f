//! Line-oriented multi-polygon text format.
//!
//! ```text
//! count=<groups>[ <ignored>]
//!   poly count=<rings>
//!     vertex count=<k>
//!       lats <lat_1> ... <lat_k>
//!       lons <lon_1> ... <lon_k>
//! ```
//!
//! Each `count=` record is one [`MultiPolygonQuery`]. Inside a group the first
//! ring is the outer boundary and every following ring is a hole. Prefixes,
//! indentation included, are matched literally.

use crate::error::{BenchError, Result};
use geobench_types::{BoundingBox, GeoPoint, MultiPolygonQuery, Polygon};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

const QUERY_PREFIX: &str = "count=";
const POLY_PREFIX: &str = "  poly count=";
const VERTEX_PREFIX: &str = "    vertex count=";
const LATS_PREFIX: &str = "      lats ";
const LONS_PREFIX: &str = "      lons ";

const READ_BUFFER_SIZE: usize = 1 << 16;

/// Streaming decoder over a poly file.
///
/// Yields one query per record. The first error is yielded once and then the
/// iterator ends, since the stream position is no longer trustworthy.
///
/// # Examples
///
/// ```
/// use geobench::codec::PolyFileReader;
///
/// let text = "count=1 London\n  poly count=1\n    vertex count=3\n      lats 51.0 51.0 51.5\n      lons 0.0 1.0 0.5\n";
/// let mut reader = PolyFileReader::new(text.as_bytes());
/// let query = reader.next().unwrap().unwrap();
/// assert_eq!(query.vertex_count(), 3);
/// assert!(reader.next().is_none());
/// assert_eq!(reader.bounds().unwrap().max_lat, 51.5);
/// ```
pub struct PolyFileReader<R> {
    reader: R,
    line: String,
    line_number: usize,
    bounds: Option<BoundingBox>,
    total_vertices: usize,
    done: bool,
}

impl PolyFileReader<BufReader<File>> {
    /// Open a poly file from disk. Compressed files are not supported.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)))
    }
}

impl<R: BufRead> PolyFileReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            bounds: None,
            total_vertices: 0,
            done: false,
        }
    }

    /// Bounds of every vertex decoded so far, `None` before the first vertex.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// Vertices decoded so far, holes included.
    pub fn total_vertices(&self) -> usize {
        self.total_vertices
    }

    /// Line number of the most recently read line, starting at 1.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next line into `self.line` without its terminator.
    /// Returns false at end of stream.
    fn advance(&mut self) -> Result<bool> {
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        if self.line.ends_with('\n') {
            self.line.pop();
            if self.line.ends_with('\r') {
                self.line.pop();
            }
        }
        Ok(true)
    }

    fn format_error(&self, message: impl Into<String>) -> BenchError {
        BenchError::Format {
            line: self.line_number,
            message: message.into(),
        }
    }

    /// Advance and strip `prefix`, failing on end of stream or a mismatch.
    fn expect(&mut self, prefix: &str) -> Result<String> {
        if !self.advance()? {
            return Err(BenchError::Format {
                line: self.line_number + 1,
                message: format!("unexpected end of stream, expected {:?}", prefix),
            });
        }
        match self.line.strip_prefix(prefix) {
            Some(rest) => Ok(rest.to_string()),
            None => Err(self.format_error(format!(
                "expected line starting with {:?}, got {:?}",
                prefix, self.line
            ))),
        }
    }

    fn parse_count(&self, text: &str, what: &str) -> Result<usize> {
        let count: usize = text
            .parse()
            .map_err(|_| self.format_error(format!("invalid {} {:?}", what, text)))?;
        if count == 0 {
            return Err(self.format_error(format!("{} must be at least 1", what)));
        }
        Ok(count)
    }

    fn parse_coordinates(&self, text: &str, expected: usize, axis: &str) -> Result<Vec<f64>> {
        // single spaces only; trailing separators are ignored
        let values = text
            .trim_end_matches(' ')
            .split(' ')
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| self.format_error(format!("invalid {} value {:?}", axis, token)))
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != expected {
            return Err(self.format_error(format!(
                "expected {} {} values, got {}",
                expected,
                axis,
                values.len()
            )));
        }
        Ok(values)
    }

    fn read_ring(&mut self) -> Result<Vec<GeoPoint>> {
        let header = self.expect(VERTEX_PREFIX)?;
        let vertex_count = self.parse_count(&header, "vertex count")?;

        let lats_text = self.expect(LATS_PREFIX)?;
        let lats = self.parse_coordinates(&lats_text, vertex_count, "lats")?;
        let lons_text = self.expect(LONS_PREFIX)?;
        let lons = self.parse_coordinates(&lons_text, vertex_count, "lons")?;

        let mut ring = Vec::with_capacity(lats.len());
        for (lat, lon) in lats.into_iter().zip(lons) {
            let vertex = GeoPoint::new(lat, lon)?;
            match self.bounds.as_mut() {
                Some(bounds) => bounds.expand_to_include(&vertex),
                None => self.bounds = Some(BoundingBox::from_point(&vertex)),
            }
            ring.push(vertex);
        }
        self.total_vertices += vertex_count;
        Ok(ring)
    }

    fn read_group(&mut self) -> Result<Polygon> {
        let header = self.expect(POLY_PREFIX)?;
        let ring_count = self.parse_count(&header, "poly count")?;

        let exterior = self.read_ring()?;
        let mut holes = Vec::new();
        for _ in 1..ring_count {
            holes.push(self.read_ring()?);
        }
        Ok(Polygon::new(exterior, holes)?)
    }

    fn read_query(&mut self) -> Result<Option<MultiPolygonQuery>> {
        if !self.advance()? {
            return Ok(None);
        }
        let rest = match self.line.strip_prefix(QUERY_PREFIX) {
            Some(rest) => rest,
            None => {
                return Err(self.format_error(format!(
                    "expected line starting with {:?}, got {:?}",
                    QUERY_PREFIX, self.line
                )));
            }
        };
        // anything after the first space is a free-form label
        let count_text = rest.split(' ').next().unwrap_or(rest).to_string();
        let group_count = self.parse_count(&count_text, "count")?;

        let mut polygons = Vec::new();
        for _ in 0..group_count {
            polygons.push(self.read_group()?);
        }
        Ok(Some(MultiPolygonQuery::new(polygons)?))
    }
}

impl<R: BufRead> Iterator for PolyFileReader<R> {
    type Item = Result<MultiPolygonQuery>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_query() {
            Ok(Some(query)) => Some(Ok(query)),
            Ok(None) => {
                self.done = true;
                log::info!(
                    "Decoded poly file: {} lines, {} vertices",
                    self.line_number,
                    self.total_vertices
                );
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode every query in `reader`.
pub fn decode<R: BufRead>(reader: R) -> PolyFileReader<R> {
    PolyFileReader::new(reader)
}

fn write_ring<W: Write>(ring: &[GeoPoint], out: &mut W) -> Result<()> {
    writeln!(out, "{}{}", VERTEX_PREFIX, ring.len())?;
    write!(out, "{}", LATS_PREFIX.trim_end())?;
    for vertex in ring {
        write!(out, " {}", vertex.lat())?;
    }
    writeln!(out)?;
    write!(out, "{}", LONS_PREFIX.trim_end())?;
    for vertex in ring {
        write!(out, " {}", vertex.lon())?;
    }
    writeln!(out)?;
    Ok(())
}

/// Write `query` as one poly file record.
///
/// Floats use the shortest representation that parses back to the same
/// value, so decoding the output reproduces `query` exactly.
pub fn encode<W: Write>(query: &MultiPolygonQuery, out: &mut W) -> Result<()> {
    writeln!(out, "{}{}", QUERY_PREFIX, query.polygons().len())?;
    for polygon in query.polygons() {
        writeln!(out, "{}{}", POLY_PREFIX, 1 + polygon.holes().len())?;
        write_ring(polygon.exterior(), out)?;
        for hole in polygon.holes() {
            write_ring(hole, out)?;
        }
    }
    Ok(())
}
