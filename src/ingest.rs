//! Concurrent bulk loading from one shared line stream.
//!
//! Workers take turns holding a single lock while they pull the next batch of
//! lines off the stream (and, when a document cap applies, claim that many
//! documents against it). Parsing and index inserts happen outside the lock.
//! Every line is read by exactly one worker, and all workers have been joined
//! before [`BulkLoader::ingest`] returns.

use crate::config::IngestConfig;
use crate::error::{BenchError, Result};
use crate::index::{Document, Index};
use geobench_types::GeoPoint;
use parking_lot::Mutex;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

const PROGRESS_INTERVAL: u64 = 1_000_000;

/// One `id,lat,lon` line, borrowed from the read buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestionRecord<'a> {
    pub id: &'a str,
    pub point: GeoPoint,
}

impl<'a> IngestionRecord<'a> {
    /// Parse one line. Fields past the third are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use geobench::ingest::IngestionRecord;
    ///
    /// let record = IngestionRecord::parse("node42,51.5,-0.12", 1).unwrap();
    /// assert_eq!(record.id, "node42");
    /// assert_eq!(record.point.lat(), 51.5);
    ///
    /// assert!(IngestionRecord::parse("node42,51.5", 2).is_err());
    /// assert!(IngestionRecord::parse("node42,north,-0.12", 3).is_err());
    /// ```
    pub fn parse(line: &'a str, line_number: u64) -> Result<Self> {
        let fail = |message: String| BenchError::IngestionParse {
            line: line_number,
            message,
        };

        let mut fields = line.split(',');
        let id = fields.next().unwrap_or_default();
        let (lat_text, lon_text) = match (fields.next(), fields.next()) {
            (Some(lat), Some(lon)) => (lat.trim(), lon.trim()),
            _ => return Err(fail(format!("expected id,lat,lon, got {:?}", line))),
        };
        let lat: f64 = lat_text
            .parse()
            .map_err(|_| fail(format!("invalid latitude {:?}", lat_text)))?;
        let lon: f64 = lon_text
            .parse()
            .map_err(|_| fail(format!("invalid longitude {:?}", lon_text)))?;
        let point = GeoPoint::new(lat, lon).map_err(|e| fail(e.to_string()))?;

        Ok(Self { id, point })
    }

    pub fn into_document(self) -> Document {
        Document::new(self.id, self.point)
    }
}

/// The shared stream position plus the documents claimed against the cap.
struct Cursor<'r, R> {
    reader: &'r mut R,
    lines_read: u64,
    claimed: u64,
}

struct Batch {
    lines: Vec<String>,
    len: usize,
    first_line: u64,
}

impl Batch {
    fn new(capacity: usize) -> Self {
        Self {
            lines: vec![String::new(); capacity],
            len: 0,
            first_line: 0,
        }
    }
}

impl<R: BufRead> Cursor<'_, R> {
    /// Read up to `limit` lines into `batch`. Returns true at end of stream.
    fn fill(&mut self, batch: &mut Batch, limit: usize) -> std::io::Result<bool> {
        batch.len = 0;
        batch.first_line = self.lines_read + 1;
        while batch.len < limit {
            let line = &mut batch.lines[batch.len];
            line.clear();
            if self.reader.read_line(line)? == 0 {
                return Ok(true);
            }
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            batch.len += 1;
            self.lines_read += 1;
        }
        Ok(false)
    }
}

struct Shared<'r, R> {
    cursor: Mutex<Cursor<'r, R>>,
    finished: AtomicBool,
    ingested: AtomicU64,
    first_error: Mutex<Option<BenchError>>,
}

impl<R> Shared<'_, R> {
    fn fail(&self, err: BenchError) {
        self.finished.store(true, Ordering::SeqCst);
        let mut slot = self.first_error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }
}

/// Feeds an [`Index`] from a line stream with a fixed pool of worker threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkLoader {
    workers: usize,
    batch_size: usize,
}

impl Default for BulkLoader {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

impl BulkLoader {
    pub fn new(workers: usize, batch_size: usize) -> Self {
        Self {
            workers: workers.max(1),
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.workers, config.batch_size)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Ingest records from `source` until it ends or `doc_cap` documents have
    /// been claimed. Returns the number of documents inserted.
    ///
    /// With a cap, no line past the cap is read, so the rest of `source` can
    /// feed another partition.
    pub fn ingest<R, I>(&self, source: &mut R, index: &I, doc_cap: Option<u64>) -> Result<u64>
    where
        R: BufRead + Send,
        I: Index + ?Sized,
    {
        let start = Instant::now();
        let shared = Shared {
            cursor: Mutex::new(Cursor {
                reader: source,
                lines_read: 0,
                claimed: 0,
            }),
            finished: AtomicBool::new(false),
            ingested: AtomicU64::new(0),
            first_error: Mutex::new(None),
        };

        std::thread::scope(|scope| {
            for worker in 0..self.workers {
                let shared = &shared;
                scope.spawn(move || {
                    if let Err(e) = self.run_worker(worker, shared, index, doc_cap) {
                        shared.fail(e);
                    }
                });
            }
        });

        if let Some(err) = shared.first_error.into_inner() {
            return Err(err);
        }
        let total = shared.ingested.into_inner();
        log::info!(
            "Ingested {} documents with {} workers in {:.2}s",
            total,
            self.workers,
            start.elapsed().as_secs_f64()
        );
        Ok(total)
    }

    fn run_worker<R, I>(
        &self,
        worker: usize,
        shared: &Shared<'_, R>,
        index: &I,
        doc_cap: Option<u64>,
    ) -> Result<()>
    where
        R: BufRead + Send,
        I: Index + ?Sized,
    {
        let mut batch = Batch::new(self.batch_size);
        while !shared.finished.load(Ordering::SeqCst) {
            {
                let mut cursor = shared.cursor.lock();
                // re-check under the lock; a sibling may have hit the end
                if shared.finished.load(Ordering::SeqCst) {
                    break;
                }
                let limit = match doc_cap {
                    Some(cap) => self.batch_size.min(cap.saturating_sub(cursor.claimed) as usize),
                    None => self.batch_size,
                };
                batch.len = 0;
                let exhausted = limit == 0 || cursor.fill(&mut batch, limit)?;
                cursor.claimed += batch.len as u64;
                let capped = doc_cap.is_some_and(|cap| cursor.claimed >= cap);
                if exhausted || capped {
                    shared.finished.store(true, Ordering::SeqCst);
                }
            }

            if batch.len == 0 {
                break;
            }
            log::debug!(
                "worker {} took {} lines starting at line {}",
                worker,
                batch.len,
                batch.first_line
            );

            for (offset, line) in batch.lines[..batch.len].iter().enumerate() {
                let record = IngestionRecord::parse(line, batch.first_line + offset as u64)?;
                index.bulk_insert(record.into_document())?;
            }

            let n = batch.len as u64;
            let before = shared.ingested.fetch_add(n, Ordering::SeqCst);
            if (before + n) / PROGRESS_INTERVAL > before / PROGRESS_INTERVAL {
                log::info!("{}...", (before + n) / PROGRESS_INTERVAL * PROGRESS_INTERVAL);
            }
        }
        Ok(())
    }
}
