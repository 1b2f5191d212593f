//! End-to-end benchmark run: ingest every partition, then time the workload.

use crate::config::{BenchConfig, EncodingKind};
use crate::error::Result;
use crate::harness::{ThroughputHarness, ThroughputReport};
use crate::index::{
    Geo3dEncoding, Index, PointEncoding, PointsEncoding, PostingsEncoding,
    SegmentedIndex,
};
use crate::ingest::BulkLoader;
use crate::workload::Workload;
use std::io::BufRead;
use std::time::Instant;

/// Ingestion outcome for one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSummary {
    pub name: String,
    pub docs: u64,
    pub segments: usize,
    pub ingest_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub encoding: EncodingKind,
    pub partitions: Vec<PartitionSummary>,
    pub throughput: ThroughputReport,
}

impl BenchReport {
    pub fn total_docs(&self) -> u64 {
        self.partitions.iter().map(|p| p.docs).sum()
    }
}

pub struct BenchRunner {
    config: BenchConfig,
}

impl BenchRunner {
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Build the configured workload and run it over `points`.
    ///
    /// The workload is built before ingestion so a broken poly file fails
    /// without reading any points.
    pub fn run<R: BufRead + Send>(&self, points: &mut R) -> Result<BenchReport> {
        let workload = Workload::from_config(&self.config)?;
        self.run_workload(points, &workload)
    }

    /// Run an already built workload over `points`.
    pub fn run_workload<R: BufRead + Send>(
        &self,
        points: &mut R,
        workload: &Workload,
    ) -> Result<BenchReport> {
        match self.config.encoding {
            EncodingKind::Postings => self.run_with(
                PostingsEncoding::new(self.config.postings_precision)?,
                points,
                workload,
            ),
            EncodingKind::Geo3d => self.run_with(Geo3dEncoding, points, workload),
            EncodingKind::Points => self.run_with(PointsEncoding, points, workload),
        }
    }

    fn run_with<E, R>(&self, encoding: E, points: &mut R, workload: &Workload) -> Result<BenchReport>
    where
        E: PointEncoding + Clone,
        R: BufRead + Send,
    {
        log::info!(
            "Running {} query benchmark on {} encoding, {} dataset",
            self.config.query.name(),
            E::NAME,
            self.config.dataset.label()
        );
        let (partitions, summaries) = self.build_partitions(encoding, points)?;

        let harness = ThroughputHarness::from_config(&self.config);
        let throughput = harness.run(workload, &partitions)?;

        Ok(BenchReport {
            encoding: self.config.encoding,
            partitions: summaries,
            throughput,
        })
    }

    fn build_partitions<E, R>(
        &self,
        encoding: E,
        points: &mut R,
    ) -> Result<(Vec<SegmentedIndex<E>>, Vec<PartitionSummary>)>
    where
        E: PointEncoding + Clone,
        R: BufRead + Send,
    {
        let loader = BulkLoader::from_config(&self.config.ingest);
        let count = self.config.dataset.partitions();
        let mut partitions = Vec::with_capacity(count);
        let mut summaries = Vec::with_capacity(count);

        for part in 0..count {
            let name = self.config.partition_name(part);
            let index = SegmentedIndex::new(name.clone(), encoding.clone());
            let start = Instant::now();

            // only the first partition is capped; later ones take the rest
            let cap = if part == 0 { self.config.ingest.doc_cap } else { None };
            let ingested = loader.ingest(points, &index, cap)?;
            index.commit()?;
            if self.config.ingest.force_merge {
                let merge_start = Instant::now();
                index.force_merge()?;
                log::info!("{}: force merge took {:?}", name, merge_start.elapsed());
            }

            let ingest_secs = start.elapsed().as_secs_f64();
            log::info!(
                "{}: indexed {} points in {:.1} sec ({} segments)",
                name,
                ingested,
                ingest_secs,
                index.segment_count()
            );
            summaries.push(PartitionSummary {
                name,
                docs: index.doc_count(),
                segments: index.segment_count(),
                ingest_secs,
            });
            partitions.push(index);
        }

        Ok((partitions, summaries))
    }
}

/// Convenience wrapper: validate `config` and run it over `points`.
pub fn run<R: BufRead + Send>(config: BenchConfig, points: &mut R) -> Result<BenchReport> {
    BenchRunner::new(config)?.run(points)
}
