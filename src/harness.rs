//! Repeated timed passes over a workload.
//!
//! Each iteration runs every query once against every partition and records
//! hits and wall-clock time. The best iteration is the one with the highest
//! queries per second; a later iteration only replaces it when strictly
//! faster.

use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::index::GeoIndex;
use crate::workload::{DISTANCE_SORT_TOP_N, PreparedQuery, Workload};
use geobench_types::{BestThroughput, IterationStats};
use std::time::Instant;

pub const DEFAULT_ITERATIONS: usize = 20;

/// Every iteration's measurements plus the best one.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputReport {
    pub iterations: Vec<IterationStats>,
    pub best: BestThroughput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputHarness {
    iterations: usize,
}

impl Default for ThroughputHarness {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl ThroughputHarness {
    pub fn new(iterations: usize) -> Self {
        Self { iterations }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(config.iterations)
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Time `workload` against `partitions` for the configured number of
    /// iterations.
    pub fn run<G: GeoIndex>(
        &self,
        workload: &Workload,
        partitions: &[G],
    ) -> Result<ThroughputReport> {
        if partitions.is_empty() {
            return Err(BenchError::Configuration(
                "Throughput harness needs at least one partition".into(),
            ));
        }
        let planner = &partitions[0];

        // fixed workloads build their predicates outside the timed region
        let prebuilt = if workload.is_fixed() {
            let queries = workload.queries()?;
            Some(
                queries
                    .iter()
                    .map(|query| workload.prepare(planner, query))
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        let mut stats = Vec::with_capacity(self.iterations);
        let mut best: Option<BestThroughput> = None;

        for iteration in 0..self.iterations {
            let mut iter_stats = IterationStats::new(iteration);
            let mut nearest = false;
            let start = Instant::now();

            match &prebuilt {
                Some(prepared) => {
                    for query in prepared {
                        nearest |= execute(query, partitions, &mut iter_stats)?;
                    }
                }
                None => {
                    for query in workload.queries()?.iter() {
                        let prepared = workload.prepare(planner, query)?;
                        nearest |= execute(&prepared, partitions, &mut iter_stats)?;
                    }
                }
            }

            iter_stats.elapsed = start.elapsed();
            log_iteration(&iter_stats, nearest);
            if BestThroughput::observe(&mut best, &iter_stats) {
                log::info!("  ***");
            }
            stats.push(iter_stats);
        }

        let best = best.ok_or_else(|| {
            BenchError::Configuration("Iterations must be greater than zero".into())
        })?;
        log::info!("BEST M hits/sec: {}", best.million_hits_per_second());
        log::info!("BEST QPS: {}", best.queries_per_second);

        Ok(ThroughputReport {
            iterations: stats,
            best,
        })
    }
}

/// Run one query against every partition. Returns true for nearest queries.
fn execute<G: GeoIndex>(
    query: &PreparedQuery,
    partitions: &[G],
    stats: &mut IterationStats,
) -> Result<bool> {
    let mut nearest = false;
    match query {
        PreparedQuery::Count(predicate) => {
            for partition in partitions {
                stats.record_hits(partition.count_matching(predicate)?);
            }
        }
        PreparedQuery::Sorted(predicate, sort) => {
            for partition in partitions {
                let sorted = partition.search_sorted(predicate, sort, DISTANCE_SORT_TOP_N)?;
                stats.record_hits(sorted.total_hits);
            }
        }
        PreparedQuery::Nearest { center, top_n } => {
            if partitions.len() != 1 {
                return Err(BenchError::Configuration(
                    "Nearest queries support a single partition only".into(),
                ));
            }
            let hits = partitions[0].nearest(center, *top_n)?;
            stats.record_hits(hits.len() as u64);
            for hit in &hits {
                stats.record_nearest_distance(hit.distance_meters);
            }
            nearest = true;
        }
    }
    stats.record_query();
    Ok(nearest)
}

fn log_iteration(stats: &IterationStats, nearest: bool) {
    if nearest {
        log::info!(
            "ITER {}: {:.1} QPS ({:.1} sec for {} queries), totNearestDistance={:.10}",
            stats.iteration,
            stats.queries_per_second(),
            stats.elapsed_secs(),
            stats.query_count,
            stats.total_nearest_distance
        );
    } else {
        log::info!(
            "ITER {}: {:.1} M hits/sec, {:.1} QPS ({:.1} sec for {} queries), totHits={}",
            stats.iteration,
            stats.million_hits_per_second(),
            stats.queries_per_second(),
            stats.elapsed_secs(),
            stats.query_count,
            stats.total_hits
        );
    }
}
