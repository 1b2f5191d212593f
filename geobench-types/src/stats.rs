use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Measurements for one timed pass over a workload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    /// Zero-based iteration number
    pub iteration: usize,
    /// Wall-clock time of the pass
    pub elapsed: Duration,
    /// Matching documents summed over all queries and partitions
    pub total_hits: u64,
    /// Sum of hit distances in meters; only meaningful for nearest-neighbor workloads
    pub total_nearest_distance: f64,
    /// Number of queries executed
    pub query_count: usize,
}

impl IterationStats {
    pub fn new(iteration: usize) -> Self {
        Self {
            iteration,
            ..Self::default()
        }
    }

    pub fn record_hits(&mut self, hits: u64) {
        self.total_hits += hits;
    }

    pub fn record_nearest_distance(&mut self, meters: f64) {
        self.total_nearest_distance += meters;
    }

    pub fn record_query(&mut self) {
        self.query_count += 1;
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn queries_per_second(&self) -> f64 {
        self.query_count as f64 / self.elapsed_secs()
    }

    pub fn hits_per_second(&self) -> f64 {
        self.total_hits as f64 / self.elapsed_secs()
    }

    pub fn million_hits_per_second(&self) -> f64 {
        self.hits_per_second() / 1_000_000.0
    }
}

/// The fastest iteration seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestThroughput {
    pub iteration: usize,
    pub queries_per_second: f64,
    pub hits_per_second: f64,
}

impl BestThroughput {
    pub fn from_stats(stats: &IterationStats) -> Self {
        Self {
            iteration: stats.iteration,
            queries_per_second: stats.queries_per_second(),
            hits_per_second: stats.hits_per_second(),
        }
    }

    pub fn million_hits_per_second(&self) -> f64 {
        self.hits_per_second / 1_000_000.0
    }

    /// Fold `stats` into `best`. Only a strictly higher QPS replaces the
    /// current best, so ties keep the earlier iteration.
    ///
    /// Returns true when `stats` became the new best.
    ///
    /// # Examples
    ///
    /// ```
    /// use geobench_types::stats::{BestThroughput, IterationStats};
    /// use std::time::Duration;
    ///
    /// let mut best = None;
    /// let first = IterationStats { iteration: 0, elapsed: Duration::from_secs(2), query_count: 10, ..Default::default() };
    /// let tie = IterationStats { iteration: 1, ..first.clone() };
    /// assert!(BestThroughput::observe(&mut best, &first));
    /// assert!(!BestThroughput::observe(&mut best, &tie));
    /// assert_eq!(best.unwrap().iteration, 0);
    /// ```
    pub fn observe(best: &mut Option<BestThroughput>, stats: &IterationStats) -> bool {
        let qps = stats.queries_per_second();
        let improved = match best {
            Some(current) => qps > current.queries_per_second,
            None => true,
        };
        if improved {
            *best = Some(Self::from_stats(stats));
        }
        improved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = IterationStats {
            iteration: 3,
            elapsed: Duration::from_millis(500),
            total_hits: 2_000_000,
            total_nearest_distance: 0.0,
            query_count: 50,
        };
        assert_eq!(stats.queries_per_second(), 100.0);
        assert_eq!(stats.hits_per_second(), 4_000_000.0);
        assert_eq!(stats.million_hits_per_second(), 4.0);
    }

    #[test]
    fn test_observe_keeps_strictly_better() {
        let slow = IterationStats {
            iteration: 0,
            elapsed: Duration::from_secs(2),
            query_count: 10,
            ..Default::default()
        };
        let fast = IterationStats {
            iteration: 1,
            elapsed: Duration::from_secs(1),
            query_count: 10,
            ..Default::default()
        };
        let slower = IterationStats {
            iteration: 2,
            elapsed: Duration::from_secs(3),
            query_count: 10,
            ..Default::default()
        };

        let mut best = None;
        assert!(BestThroughput::observe(&mut best, &slow));
        assert!(BestThroughput::observe(&mut best, &fast));
        assert!(!BestThroughput::observe(&mut best, &slower));
        assert_eq!(best.unwrap().iteration, 1);
        assert_eq!(best.unwrap().queries_per_second, 10.0);
    }
}
