//! Work partition across worker processes
//!
//! Each worker renders a contiguous image range with its own annotation file. Ranges are
//! proportional to worker throughput, measured as the time a worker took on a common
//! benchmark (faster worker, larger share).

use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkShard {
    pub worker: usize,
    pub start_index: u64,
    pub num_images: u64,
}

/// Splits `num_images` starting at `start_index` by `benchmark_secs` (one entry per worker).
///
/// Shares follow `1 / time`; rounding leftovers go to the fastest workers first.
pub fn divide_workload(
    start_index: u64,
    num_images: u64,
    benchmark_secs: &[f64],
) -> Result<Vec<WorkShard>, ConfigError> {
    if benchmark_secs.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "benchmark_time".to_string(),
            reason: "at least one worker is required".to_string(),
        });
    }
    if let Some(bad) = benchmark_secs.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
        return Err(ConfigError::InvalidValue {
            key: "benchmark_time".to_string(),
            reason: format!("{bad} is not a positive duration"),
        });
    }

    let speeds: Vec<f64> = benchmark_secs.iter().map(|t| 1.0 / t).collect();
    let total_speed: f64 = speeds.iter().sum();
    let exact: Vec<f64> = speeds.iter().map(|s| num_images as f64 * s / total_speed).collect();
    let mut counts: Vec<u64> = exact.iter().map(|e| e.floor() as u64).collect();

    let assigned: u64 = counts.iter().sum();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (exact[a] - exact[a].floor(), exact[b] - exact[b].floor());
        rb.total_cmp(&ra).then(speeds[b].total_cmp(&speeds[a])).then(a.cmp(&b))
    });
    for &worker in order.iter().cycle().take(num_images.saturating_sub(assigned) as usize) {
        counts[worker] += 1;
    }

    let mut next = start_index;
    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(worker, num_images)| {
            let shard = WorkShard { worker, start_index: next, num_images };
            next += num_images;
            shard
        })
        .collect())
}

impl WorkShard {
    /// Worker configuration: the shard's range plus a `part<N>` file prefix so annotation
    /// and checkpoint files of different workers never collide.
    pub fn apply(&self, base: &GeneratorConfig) -> GeneratorConfig {
        let mut config = base.clone();
        config.output.start_index = self.start_index;
        config.output.num_images = self.num_images;
        config.output.filename_prefix = Some(match &base.output.filename_prefix {
            Some(prefix) => format!("{prefix}_part{}", self.worker),
            None => format!("part{}", self.worker),
        });
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_faster_worker_gets_more() {
        // worker 1 is twice as fast
        let shards = divide_workload(100, 30, &[2.0, 1.0]).unwrap();
        assert_eq!(
            shards,
            vec![
                WorkShard { worker: 0, start_index: 100, num_images: 10 },
                WorkShard { worker: 1, start_index: 110, num_images: 20 },
            ]
        );
    }

    #[test]
    fn test_leftover_goes_to_fastest() {
        let shards = divide_workload(0, 10, &[1.0, 1.0, 1.0]).unwrap();
        let counts: Vec<u64> = shards.iter().map(|s| s.num_images).collect();
        assert_eq!(counts, vec![4, 3, 3]);
    }

    #[test]
    fn test_invalid_times() {
        assert!(divide_workload(0, 10, &[]).is_err());
        assert!(divide_workload(0, 10, &[1.0, 0.0]).is_err());
        assert!(divide_workload(0, 10, &[f64::NAN]).is_err());
    }

    #[test]
    fn test_apply_sets_range_and_prefix() {
        let shard = WorkShard { worker: 2, start_index: 40, num_images: 15 };
        let mut base = GeneratorConfig::default();
        let config = shard.apply(&base);
        assert_eq!(config.output.start_index, 40);
        assert_eq!(config.output.num_images, 15);
        assert_eq!(config.output.filename_prefix.as_deref(), Some("part2"));

        base.output.filename_prefix = Some("night".to_string());
        assert_eq!(shard.apply(&base).output.filename_prefix.as_deref(), Some("night_part2"));
    }

    proptest! {
        #[test]
        fn prop_shards_are_contiguous_and_complete(
            start in 0u64..1000,
            total in 0u64..5000,
            times in prop::collection::vec(0.1f64..100.0, 1..8),
        ) {
            let shards = divide_workload(start, total, &times).unwrap();
            prop_assert_eq!(shards.len(), times.len());
            prop_assert_eq!(shards.iter().map(|s| s.num_images).sum::<u64>(), total);
            let mut next = start;
            for shard in &shards {
                prop_assert_eq!(shard.start_index, next);
                next += shard.num_images;
            }
        }
    }
}
