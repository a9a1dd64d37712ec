//! The worker pool: every worker loops over fresh seeds forever.
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::test_run::Harness;

/// Seeds handed out to workers, strictly increasing across all of them.
#[derive(Debug)]
pub struct SeedCounter(AtomicI64);

impl SeedCounter {
    pub fn starting_at(seed: i64) -> Self {
        Self(AtomicI64::new(seed))
    }

    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

/// Start `workers` endless test loops. The returned pool owns the threads.
pub fn spawn_workers(harness: Arc<Harness>, seeds: Arc<SeedCounter>, workers: usize) -> anyhow::Result<ThreadPool> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("smith-worker-{i}"))
        .build()?;
    for _ in 0..workers {
        let harness = Arc::clone(&harness);
        let seeds = Arc::clone(&seeds);
        pool.spawn(move || {
            loop {
                let seed = seeds.next();
                let outcome = harness.run_seed(seed);
                debug!(seed, ?outcome, "seed done");
            }
        });
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_unique_across_threads() {
        let seeds = SeedCounter::starting_at(100);
        let mut all: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| (0..250).map(|_| seeds.next()).collect::<Vec<_>>())).collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
        assert_eq!(all[0], 101);
        assert_eq!(all[999], 1100);
    }
}
