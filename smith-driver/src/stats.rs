//! Counters shared by every worker and read by the periodic reporter.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use colored::Colorize;
use tracing::info;

#[derive(Debug, Default)]
pub struct Stats {
    pub total: AtomicU64,
    pub known: AtomicU64,
    /// Build and coverage-build failures.
    pub build: AtomicU64,
    pub ssadump: AtomicU64,
    pub gofmt: AtomicU64,
    pub exec: AtomicU64,
    pub generator: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub total: u64,
    pub known: u64,
    pub build: u64,
    pub ssadump: u64,
    pub gofmt: u64,
    pub exec: u64,
    pub generator: u64,
}

impl Stats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Snapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        Snapshot {
            total: load(&self.total),
            known: load(&self.known),
            build: load(&self.build),
            ssadump: load(&self.ssadump),
            gofmt: load(&self.gofmt),
            exec: load(&self.exec),
            generator: load(&self.generator),
        }
    }

    /// Log a stats line every `interval`, forever.
    pub fn report_forever(&self, interval: Duration) -> ! {
        loop {
            info!("{}", self.snapshot());
            std::thread::sleep(interval);
        }
    }
}

impl Snapshot {
    pub fn failures(&self) -> u64 {
        self.build + self.ssadump + self.gofmt + self.exec
    }
}

fn failure(n: u64, label: &str) -> String {
    let text = format!("{} {}", n, label);
    if n == 0 { text } else { text.red().bold().to_string() }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tests, {} known, {}, {}, {}, {}, {} generator failures",
            self.total,
            self.known,
            failure(self.build, "build"),
            failure(self.ssadump, "ssadump"),
            failure(self.gofmt, "gofmt"),
            failure(self.exec, "exec"),
            self.generator,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_line() {
        colored::control::set_override(false);
        let stats = Stats::default();
        Stats::bump(&stats.total);
        Stats::bump(&stats.total);
        Stats::bump(&stats.known);
        Stats::bump(&stats.gofmt);
        let snap = stats.snapshot();
        assert_eq!(snap.failures(), 1);
        assert_eq!(snap.to_string(), "2 tests, 1 known, 0 build, 0 ssadump, 1 gofmt, 0 exec, 0 generator failures");
    }

    #[test]
    fn concurrent_bumps_are_not_lost() {
        let stats = Stats::default();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        Stats::bump(&stats.exec);
                    }
                });
            }
        });
        assert_eq!(stats.snapshot().exec, 8000);
    }
}
