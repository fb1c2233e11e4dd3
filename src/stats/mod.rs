//! Statistics collection
//!
//! Transfer counters and the reporting sink.
//!
//! Three accumulators exist during a run:
//!
//! - **heartbeat**: reset every time a heartbeat report is emitted
//! - **cycle**: reset at the start of every pass
//! - **global**: the whole run, rolled up from cycle stats at every pass end
//!
//! Workers update the heartbeat and cycle accumulators under the shared state's
//! data lock; the duration controller adds elapsed time to them once a second.
//! Formatting is left to a `Reporter`.
//!
//! # Example
//!
//! ```
//! use disktest::engine::OperationType;
//! use disktest::stats::{Stats, StatsSnapshot, TimeScaling};
//!
//! let mut stats = Stats::default();
//! stats.record(OperationType::Write, 4096);
//! stats.record(OperationType::Read, 4096);
//! stats.wtime = 2;
//! stats.rtime = 2;
//!
//! let snapshot = StatsSnapshot::new(stats, TimeScaling::Phased);
//! assert_eq!(snapshot.write_iops(), 0.5);
//! ```

use crate::engine::OperationType;
use crate::error::IoFailure;
use crate::util::time::per_second;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counts, bytes and elapsed seconds per direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub wcount: u64,
    pub rcount: u64,
    pub wbytes: u64,
    pub rbytes: u64,
    /// Seconds attributed to writing
    pub wtime: u64,
    /// Seconds attributed to reading
    pub rtime: u64,
}

impl Stats {
    /// Record one completed transfer
    pub fn record(&mut self, op: OperationType, bytes: u64) {
        match op {
            OperationType::Read => {
                self.rcount += 1;
                self.rbytes += bytes;
            }
            OperationType::Write => {
                self.wcount += 1;
                self.wbytes += bytes;
            }
        }
    }

    /// Add elapsed seconds
    pub fn add_time(&mut self, read_secs: u64, write_secs: u64) {
        self.rtime += read_secs;
        self.wtime += write_secs;
    }

    /// Accumulate another set of stats into this one
    pub fn merge(&mut self, other: &Stats) {
        self.wcount += other.wcount;
        self.rcount += other.rcount;
        self.wbytes += other.wbytes;
        self.rbytes += other.rbytes;
        self.wtime += other.wtime;
        self.rtime += other.rtime;
    }

    /// Return the current values and reset to zero
    pub fn take(&mut self) -> Stats {
        std::mem::take(self)
    }

    pub fn total_ops(&self) -> u64 {
        self.wcount + self.rcount
    }

    pub fn total_bytes(&self) -> u64 {
        self.wbytes + self.rbytes
    }
}

/// How elapsed time maps onto each direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeScaling {
    /// Reads and writes run in separate phases; time is already attributed
    Phased,
    /// Reads and writes are mixed; time is shared by duty percentage
    Duty { read_percent: u8, write_percent: u8 },
}

/// Read-only view of an accumulator with derived rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub stats: Stats,
    pub read_seconds: u64,
    pub write_seconds: u64,
}

impl StatsSnapshot {
    pub fn new(stats: Stats, scaling: TimeScaling) -> Self {
        let (read_seconds, write_seconds) = match scaling {
            TimeScaling::Phased => (stats.rtime, stats.wtime),
            TimeScaling::Duty {
                read_percent,
                write_percent,
            } => (
                (stats.rtime * read_percent as u64 / 100).max(1),
                (stats.wtime * write_percent as u64 / 100).max(1),
            ),
        };
        Self {
            stats,
            read_seconds,
            write_seconds,
        }
    }

    pub fn read_iops(&self) -> f64 {
        per_second(self.stats.rcount, self.read_seconds)
    }

    pub fn write_iops(&self) -> f64 {
        per_second(self.stats.wcount, self.write_seconds)
    }

    /// Bytes per second
    pub fn read_throughput(&self) -> f64 {
        per_second(self.stats.rbytes, self.read_seconds)
    }

    /// Bytes per second
    pub fn write_throughput(&self) -> f64 {
        per_second(self.stats.wbytes, self.write_seconds)
    }
}

/// Statistics/reporting sink
///
/// The engine calls these hooks; formatting and output are up to the implementor.
pub trait Reporter: Send + Sync {
    /// Periodic report; `snapshot` covers the interval since the previous heartbeat
    fn heartbeat(&self, pass: u64, elapsed_secs: u64, snapshot: &StatsSnapshot);

    /// End-of-pass report for the pass's cycle stats
    fn cycle(&self, pass: u64, snapshot: &StatsSnapshot);

    /// A transfer failed; called once per failure, including every miscompare
    fn failure(&self, pass: u64, failure: &IoFailure);
}

/// Copy of a reported failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub pass: u64,
    pub lba: u64,
    pub message: String,
    pub miscompare: bool,
    /// Hex dump for miscompares
    pub dump: Option<String>,
}

#[derive(Debug, Default)]
struct Collected {
    heartbeats: Vec<(u64, u64, StatsSnapshot)>,
    cycles: Vec<(u64, StatsSnapshot)>,
    failures: Vec<FailureRecord>,
}

/// Reporter that keeps everything it is given, for embedding and tests
#[derive(Debug, Default)]
pub struct CollectingReporter {
    inner: Mutex<Collected>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collected> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// (pass, elapsed seconds, snapshot) per heartbeat
    pub fn heartbeats(&self) -> Vec<(u64, u64, StatsSnapshot)> {
        self.lock().heartbeats.clone()
    }

    /// (pass, snapshot) per completed pass
    pub fn cycles(&self) -> Vec<(u64, StatsSnapshot)> {
        self.lock().cycles.clone()
    }

    pub fn failures(&self) -> Vec<FailureRecord> {
        self.lock().failures.clone()
    }

    pub fn miscompares(&self) -> Vec<FailureRecord> {
        self.lock()
            .failures
            .iter()
            .filter(|f| f.miscompare)
            .cloned()
            .collect()
    }
}

impl Reporter for CollectingReporter {
    fn heartbeat(&self, pass: u64, elapsed_secs: u64, snapshot: &StatsSnapshot) {
        self.lock().heartbeats.push((pass, elapsed_secs, *snapshot));
    }

    fn cycle(&self, pass: u64, snapshot: &StatsSnapshot) {
        self.lock().cycles.push((pass, *snapshot));
    }

    fn failure(&self, pass: u64, failure: &IoFailure) {
        let (miscompare, dump) = match failure {
            IoFailure::Miscompare(m) => (true, Some(m.dump())),
            _ => (false, None),
        };
        self.lock().failures.push(FailureRecord {
            pass,
            lba: failure.lba(),
            message: failure.to_string(),
            miscompare,
            dump,
        });
    }
}
