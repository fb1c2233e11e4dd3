//! Shared test state
//!
//! The single structure visible to every worker and to the duration controller
//! for the length of one pass. It is guarded by two locks that are only ever
//! taken in the order primary → data:
//!
//! - **primary** (`lock_schedule`): cursors and scheduler bookkeeping; held
//!   for the whole of an action decision
//! - **data** (`lock_data`): the write bitmap and the statistics; held only
//!   for counter and bitmap updates, and briefly by the read-after-write gate
//!
//! The continue and pass flags are atomics so that they can be polled without
//! either lock.
//!
//! # Invariants
//!
//! - A bitmap bit is set if and only if the write covering that LBA completed
//!   during this pass; bits are never cleared within a pass.
//! - `test_passed` is sticky: once cleared it stays cleared.

pub mod bitmap;

pub use bitmap::WriteBitmap;

use crate::config::Config;
use crate::engine::OperationType;
use crate::error::EngineError;
use crate::stats::Stats;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Direction of the linear cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Scheduler bookkeeping, guarded by the primary lock
#[derive(Debug, Clone)]
pub struct ScheduleState {
    /// Linear read cursor: the next start LBA sweeping up, the exclusive end
    /// of the next transfer sweeping down
    pub read_cursor: i64,
    /// Linear write cursor, same convention as `read_cursor`
    pub write_cursor: i64,
    pub direction: Direction,
    /// Operation of the most recent action, `None` before the first
    pub last_op: Option<OperationType>,
    /// No write has been issued yet this pass
    pub write_first: bool,
    /// No read has been issued yet this pass
    pub read_first: bool,
    /// Writes issued this pass
    pub wcount: u64,
    /// Reads issued this pass
    pub rcount: u64,
    /// Transfer size of the most recent write, retraced by interleaved reads
    pub last_write_blocks: u64,
    /// Seeded once per run; each pass continues from a jumped stream
    pub rng: Xoshiro256PlusPlus,
}

impl ScheduleState {
    pub fn new(start_lba: u64, rng: Xoshiro256PlusPlus) -> Self {
        Self {
            read_cursor: start_lba as i64,
            write_cursor: start_lba as i64,
            direction: Direction::Up,
            last_op: None,
            write_first: true,
            read_first: true,
            wcount: 0,
            rcount: 0,
            last_write_blocks: 0,
            rng,
        }
    }

    pub fn cursor(&self, op: OperationType) -> i64 {
        match op {
            OperationType::Read => self.read_cursor,
            OperationType::Write => self.write_cursor,
        }
    }

    pub fn cursor_mut(&mut self, op: OperationType) -> &mut i64 {
        match op {
            OperationType::Read => &mut self.read_cursor,
            OperationType::Write => &mut self.write_cursor,
        }
    }

    /// No action of this type has been issued yet
    pub fn is_first(&self, op: OperationType) -> bool {
        match op {
            OperationType::Read => self.read_first,
            OperationType::Write => self.write_first,
        }
    }
}

/// Bitmap and statistics, guarded by the data lock
#[derive(Debug)]
pub struct DataState {
    pub bitmap: WriteBitmap,
    pub heartbeat: Stats,
    pub cycle: Stats,
}

const PHASE_NONE: u8 = 0;
const PHASE_READ: u8 = 1;
const PHASE_WRITE: u8 = 2;

/// State shared by the workers and the duration controller for one pass
#[derive(Debug)]
pub struct SharedTestState {
    pass: u64,
    schedule: Mutex<ScheduleState>,
    data: Mutex<DataState>,
    continue_flag: AtomicBool,
    test_passed: AtomicBool,
    /// Run-wide stop request from outside the engine (signals, embedding code)
    external_stop: Arc<AtomicBool>,
    /// Operation of the most recent action, readable without the primary lock
    phase: AtomicU8,
    failures: AtomicU64,
}

impl SharedTestState {
    /// Fresh state for `pass`: cursors at the start LBA and a clear bitmap
    ///
    /// Fails when the bitmap for the configured range cannot be allocated.
    pub fn new(
        config: &Config,
        pass: u64,
        rng: Xoshiro256PlusPlus,
        external_stop: Arc<AtomicBool>,
    ) -> Result<Self, EngineError> {
        let start = config.start_lba();
        let bitmap = WriteBitmap::new(start, config.stop_lba())?;
        Ok(Self {
            pass,
            schedule: Mutex::new(ScheduleState::new(start, rng)),
            data: Mutex::new(DataState {
                bitmap,
                heartbeat: Stats::default(),
                cycle: Stats::default(),
            }),
            continue_flag: AtomicBool::new(true),
            test_passed: AtomicBool::new(true),
            external_stop,
            phase: AtomicU8::new(PHASE_NONE),
            failures: AtomicU64::new(0),
        })
    }

    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Acquire the primary lock
    pub fn lock_schedule(&self) -> MutexGuard<'_, ScheduleState> {
        self.schedule.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire the data lock
    pub fn lock_data(&self) -> MutexGuard<'_, DataState> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Workers keep going while this holds
    pub fn should_continue(&self) -> bool {
        self.continue_flag.load(Ordering::Acquire) && !self.external_stop.load(Ordering::Acquire)
    }

    /// Clear the continue flag; every worker stops at its next check
    pub fn request_stop(&self) {
        self.continue_flag.store(false, Ordering::Release);
    }

    /// The external stop request fired
    pub fn externally_stopped(&self) -> bool {
        self.external_stop.load(Ordering::Acquire)
    }

    pub fn test_passed(&self) -> bool {
        self.test_passed.load(Ordering::Acquire)
    }

    /// Record a failure: clears the pass flag, and the continue flag when `stop_all`
    pub fn record_failure(&self, stop_all: bool) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.test_passed.store(false, Ordering::Release);
        if stop_all {
            self.request_stop();
        }
    }

    /// Failures recorded this pass
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Whether every LBA in `[lba, lba + blocks)` has been written this pass
    pub fn is_range_written(&self, lba: u64, blocks: u64) -> bool {
        self.lock_data().bitmap.is_range_set(lba, blocks)
    }

    /// Account a completed write and mark its blocks written
    pub fn complete_write(&self, lba: u64, blocks: u64, bytes: u64) {
        let mut data = self.lock_data();
        data.bitmap.set_range(lba, blocks);
        data.heartbeat.record(OperationType::Write, bytes);
        data.cycle.record(OperationType::Write, bytes);
    }

    /// Account a completed read
    pub fn complete_read(&self, bytes: u64) {
        let mut data = self.lock_data();
        data.heartbeat.record(OperationType::Read, bytes);
        data.cycle.record(OperationType::Read, bytes);
    }

    /// Add elapsed seconds to the heartbeat and cycle accumulators
    pub fn add_time(&self, read_secs: u64, write_secs: u64) {
        let mut data = self.lock_data();
        data.heartbeat.add_time(read_secs, write_secs);
        data.cycle.add_time(read_secs, write_secs);
    }

    /// Current cycle stats
    pub fn cycle_stats(&self) -> Stats {
        self.lock_data().cycle
    }

    /// Heartbeat stats since the previous call, resetting the accumulator
    pub fn take_heartbeat_stats(&self) -> Stats {
        self.lock_data().heartbeat.take()
    }

    /// Number of LBAs written this pass
    pub fn written_blocks(&self) -> u64 {
        self.lock_data().bitmap.count_set()
    }

    pub fn set_phase(&self, op: OperationType) {
        let phase = match op {
            OperationType::Read => PHASE_READ,
            OperationType::Write => PHASE_WRITE,
        };
        self.phase.store(phase, Ordering::Relaxed);
    }

    /// Operation of the most recent action
    pub fn phase(&self) -> Option<OperationType> {
        match self.phase.load(Ordering::Relaxed) {
            PHASE_READ => Some(OperationType::Read),
            PHASE_WRITE => Some(OperationType::Write),
            _ => None,
        }
    }
}
