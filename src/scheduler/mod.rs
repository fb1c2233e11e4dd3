//! Action scheduler
//!
//! Decides, for every transfer, the operation, the transfer size and the LBA.
//! `Scheduler::next_action` must be called with the shared state's primary lock
//! held; the lock is what keeps two workers from being handed overlapping
//! linear ranges, because the cursor advance happens inside the same call as
//! the decision.
//!
//! # Decision steps
//!
//! 1. **Operation**: fixed by the configured directions, duty-cycled in random
//!    mode, strictly alternating in interleaved linear mode
//! 2. **Transfer size**: fixed, or drawn from `[low, high]`; interleaved reads
//!    reuse the size of the write they retrace
//! 3. **LBA**: diskcache start LBA, linear cursor, or masked random draw
//! 4. **Read-after-write gate**: a compared read of unwritten blocks waits for
//!    the write (linear) or becomes a write (random)
//! 5. **Termination**: `None` once the budget is spent or the run is stopping
//!
//! Randomness comes from the per-pass stream in `ScheduleState`, which is
//! seeded once per run, so identical seeds reproduce identical schedules.

use crate::config::workload::{AccessPattern, LinearSweep};
use crate::config::Config;
use crate::engine::OperationType;
use crate::state::{Direction, ScheduleState, SharedTestState};
use crossbeam::utils::Backoff;
use rand::{Rng, RngCore};
use std::thread;
use std::time::Duration;

/// Poll interval of the linear read-after-write gate once spinning gives up
const GATE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One transfer to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub op: OperationType,
    /// Transfer size in blocks
    pub blocks: u64,
    pub lba: u64,
}

/// Read-only scheduling policy derived from the configuration
#[derive(Debug, Clone)]
pub struct Scheduler {
    start: u64,
    stop: u64,
    low: u64,
    high: u64,
    access: AccessPattern,
    read: bool,
    write: bool,
    write_percent: u8,
    seeks: u64,
    seek_limited: bool,
    read_balance_cutoff: bool,
    cycling: bool,
    compare: bool,
    diskcache: bool,
}

impl Scheduler {
    pub fn new(config: &Config) -> Self {
        let (read, write) = config.directions();
        Self {
            start: config.start_lba(),
            stop: config.stop_lba(),
            low: config.transfer_low(),
            high: config.transfer_high(),
            access: config.workload.access,
            read,
            write,
            write_percent: config.percentages().1,
            seeks: config.seeks(),
            seek_limited: config.seek_limited(),
            read_balance_cutoff: config.read_balance_cutoff(),
            cycling: config.runtime.cycles.is_some(),
            compare: config.compare_enabled(),
            diskcache: config.is_diskcache(),
        }
    }

    /// Transfers per pass
    pub fn seeks(&self) -> u64 {
        self.seeks
    }

    fn read_write(&self) -> bool {
        self.read && self.write
    }

    /// Compute the next action, or `None` when the worker should stop
    ///
    /// # Arguments
    ///
    /// * `sched` - Scheduler bookkeeping, from the held primary lock
    /// * `state` - The shared state, for the bitmap and the continue flag
    pub fn next_action(
        &self,
        sched: &mut ScheduleState,
        state: &SharedTestState,
    ) -> Option<Action> {
        if !state.should_continue() || self.budget_exhausted(sched) {
            return None;
        }

        let mut op = self.choose_operation(sched);
        let mut blocks = self.choose_size(sched, op);

        let lba = if self.diskcache {
            self.start
        } else {
            match self.access {
                AccessPattern::Linear { sweep, interleaved } => {
                    self.linear_target(sched, &mut op, &mut blocks, sweep, interleaved)?
                }
                AccessPattern::Random => self.random_target(sched, blocks, state)?,
            }
        };

        if op == OperationType::Read && self.compare && self.write {
            op = self.read_after_write_gate(state, lba, blocks)?;
        }

        self.record(sched, op, blocks, lba);
        state.set_phase(op);
        Some(Action { op, blocks, lba })
    }

    fn budget_exhausted(&self, sched: &ScheduleState) -> bool {
        if self.seek_limited && sched.wcount + sched.rcount >= self.seeks {
            return true;
        }
        // Reads drive the pass length when no budget is configured
        self.read_balance_cutoff && sched.rcount * 100 / (self.seeks + 1) >= 80
    }

    fn choose_operation(&self, sched: &ScheduleState) -> OperationType {
        if !self.read_write() {
            return if self.write {
                OperationType::Write
            } else {
                OperationType::Read
            };
        }

        match self.access {
            AccessPattern::Random => {
                let ratio = sched.wcount * 100 / (sched.rcount + 1 + sched.wcount);
                if ratio >= self.write_percent as u64 {
                    OperationType::Read
                } else {
                    OperationType::Write
                }
            }
            AccessPattern::Linear { interleaved: true, .. } => match sched.last_op {
                Some(op) => op.flip(),
                None => OperationType::Write,
            },
            // Phase continues until the sweep boundary flips it
            AccessPattern::Linear { .. } => sched.last_op.unwrap_or(OperationType::Write),
        }
    }

    fn choose_size(&self, sched: &mut ScheduleState, op: OperationType) -> u64 {
        if self.low == self.high {
            return self.high;
        }
        if op == OperationType::Read
            && self.access.is_interleaved()
            && self.read_write()
            && sched.last_write_blocks > 0
        {
            return sched.last_write_blocks;
        }
        sched.rng.gen_range(self.low..=self.high)
    }

    /// Start LBA of a `blocks` transfer at `cursor`
    ///
    /// Sweeping up, the cursor is the next start LBA. Sweeping down it is the
    /// exclusive end of the next transfer, so a larger transfer never reaches
    /// back into the range just issued.
    fn target_lba(direction: Direction, cursor: i64, blocks: u64) -> i64 {
        match direction {
            Direction::Up => cursor,
            Direction::Down => cursor - blocks as i64,
        }
    }

    /// Whether a transfer of `blocks` at `cursor` stays inside the range
    fn fits(&self, direction: Direction, cursor: i64, blocks: u64) -> bool {
        let lba = Self::target_lba(direction, cursor, blocks);
        lba >= self.start as i64 && lba as u64 + blocks <= self.stop + 1
    }

    /// Blocks left between `cursor` and the range end it is heading for
    fn room(&self, direction: Direction, cursor: i64) -> u64 {
        let room = match direction {
            Direction::Up => self.stop as i64 + 1 - cursor,
            Direction::Down => cursor - self.start as i64,
        };
        room.max(0) as u64
    }

    /// Cursor at the end of the range a sweep in `direction` starts from
    fn sweep_origin(&self, direction: Direction) -> i64 {
        match direction {
            Direction::Up => self.start as i64,
            Direction::Down => self.stop as i64 + 1,
        }
    }

    fn linear_target(
        &self,
        sched: &mut ScheduleState,
        op: &mut OperationType,
        blocks: &mut u64,
        sweep: LinearSweep,
        interleaved: bool,
    ) -> Option<u64> {
        let flip_op = self.read_write() && !interleaved;

        if sched.is_first(*op) {
            *sched.cursor_mut(*op) = self.sweep_origin(sched.direction);
        }

        let room = self.room(sched.direction, sched.cursor(*op));
        if self.low != self.high && room > 0 {
            // Truncate the tail transfer rather than skipping it
            *blocks = (*blocks).min(room);
        }

        if !self.fits(sched.direction, sched.cursor(*op), *blocks) {
            match sweep {
                LinearSweep::Retrace => {
                    *sched.cursor_mut(*op) = self.start as i64;
                    if flip_op {
                        *op = op.flip();
                        *sched.cursor_mut(*op) = self.start as i64;
                    }
                    if *op == OperationType::Write && self.cycling {
                        return None;
                    }
                }
                LinearSweep::Bounce => {
                    // A turning cursor keeps its value: the end of the last
                    // upward transfer is where the downward sweep starts
                    sched.direction = sched.direction.reverse();
                    if flip_op {
                        if *op == OperationType::Write {
                            sched.read_cursor = sched.write_cursor;
                        }
                        *op = op.flip();
                    }
                    if !self.fits(sched.direction, sched.cursor(*op), 1) {
                        // The new op's cursor was parked at the far end
                        *sched.cursor_mut(*op) = self.sweep_origin(sched.direction);
                    }
                    if sched.direction == Direction::Up && self.cycling {
                        return None;
                    }
                }
            }
            *blocks = (*blocks).min(self.room(sched.direction, sched.cursor(*op)));
        }

        Some(Self::target_lba(sched.direction, sched.cursor(*op), *blocks) as u64)
    }

    fn random_target(
        &self,
        sched: &mut ScheduleState,
        blocks: u64,
        state: &SharedTestState,
    ) -> Option<u64> {
        let span = self.stop - self.start + 1;
        // Aligned slots that fit entirely inside the range
        let slots = (span - blocks) / blocks + 1;
        let mask = slots.next_power_of_two() - 1;

        loop {
            let slot = sched.rng.next_u64() & mask;
            if slot < slots {
                return Some(self.start + slot * blocks);
            }
            if self.budget_exhausted(sched) || !state.should_continue() {
                return None;
            }
        }
    }

    /// Returns the operation to perform, or `None` if the run stopped while waiting
    fn read_after_write_gate(
        &self,
        state: &SharedTestState,
        lba: u64,
        blocks: u64,
    ) -> Option<OperationType> {
        if state.is_range_written(lba, blocks) {
            return Some(OperationType::Read);
        }

        match self.access {
            AccessPattern::Random => Some(OperationType::Write),
            AccessPattern::Linear { .. } => {
                // Linear reads trail writes by construction, so the peer that owns
                // this range is in flight; wait for it without a condition variable.
                let backoff = Backoff::new();
                while !state.is_range_written(lba, blocks) {
                    if !state.should_continue() {
                        return None;
                    }
                    if backoff.is_completed() {
                        thread::sleep(GATE_POLL_INTERVAL);
                    } else {
                        backoff.snooze();
                    }
                }
                Some(OperationType::Read)
            }
        }
    }

    fn record(&self, sched: &mut ScheduleState, op: OperationType, blocks: u64, lba: u64) {
        let (start, end) = (lba as i64, (lba + blocks) as i64);
        let next = match sched.direction {
            Direction::Up => end,
            Direction::Down => start,
        };
        match op {
            OperationType::Write => {
                sched.wcount += 1;
                if matches!(
                    self.access,
                    AccessPattern::Linear {
                        sweep: LinearSweep::Bounce,
                        ..
                    }
                ) {
                    // Positioned so the next read covers this write
                    sched.read_cursor = match sched.direction {
                        Direction::Up => start,
                        Direction::Down => end,
                    };
                }
                sched.write_cursor = next;
                sched.write_first = false;
                sched.last_write_blocks = blocks;
            }
            OperationType::Read => {
                sched.rcount += 1;
                sched.read_cursor = next;
                sched.read_first = false;
            }
        }
        sched.last_op = Some(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::workload::AddressRange;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn linear(sweep: LinearSweep, interleaved: bool) -> AccessPattern {
        AccessPattern::Linear { sweep, interleaved }
    }

    fn config(stop: u64, blocks: u64, access: AccessPattern) -> Config {
        let mut config = Config::new(PathBuf::from("/tmp/test"));
        config.target.range = AddressRange::Lba { start: 0, stop: Some(stop) };
        config.workload.transfer_low = blocks;
        config.workload.transfer_high = blocks;
        config.workload.access = access;
        config.runtime.seed = Some(7);
        config
    }

    fn state_for(config: &Config) -> SharedTestState {
        SharedTestState::new(
            config,
            1,
            Xoshiro256PlusPlus::seed_from_u64(config.seed()),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap()
    }

    /// Run the scheduler single-threaded, completing every write immediately
    fn drain(config: &Config, limit: usize) -> Vec<Action> {
        let scheduler = Scheduler::new(config);
        let state = state_for(config);
        let mut actions = Vec::new();
        while actions.len() < limit {
            let action = {
                let mut sched = state.lock_schedule();
                scheduler.next_action(&mut sched, &state)
            };
            match action {
                Some(a) => {
                    if a.op == OperationType::Write {
                        state.complete_write(a.lba, a.blocks, a.blocks * 512);
                    }
                    actions.push(a);
                }
                None => break,
            }
        }
        actions
    }

    fn lbas(actions: &[Action], op: OperationType) -> Vec<u64> {
        actions.iter().filter(|a| a.op == op).map(|a| a.lba).collect()
    }

    #[test]
    fn test_linear_write_then_read() {
        let mut cfg = config(99, 10, linear(LinearSweep::Retrace, false));
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.compare = Some(0);

        let actions = drain(&cfg, 1000);
        assert_eq!(actions.len(), 20);
        let expected: Vec<u64> = (0..10).map(|i| i * 10).collect();
        assert!(actions[..10].iter().all(|a| a.op == OperationType::Write));
        assert!(actions[10..].iter().all(|a| a.op == OperationType::Read));
        assert_eq!(lbas(&actions, OperationType::Write), expected);
        assert_eq!(lbas(&actions, OperationType::Read), expected);
    }

    #[test]
    fn test_linear_ranges_never_overlap_within_direction() {
        let mut cfg = config(1999, 1, linear(LinearSweep::Retrace, false));
        cfg.workload.transfer_low = 1;
        cfg.workload.transfer_high = 16;
        cfg.workload.write = true;
        cfg.workload.seeks = Some(100);

        let actions = drain(&cfg, 1000);
        assert_eq!(actions.len(), 100);
        let mut end = 0;
        for a in &actions {
            assert!(a.lba >= end, "overlap at lba {}", a.lba);
            assert!(a.blocks >= 1 && a.blocks <= 16);
            end = a.lba + a.blocks;
        }
    }

    #[test]
    fn test_bounce_random_sizes_never_overlap() {
        let mut cfg = config(199, 1, linear(LinearSweep::Bounce, false));
        cfg.workload.transfer_low = 1;
        cfg.workload.transfer_high = 16;
        cfg.workload.write = true;
        cfg.workload.seeks = Some(200);

        let actions = drain(&cfg, 1000);
        assert_eq!(actions.len(), 200);

        // Up sweeps end flush with the range end, down sweeps at the start
        let mut direction = Direction::Up;
        let mut bound = 0;
        let mut downward = 0;
        for a in &actions {
            assert!(a.blocks >= 1 && a.blocks <= 16);
            assert!(a.lba + a.blocks <= 200);
            match direction {
                Direction::Up => {
                    assert!(a.lba >= bound, "overlap going up at lba {}", a.lba);
                    bound = a.lba + a.blocks;
                    if bound == 200 {
                        direction = Direction::Down;
                    }
                }
                Direction::Down => {
                    downward += 1;
                    assert!(a.lba + a.blocks <= bound, "overlap going down at lba {}", a.lba);
                    bound = a.lba;
                    if bound == 0 {
                        direction = Direction::Up;
                    }
                }
            }
        }
        assert!(downward > 0);
    }

    #[test]
    fn test_bounce_random_size_reads_cover_whole_range() {
        let mut cfg = config(199, 1, linear(LinearSweep::Bounce, false));
        cfg.workload.transfer_low = 1;
        cfg.workload.transfer_high = 16;
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.compare = Some(0);
        cfg.workload.seeks = Some(1000);
        cfg.runtime.cycles = Some(0);

        let actions = drain(&cfg, 1000);
        let reads: Vec<&Action> = actions.iter().filter(|a| a.op == OperationType::Read).collect();
        assert_eq!(reads[0].lba + reads[0].blocks, 200);
        for pair in reads.windows(2) {
            assert_eq!(pair[1].lba + pair[1].blocks, pair[0].lba);
        }
        assert_eq!(reads.last().unwrap().lba, 0);
    }

    #[test]
    fn test_bounce_interleaved_reads_follow_writes() {
        let mut cfg = config(99, 1, linear(LinearSweep::Bounce, true));
        cfg.workload.transfer_low = 1;
        cfg.workload.transfer_high = 16;
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.compare = Some(0);
        cfg.workload.seeks = Some(200);

        let actions = drain(&cfg, 1000);
        assert_eq!(actions.len(), 200);
        for pair in actions.chunks(2) {
            assert_eq!(pair[0].op, OperationType::Write);
            assert_eq!(pair[1].op, OperationType::Read);
            assert_eq!(pair[0].lba, pair[1].lba);
            assert_eq!(pair[0].blocks, pair[1].blocks);
        }
    }

    #[test]
    fn test_linear_random_size_tail_truncated() {
        let mut cfg = config(99, 1, linear(LinearSweep::Retrace, false));
        cfg.workload.transfer_low = 7;
        cfg.workload.transfer_high = 13;
        cfg.workload.write = true;
        cfg.runtime.cycles = Some(1);
        cfg.workload.seeks = Some(1000);

        let actions = drain(&cfg, 1000);
        let last = actions.last().unwrap();
        assert_eq!(last.lba + last.blocks, 100);
        let covered: u64 = actions.iter().map(|a| a.blocks).sum();
        assert_eq!(covered, 100);
    }

    #[test]
    fn test_retrace_write_only_cycling_ends_pass() {
        let mut cfg = config(49, 10, linear(LinearSweep::Retrace, false));
        cfg.workload.write = true;
        cfg.runtime.cycles = Some(3);
        cfg.workload.seeks = Some(1000);

        let actions = drain(&cfg, 1000);
        assert_eq!(lbas(&actions, OperationType::Write), vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_retrace_write_only_wraps() {
        let mut cfg = config(29, 10, linear(LinearSweep::Retrace, false));
        cfg.workload.write = true;
        cfg.workload.seeks = Some(7);

        let actions = drain(&cfg, 1000);
        assert_eq!(
            lbas(&actions, OperationType::Write),
            vec![0, 10, 20, 0, 10, 20, 0]
        );
    }

    #[test]
    fn test_bounce_write_only() {
        let mut cfg = config(29, 10, linear(LinearSweep::Bounce, false));
        cfg.workload.write = true;
        cfg.workload.seeks = Some(8);

        let actions = drain(&cfg, 1000);
        assert_eq!(
            lbas(&actions, OperationType::Write),
            vec![0, 10, 20, 20, 10, 0, 0, 10]
        );
    }

    #[test]
    fn test_bounce_reads_retrace_downward() {
        let mut cfg = config(49, 10, linear(LinearSweep::Bounce, false));
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.compare = Some(0);

        let actions = drain(&cfg, 1000);
        assert_eq!(actions.len(), 10);
        assert_eq!(lbas(&actions, OperationType::Write), vec![0, 10, 20, 30, 40]);
        assert_eq!(lbas(&actions, OperationType::Read), vec![40, 30, 20, 10, 0]);
    }

    #[test]
    fn test_bounce_cycling_ends_when_turning_up() {
        let mut cfg = config(49, 10, linear(LinearSweep::Bounce, false));
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.seeks = Some(1000);
        cfg.runtime.cycles = Some(0);

        let actions = drain(&cfg, 1000);
        assert_eq!(actions.len(), 10);
    }

    #[test]
    fn test_interleaved_alternates() {
        let mut cfg = config(49, 10, linear(LinearSweep::Retrace, true));
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.compare = Some(0);

        let actions = drain(&cfg, 1000);
        assert_eq!(actions.len(), 10);
        for (i, pair) in actions.chunks(2).enumerate() {
            assert_eq!(pair[0].op, OperationType::Write);
            assert_eq!(pair[1].op, OperationType::Read);
            assert_eq!(pair[0].lba, i as u64 * 10);
            assert_eq!(pair[1].lba, pair[0].lba);
        }
    }

    #[test]
    fn test_interleaved_read_reuses_write_size() {
        let mut cfg = config(999, 1, linear(LinearSweep::Retrace, true));
        cfg.workload.transfer_low = 1;
        cfg.workload.transfer_high = 32;
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.seeks = Some(200);

        let actions = drain(&cfg, 1000);
        for pair in actions.chunks(2) {
            assert_eq!(pair[1].op, OperationType::Read);
            assert_eq!(pair[0].lba, pair[1].lba);
            assert_eq!(pair[0].blocks, pair[1].blocks);
        }
    }

    #[test]
    fn test_random_lbas_in_range_and_aligned() {
        let mut cfg = config(0, 8, AccessPattern::Random);
        cfg.target.range = AddressRange::Lba { start: 100, stop: Some(1099) };
        cfg.workload.write = true;
        cfg.workload.seeks = Some(500);

        let actions = drain(&cfg, 1000);
        assert_eq!(actions.len(), 500);
        for a in &actions {
            assert!(a.lba >= 100);
            assert!(a.lba + a.blocks <= 1100);
            assert_eq!((a.lba - 100) % 8, 0);
        }
    }

    #[test]
    fn test_random_duty_cycle() {
        let mut cfg = config(1999, 1, AccessPattern::Random);
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.read_percent = Some(70);
        cfg.workload.write_percent = Some(30);
        cfg.workload.seeks = Some(1000);

        let actions = drain(&cfg, 2000);
        let writes = actions.iter().filter(|a| a.op == OperationType::Write).count();
        let ratio = writes as f64 / actions.len() as f64;
        assert!((ratio - 0.30).abs() < 0.05, "write ratio {}", ratio);
    }

    #[test]
    fn test_random_stale_read_becomes_write() {
        let mut cfg = config(99, 1, AccessPattern::Random);
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.compare = Some(0);
        cfg.workload.seeks = Some(400);

        let scheduler = Scheduler::new(&cfg);
        let state = state_for(&cfg);
        for _ in 0..400 {
            let action = {
                let mut sched = state.lock_schedule();
                scheduler.next_action(&mut sched, &state)
            };
            let Some(a) = action else { break };
            if a.op == OperationType::Read {
                // Never a read against unwritten blocks
                assert!(state.is_range_written(a.lba, a.blocks));
            } else {
                state.complete_write(a.lba, a.blocks, 512);
            }
        }
        let sched = state.lock_schedule();
        assert!(sched.wcount >= sched.rcount);
        assert!(sched.rcount > 0);
    }

    #[test]
    fn test_random_transfer_sizes_in_bounds() {
        let mut cfg = config(9999, 1, AccessPattern::Random);
        cfg.workload.transfer_low = 4;
        cfg.workload.transfer_high = 64;
        cfg.workload.write = true;
        cfg.workload.seeks = Some(300);

        let actions = drain(&cfg, 1000);
        assert!(actions.iter().all(|a| (4..=64).contains(&a.blocks)));
        assert!(actions.iter().any(|a| a.blocks != actions[0].blocks));
    }

    #[test]
    fn test_diskcache_always_start() {
        let mut cfg = config(0, 8, AccessPattern::Random);
        cfg.target.range = AddressRange::Lba { start: 64, stop: Some(71) };
        cfg.workload.write = true;

        let actions = drain(&cfg, 5000);
        assert_eq!(actions.len(), 1000);
        assert!(actions.iter().all(|a| a.lba == 64 && a.blocks == 8));
    }

    #[test]
    fn test_stop_flag_ends_schedule() {
        let cfg = config(99, 1, AccessPattern::Random);
        let scheduler = Scheduler::new(&cfg);
        let state = state_for(&cfg);
        state.request_stop();
        let mut sched = state.lock_schedule();
        assert_eq!(scheduler.next_action(&mut sched, &state), None);
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let mut cfg = config(9999, 1, AccessPattern::Random);
        cfg.workload.transfer_high = 16;
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.seeks = Some(200);

        assert_eq!(drain(&cfg, 1000), drain(&cfg, 1000));
        let first = drain(&cfg, 1000);
        cfg.runtime.seed = Some(8);
        assert_ne!(first, drain(&cfg, 1000));
    }

    #[test]
    fn test_read_balance_cutoff() {
        let mut cfg = config(999, 1, AccessPattern::Random);
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.read_percent = Some(90);
        cfg.workload.write_percent = Some(10);
        cfg.runtime.cycles = Some(0);
        assert!(!cfg.seek_limited());

        let actions = drain(&cfg, 100_000);
        let reads = actions.iter().filter(|a| a.op == OperationType::Read).count() as u64;
        assert_eq!(reads, (cfg.seeks() + 1) * 80 / 100 + 1);
    }

    #[test]
    fn test_linear_gate_waits_for_peer_write() {
        let mut cfg = config(9, 10, linear(LinearSweep::Retrace, true));
        cfg.target.range = AddressRange::Lba { start: 0, stop: Some(99) };
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.compare = Some(0);

        let scheduler = Scheduler::new(&cfg);
        let state = Arc::new(state_for(&cfg));

        let write = {
            let mut sched = state.lock_schedule();
            scheduler.next_action(&mut sched, &state).unwrap()
        };
        assert_eq!(write.op, OperationType::Write);

        let peer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                state.complete_write(write.lba, write.blocks, write.blocks * 512);
            })
        };

        let read = {
            let mut sched = state.lock_schedule();
            scheduler.next_action(&mut sched, &state).unwrap()
        };
        assert_eq!(read.op, OperationType::Read);
        assert_eq!(read.lba, write.lba);
        assert!(state.is_range_written(read.lba, read.blocks));
        peer.join().unwrap();
    }

    #[test]
    fn test_linear_gate_released_by_stop() {
        let mut cfg = config(99, 10, linear(LinearSweep::Retrace, true));
        cfg.workload.read = true;
        cfg.workload.write = true;
        cfg.workload.compare = Some(0);

        let scheduler = Scheduler::new(&cfg);
        let state = Arc::new(state_for(&cfg));
        {
            let mut sched = state.lock_schedule();
            scheduler.next_action(&mut sched, &state).unwrap();
        }

        let stopper = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                state.request_stop();
            })
        };

        let mut sched = state.lock_schedule();
        assert_eq!(scheduler.next_action(&mut sched, &state), None);
        drop(sched);
        stopper.join().unwrap();
    }
}
