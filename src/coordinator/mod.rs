//! Run coordinator
//!
//! Drives a test run pass by pass. Each pass gets fresh shared state (cursors at
//! the start LBA, a zeroed bitmap), a duration controller thread and the worker
//! pool; the coordinator joins the workers, releases the controller and rolls
//! the pass's cycle statistics into the run's global statistics.
//!
//! # Architecture
//!
//! ```text
//! TestRun::run
//!   └─ per pass
//!        ├─ DurationController thread   (time, heartbeats, stop)
//!        └─ Worker threads × N          (scheduler → I/O → verify)
//! ```
//!
//! The scheduler RNG is seeded once per run; every pass continues from a
//! `jump()`ed copy of it, so a seed reproduces the whole multi-pass schedule.
//!
//! # Example
//!
//! ```no_run
//! use disktest::config::Config;
//! use disktest::coordinator::TestRun;
//! use disktest::engine::file::FileEngine;
//! use disktest::output::text::LogReporter;
//! use std::sync::Arc;
//!
//! let config = Config::new("/tmp/disktest.img".into());
//! let engine = Arc::new(FileEngine::new(config.target.path.clone(), false));
//! let run = TestRun::new(config, engine, Arc::new(LogReporter::new()));
//! let summary = run.run()?;
//! println!("passed: {}", summary.passed);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::workload::AccessPattern;
use crate::config::Config;
use crate::engine::IoEngine;
use crate::pattern::{MarkContext, PatternGenerator};
use crate::scheduler::Scheduler;
use crate::state::SharedTestState;
use crate::stats::{Reporter, Stats, StatsSnapshot, TimeScaling};
use crate::timer::{DurationController, StopReason, TICK};
use crate::worker::{PassContext, Worker};
use crate::Result;
use anyhow::Context;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// No failure was recorded in any pass
    pub passed: bool,
    /// Passes started
    pub passes: u64,
    /// Failures recorded across all passes
    pub failures: u64,
    /// Why the last pass ended
    pub stop_reason: StopReason,
    /// Whole-run statistics
    pub global: StatsSnapshot,
    pub elapsed_secs: u64,
}

/// Result of one pass
#[derive(Debug, Clone, Copy)]
struct PassOutcome {
    stats: Stats,
    passed: bool,
    failures: u64,
    reason: StopReason,
}

/// How elapsed time is attributed for `config`
///
/// Runs whose reads and writes never mix (single direction, or linear phases)
/// charge each tick to the active phase; mixed runs share it by duty percentage.
pub fn time_scaling(config: &Config) -> TimeScaling {
    let phased = !config.read_write()
        || matches!(
            config.workload.access,
            AccessPattern::Linear {
                interleaved: false,
                ..
            }
        );
    if phased {
        TimeScaling::Phased
    } else {
        let (read_percent, write_percent) = config.percentages();
        TimeScaling::Duty {
            read_percent,
            write_percent,
        }
    }
}

/// A configured test run against one target
pub struct TestRun {
    config: Arc<Config>,
    engine: Arc<dyn IoEngine>,
    reporter: Arc<dyn Reporter>,
    stop: Arc<AtomicBool>,
    tick: Duration,
}

impl TestRun {
    pub fn new(config: Config, engine: Arc<dyn IoEngine>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            reporter,
            stop: Arc::new(AtomicBool::new(false)),
            tick: TICK,
        }
    }

    /// Use `stop` as the external stop request
    pub fn with_stop_handle(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Override the controller tick (one unit of run time and heartbeat interval)
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Setting this flag stops every worker at its next check and ends the run
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every pass
    ///
    /// # Errors
    ///
    /// Returns an error when a worker cannot allocate its buffers or open the
    /// target, or when a thread cannot be spawned or panics. Transfer failures
    /// and miscompares are not errors; they show up in `RunSummary::passed`.
    pub fn run(&self) -> Result<RunSummary> {
        let config = &self.config;
        let started = Instant::now();
        let seed = config.seed();
        let scaling = time_scaling(config);

        let marker = config.workload.mark.map(|_| {
            let stamp = config
                .runtime
                .alt_marker
                .unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64);
            let host = hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_default();
            MarkContext::new(stamp, seed, &host, &self.engine.name())
        });

        info!(
            device = %self.engine.name(),
            seed,
            workers = config.runtime.workers,
            start = config.start_lba(),
            stop = config.stop_lba(),
            seeks = config.seeks(),
            "starting test"
        );

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut global = Stats::default();
        let mut passed = true;
        let mut failures = 0;
        let mut pass = 0;
        let mut stop_reason;

        loop {
            pass += 1;
            let pass_rng = rng.clone();
            rng.jump();

            let outcome = self.run_pass(pass, pass_rng, marker.clone(), scaling)?;
            global.merge(&outcome.stats);
            self.reporter
                .cycle(pass, &StatsSnapshot::new(outcome.stats, scaling));
            passed &= outcome.passed;
            failures += outcome.failures;
            stop_reason = outcome.reason;

            if self.stop.load(Ordering::Acquire) {
                info!(pass, "stop requested");
                break;
            }
            if !passed {
                break;
            }
            match config.runtime.cycles {
                None => break,
                Some(n) if n > 0 && pass >= n => break,
                _ => {}
            }
        }

        Ok(RunSummary {
            passed,
            passes: pass,
            failures,
            stop_reason,
            global: StatsSnapshot::new(global, scaling),
            elapsed_secs: started.elapsed().as_secs(),
        })
    }

    fn run_pass(
        &self,
        pass: u64,
        rng: Xoshiro256PlusPlus,
        marker: Option<MarkContext>,
        scaling: TimeScaling,
    ) -> Result<PassOutcome> {
        let config = &self.config;
        let state = Arc::new(SharedTestState::new(
            config,
            pass,
            rng,
            Arc::clone(&self.stop),
        )?);
        let ctx = Arc::new(PassContext {
            config: Arc::clone(config),
            state: Arc::clone(&state),
            scheduler: Scheduler::new(config),
            pattern: PatternGenerator::new(config.workload.pattern, config.seed(), pass),
            marker,
            engine: Arc::clone(&self.engine),
            reporter: Arc::clone(&self.reporter),
        });

        let controller = DurationController::new(
            Arc::clone(config),
            Arc::clone(&state),
            Arc::clone(&self.reporter),
            scaling,
        )
        .with_tick(self.tick);
        let (done_tx, done_rx) = crossbeam::channel::bounded::<()>(0);
        let timer = thread::Builder::new()
            .name("disktest-timer".to_string())
            .spawn(move || controller.run(done_rx))
            .context("Failed to spawn duration controller thread")?;

        let mut fatal: Option<anyhow::Error> = None;
        let mut handles = Vec::with_capacity(config.runtime.workers);
        for id in 0..config.runtime.workers {
            let ctx = Arc::clone(&ctx);
            let spawned = thread::Builder::new()
                .name(format!("disktest-worker-{}", id))
                .spawn(move || Worker::new(id, ctx).run());
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    state.record_failure(true);
                    fatal = Some(anyhow::Error::new(e).context(format!("Failed to spawn worker {}", id)));
                    break;
                }
            }
        }

        let mut executed = 0;
        for handle in handles {
            match handle.join() {
                Ok(Ok(n)) => executed += n,
                Ok(Err(e)) => {
                    fatal.get_or_insert(e);
                }
                Err(_) => {
                    state.record_failure(true);
                    fatal.get_or_insert_with(|| anyhow::anyhow!("Worker thread panicked"));
                }
            }
        }

        drop(done_tx);
        let reason = timer
            .join()
            .map_err(|_| anyhow::anyhow!("Duration controller thread panicked"))?;

        if let Some(e) = fatal {
            error!(pass, "{:#}", e);
            return Err(e);
        }

        let stats = state.cycle_stats();
        info!(
            pass,
            %reason,
            executed,
            writes = stats.wcount,
            reads = stats.rcount,
            written_blocks = state.written_blocks(),
            failures = state.failure_count(),
            "pass complete"
        );

        Ok(PassOutcome {
            stats,
            passed: state.test_passed(),
            failures: state.failure_count(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::workload::{AddressRange, FillPattern, LinearSweep};
    use crate::engine::mock::MockEngine;
    use crate::engine::OperationType;
    use crate::stats::CollectingReporter;
    use std::path::PathBuf;

    fn base_config() -> Config {
        let mut config = Config::new(PathBuf::from("mock"));
        config.target.range = AddressRange::Lba { start: 0, stop: Some(99) };
        config.runtime.seed = Some(42);
        config
    }

    fn linear_rw_config() -> Config {
        let mut config = base_config();
        config.workload.transfer_low = 10;
        config.workload.transfer_high = 10;
        config.workload.access = AccessPattern::Linear {
            sweep: LinearSweep::Retrace,
            interleaved: false,
        };
        config.workload.read = true;
        config.workload.write = true;
        config.workload.compare = Some(0);
        config
    }

    fn run_with(config: Config, engine: &MockEngine) -> (TestRun, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::new());
        let run = TestRun::new(
            config,
            Arc::new(engine.clone()),
            Arc::clone(&reporter) as Arc<dyn Reporter>,
        );
        (run, reporter)
    }

    #[test]
    fn test_linear_write_read_pass() {
        let engine = MockEngine::new(100);
        let (run, reporter) = run_with(linear_rw_config(), &engine);

        let summary = run.run().unwrap();
        assert!(summary.passed);
        assert_eq!(summary.passes, 1);
        assert_eq!(summary.failures, 0);
        assert_eq!(summary.global.stats.wcount, 10);
        assert_eq!(summary.global.stats.rcount, 10);

        let ops = engine.operations();
        assert_eq!(ops.len(), 20);
        let mut written: Vec<u64> = ops
            .iter()
            .filter(|o| o.op_type == OperationType::Write)
            .map(|o| o.offset / 512)
            .collect();
        written.sort();
        assert_eq!(written, (0..10).map(|i| i * 10).collect::<Vec<_>>());
        assert_eq!(engine.open_count(), 4);
        assert_eq!(reporter.cycles().len(), 1);
    }

    #[test]
    fn test_forced_miscompare() {
        let engine = MockEngine::new(100);
        // LBA 95, corrupted once the whole write sweep is on the volume
        engine.corrupt_after_writes(10, 512 * 95 + 7);
        let (run, reporter) = run_with(linear_rw_config(), &engine);

        let summary = run.run().unwrap();
        assert!(!summary.passed);
        let miscompares = reporter.miscompares();
        assert_eq!(miscompares.len(), 1);
        assert_eq!(miscompares[0].lba, 90);
        assert!(miscompares[0].dump.as_ref().unwrap().contains("        5f 0000:"));
    }

    #[test]
    fn test_random_duty_ratio() {
        let mut config = base_config();
        config.target.range = AddressRange::Lba { start: 0, stop: Some(9999) };
        config.workload.read = true;
        config.workload.write = true;
        config.workload.read_percent = Some(70);
        config.workload.write_percent = Some(30);
        config.workload.seeks = Some(1000);
        let engine = MockEngine::new(10_000);
        let (run, _reporter) = run_with(config, &engine);

        let summary = run.run().unwrap();
        let stats = summary.global.stats;
        assert_eq!(stats.total_ops(), 1000);
        let ratio = stats.wcount as f64 / stats.total_ops() as f64;
        assert!((ratio - 0.30).abs() <= 0.05, "write ratio {}", ratio);
    }

    #[test]
    fn test_cooperative_stop_on_run_time() {
        let mut config = base_config();
        config.target.range = AddressRange::Lba { start: 0, stop: Some(1999) };
        config.workload.read = true;
        config.workload.write = true;
        config.runtime.workers = 8;
        config.runtime.run_time = Some(2);
        let engine = MockEngine::new(2000);
        let (run, _reporter) = run_with(config, &engine);
        let run = run.with_tick(Duration::from_millis(100));

        let started = Instant::now();
        let summary = run.run().unwrap();
        let elapsed = started.elapsed();
        assert!(summary.passed);
        assert_eq!(summary.stop_reason, StopReason::TimeElapsed);
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(10));
        assert!(summary.global.stats.total_ops() > 0);
        assert_eq!(engine.open_count(), 8);
    }

    #[test]
    fn test_external_stop_ends_endless_cycles() {
        let mut config = base_config();
        config.workload.write = true;
        config.workload.seeks = Some(50);
        config.runtime.cycles = Some(0);
        let engine = MockEngine::new(100);
        let (run, _reporter) = run_with(config, &engine);

        let stop = run.stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            stop.store(true, Ordering::SeqCst);
        });

        let summary = run.run().unwrap();
        stopper.join().unwrap();
        assert!(summary.passed);
        assert!(summary.passes >= 1);
    }

    #[test]
    fn test_cycles_run_fresh_passes() {
        let mut config = base_config();
        config.workload.transfer_low = 10;
        config.workload.transfer_high = 10;
        config.workload.access = AccessPattern::Linear {
            sweep: LinearSweep::Retrace,
            interleaved: false,
        };
        config.workload.write = true;
        config.workload.pattern = FillPattern::Random;
        config.runtime.cycles = Some(3);
        config.runtime.workers = 2;
        let engine = MockEngine::new(100);
        let (run, reporter) = run_with(config, &engine);

        let summary = run.run().unwrap();
        assert!(summary.passed);
        assert_eq!(summary.passes, 3);
        assert_eq!(summary.global.stats.wcount, 30);
        let cycles = reporter.cycles();
        assert_eq!(cycles.len(), 3);
        assert!(cycles.iter().all(|(_, s)| s.stats.wcount == 10));
        assert_eq!(cycles[2].0, 3);
    }

    #[test]
    fn test_failure_ends_cycles() {
        let mut config = linear_rw_config();
        config.runtime.cycles = Some(0);
        let engine = MockEngine::new(100);
        engine.set_should_fail(true);
        let (run, reporter) = run_with(config, &engine);

        let summary = run.run().unwrap();
        assert!(!summary.passed);
        assert_eq!(summary.passes, 1);
        assert!(summary.failures >= 1);
        assert!(!reporter.failures().is_empty());
    }

    #[test]
    fn test_open_failure_aborts_run() {
        let engine = MockEngine::new(100);
        engine.set_fail_open(true);
        let (run, _reporter) = run_with(linear_rw_config(), &engine);

        let err = run.run().unwrap_err();
        assert!(err.to_string().contains("could not open target"));
    }

    #[test]
    fn test_untrackable_range_aborts_run() {
        let engine = MockEngine::new(100);
        let mut config = base_config();
        config.target.range = AddressRange::Lba { start: 0, stop: Some(u64::MAX / 2) };
        config.workload.seeks = Some(1);
        let (run, _reporter) = run_with(config, &engine);

        let err = run.run().unwrap_err();
        assert!(err.to_string().contains("write bitmap"));
        assert_eq!(engine.open_count(), 0);
    }

    #[test]
    fn test_time_scaling() {
        let mut config = linear_rw_config();
        assert_eq!(time_scaling(&config), TimeScaling::Phased);

        config.workload.access = AccessPattern::Random;
        config.workload.write_percent = Some(20);
        assert_eq!(
            time_scaling(&config),
            TimeScaling::Duty {
                read_percent: 80,
                write_percent: 20
            }
        );

        config.workload.read = false;
        assert_eq!(time_scaling(&config), TimeScaling::Phased);
    }
}
