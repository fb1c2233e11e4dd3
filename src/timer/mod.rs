//! Duration/stop controller
//!
//! One controller thread runs beside the worker pool of every pass. Once per
//! tick it attributes elapsed time to the read and write accumulators, emits a
//! heartbeat when one is due, and checks whether the pass must stop. It is the
//! only component that initiates a stop on time; workers just observe the
//! continue flag.
//!
//! The driver owns the `Sender` half of the done channel and drops it after
//! joining the workers, which ends the controller before its next tick.
//!
//! # Example
//!
//! ```no_run
//! use disktest::stats::{CollectingReporter, TimeScaling};
//! use disktest::timer::DurationController;
//! # use disktest::{Config, state::SharedTestState};
//! # use std::sync::Arc;
//! # fn parts() -> (Arc<Config>, Arc<SharedTestState>) { unimplemented!() }
//! let (config, state) = parts();
//! let (done_tx, done_rx) = crossbeam::channel::bounded::<()>(0);
//! let controller = DurationController::new(
//!     config,
//!     state,
//!     Arc::new(CollectingReporter::new()),
//!     TimeScaling::Phased,
//! );
//! let timer = std::thread::spawn(move || controller.run(done_rx));
//! // ... run and join the workers ...
//! drop(done_tx);
//! let reason = timer.join().unwrap();
//! ```

use crate::config::Config;
use crate::engine::OperationType;
use crate::state::SharedTestState;
use crate::stats::{Reporter, StatsSnapshot, TimeScaling};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default tick: the controller's unit of elapsed time
pub const TICK: Duration = Duration::from_secs(1);

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Stopped,
}

/// Why the controller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The configured run time elapsed
    TimeElapsed,
    /// A failure cleared the pass flag
    TestFailed,
    /// The continue flag was already cleared (stop on error, external stop)
    Stopped,
    /// The workers finished on their own and the driver released the controller
    WorkersFinished,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TimeElapsed => write!(f, "run time elapsed"),
            StopReason::TestFailed => write!(f, "test failed"),
            StopReason::Stopped => write!(f, "stop requested"),
            StopReason::WorkersFinished => write!(f, "workers finished"),
        }
    }
}

/// Per-pass wall-clock controller
pub struct DurationController {
    config: Arc<Config>,
    state: Arc<SharedTestState>,
    reporter: Arc<dyn Reporter>,
    scaling: TimeScaling,
    tick: Duration,
    status: ControllerState,
    elapsed: u64,
}

impl DurationController {
    pub fn new(
        config: Arc<Config>,
        state: Arc<SharedTestState>,
        reporter: Arc<dyn Reporter>,
        scaling: TimeScaling,
    ) -> Self {
        Self {
            config,
            state,
            reporter,
            scaling,
            tick: TICK,
            status: ControllerState::Running,
            elapsed: 0,
        }
    }

    /// Override the tick length; elapsed time is still counted in ticks
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn status(&self) -> ControllerState {
        self.status
    }

    /// Ticks counted so far
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Run until a stop condition holds or `done` is signalled or dropped
    pub fn run(mut self, done: Receiver<()>) -> StopReason {
        let mut reason = StopReason::WorkersFinished;
        while self.status == ControllerState::Running {
            match done.recv_timeout(self.tick) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    self.status = ControllerState::Stopped;
                    break;
                }
            }
            if let Some(stop) = self.tick_once() {
                reason = stop;
            }
        }
        debug!(pass = self.state.pass(), elapsed = self.elapsed, %reason, "controller stopped");
        reason
    }

    /// One tick of work; returns the stop reason once the pass must end
    pub fn tick_once(&mut self) -> Option<StopReason> {
        self.elapsed += 1;
        self.attribute_time();

        if let Some(interval) = self.config.runtime.heartbeat.filter(|&hb| hb > 0) {
            if self.elapsed % interval == 0 {
                let stats = self.state.take_heartbeat_stats();
                let snapshot = StatsSnapshot::new(stats, self.scaling);
                self.reporter
                    .heartbeat(self.state.pass(), self.elapsed, &snapshot);
            }
        }

        let reason = self.stop_reason()?;
        if reason == StopReason::TimeElapsed {
            info!(pass = self.state.pass(), seconds = self.elapsed, "run time elapsed");
        }
        self.state.request_stop();
        self.status = ControllerState::Stopped;
        Some(reason)
    }

    fn attribute_time(&self) {
        match self.scaling {
            TimeScaling::Phased => match self.state.phase() {
                Some(OperationType::Read) => self.state.add_time(1, 0),
                Some(OperationType::Write) => self.state.add_time(0, 1),
                None => {}
            },
            TimeScaling::Duty { .. } => self.state.add_time(1, 1),
        }
    }

    fn stop_reason(&self) -> Option<StopReason> {
        if let Some(limit) = self.config.runtime.run_time {
            if self.elapsed >= limit {
                return Some(StopReason::TimeElapsed);
            }
        }
        if !self.state.test_passed() {
            return Some(StopReason::TestFailed);
        }
        if !self.state.should_continue() {
            return Some(StopReason::Stopped);
        }
        None
    }
}
