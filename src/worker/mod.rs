//! Worker thread implementation
//!
//! A worker is the per-thread I/O cycle: ask the scheduler for the next action,
//! seek, transfer, verify, account, repeat. Every worker of a pass shares one
//! `PassContext`; the only state a worker owns is its target handle and its two
//! aligned buffers.
//!
//! # Cycle
//!
//! 1. Check the continue flag
//! 2. Take the primary lock, get the next action, release the lock
//! 3. Seek to `lba * 512`; a seek landing elsewhere is a failure
//! 4. Write: fill, mark, write, optionally sync, then set the bitmap bits
//! 5. Read: read, then compare against a freshly generated expected buffer
//!
//! Per-transfer failures never end the worker by themselves: they are logged,
//! handed to the reporter and recorded in the shared state, which stops every
//! worker when `stop_on_error` is set. Only buffer allocation and handle open
//! failures are returned as errors.
//!
//! # Example
//!
//! ```no_run
//! use disktest::worker::{PassContext, Worker};
//! use std::sync::Arc;
//!
//! # fn context() -> Arc<PassContext> { unimplemented!() }
//! let ctx: Arc<PassContext> = context();
//! let transfers = Worker::new(0, ctx).run()?;
//! println!("{} transfers", transfers);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::Config;
use crate::engine::{IoEngine, IoHandle, OperationType};
use crate::error::{EngineError, IoFailure, Miscompare};
use crate::pattern::{self, MarkContext, PatternGenerator};
use crate::scheduler::{Action, Scheduler};
use crate::state::SharedTestState;
use crate::stats::Reporter;
use crate::util::buffer::{AlignedBuffer, DEFAULT_ALIGNMENT};
use crate::{Result, BLOCK_SIZE};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Everything the workers of one pass share
pub struct PassContext {
    pub config: Arc<Config>,
    pub state: Arc<SharedTestState>,
    pub scheduler: Scheduler,
    pub pattern: PatternGenerator,
    /// Present when markers are configured
    pub marker: Option<MarkContext>,
    pub engine: Arc<dyn IoEngine>,
    pub reporter: Arc<dyn Reporter>,
}

/// Worker thread that executes transfers for one pass
pub struct Worker {
    id: usize,
    ctx: Arc<PassContext>,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<PassContext>) -> Self {
        Self { id, ctx }
    }

    /// Run until the scheduler or the shared state says stop
    ///
    /// Returns the number of actions executed, failed ones included.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Allocation` or `EngineError::Open`; both also clear
    /// the shared pass and continue flags so the rest of the pass winds down.
    pub fn run(self) -> Result<u64> {
        let ctx = &self.ctx;
        let state = &ctx.state;

        let size = ctx
            .config
            .transfer_high()
            .checked_mul(BLOCK_SIZE)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .unwrap_or(usize::MAX);
        let mut buffers = match AlignedBuffer::try_new(size, DEFAULT_ALIGNMENT).and_then(|data| {
            AlignedBuffer::try_new(size, DEFAULT_ALIGNMENT).map(|expected| (data, expected))
        }) {
            Ok(buffers) => buffers,
            Err(e) => {
                error!(worker = self.id, "{}", e);
                state.record_failure(true);
                return Err(e.into());
            }
        };

        let mut handle = match ctx.engine.open() {
            Ok(handle) => handle,
            Err(source) => {
                let e = EngineError::Open {
                    worker_id: self.id,
                    source: source.into(),
                };
                error!(worker = self.id, "{:#}", e);
                state.record_failure(true);
                return Err(e.into());
            }
        };

        let mut executed = 0u64;
        while state.should_continue() {
            let action = {
                let mut sched = state.lock_schedule();
                ctx.scheduler.next_action(&mut sched, state)
            };
            let Some(action) = action else { break };

            debug!(
                worker = self.id,
                pass = state.pass(),
                op = %action.op,
                lba = action.lba,
                blocks = action.blocks,
                "action"
            );
            executed += 1;

            let (data, expected) = (&mut buffers.0, &mut buffers.1);
            if let Err(failure) = self.execute(handle.as_mut(), action, data, expected) {
                self.fail(failure);
            }
        }

        if let Err(e) = handle.close() {
            warn!(worker = self.id, "close failed: {}", e);
        }
        debug!(worker = self.id, executed, "worker finished");
        Ok(executed)
    }

    fn execute(
        &self,
        handle: &mut dyn IoHandle,
        action: Action,
        data: &mut AlignedBuffer,
        expected: &mut AlignedBuffer,
    ) -> std::result::Result<(), IoFailure> {
        let Action { op, blocks, lba } = action;
        let bytes = (blocks * BLOCK_SIZE) as usize;

        let requested = lba * BLOCK_SIZE;
        match handle.seek(requested) {
            Ok(pos) if pos == requested => {}
            Ok(actual) => {
                return Err(IoFailure::SeekMismatch {
                    lba,
                    requested,
                    actual,
                })
            }
            Err(source) => {
                return Err(IoFailure::Seek {
                    lba,
                    requested,
                    source,
                })
            }
        }

        match op {
            OperationType::Write => {
                let buf = &mut data.as_mut_slice()[..bytes];
                self.generate(buf, lba);

                let n = handle
                    .write(buf)
                    .map_err(|source| IoFailure::Transfer { op, lba, source })?;
                if n != bytes {
                    return Err(IoFailure::ShortTransfer {
                        op,
                        lba,
                        requested: bytes,
                        transferred: n,
                    });
                }
                if self.ctx.config.workload.fsync {
                    handle
                        .sync()
                        .map_err(|source| IoFailure::Sync { lba, source })?;
                }
                self.ctx.state.complete_write(lba, blocks, bytes as u64);
            }
            OperationType::Read => {
                let buf = &mut data.as_mut_slice()[..bytes];
                let n = handle
                    .read(buf)
                    .map_err(|source| IoFailure::Transfer { op, lba, source })?;
                if n != bytes {
                    return Err(IoFailure::ShortTransfer {
                        op,
                        lba,
                        requested: bytes,
                        transferred: n,
                    });
                }
                self.ctx.state.complete_read(bytes as u64);

                if let Some(limit) = self.ctx.config.workload.compare {
                    let len = match limit as usize {
                        0 => bytes,
                        l if l > bytes => bytes,
                        l => l,
                    };
                    let want = &mut expected.as_mut_slice()[..bytes];
                    self.generate(want, lba);
                    if let Some(offset) = pattern::first_mismatch(&want[..len], &buf[..len]) {
                        return Err(IoFailure::Miscompare(Box::new(Miscompare {
                            lba,
                            pass: self.ctx.state.pass(),
                            worker_id: self.id,
                            offset,
                            expected: want.to_vec(),
                            actual: buf.to_vec(),
                        })));
                    }
                }
            }
        }
        Ok(())
    }

    /// Produce the content a write at `lba` carries: fill, then markers
    fn generate(&self, buf: &mut [u8], lba: u64) {
        self.ctx.pattern.fill(buf, lba);
        if let (Some(mode), Some(marker)) = (self.ctx.config.workload.mark, &self.ctx.marker) {
            pattern::mark(buf, lba, self.ctx.state.pass(), mode, marker);
        }
    }

    fn fail(&self, failure: IoFailure) {
        let state = &self.ctx.state;
        let pass = state.pass();
        match &failure {
            IoFailure::Miscompare(m) => error!(
                worker = self.id,
                pass,
                failing_lba = m.failing_lba(),
                offset = m.offset,
                "{}\n{}",
                failure,
                m.dump()
            ),
            _ => error!(worker = self.id, pass, "{}", failure),
        }
        self.ctx.reporter.failure(pass, &failure);
        state.record_failure(self.ctx.config.runtime.stop_on_error);
    }
}
