//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! A `Config` is built once by the driver before any worker starts and is
//! read-only afterwards. Options left unset by the user resolve to the classic
//! disktest defaults through the accessor methods below; `cli_convert::apply_assumptions`
//! writes those resolved values back so the configuration banner shows them.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;
pub mod workload;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use workload::*;

/// Volume size used when the target size cannot be discovered
pub const DEFAULT_VOLUME_BLOCKS: u64 = 2000;

/// Seek count for the diskcache test
pub const DEFAULT_SEEKS: u64 = 1000;

/// Complete test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Path to target (file or block device)
    pub path: PathBuf,
    /// Use direct IO (O_DIRECT)
    #[serde(default)]
    pub direct: bool,
    /// Volume size in blocks (discovered from the target when unset)
    pub volume_blocks: Option<u64>,
    /// Range under test
    #[serde(default)]
    pub range: AddressRange,
}

/// Workload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Smallest transfer, in blocks
    #[serde(default = "default_transfer")]
    pub transfer_low: u64,
    /// Largest transfer, in blocks (equal to `transfer_low` for fixed-size transfers)
    #[serde(default = "default_transfer")]
    pub transfer_high: u64,
    #[serde(default)]
    pub access: AccessPattern,
    /// Issue reads
    #[serde(default)]
    pub read: bool,
    /// Issue writes
    #[serde(default)]
    pub write: bool,
    /// Duty cycle read percentage (random access only)
    pub read_percent: Option<u8>,
    /// Duty cycle write percentage (random access only)
    pub write_percent: Option<u8>,
    /// Number of transfers per pass
    pub seeks: Option<u64>,
    #[serde(default)]
    pub pattern: FillPattern,
    /// Compare reads against the expected pattern; 0 compares the whole transfer
    pub compare: Option<u64>,
    /// Stamp block markers into written data
    pub mark: Option<MarkMode>,
    /// fsync after every write
    #[serde(default)]
    pub fsync: bool,
}

fn default_transfer() -> u64 {
    1
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            transfer_low: default_transfer(),
            transfer_high: default_transfer(),
            access: AccessPattern::default(),
            read: false,
            write: false,
            read_percent: None,
            write_percent: None,
            seeks: None,
            pattern: FillPattern::default(),
            compare: None,
            mark: None,
            fsync: false,
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Wall-clock bound for each pass, in seconds
    pub run_time: Option<u64>,
    /// Number of passes; 0 repeats until stopped
    pub cycles: Option<u64>,
    /// Heartbeat interval, in seconds
    pub heartbeat: Option<u64>,
    /// Seed for the scheduler and the random pattern (process id when unset)
    pub seed: Option<u64>,
    /// Stop every worker on the first failure
    #[serde(default = "default_stop_on_error")]
    pub stop_on_error: bool,
    /// Value stamped into markers in place of the run start time
    pub alt_marker: Option<u64>,
    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

fn default_workers() -> usize {
    4
}

fn default_stop_on_error() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            run_time: None,
            cycles: None,
            heartbeat: None,
            seed: None,
            stop_on_error: default_stop_on_error(),
            alt_marker: None,
            debug: false,
        }
    }
}

impl Config {
    /// Configuration for `path` with every option at its default
    pub fn new(path: PathBuf) -> Self {
        Self {
            target: TargetConfig {
                path,
                direct: false,
                volume_blocks: None,
                range: AddressRange::default(),
            },
            workload: WorkloadConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// Largest transfer in blocks
    pub fn transfer_high(&self) -> u64 {
        self.workload.transfer_high.max(self.workload.transfer_low)
    }

    /// Smallest transfer in blocks
    pub fn transfer_low(&self) -> u64 {
        self.workload.transfer_low
    }

    /// Whether transfer sizes are drawn from a range
    pub fn random_transfer(&self) -> bool {
        self.transfer_low() != self.transfer_high()
    }

    /// Volume size in blocks
    ///
    /// An explicit LBA range with a stop bound overrides the volume size.
    pub fn volume_blocks(&self) -> u64 {
        match self.target.range {
            AddressRange::Lba { start, stop: Some(stop) } if stop >= start => stop - start + 1,
            AddressRange::Block { start, stop: Some(stop) } if stop >= start => {
                (stop - start + 1) * self.transfer_high()
            }
            _ => self.target.volume_blocks.unwrap_or(DEFAULT_VOLUME_BLOCKS),
        }
    }

    /// First LBA under test
    pub fn start_lba(&self) -> u64 {
        match self.target.range {
            AddressRange::Lba { start, .. } => start,
            AddressRange::Block { start, .. } => start * self.transfer_high(),
        }
    }

    /// Last LBA under test (inclusive)
    pub fn stop_lba(&self) -> u64 {
        let volume_end = self.volume_blocks().saturating_sub(1);
        match self.target.range {
            AddressRange::Lba { stop, .. } => stop.unwrap_or(volume_end),
            AddressRange::Block { stop: Some(stop), .. } => {
                (stop + 1) * self.transfer_high() - 1
            }
            AddressRange::Block { stop: None, .. } => volume_end,
        }
    }

    /// Number of blocks in the range under test
    pub fn span_blocks(&self) -> u64 {
        self.stop_lba().saturating_sub(self.start_lba()) + 1
    }

    /// The range holds exactly one largest transfer, so every action hits the start LBA
    pub fn is_diskcache(&self) -> bool {
        self.span_blocks() == self.transfer_high()
    }

    /// Enabled directions as (read, write); read-only when neither is configured
    pub fn directions(&self) -> (bool, bool) {
        match (self.workload.read, self.workload.write) {
            (false, false) => (true, false),
            dirs => dirs,
        }
    }

    pub fn reads_enabled(&self) -> bool {
        self.directions().0
    }

    pub fn writes_enabled(&self) -> bool {
        self.directions().1
    }

    /// Both reads and writes are configured
    pub fn read_write(&self) -> bool {
        self.reads_enabled() && self.writes_enabled()
    }

    /// Normalized duty cycle percentages as (read, write)
    ///
    /// A single direction forces 100%. With both directions a missing value is
    /// derived from the other (50/50 when neither is set) and any remainder is
    /// split between the two.
    pub fn percentages(&self) -> (u8, u8) {
        let (read, write) = self.directions();
        let (mut r, mut w) = (
            self.workload.read_percent.unwrap_or(0) as i32,
            self.workload.write_percent.unwrap_or(0) as i32,
        );

        if read && !write {
            r = 100;
            w = 0;
        } else if write && !read {
            r = 0;
            w = 100;
        } else if r == 0 && w == 0 {
            r = 50;
            w = 50;
        } else if r == 0 {
            r = 100 - w;
        } else if w == 0 {
            w = 100 - r;
        }

        if r + w != 100 && read && write {
            let remainder = 100 - (r + w);
            let half = remainder / 2;
            w += half;
            r += remainder - half;
        }

        (r.clamp(0, 100) as u8, w.clamp(0, 100) as u8)
    }

    /// Transfers per pass
    pub fn seeks(&self) -> u64 {
        if let Some(seeks) = self.workload.seeks {
            return seeks;
        }
        let mut seeks = if self.is_diskcache() {
            DEFAULT_SEEKS
        } else {
            self.span_blocks() / self.transfer_high()
        };
        if self.workload.access.is_linear() && self.read_write() {
            seeks *= 2;
        }
        seeks
    }

    /// Whether the seek count bounds a pass
    ///
    /// Explicit seeks always do; otherwise seeks bound the pass unless a run
    /// time is given, and always when cycling. A pass ended by the read
    /// balance cutoff is not seek limited.
    pub fn seek_limited(&self) -> bool {
        if self.read_balance_cutoff() {
            return false;
        }
        self.workload.seeks.is_some()
            || self.runtime.run_time.is_none()
            || self.runtime.cycles.is_some()
    }

    /// Whether a pass ends once reads reach 80% of the derived seek count
    ///
    /// Applies to cycling random read/write runs with neither seeks nor a run
    /// time configured.
    pub fn read_balance_cutoff(&self) -> bool {
        self.workload.seeks.is_none()
            && self.runtime.run_time.is_none()
            && self.runtime.cycles.is_some()
            && !self.workload.access.is_linear()
            && self.read_write()
            && self.percentages().0 > 0
    }

    /// Compare-on-read is enabled
    pub fn compare_enabled(&self) -> bool {
        self.workload.compare.is_some()
    }

    /// Seed for the scheduler and random pattern
    pub fn seed(&self) -> u64 {
        self.runtime.seed.unwrap_or_else(|| std::process::id() as u64)
    }
}

// Display trait implementations

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Target: {}", self.target)?;
        writeln!(
            f,
            "  Range: lba {}..={} ({} blocks, volume {} blocks)",
            self.start_lba(),
            self.stop_lba(),
            self.span_blocks(),
            self.volume_blocks()
        )?;
        writeln!(f, "  Workload: {}", self.workload)?;
        let (rperc, wperc) = self.percentages();
        if !self.workload.access.is_linear() {
            writeln!(f, "  Duty cycle: {}% read / {}% write", rperc, wperc)?;
        }
        writeln!(
            f,
            "  Seeks: {}{}",
            self.seeks(),
            if self.seek_limited() { "" } else { " (not enforced)" }
        )?;
        writeln!(f, "  Runtime: {}", self.runtime)?;
        Ok(())
    }
}

impl fmt::Display for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.path.display(), self.range)?;
        if self.direct {
            write!(f, ", direct")?;
        }
        Ok(())
    }
}

impl fmt::Display for WorkloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dirs = match (self.read, self.write) {
            (true, true) => "read/write",
            (false, true) => "write",
            _ => "read",
        };
        write!(f, "{}, {}, pattern={}", dirs, self.access, self.pattern)?;
        if self.transfer_low == self.transfer_high {
            write!(f, ", transfer={} blocks", self.transfer_low)?;
        } else {
            write!(f, ", transfer={}..={} blocks", self.transfer_low, self.transfer_high)?;
        }
        if let Some(len) = self.compare {
            if len == 0 {
                write!(f, ", compare=all")?;
            } else {
                write!(f, ", compare={} bytes", len)?;
            }
        }
        if let Some(mark) = self.mark {
            write!(f, ", mark={}", mark)?;
        }
        if self.fsync {
            write!(f, ", fsync")?;
        }
        Ok(())
    }
}

impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workers={}", self.workers)?;
        if let Some(secs) = self.run_time {
            write!(f, ", run_time={}s", secs)?;
        }
        match self.cycles {
            Some(0) => write!(f, ", cycles=forever")?,
            Some(n) => write!(f, ", cycles={}", n)?,
            None => {}
        }
        if let Some(secs) = self.heartbeat {
            write!(f, ", heartbeat={}s", secs)?;
        }
        if let Some(seed) = self.seed {
            write!(f, ", seed={}", seed)?;
        }
        if !self.stop_on_error {
            write!(f, ", continue_on_error")?;
        }
        Ok(())
    }
}
