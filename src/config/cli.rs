//! CLI argument parsing using clap
//!
//! Option letters follow the classic disktest command line. Numeric values keep
//! their historic suffixes (`k`, `K`, `m`, `M`, `g`, `G` for counts and `m`, `h`,
//! `d` for durations); `cli_convert` turns the raw strings into a `Config`.

use clap::Parser;
use std::path::PathBuf;

/// disktest - concurrent disk exerciser with data verification
#[derive(Parser, Debug, Default)]
#[command(name = "disktest")]
#[command(version, about, long_about = None, disable_help_flag = true)]
pub struct Cli {
    /// Print help (-h is the heartbeat interval)
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,

    /// Target path (file or block device)
    ///
    /// May be omitted when the TOML configuration names the target.
    #[arg(value_name = "PATH")]
    pub target: Option<PathBuf>,

    // === Direction ===
    /// Issue reads (the default when neither -r nor -w is given)
    #[arg(short = 'r')]
    pub read: bool,

    /// Issue writes
    #[arg(short = 'w')]
    pub write: bool,

    /// Duty cycle as read:write percentages (random seeking only), e.g. 70:30
    #[arg(short = 'D', value_name = "R:W")]
    pub duty: Option<String>,

    /// Seek pattern: r random, L linear, l linear interleaved; add u (up-up) or d (up-down)
    #[arg(short = 'p', value_name = "TYPE")]
    pub seek_pattern: Option<String>,

    // === Transfers and range ===
    /// Transfer size, or low:high for random sizes (k suffix = KiB, values > 256 are bytes)
    #[arg(short = 'B', value_name = "SIZE")]
    pub transfer: Option<String>,

    /// Volume size in blocks (k, K, m, M, g, G multipliers)
    #[arg(short = 'N', value_name = "BLOCKS")]
    pub volume: Option<String>,

    /// LBA range under test, start[:stop]
    #[arg(short = 's', value_name = "RANGE")]
    pub lba_range: Option<String>,

    /// Range under test in transfer-sized blocks, start[:stop]
    #[arg(short = 'S', value_name = "RANGE")]
    pub block_range: Option<String>,

    /// Total transfers per pass (k, K, m, M, g, G multipliers)
    #[arg(short = 'L', value_name = "COUNT")]
    pub seeks: Option<String>,

    // === Data ===
    /// Counting pattern (default)
    #[arg(short = 'c')]
    pub counting: bool,

    /// LBA pattern: each block holds its own LBA
    #[arg(short = 'n')]
    pub lba_pattern: bool,

    /// Fixed pattern value (decimal, 0x hex or 0 octal)
    #[arg(short = 'f', value_name = "VALUE")]
    pub fixed: Option<String>,

    /// Random pattern, regenerated every pass
    #[arg(short = 'z')]
    pub random_pattern: bool,

    /// Compare read data; 0 compares the whole transfer, otherwise a length in bytes
    #[arg(short = 'E', value_name = "LENGTH")]
    pub compare: Option<String>,

    /// Mark blocks with a header: f first, l last, a all
    #[arg(short = 'm', value_name = "MODE")]
    pub mark: Option<String>,

    /// Value stamped into markers in place of the run start time
    #[arg(long, value_name = "VALUE")]
    pub alt_marker: Option<u64>,

    /// fsync after every write
    #[arg(long)]
    pub fsync: bool,

    /// IO type; d selects direct IO (b, f and r are accepted for compatibility)
    #[arg(short = 'I', value_name = "TYPE")]
    pub io_type: Option<String>,

    // === Runtime ===
    /// Number of worker threads
    #[arg(short = 'K', value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Run time per pass (e.g. 30, 10m, 2h, 1d)
    #[arg(short = 'T', value_name = "TIME")]
    pub run_time: Option<String>,

    /// Number of passes; 0 repeats until interrupted
    #[arg(short = 'C', value_name = "COUNT")]
    pub cycles: Option<u64>,

    /// Heartbeat interval (e.g. 5, 1m)
    #[arg(short = 'h', value_name = "TIME")]
    pub heartbeat: Option<String>,

    /// Seed for the scheduler and the random pattern
    #[arg(short = 'a', value_name = "SEED")]
    pub seed: Option<u64>,

    /// Keep running after a failure instead of stopping every worker
    #[arg(short = 'A')]
    pub continue_on_error: bool,

    // === Driver ===
    /// TOML configuration file; command-line options override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the final summary as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Pretty-print the JSON summary
    #[arg(long)]
    pub json_pretty: bool,

    /// Validate and print the configuration without running
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}
