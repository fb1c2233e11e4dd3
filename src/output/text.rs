//! Human-readable text output
//!
//! `LogReporter` emits heartbeats, pass summaries and failures through
//! `tracing`; `print_summary` writes the end-of-run banner to stdout.

use crate::coordinator::RunSummary;
use crate::error::IoFailure;
use crate::stats::{Reporter, StatsSnapshot};
use crate::util::time::{format_elapsed, format_rate, format_throughput};
use tracing::{error, info};

/// Reporter that writes through `tracing`
#[derive(Debug, Default)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for LogReporter {
    fn heartbeat(&self, pass: u64, elapsed_secs: u64, snapshot: &StatsSnapshot) {
        info!(
            pass,
            elapsed = %format_elapsed(elapsed_secs),
            "heartbeat: {}",
            format_snapshot(snapshot)
        );
    }

    fn cycle(&self, pass: u64, snapshot: &StatsSnapshot) {
        info!(pass, "cycle stats: {}", format_snapshot(snapshot));
    }

    fn failure(&self, pass: u64, failure: &IoFailure) {
        // The worker already logged the dump; keep the sink to one line
        error!(pass, lba = failure.lba(), "failure: {}", failure);
    }
}

/// One-line rendering of a snapshot
pub fn format_snapshot(snapshot: &StatsSnapshot) -> String {
    let stats = &snapshot.stats;
    format!(
        "write {} ops ({}), {} IOPS, {}; read {} ops ({}), {} IOPS, {}",
        format_number(stats.wcount),
        format_bytes(stats.wbytes),
        format_rate(snapshot.write_iops()),
        format_throughput(snapshot.write_throughput()),
        format_number(stats.rcount),
        format_bytes(stats.rbytes),
        format_rate(snapshot.read_iops()),
        format_throughput(snapshot.read_throughput()),
    )
}

/// Final verdict line
pub fn verdict(passed: bool) -> &'static str {
    if passed {
        "Test Done (Passed)"
    } else {
        "Test Done (Failed)"
    }
}

/// Print the end-of-run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    let global = &summary.global;
    let stats = &global.stats;

    println!("═══════════════════════════════════════════════════════════");
    println!("                    TEST RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Elapsed Time: {}", format_elapsed(summary.elapsed_secs));
    println!("Passes:       {}", summary.passes);
    println!("Ended:        {}", summary.stop_reason);
    println!();

    println!("Operations:");
    println!(
        "  Write: {} ops ({}) - {} IOPS",
        format_number(stats.wcount),
        format_bytes(stats.wbytes),
        format_rate(global.write_iops())
    );
    println!(
        "  Read:  {} ops ({}) - {} IOPS",
        format_number(stats.rcount),
        format_bytes(stats.rbytes),
        format_rate(global.read_iops())
    );
    println!(
        "  Total: {} ops ({})",
        format_number(stats.total_ops()),
        format_bytes(stats.total_bytes())
    );
    if summary.failures > 0 {
        println!("  Failures: {}", format_number(summary.failures));
    }
    println!();

    println!("Throughput:");
    println!("  Write: {}", format_throughput(global.write_throughput()));
    println!("  Read:  {}", format_throughput(global.read_throughput()));
    println!();

    println!("═══════════════════════════════════════════════════════════");
    println!("{}", verdict(summary.passed));
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

/// Format bytes with appropriate units
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
