//! JSON output formatting
//!
//! Serializes the end-of-run summary: verdict, pass count, failure count and the
//! global statistics per direction, with both raw numbers and human-readable
//! strings.

use crate::coordinator::RunSummary;
use crate::stats::StatsSnapshot;
use crate::timer::StopReason;
use crate::util::time::{format_elapsed, format_throughput};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Throughput with bytes/sec and human-readable format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonThroughput {
    pub bytes_per_sec: u64,
    pub human: String,
}

impl JsonThroughput {
    pub fn new(bytes_per_sec: f64) -> Self {
        Self {
            bytes_per_sec: bytes_per_sec as u64,
            human: format_throughput(bytes_per_sec),
        }
    }
}

/// Statistics for one direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDirection {
    pub ops: u64,
    pub bytes: u64,
    /// Seconds the rates are computed over
    pub seconds: u64,
    pub iops: f64,
    pub throughput: JsonThroughput,
}

/// Elapsed wall-clock time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonElapsed {
    pub secs: u64,
    pub human: String,
}

/// Top-level JSON document
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub passed: bool,
    pub passes: u64,
    pub failures: u64,
    pub stop_reason: StopReason,
    pub elapsed: JsonElapsed,
    pub write: JsonDirection,
    pub read: JsonDirection,
}

impl JsonSummary {
    pub fn from_summary(summary: &RunSummary) -> Self {
        let global = &summary.global;
        Self {
            passed: summary.passed,
            passes: summary.passes,
            failures: summary.failures,
            stop_reason: summary.stop_reason,
            elapsed: JsonElapsed {
                secs: summary.elapsed_secs,
                human: format_elapsed(summary.elapsed_secs),
            },
            write: write_direction(global),
            read: read_direction(global),
        }
    }
}

fn write_direction(snapshot: &StatsSnapshot) -> JsonDirection {
    JsonDirection {
        ops: snapshot.stats.wcount,
        bytes: snapshot.stats.wbytes,
        seconds: snapshot.write_seconds,
        iops: snapshot.write_iops(),
        throughput: JsonThroughput::new(snapshot.write_throughput()),
    }
}

fn read_direction(snapshot: &StatsSnapshot) -> JsonDirection {
    JsonDirection {
        ops: snapshot.stats.rcount,
        bytes: snapshot.stats.rbytes,
        seconds: snapshot.read_seconds,
        iops: snapshot.read_iops(),
        throughput: JsonThroughput::new(snapshot.read_throughput()),
    }
}

/// Render the summary as a JSON string
pub fn summary_to_json(summary: &RunSummary, pretty: bool) -> Result<String> {
    let doc = JsonSummary::from_summary(summary);
    let text = if pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    Ok(text)
}

/// Write JSON output to file
pub fn write_json_output(output_path: &Path, summary: &RunSummary, pretty: bool) -> Result<()> {
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output file: {}", output_path.display()))?;
    let doc = JsonSummary::from_summary(summary);

    if pretty {
        serde_json::to_writer_pretty(&mut file, &doc)?;
    } else {
        serde_json::to_writer(&mut file, &doc)?;
    }
    writeln!(file)?;

    Ok(())
}
