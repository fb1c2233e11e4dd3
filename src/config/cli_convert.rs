//! CLI to Config conversion utilities
//!
//! Parsers for the historic disktest value formats, the merge of command-line
//! options over a base configuration, and the assumptions pass that fills in
//! what the user left unset.

use crate::config::cli::Cli;
use crate::config::workload::*;
use crate::config::{Config, DEFAULT_VOLUME_BLOCKS};
use anyhow::{bail, Context, Result};

/// Parse a count with a binary (`k`, `m`, `g`) or decimal (`K`, `M`, `G`) multiplier
pub fn parse_count(s: &str) -> Result<u64> {
    let s = s.trim();

    let (num_str, multiplier) = match s.chars().last() {
        Some('k') => (&s[..s.len() - 1], 1u64 << 10),
        Some('K') => (&s[..s.len() - 1], 1_000),
        Some('m') => (&s[..s.len() - 1], 1 << 20),
        Some('M') => (&s[..s.len() - 1], 1_000_000),
        Some('g') => (&s[..s.len() - 1], 1 << 30),
        Some('G') => (&s[..s.len() - 1], 1_000_000_000),
        _ => (s, 1),
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid count format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Count out of range: {}", s))
}

/// Parse a duration string (e.g. "60", "60s", "5m", "1h", "2d") to seconds
pub fn parse_duration(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with('s') {
        (s.trim_end_matches('s'), 1u64)
    } else if s.ends_with('m') {
        (s.trim_end_matches('m'), 60)
    } else if s.ends_with('h') {
        (s.trim_end_matches('h'), 3600)
    } else if s.ends_with('d') {
        (s.trim_end_matches('d'), 86_400)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    Ok(num * multiplier)
}

/// Parse an integer in C notation: `0x` hex, leading `0` octal, decimal otherwise
pub fn parse_c_integer(s: &str) -> Result<u64> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8)
    } else {
        s.parse()
    };
    parsed.with_context(|| format!("Invalid numeric value: {}", s))
}

/// Parse one transfer size to blocks
///
/// A `k` suffix means KiB (two blocks per k); a bare value above 256 is taken
/// as bytes, anything else as blocks.
pub fn parse_transfer_size(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Some(num_str) = s.strip_suffix('k') {
        let num: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid transfer size: {}", s))?;
        return Ok(num * 2);
    }

    let num: u64 = s
        .parse()
        .with_context(|| format!("Invalid transfer size: {}", s))?;
    if num > 256 {
        Ok(num / crate::BLOCK_SIZE)
    } else {
        Ok(num)
    }
}

/// Parse `size` or `low:high` to transfer bounds in blocks
pub fn parse_transfer(s: &str) -> Result<(u64, u64)> {
    match s.split_once(':') {
        Some((low, high)) => Ok((parse_transfer_size(low)?, parse_transfer_size(high)?)),
        None => {
            let size = parse_transfer_size(s)?;
            Ok((size, size))
        }
    }
}

/// Parse `start` or `start:stop`
pub fn parse_range(s: &str) -> Result<(u64, Option<u64>)> {
    match s.split_once(':') {
        Some((start, stop)) => Ok((parse_count(start)?, Some(parse_count(stop)?))),
        None => Ok((parse_count(s)?, None)),
    }
}

/// Parse `read:write` duty percentages
pub fn parse_percentages(s: &str) -> Result<(u8, u8)> {
    let (read, write) = s
        .split_once(':')
        .with_context(|| format!("Duty cycle must be read:write, got {}", s))?;
    let read: u8 = read
        .trim()
        .parse()
        .with_context(|| format!("Invalid read percentage: {}", read))?;
    let write: u8 = write
        .trim()
        .parse()
        .with_context(|| format!("Invalid write percentage: {}", write))?;
    if read as u32 + write as u32 > 100 {
        bail!("Duty cycle percentages exceed 100: {}", s);
    }
    Ok((read, write))
}

/// Parse a seek pattern (`r`, `L`, `l`, optionally with `u` or `d`)
pub fn parse_seek_pattern(s: &str) -> Result<AccessPattern> {
    let sweep = if s.contains(['U', 'u']) {
        LinearSweep::Retrace
    } else if s.contains(['D', 'd']) {
        LinearSweep::Bounce
    } else {
        LinearSweep::Retrace
    };

    if s.contains('L') {
        Ok(AccessPattern::Linear { sweep, interleaved: false })
    } else if s.contains('l') {
        Ok(AccessPattern::Linear { sweep, interleaved: true })
    } else if s.contains(['R', 'r']) {
        Ok(AccessPattern::Random)
    } else {
        bail!("Unknown seek pattern: {}", s)
    }
}

/// Parse a mark mode (`f`, `l` or `a`)
pub fn parse_mark_mode(s: &str) -> Result<MarkMode> {
    if s.contains(['L', 'l']) {
        Ok(MarkMode::Last)
    } else if s.contains(['F', 'f']) {
        Ok(MarkMode::First)
    } else if s.contains(['A', 'a']) {
        Ok(MarkMode::All)
    } else {
        bail!("Unknown mark type: {}", s)
    }
}

/// Build the configuration from the command line, over the TOML file when one is given
pub fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => crate::config::toml::parse_toml_file(path)?,
        None => match &cli.target {
            Some(target) => Config::new(target.clone()),
            None => bail!("Unspecified target"),
        },
    };
    apply_cli(cli, &mut config)?;
    Ok(config)
}

/// Override `config` with every option set on the command line
pub fn apply_cli(cli: &Cli, config: &mut Config) -> Result<()> {
    if let Some(target) = &cli.target {
        config.target.path = target.clone();
    }

    // Direction
    if cli.read || cli.write {
        config.workload.read = cli.read;
        config.workload.write = cli.write;
    }
    if let Some(duty) = &cli.duty {
        let (read, write) = parse_percentages(duty)?;
        config.workload.read_percent = Some(read);
        config.workload.write_percent = Some(write);
    }
    if let Some(pattern) = &cli.seek_pattern {
        config.workload.access = parse_seek_pattern(pattern)?;
    }

    // Transfers and range
    if let Some(transfer) = &cli.transfer {
        let (low, high) = parse_transfer(transfer)?;
        config.workload.transfer_low = low;
        config.workload.transfer_high = high;
    }
    if let Some(volume) = &cli.volume {
        config.target.volume_blocks = Some(parse_count(volume)?);
    }
    match (&cli.lba_range, &cli.block_range) {
        (Some(_), Some(_)) => bail!("Can't specify range in both block and LBA, use -s or -S"),
        (Some(range), None) => {
            let (start, stop) = parse_range(range)?;
            config.target.range = AddressRange::Lba { start, stop };
        }
        (None, Some(range)) => {
            let (start, stop) = parse_range(range)?;
            config.target.range = AddressRange::Block { start, stop };
        }
        (None, None) => {}
    }
    if let Some(seeks) = &cli.seeks {
        config.workload.seeks = Some(parse_count(seeks)?);
    }

    // Data
    let patterns = [cli.counting, cli.lba_pattern, cli.fixed.is_some(), cli.random_pattern];
    if patterns.iter().filter(|&&set| set).count() > 1 {
        bail!("Please specify only one pattern type");
    }
    if cli.counting {
        config.workload.pattern = FillPattern::Counting;
    } else if cli.lba_pattern {
        config.workload.pattern = FillPattern::Lba;
    } else if cli.random_pattern {
        config.workload.pattern = FillPattern::Random;
    } else if let Some(value) = &cli.fixed {
        config.workload.pattern = FillPattern::Fixed(parse_c_integer(value)?);
    }
    if let Some(compare) = &cli.compare {
        config.workload.compare = Some(parse_c_integer(compare)?);
    }
    if let Some(mark) = &cli.mark {
        config.workload.mark = Some(parse_mark_mode(mark)?);
    }
    if cli.alt_marker.is_some() {
        config.runtime.alt_marker = cli.alt_marker;
    }
    if cli.fsync {
        config.workload.fsync = true;
    }
    if let Some(io_type) = &cli.io_type {
        if !io_type.contains(['B', 'b', 'F', 'f', 'R', 'r', 'D', 'd']) {
            bail!("Unknown IO type: {}", io_type);
        }
        config.target.direct = io_type.contains(['D', 'd']);
    }

    // Runtime
    if let Some(workers) = cli.workers {
        config.runtime.workers = workers;
    }
    if let Some(run_time) = &cli.run_time {
        config.runtime.run_time = Some(parse_duration(run_time)?);
    }
    if cli.cycles.is_some() {
        config.runtime.cycles = cli.cycles;
    }
    if let Some(heartbeat) = &cli.heartbeat {
        config.runtime.heartbeat = Some(parse_duration(heartbeat)?);
    }
    if cli.seed.is_some() {
        config.runtime.seed = cli.seed;
    }
    if cli.continue_on_error {
        config.runtime.stop_on_error = false;
    }
    if cli.debug {
        config.runtime.debug = true;
    }

    Ok(())
}

/// Fill in what the user left unset
///
/// `discovered` is the volume size reported by the target, if any. The seek
/// count and range bounds stay derived so that whether seeks bound a pass keeps
/// following what the user actually asked for.
pub fn apply_assumptions(config: &mut Config, discovered: Option<u64>) {
    if config.target.volume_blocks.is_none() {
        config.target.volume_blocks = Some(
            discovered
                .filter(|&blocks| blocks > 0)
                .unwrap_or(DEFAULT_VOLUME_BLOCKS),
        );
    }

    if !config.workload.read && !config.workload.write {
        config.workload.read = true;
    }

    if config.workload.access == AccessPattern::Random {
        let (read, write) = config.percentages();
        config.workload.read_percent = Some(read);
        config.workload.write_percent = Some(write);
    }

    if config.runtime.seed.is_none() {
        config.runtime.seed = Some(config.seed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["disktest"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_count_multipliers() {
        assert_eq!(parse_count("100").unwrap(), 100);
        assert_eq!(parse_count("2k").unwrap(), 2048);
        assert_eq!(parse_count("2K").unwrap(), 2000);
        assert_eq!(parse_count("1m").unwrap(), 1 << 20);
        assert_eq!(parse_count("3M").unwrap(), 3_000_000);
        assert_eq!(parse_count("1g").unwrap(), 1 << 30);
        assert_eq!(parse_count("1G").unwrap(), 1_000_000_000);
        assert!(parse_count("12x").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30").unwrap(), 30);
        assert_eq!(parse_duration("30s").unwrap(), 30);
        assert_eq!(parse_duration("5m").unwrap(), 300);
        assert_eq!(parse_duration("2h").unwrap(), 7200);
        assert_eq!(parse_duration("1d").unwrap(), 86_400);
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_c_integer() {
        assert_eq!(parse_c_integer("0xdead").unwrap(), 0xdead);
        assert_eq!(parse_c_integer("017").unwrap(), 15);
        assert_eq!(parse_c_integer("0").unwrap(), 0);
        assert_eq!(parse_c_integer("512").unwrap(), 512);
    }

    #[test]
    fn test_parse_transfer() {
        assert_eq!(parse_transfer("8").unwrap(), (8, 8));
        assert_eq!(parse_transfer("4k").unwrap(), (8, 8));
        assert_eq!(parse_transfer("4096").unwrap(), (8, 8));
        assert_eq!(parse_transfer("1:64k").unwrap(), (1, 128));
        assert!(parse_transfer("big").is_err());
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("100").unwrap(), (100, None));
        assert_eq!(parse_range("0:1k").unwrap(), (0, Some(1024)));
        assert!(parse_range("a:b").is_err());
    }

    #[test]
    fn test_parse_percentages() {
        assert_eq!(parse_percentages("70:30").unwrap(), (70, 30));
        assert_eq!(parse_percentages("40:0").unwrap(), (40, 0));
        assert!(parse_percentages("70").is_err());
        assert!(parse_percentages("80:80").is_err());
    }

    #[test]
    fn test_parse_seek_pattern() {
        assert_eq!(parse_seek_pattern("r").unwrap(), AccessPattern::Random);
        assert_eq!(
            parse_seek_pattern("L").unwrap(),
            AccessPattern::Linear { sweep: LinearSweep::Retrace, interleaved: false }
        );
        assert_eq!(
            parse_seek_pattern("Ld").unwrap(),
            AccessPattern::Linear { sweep: LinearSweep::Bounce, interleaved: false }
        );
        assert_eq!(
            parse_seek_pattern("lu").unwrap(),
            AccessPattern::Linear { sweep: LinearSweep::Retrace, interleaved: true }
        );
        assert!(parse_seek_pattern("x").is_err());
    }

    #[test]
    fn test_parse_mark_mode() {
        assert_eq!(parse_mark_mode("f").unwrap(), MarkMode::First);
        assert_eq!(parse_mark_mode("L").unwrap(), MarkMode::Last);
        assert_eq!(parse_mark_mode("a").unwrap(), MarkMode::All);
        assert!(parse_mark_mode("q").is_err());
    }

    #[test]
    fn test_build_config_from_flags() {
        let config = build_config(&cli(&[
            "-r", "-w", "-D", "60:40", "-B", "1:16", "-s", "100:1099", "-L", "5K", "-K", "8",
            "-T", "2m", "-C", "0", "-h", "10", "-a", "42", "-A", "-E", "0", "-f", "0xab",
            "-m", "a", "-I", "bd", "/dev/sdz",
        ]))
        .unwrap();

        assert_eq!(config.target.path, PathBuf::from("/dev/sdz"));
        assert!(config.target.direct);
        assert_eq!(config.target.range, AddressRange::Lba { start: 100, stop: Some(1099) });
        assert_eq!((config.workload.transfer_low, config.workload.transfer_high), (1, 16));
        assert_eq!(config.workload.seeks, Some(5000));
        assert_eq!(config.percentages(), (60, 40));
        assert_eq!(config.workload.pattern, FillPattern::Fixed(0xab));
        assert_eq!(config.workload.compare, Some(0));
        assert_eq!(config.workload.mark, Some(MarkMode::All));
        assert_eq!(config.runtime.workers, 8);
        assert_eq!(config.runtime.run_time, Some(120));
        assert_eq!(config.runtime.cycles, Some(0));
        assert_eq!(config.runtime.heartbeat, Some(10));
        assert_eq!(config.runtime.seed, Some(42));
        assert!(!config.runtime.stop_on_error);
    }

    #[test]
    fn test_missing_target() {
        let err = build_config(&cli(&["-r"])).unwrap_err();
        assert!(err.to_string().contains("Unspecified target"));
    }

    #[test]
    fn test_conflicting_options() {
        assert!(build_config(&cli(&["-c", "-z", "t.img"])).is_err());
        assert!(build_config(&cli(&["-s", "0:9", "-S", "0:1", "t.img"])).is_err());
        assert!(build_config(&cli(&["-I", "q", "t.img"])).is_err());
    }

    #[test]
    fn test_cli_overrides_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[target]
path = "/tmp/from-toml"

[workload]
write = true
transfer_low = 8
transfer_high = 8

[runtime]
workers = 2
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let config = build_config(&cli(&["--config", path, "-K", "6"])).unwrap();
        assert_eq!(config.target.path, PathBuf::from("/tmp/from-toml"));
        assert!(config.workload.write);
        assert_eq!(config.workload.transfer_high, 8);
        assert_eq!(config.runtime.workers, 6);

        let config = build_config(&cli(&["--config", path, "other.img"])).unwrap();
        assert_eq!(config.target.path, PathBuf::from("other.img"));
    }

    #[test]
    fn test_apply_assumptions() {
        let mut config = build_config(&cli(&["t.img"])).unwrap();
        apply_assumptions(&mut config, Some(8192));
        assert_eq!(config.target.volume_blocks, Some(8192));
        assert!(config.workload.read);
        assert!(!config.workload.write);
        assert_eq!(config.workload.read_percent, Some(100));
        assert!(config.runtime.seed.is_some());
        assert_eq!(config.seeks(), 8192);
        assert!(config.workload.seeks.is_none());

        let mut config = build_config(&cli(&["-w", "-r", "t.img"])).unwrap();
        apply_assumptions(&mut config, None);
        assert_eq!(config.target.volume_blocks, Some(DEFAULT_VOLUME_BLOCKS));
        assert_eq!(config.percentages(), (50, 50));
    }

    #[test]
    fn test_apply_assumptions_keeps_linear_duty_unset() {
        let mut config = build_config(&cli(&["-w", "-r", "-pL", "t.img"])).unwrap();
        apply_assumptions(&mut config, Some(0));
        assert_eq!(config.target.volume_blocks, Some(DEFAULT_VOLUME_BLOCKS));
        assert!(config.workload.read_percent.is_none());
        assert!(config.workload.write_percent.is_none());
    }
}
