//! Configuration validation
//!
//! Runs after the assumptions pass, so derived values (volume size, stop LBA,
//! seek count) are the ones the run will actually use.

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_workload(config)?;
    validate_range(config)?;
    validate_runtime(config)?;
    validate_data(config)?;
    Ok(())
}

/// Validate transfer sizes and seeking
pub fn validate_workload(config: &Config) -> Result<()> {
    let workload = &config.workload;

    if workload.transfer_low < 1 || workload.transfer_high < 1 {
        anyhow::bail!(
            "transfer sizes must be at least 1 block, got {}:{}",
            workload.transfer_low,
            workload.transfer_high
        );
    }
    if workload.transfer_low > workload.transfer_high {
        anyhow::bail!(
            "low transfer size ({}) exceeds high transfer size ({})",
            workload.transfer_low,
            workload.transfer_high
        );
    }

    let duty_given = workload.read_percent.is_some() || workload.write_percent.is_some();
    if duty_given && workload.access.is_linear() {
        anyhow::bail!("Duty cycle testing is supported for random (-p r) tests only");
    }
    if let (Some(r), Some(w)) = (workload.read_percent, workload.write_percent) {
        if r as u32 + w as u32 > 100 {
            anyhow::bail!("read_percent ({}) + write_percent ({}) exceeds 100", r, w);
        }
    }

    if matches!(config.target.range, AddressRange::Block { .. }) && config.random_transfer() {
        anyhow::bail!(
            "Can't have unfixed transfer sizes and specify the range in terms of blocks"
        );
    }

    Ok(())
}

/// Validate the range under test against the volume
pub fn validate_range(config: &Config) -> Result<()> {
    let (start, stop) = match config.target.range {
        AddressRange::Lba { start, stop } | AddressRange::Block { start, stop } => (start, stop),
    };
    if let Some(stop) = stop {
        if start > stop {
            anyhow::bail!(
                "Stop of range ({}) must be greater than the start ({})",
                stop,
                start
            );
        }
    }

    let volume = config.volume_blocks();
    let high = config.transfer_high();
    if volume < high {
        anyhow::bail!(
            "Volume size ({} blocks) is too small for transfer size ({} blocks)",
            volume,
            high
        );
    }
    if config.start_lba() > config.stop_lba() {
        anyhow::bail!(
            "Start LBA {} is past the end of the volume ({} blocks)",
            config.start_lba(),
            volume
        );
    }
    if let Some(declared) = config.target.volume_blocks {
        if config.stop_lba() >= declared {
            anyhow::bail!(
                "Volume stop LBA ({}) exceeds volume size ({} blocks)",
                config.stop_lba(),
                declared
            );
        }
    }
    if config.span_blocks() < high {
        anyhow::bail!(
            "Range of {} blocks cannot hold a {}-block transfer",
            config.span_blocks(),
            high
        );
    }

    Ok(())
}

/// Validate workers, seeks and timing
pub fn validate_runtime(config: &Config) -> Result<()> {
    let runtime = &config.runtime;

    if runtime.workers == 0 {
        anyhow::bail!("workers must be at least 1");
    }
    if config.seek_limited() {
        let seeks = config.seeks();
        if seeks == 0 {
            anyhow::bail!("Total seeks of {} is invalid", seeks);
        }
        if runtime.workers as u64 > seeks {
            anyhow::bail!(
                "Can't have more workers ({}) than seeks ({}), use -K/-L to adjust",
                runtime.workers,
                seeks
            );
        }
    }
    if let Some(run_time) = runtime.run_time {
        if run_time == 0 {
            anyhow::bail!("run_time must be at least 1 second");
        }
        if let Some(heartbeat) = runtime.heartbeat {
            if heartbeat > run_time {
                anyhow::bail!(
                    "Heartbeat ({}s) should be at most the run time ({}s), use -h/-T to adjust",
                    heartbeat,
                    run_time
                );
            }
        }
    }

    Ok(())
}

/// Validate marking and compare settings
pub fn validate_data(config: &Config) -> Result<()> {
    let workload = &config.workload;

    if matches!(workload.mark, Some(MarkMode::First) | Some(MarkMode::Last))
        && config.random_transfer()
    {
        anyhow::bail!("First and last block marking require a fixed transfer size");
    }

    if config.compare_enabled() && !config.writes_enabled() {
        if workload.pattern == FillPattern::Random && config.runtime.seed.is_none() {
            anyhow::bail!("Comparing a read-only run of the random pattern requires a seed (-a)");
        }
        if workload.mark.is_some() && config.runtime.alt_marker.is_none() {
            anyhow::bail!(
                "Comparing a read-only run of marked data requires --alt-marker"
            );
        }
    }

    Ok(())
}
