//! disktest CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use disktest::config::{cli::Cli, cli_convert, validator};
use disktest::engine::file::FileEngine;
use disktest::engine::IoEngine;
use disktest::output::{json, text};
use disktest::TestRun;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    println!("disktest v{}", env!("CARGO_PKG_VERSION"));
    println!("Concurrent disk exerciser with data verification");
    println!();

    let mut config = cli_convert::build_config(&cli)?;
    let engine = FileEngine::new(config.target.path.clone(), config.target.direct);
    let discovered = engine
        .volume_blocks()
        .context("Failed to determine target size")?;
    cli_convert::apply_assumptions(&mut config, discovered);

    validator::validate_config(&config).context("Configuration validation failed")?;

    print!("{}", config);

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    println!();
    println!("Starting test...");
    println!();

    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .with_context(|| format!("Failed to register handler for signal {}", signal))?;
    }

    let run = TestRun::new(config, Arc::new(engine), Arc::new(text::LogReporter::new()))
        .with_stop_handle(stop);
    let summary = run.run()?;

    println!();
    text::print_summary(&summary);

    if let Some(path) = &cli.json {
        json::write_json_output(path, &summary, cli.json_pretty)?;
        println!("JSON summary written to {}", path.display());
    }

    if !summary.passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` wins over the default level
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
