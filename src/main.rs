mod cli;
mod config;
mod domain;
mod infra;
mod logging;
mod workflows;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use cli::{Cli, SyncMode};
use config::Settings;
use infra::ani::AniClient;
use workflows::sync::Synchronizer;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    logging::init(&settings.log_level);

    if let Some(root) = cli.storage_root {
        settings.storage_root = root;
    }
    let overwrite = cli.overwrite || settings.overwrite;
    debug!(
        "Storage root {:?}, external schedule {:?}",
        settings.storage_root, settings.cron_expression
    );

    let Some(mode) = select_mode(cli.mode, &settings) else {
        info!("Sync is disabled; pass --mode to run anyway");
        return Ok(());
    };

    let interval = cli.interval_minutes.map(parse_interval).transpose()?;
    let client = AniClient::new(&settings)?;
    let synchronizer = Synchronizer::new(&client, &settings);

    match interval {
        None => {
            synchronizer.run(mode, overwrite);
        }
        Some(interval) => loop {
            synchronizer.run(mode, overwrite);
            info!("Next {mode:?} sync in {interval:?}");
            thread::sleep(interval);
        },
    }

    Ok(())
}

fn parse_interval(minutes: u64) -> Result<Duration> {
    if minutes == 0 {
        bail!("--interval-minutes must be at least 1");
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .with_context(|| format!("--interval-minutes {minutes} is too large"))
}

/// An explicit `--mode` always runs. Otherwise a pending one-shot run uses its
/// own mode, and a regular run syncs the current season if enabled.
fn select_mode(requested: Option<SyncMode>, settings: &Settings) -> Option<SyncMode> {
    if let Some(mode) = requested {
        return Some(mode);
    }
    if settings.run_once {
        return Some(settings.mode_for_run_once);
    }
    settings.enabled.then_some(SyncMode::CurrentSeason)
}
