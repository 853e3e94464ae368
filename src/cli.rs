use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Walk only the bucket of the current quarter
    CurrentSeason,
    /// Walk every bucket from the first season up to today
    AllHistory,
    /// Read the feed of recently published files
    RssIncremental,
}

#[derive(Parser)]
#[command(name = "anistrm")]
#[command(about = "Mirror a remote anime catalog as local pointer files")]
pub struct Cli {
    /// Settings file (defaults to $XDG_CONFIG_HOME/anistrm/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory receiving the pointer files
    #[arg(long)]
    pub storage_root: Option<PathBuf>,

    /// Sync mode; falls back to the settings file when omitted
    #[arg(long)]
    pub mode: Option<SyncMode>,

    /// Replace pointer files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Repeat the sync every N minutes instead of exiting
    #[arg(long = "interval-minutes")]
    pub interval_minutes: Option<u64>,
}
