use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::SyncMode;
use crate::infra::retry::RetryPolicy;

const STORAGE_ROOT_VAR: &str = "ANISTRM_STORAGE_ROOT";

/// Everything a sync run needs, resolved once at startup and passed down.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    /// Kept for the external scheduler; never interpreted here.
    pub cron_expression: String,
    pub run_once: bool,
    pub storage_root: PathBuf,
    pub overwrite: bool,
    pub mode_for_run_once: SyncMode,

    pub user_agent: String,
    pub proxy: Option<String>,
    pub request_timeout_secs: u64,
    /// IANA zone deciding which quarter "today" is in, e.g. `Asia/Shanghai`.
    /// Local time when unset or unknown.
    pub timezone: Option<String>,

    pub base_url: String,
    pub feed_url: String,
    pub history_start_year: i32,
    pub extra_buckets: Vec<String>,
    pub pointer_extension: String,

    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
    pub retry_backoff: f64,

    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: "20 22,23,0,1 * * *".to_string(),
            run_once: false,
            storage_root: PathBuf::from("strm"),
            overwrite: false,
            mode_for_run_once: SyncMode::CurrentSeason,
            user_agent: concat!("anistrm/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy: None,
            request_timeout_secs: 30,
            timezone: None,
            base_url: "https://openani.an-i.workers.dev/".to_string(),
            feed_url: "https://aniapi.v300.eu.org/ani-download.xml".to_string(),
            history_start_year: 2019,
            extra_buckets: vec!["ANi".to_string()],
            pointer_extension: "pointer".to_string(),
            retry_attempts: 3,
            retry_delay_secs: 3,
            retry_backoff: 2.0,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Reads the settings file (explicit path or the default location) and
    /// applies environment overrides. A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit.map(Path::to_path_buf).unwrap_or_else(get_config_path);

        let mut settings = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file {path:?}"))?;
            Self::parse(&content).with_context(|| format!("Invalid settings file {path:?}"))?
        } else if explicit.is_some() {
            anyhow::bail!("Settings file not found: {path:?}");
        } else {
            Settings::default()
        };

        if let Ok(root) = env::var(STORAGE_ROOT_VAR) {
            settings.storage_root = PathBuf::from(root);
        }

        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            delay: Duration::from_secs(self.retry_delay_secs),
            backoff: self.retry_backoff,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("anistrm"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}
