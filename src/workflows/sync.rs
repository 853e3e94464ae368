use chrono::{DateTime, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::cli::SyncMode;
use crate::config::Settings;
use crate::domain::models::RemoteItem;
use crate::domain::season::Season;
use crate::infra::ani::CatalogSource;
use crate::infra::retry::RetryPolicy;
use crate::infra::store::PointerStore;
use crate::workflows::feed::FeedReader;
use crate::workflows::resolver::Resolver;
use crate::workflows::walker::TreeWalker;

/// Drives discovery, resolution and materialization for one run.
pub struct Synchronizer<'a> {
    source: &'a dyn CatalogSource,
    resolver: Resolver,
    store: PointerStore,
    retry: RetryPolicy,
    history_start_year: i32,
    extra_buckets: Vec<String>,
    timezone: Option<Tz>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(source: &'a dyn CatalogSource, settings: &Settings) -> Self {
        Self {
            source,
            resolver: Resolver::new(&settings.base_url),
            store: PointerStore::new(&settings.storage_root, settings.pointer_extension.clone()),
            retry: settings.retry_policy(),
            history_start_year: settings.history_start_year,
            extra_buckets: settings.extra_buckets.clone(),
            timezone: parse_timezone(settings.timezone.as_deref()),
        }
    }

    /// Runs `mode` against today's catalog and returns how many pointer files were written.
    pub fn run(&self, mode: SyncMode, overwrite: bool) -> usize {
        self.run_on(mode, overwrite, self.today())
    }

    pub fn run_on(&self, mode: SyncMode, overwrite: bool, today: NaiveDate) -> usize {
        let mut written = HashSet::new();
        let created = match mode {
            SyncMode::CurrentSeason => {
                let season = Season::containing(today).to_string();
                self.sync_bucket(&season, overwrite, &mut written)
            }
            SyncMode::AllHistory => {
                let buckets = Season::history(self.history_start_year, today)
                    .into_iter()
                    .map(|season| season.to_string())
                    .chain(self.extra_buckets.iter().cloned());
                buckets
                    .map(|bucket| self.sync_bucket(&bucket, overwrite, &mut written))
                    .sum::<usize>()
            }
            SyncMode::RssIncremental => {
                let items = FeedReader::new(self.source, self.retry).fetch_latest();
                self.materialize(items, overwrite, &mut written)
            }
        };

        info!(
            "{mode:?} sync created {created} pointer file(s) under {:?}",
            self.store.root()
        );
        created
    }

    fn sync_bucket(&self, bucket: &str, overwrite: bool, written: &mut HashSet<PathBuf>) -> usize {
        info!("Walking {bucket}");
        let items = TreeWalker::new(self.source, self.retry).list_tree(&[bucket.to_string()]);
        if items.is_empty() {
            warn!("{bucket} produced no files");
        }
        let created = self.materialize(items, overwrite, written);
        info!("{bucket}: {created} new pointer file(s)");
        created
    }

    fn materialize(
        &self,
        items: Vec<RemoteItem>,
        overwrite: bool,
        written: &mut HashSet<PathBuf>,
    ) -> usize {
        let mut created = 0;
        for item in items {
            if !item.is_valid() {
                debug!("Discarding {:?} in {}", item.title, item.season);
                continue;
            }

            let resolved = self.resolver.resolve(item);
            let path = self.store.pointer_path(&resolved);
            if !written.insert(path) {
                debug!("{} already written during this run", resolved.file_name);
                continue;
            }

            if self.store.write(&resolved, overwrite) {
                created += 1;
            }
        }
        created
    }

    fn today(&self) -> NaiveDate {
        date_in(Utc::now(), self.timezone)
    }
}

/// Resolves an IANA zone name. Unknown names are logged and treated as unset.
fn parse_timezone(name: Option<&str>) -> Option<Tz> {
    let name = name.map(str::trim).filter(|n| !n.is_empty())?;
    match name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(e) => {
            error!("Unknown timezone {name:?}, using local time: {e}");
            None
        }
    }
}

/// Calendar date of `now` in `timezone`, or in local time when none is set.
fn date_in(now: DateTime<Utc>, timezone: Option<Tz>) -> NaiveDate {
    match timezone {
        Some(tz) => now.with_timezone(&tz).date_naive(),
        None => now.with_timezone(&Local).date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::fake::FakeSource;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn settings(root: &Path) -> Settings {
        Settings {
            storage_root: root.to_path_buf(),
            base_url: "https://host/".to_string(),
            history_start_year: 2024,
            extra_buckets: vec!["ANi".to_string()],
            retry_delay_secs: 0,
            ..Settings::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn read(path: PathBuf) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_current_season_walks_only_todays_bucket() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new()
            .dir(&["2024-4"], &["ShowFolder", "[ANi] Top - 01.mp4", "ShowName"])
            .dir(&["2024-4", "ShowFolder"], &["[ANi] Show - 01.mp4"])
            .dir(&["2024-1"], &["[ANi] Old - 01.mp4"]);
        let sync = Synchronizer::new(&source, &settings(temp_dir.path()));

        assert_eq!(sync.run_on(SyncMode::CurrentSeason, false, date(2024, 5, 1)), 2);

        let season_dir = temp_dir.path().join("2024-4");
        assert_eq!(
            read(season_dir.join("ShowFolder - [ANi] Show - 01.mp4.pointer")),
            "https://host/2024-4/ShowFolder/%5BANi%5D%20Show%20-%2001.mp4?d=true\n"
        );
        assert!(season_dir.join("[ANi] Top - 01.mp4.pointer").exists());
        assert!(!temp_dir.path().join("2024-1").exists());
        assert_eq!(source.calls_to(&["2024-1"]), 0);
    }

    #[test]
    fn test_second_run_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new().dir(&["2024-4"], &["[ANi] A - 01.mp4", "[ANi] A - 02.mp4"]);
        let sync = Synchronizer::new(&source, &settings(temp_dir.path()));

        assert_eq!(sync.run_on(SyncMode::CurrentSeason, false, date(2024, 6, 30)), 2);
        assert_eq!(sync.run_on(SyncMode::CurrentSeason, false, date(2024, 6, 30)), 0);
        assert_eq!(sync.run_on(SyncMode::CurrentSeason, true, date(2024, 6, 30)), 2);
    }

    #[test]
    fn test_all_history_survives_a_dead_season() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new()
            .dir(&["2024-1"], &["[ANi] A - 01.mp4"])
            .failing(&["2024-4"])
            .dir(&["2024-7"], &["[ANi] B - 01.mp4"])
            .dir(&["2024-10"], &["[ANi] C - 01.mp4"])
            .dir(&["ANi"], &["[ANi] Root - 01.mp4"]);
        let sync = Synchronizer::new(&source, &settings(temp_dir.path()));

        assert_eq!(sync.run_on(SyncMode::AllHistory, false, date(2024, 11, 3)), 4);
        assert_eq!(source.calls_to(&["2024-4"]), 3);
        assert!(!temp_dir.path().join("2024-4").exists());
        assert!(temp_dir.path().join("ANi").join("[ANi] Root - 01.mp4.pointer").exists());
        assert_eq!(source.calls_to(&["2025-1"]), 0);
    }

    #[test]
    fn test_rss_incremental_uses_feed_urls() {
        let temp_dir = TempDir::new().unwrap();
        let xml = "<rss><channel>\
            <item><title>[ANi] Show - 01 [1080P].mp4</title>\
            <link>https://host/2025-4/%5BANi%5D%20Show%20-%2001%20%5B1080P%5D.mp4?d=mp4</link></item>\
            <item><title>Notice</title><link>https://host/2025-4/Notice.txt</link></item>\
            </channel></rss>";
        let source = FakeSource::new().feed(xml);
        let sync = Synchronizer::new(&source, &settings(temp_dir.path()));

        assert_eq!(sync.run_on(SyncMode::RssIncremental, false, date(2025, 10, 5)), 1);
        assert_eq!(
            read(temp_dir.path().join("2025-4").join("[ANi] Show - 01 [1080P].mp4.pointer")),
            "https://host/2025-4/[ANi] Show - 01 [1080P].mp4?d=true\n"
        );
        assert_eq!(sync.run_on(SyncMode::RssIncremental, false, date(2025, 10, 5)), 0);
    }

    #[test]
    fn test_feed_and_walk_converge_on_one_pointer() {
        let temp_dir = TempDir::new().unwrap();
        let xml = "<rss><channel><item><title></title>\
            <link>https://host/2025-4/%5BANi%5D%20Show%20-%2001.mp4?d=true</link></item>\
            </channel></rss>";
        let source = FakeSource::new()
            .feed(xml)
            .dir(&["2025-4"], &["[ANi] Show - 01.mp4"]);
        let sync = Synchronizer::new(&source, &settings(temp_dir.path()));

        assert_eq!(sync.run_on(SyncMode::RssIncremental, false, date(2025, 10, 5)), 1);
        assert_eq!(sync.run_on(SyncMode::CurrentSeason, false, date(2025, 10, 5)), 0);
        assert_eq!(fs::read_dir(temp_dir.path().join("2025-4")).unwrap().count(), 1);
    }

    #[test]
    fn test_duplicate_items_are_written_once_per_run() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new().dir(&["2024-4"], &["[ANi] A - 01.mp4", "[ANi] A - 01.mp4"]);
        let sync = Synchronizer::new(&source, &settings(temp_dir.path()));

        assert_eq!(sync.run_on(SyncMode::CurrentSeason, true, date(2024, 4, 1)), 1);
    }

    #[test]
    fn test_unsafe_feed_paths_are_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("strm");
        let xml = "<rss><channel><item><title></title>\
            <link>https://host/2025-4/a%2Fb/%5BANi%5D%20x.mp4?d=true</link></item>\
            </channel></rss>";
        let source = FakeSource::new().feed(xml);
        let sync = Synchronizer::new(&source, &settings(&root));

        assert_eq!(sync.run_on(SyncMode::RssIncremental, false, date(2025, 10, 5)), 0);
        assert!(!root.exists());
    }

    #[test]
    fn test_timezone_decides_the_season_at_quarter_boundaries() {
        let now = DateTime::parse_from_rfc3339("2024-12-31T17:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let shanghai = parse_timezone(Some("Asia/Shanghai"));
        assert_eq!(shanghai, Some(chrono_tz::Asia::Shanghai));
        assert_eq!(Season::containing(date_in(now, shanghai)).to_string(), "2025-1");
        assert_eq!(Season::containing(date_in(now, Some(Tz::UTC))).to_string(), "2024-10");
        assert_eq!(
            Season::containing(date_in(now, parse_timezone(Some("America/New_York")))).to_string(),
            "2024-10"
        );
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_local_time() {
        assert_eq!(parse_timezone(Some("Mars/Olympus_Mons")), None);
        assert_eq!(parse_timezone(Some("  ")), None);
        assert_eq!(parse_timezone(None), None);

        let now = Utc::now();
        assert_eq!(date_in(now, None), now.with_timezone(&Local).date_naive());
    }
}
