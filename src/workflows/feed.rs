use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::domain::models::RemoteItem;
use crate::infra::ani::{decode_component, CatalogSource};
use crate::infra::feed::{parse_feed, FeedEntry};
use crate::infra::retry::RetryPolicy;

const DELIVERY_KEY: &str = "d";
const DELIVERY_VALUE: &str = "true";
const DEFAULT_EXTENSION: &str = ".mp4";

fn extension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\.[A-Za-z0-9]{2,4}$").unwrap())
}

/// Turns the feed of recently published files into remote items carrying
/// their authoritative URL.
pub struct FeedReader<'a> {
    source: &'a dyn CatalogSource,
    retry: RetryPolicy,
}

impl<'a> FeedReader<'a> {
    pub fn new(source: &'a dyn CatalogSource, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// An unreachable or unparsable feed yields no items.
    pub fn fetch_latest(&self) -> Vec<RemoteItem> {
        let entries = self.retry.run_or_default("fetch feed", || {
            let xml = self.source.fetch_feed()?;
            parse_feed(&xml)
        });

        let items: Vec<RemoteItem> = entries.iter().filter_map(item_from_entry).collect();
        info!("Feed listed {} entries, {} usable", entries.len(), items.len());
        items
    }
}

fn item_from_entry(entry: &FeedEntry) -> Option<RemoteItem> {
    let Some(link) = normalize_link(&entry.link) else {
        warn!("Skipping feed entry with invalid link: {:?}", entry.link);
        return None;
    };

    let Some(item) = classify_link(&link) else {
        debug!("Skipping feed entry without season and file name: {link}");
        return None;
    };

    if !entry.title.is_empty() && !item.title.contains(&entry.title) {
        debug!(
            "Skipping feed entry whose title does not match its file: {:?} vs {:?}",
            entry.title, item.title
        );
        return None;
    }

    Some(item)
}

/// Parses `link` and repairs the known upstream quirks: a delivery flag with
/// the wrong value or missing entirely, and a file name without extension.
/// Returns `None` for anything that is not an absolute HTTP(S) URL.
pub fn normalize_link(link: &str) -> Option<Url> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let mut url = Url::parse(link).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    let path = url.path().to_string();
    let last = path.rsplit('/').next().unwrap_or_default();
    if !last.is_empty() && !extension_pattern().is_match(&decode_component(last)) {
        url.set_path(&format!("{path}{DEFAULT_EXTENSION}"));
    }

    let query = delivery_query(url.query());
    url.set_query(Some(&query));
    Some(url)
}

fn delivery_query(query: Option<&str>) -> String {
    let canonical = format!("{DELIVERY_KEY}={DELIVERY_VALUE}");
    let mut pairs: Vec<String> = Vec::new();
    let mut has_flag = false;

    for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let key = pair.split_once('=').map_or(pair, |(key, _)| key);
        if key == DELIVERY_KEY {
            if !has_flag {
                pairs.push(canonical.clone());
                has_flag = true;
            }
        } else {
            pairs.push(pair.to_string());
        }
    }

    if !has_flag {
        pairs.push(canonical);
    }
    pairs.join("&")
}

/// Reads season, sub-paths and file name off the URL path.
fn classify_link(url: &Url) -> Option<RemoteItem> {
    let components: Vec<String> = url
        .path()
        .strip_prefix('/')?
        .split('/')
        .map(decode_component)
        .collect();

    let (title, rest) = components.split_last()?;
    let (season, sub_paths) = rest.split_first()?;
    if title.is_empty() {
        return None;
    }

    Some(RemoteItem::new(season.clone(), sub_paths.to_vec(), title.clone()).with_source_url(url.as_str()))
}
