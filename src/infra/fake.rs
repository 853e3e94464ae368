use anyhow::{bail, Result};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use super::ani::CatalogSource;

/// In-memory remote used by tests: canned listings keyed by decoded path,
/// paths that always fail, and a log of every request.
#[derive(Default)]
pub struct FakeSource {
    listings: HashMap<Vec<String>, Vec<String>>,
    failing: HashSet<Vec<String>>,
    feed: Option<String>,
    calls: RefCell<Vec<Vec<String>>>,
    feed_calls: Cell<usize>,
}

fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, segments: &[&str], names: &[&str]) -> Self {
        self.listings.insert(path(segments), path(names));
        self
    }

    pub fn failing(mut self, segments: &[&str]) -> Self {
        self.failing.insert(path(segments));
        self
    }

    pub fn feed(mut self, xml: &str) -> Self {
        self.feed = Some(xml.to_string());
        self
    }

    pub fn calls_to(&self, segments: &[&str]) -> usize {
        let wanted = path(segments);
        self.calls.borrow().iter().filter(|c| **c == wanted).count()
    }

    pub fn feed_calls(&self) -> usize {
        self.feed_calls.get()
    }
}

impl CatalogSource for FakeSource {
    fn list_directory(&self, segments: &[String]) -> Result<Vec<String>> {
        self.calls.borrow_mut().push(segments.to_vec());
        if self.failing.contains(segments) {
            bail!("HTTP 503 for {}", segments.join("/"));
        }
        Ok(self.listings.get(segments).cloned().unwrap_or_default())
    }

    fn fetch_feed(&self) -> Result<String> {
        self.feed_calls.set(self.feed_calls.get() + 1);
        match &self.feed {
            Some(xml) => Ok(xml.clone()),
            None => bail!("feed unavailable"),
        }
    }
}
