use tracing::{debug, warn};

use crate::domain::models::{is_media_name, RemoteItem};
use crate::infra::ani::CatalogSource;
use crate::infra::retry::RetryPolicy;

/// Deepest path (season included) the walker will descend into.
const MAX_DEPTH: usize = 8;

/// Recursively lists a remote tree, one request at a time.
pub struct TreeWalker<'a> {
    source: &'a dyn CatalogSource,
    retry: RetryPolicy,
}

impl<'a> TreeWalker<'a> {
    pub fn new(source: &'a dyn CatalogSource, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Every media leaf below `segments`. A subtree whose listing keeps
    /// failing contributes nothing instead of aborting the walk.
    pub fn list_tree(&self, segments: &[String]) -> Vec<RemoteItem> {
        let Some((season, sub_paths)) = segments.split_first() else {
            return Vec::new();
        };

        let location = segments.join("/");
        let names = self
            .retry
            .run_or_default(&format!("list {location}"), || {
                self.source.list_directory(segments)
            });

        let mut items = Vec::new();
        for name in names {
            match classify(&name) {
                Entry::Leaf => {
                    debug!("Found {name} in {location}");
                    items.push(RemoteItem::new(season.clone(), sub_paths.to_vec(), name));
                }
                Entry::Directory if segments.len() >= MAX_DEPTH => {
                    warn!("Not descending into {name}: {location} is already {MAX_DEPTH} levels deep");
                }
                Entry::Directory => {
                    let mut child = segments.to_vec();
                    child.push(name);
                    items.extend(self.list_tree(&child));
                }
                Entry::Ignored => debug!("Ignoring {name} in {location}"),
            }
        }
        items
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Entry {
    Leaf,
    Directory,
    Ignored,
}

/// The media marker wins over the directory heuristic, so a directory whose
/// name carries the marker is treated as a leaf.
fn classify(name: &str) -> Entry {
    if is_media_name(name) {
        Entry::Leaf
    } else if !name.contains('.') {
        Entry::Directory
    } else {
        Entry::Ignored
    }
}
