/// Substring every genuine media file name on the remote carries.
pub const MEDIA_MARKER: &str = "ANi";

/// Returns true when the name looks like a media leaf rather than a directory or noise.
pub fn is_media_name(name: &str) -> bool {
    name.contains(MEDIA_MARKER)
}

/// A file discovered on the remote, in decoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub season: String,
    pub sub_paths: Vec<String>,
    pub title: String,
    /// Authoritative URL from the feed. Synthesized from the path when absent.
    pub source_url: Option<String>,
}

impl RemoteItem {
    pub fn new(season: impl Into<String>, sub_paths: Vec<String>, title: impl Into<String>) -> Self {
        Self {
            season: season.into(),
            sub_paths,
            title: title.into(),
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Media marker present and every component usable as a single local path segment.
    pub fn is_valid(&self) -> bool {
        is_media_name(&self.title)
            && is_safe_component(&self.season)
            && is_safe_component(&self.title)
            && self.sub_paths.iter().all(|p| is_safe_component(p))
    }
}

fn is_safe_component(component: &str) -> bool {
    !component.trim().is_empty()
        && component != "."
        && component != ".."
        && !component.contains(['/', '\\'])
}

/// A remote item ready to be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub item: RemoteItem,
    /// Pointer file content.
    pub url: String,
    /// Local base name, without the pointer extension.
    pub file_name: String,
}
