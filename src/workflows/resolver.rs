use crate::domain::models::{RemoteItem, ResolvedItem};
use crate::infra::ani::{decode_component, ensure_trailing_slash};

const LOCAL_NAME_SEPARATOR: &str = " - ";
const DELIVERY_FLAG: &str = "?d=true";

/// Maps remote items to pointer content and local file names. Pure: the same
/// item always resolves to the same output.
#[derive(Debug, Clone)]
pub struct Resolver {
    base_url: String,
}

impl Resolver {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: ensure_trailing_slash(base_url),
        }
    }

    pub fn resolve(&self, item: RemoteItem) -> ResolvedItem {
        let url = match &item.source_url {
            Some(source_url) => decode_component(source_url),
            None => self.synthesize_url(&item),
        };
        let file_name = local_file_name(&item);
        ResolvedItem {
            item,
            url,
            file_name,
        }
    }

    /// Percent-encoded download URL for an item found by walking the tree.
    pub fn synthesize_url(&self, item: &RemoteItem) -> String {
        let mut url = self.base_url.clone();
        for component in std::iter::once(&item.season).chain(&item.sub_paths) {
            url.push_str(&urlencoding::encode(component));
            url.push('/');
        }
        url.push_str(&urlencoding::encode(&item.title));
        url.push_str(DELIVERY_FLAG);
        url
    }
}

/// Sub-paths are flattened into a prefix, so every pointer sits directly in
/// its season directory.
pub fn local_file_name(item: &RemoteItem) -> String {
    if item.sub_paths.is_empty() {
        item.title.clone()
    } else {
        format!(
            "{}{LOCAL_NAME_SEPARATOR}{}",
            item.sub_paths.join(LOCAL_NAME_SEPARATOR),
            item.title
        )
    }
}
