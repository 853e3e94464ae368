use anyhow::Result;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Settings;

/// Seam between the sync engine and the remote file server.
pub trait CatalogSource {
    /// Raw entry names of the directory addressed by decoded `segments`.
    fn list_directory(&self, segments: &[String]) -> Result<Vec<String>>;

    /// Body of the feed of recently published files.
    fn fetch_feed(&self) -> Result<String>;
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}")]
    Status {
        url: String,
        status: StatusCode,
    },
    #[error("{url} returned an unreadable listing: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    files: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
}

/// Blocking client for the file server's listing API and its feed.
#[derive(Debug, Clone)]
pub struct AniClient {
    client: Client,
    base_url: String,
    feed_url: String,
}

impl AniClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout());

        if let Some(proxy) = settings.proxy.as_deref().filter(|p| !p.is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: settings.base_url.clone(),
            feed_url: settings.feed_url.clone(),
        })
    }

    /// The listing API only answers POST.
    fn listing_request(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    fn send(&self, url: &str, request: RequestBuilder) -> Result<String, RemoteError> {
        let response = request.send().map_err(|source| http_error(url, source))?;
        check_status(url, response.status())?;
        response.text().map_err(|source| http_error(url, source))
    }
}

impl CatalogSource for AniClient {
    fn list_directory(&self, segments: &[String]) -> Result<Vec<String>> {
        let url = directory_url(&self.base_url, segments);
        let body = self.send(&url, self.listing_request(&url))?;
        Ok(parse_listing(&url, &body)?)
    }

    fn fetch_feed(&self) -> Result<String> {
        let url = &self.feed_url;
        Ok(self.send(url, self.client.get(url))?)
    }
}

fn check_status(url: &str, status: StatusCode) -> Result<(), RemoteError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(RemoteError::Status {
            url: url.to_string(),
            status,
        })
    }
}

fn http_error(url: &str, source: reqwest::Error) -> RemoteError {
    RemoteError::Http {
        url: url.to_string(),
        source,
    }
}

/// Listing endpoint for a directory; every segment is percent-encoded and the
/// path always ends with `/`.
pub fn directory_url(base_url: &str, segments: &[String]) -> String {
    let mut url = ensure_trailing_slash(base_url);
    for segment in segments {
        url.push_str(&urlencoding::encode(segment));
        url.push('/');
    }
    url
}

pub fn ensure_trailing_slash(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    }
}

/// Entry names of a listing body, decoded back to their readable form.
fn parse_listing(url: &str, body: &str) -> Result<Vec<String>, RemoteError> {
    let listing: ListingResponse =
        serde_json::from_str(body).map_err(|source| RemoteError::Decode {
            url: url.to_string(),
            source,
        })?;

    Ok(listing
        .files
        .into_iter()
        .map(|entry| decode_component(&entry.name))
        .collect())
}

/// Percent-decodes a path component, leaving it untouched when the result
/// would not be valid UTF-8.
pub fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
