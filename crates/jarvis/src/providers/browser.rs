use std::sync::Arc;

use async_trait::async_trait;

use super::Opener;
use crate::capabilities::{BrowserControl, CapabilityReply, CapabilityResult};

pub fn google_search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", urlencoding::encode(query))
}

pub fn youtube_search_url(query: &str) -> String {
    format!(
        "https://www.youtube.com/results?search_query={}",
        urlencoding::encode(query)
    )
}

/// Opens pages in the default browser
#[derive(Clone)]
pub struct WebBrowser {
    opener: Arc<dyn Opener>,
}

impl WebBrowser {
    pub fn new(opener: Arc<dyn Opener>) -> Self {
        Self { opener }
    }
}

#[async_trait]
impl BrowserControl for WebBrowser {
    async fn open_url(&self, url: &str) -> CapabilityResult {
        let url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        };

        match self.opener.open(&url) {
            Ok(()) => {
                tracing::info!("Opened URL: {}", url);
                Ok(CapabilityReply::ok(format!("Opening {}", url)))
            }
            Err(e) => {
                tracing::error!("Failed to open URL {}: {}", url, e);
                Ok(CapabilityReply::failed("Couldn't open that link. 😅"))
            }
        }
    }

    async fn google_search(&self, query: &str) -> CapabilityResult {
        match self.opener.open(&google_search_url(query)) {
            Ok(()) => {
                tracing::info!("Google search: {}", query);
                Ok(CapabilityReply::ok(format!("Searching Google for '{}'", query)))
            }
            Err(e) => {
                tracing::error!("Search failed: {}", e);
                Ok(CapabilityReply::failed("Search didn't work. Try again?"))
            }
        }
    }

    async fn youtube_search(&self, query: &str) -> CapabilityResult {
        match self.opener.open(&youtube_search_url(query)) {
            Ok(()) => {
                tracing::info!("YouTube search: {}", query);
                Ok(CapabilityReply::ok(format!(
                    "Looking up '{}' on YouTube 🔥",
                    query
                )))
            }
            Err(e) => {
                tracing::error!("YouTube search failed: {}", e);
                Ok(CapabilityReply::failed("Couldn't search YouTube. 😅"))
            }
        }
    }
}
