//! The browser surface the checks talk to
//!
//! Checks only ever see `&dyn Page`. The Playwright driver implements it for
//! real runs; tests script it in memory.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SmokeResult;

/// Outcome of a page navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    /// HTTP status of the main document, `None` when the driver saw no response
    pub status: Option<u16>,

    /// URL the page ended up on after redirects
    pub url: String,
}

impl Navigation {
    pub fn is_ok(&self) -> bool {
        self.status == Some(200)
    }

    /// Status rendered for report details
    pub fn status_label(&self) -> String {
        match self.status {
            Some(code) => code.to_string(),
            None => "No response".to_string(),
        }
    }
}

/// Outcome of waiting for the URL to move away from a known value
///
/// Expiry of the wait is an expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlWait {
    Changed(String),
    TimedOut,
}

/// A console message of level `error` or `warning` emitted by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEvent {
    pub level: String,
    pub text: String,
}

impl fmt::Display for ConsoleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.to_uppercase(), self.text)
    }
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for network idle, bounded by `timeout`
    async fn goto(&self, url: &str, timeout: Duration) -> SmokeResult<Navigation>;

    async fn url(&self) -> SmokeResult<String>;

    async fn title(&self) -> SmokeResult<String>;

    /// Serialized HTML of the current document
    async fn content(&self) -> SmokeResult<String>;

    /// Rendered text of the document body
    async fn body_text(&self) -> SmokeResult<String>;

    /// Number of elements matching a Playwright selector
    async fn count(&self, selector: &str) -> SmokeResult<usize>;

    /// Text content of the first match, `None` when nothing matches
    async fn text_content(&self, selector: &str) -> SmokeResult<Option<String>>;

    /// Fill the first element matching `selector`
    async fn fill(&self, selector: &str, value: &str) -> SmokeResult<()>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str) -> SmokeResult<()>;

    async fn wait_for_url_change(&self, from: &str, timeout: Duration) -> SmokeResult<UrlWait>;

    /// Full-page screenshot written to `path`
    async fn screenshot(&self, path: &Path) -> SmokeResult<()>;

    /// Fixed delay to let client-side rendering finish
    async fn settle(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
