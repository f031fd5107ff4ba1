//! Error types for the smoke runner

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmokeError {
    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Playwright driver exited unexpectedly")]
    DriverExited,

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Target not reachable after {attempts} attempts: {url}")]
    Unreachable { url: String, attempts: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type SmokeResult<T> = Result<T, SmokeError>;
