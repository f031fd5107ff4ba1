//! Suite configuration: target, credentials, routes and wait budgets

use std::path::PathBuf;
use std::time::Duration;

/// Route visited by the static pages check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticRoute {
    pub path: &'static str,
    pub name: &'static str,
    pub screenshot: bool,
}

pub const STATIC_ROUTES: &[StaticRoute] = &[
    StaticRoute { path: "/about", name: "About", screenshot: true },
    StaticRoute { path: "/contact", name: "Contact", screenshot: true },
    StaticRoute { path: "/privacy", name: "Privacy", screenshot: false },
    StaticRoute { path: "/terms", name: "Terms", screenshot: false },
    StaticRoute { path: "/faq", name: "FAQ", screenshot: true },
];

/// Login used by the login flow check. The target application owns the account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "admin@passiotour.com".to_string(),
            password: "Admin@123".to_string(),
        }
    }
}

/// Wait budgets. Every one of them is best-effort.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Page navigation, including the network idle wait
    pub navigation: Duration,

    /// URL change after submitting the login form
    pub url_change: Duration,

    /// Settle delay after most navigations
    pub settle: Duration,

    /// Settle delay after the login submit
    pub after_submit: Duration,

    /// Settle delay between static pages
    pub static_settle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(10),
            url_change: Duration::from_secs(5),
            settle: Duration::from_secs(1),
            after_submit: Duration::from_secs(2),
            static_settle: Duration::from_millis(500),
        }
    }
}

/// What the check sequence needs to know about the target and outputs
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub credentials: Credentials,
    pub timeouts: Timeouts,
}

impl SuiteConfig {
    /// Absolute URL for a route on the target
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Copy with `screenshot_dir` anchored to the current directory
    ///
    /// The driver runs from its own working directory, so relative paths
    /// handed to it would resolve somewhere else.
    pub fn with_absolute_output(&self) -> std::io::Result<SuiteConfig> {
        let mut suite = self.clone();
        if suite.screenshot_dir.is_relative() {
            suite.screenshot_dir = std::env::current_dir()?.join(&self.screenshot_dir);
        }
        Ok(suite)
    }

    /// Screenshot location following `test_NN_<name>.png`
    pub fn screenshot_path(&self, seq: u8, name: &str) -> PathBuf {
        self.screenshot_dir.join(format!("test_{:02}_{}.png", seq, name))
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            screenshot_dir: PathBuf::from("test-results"),
            credentials: Credentials::default(),
            timeouts: Timeouts::default(),
        }
    }
}
