//! Scripted in-memory page used by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use tourcheck_smoke::{
    ConsoleEvent, Navigation, Page, SmokeError, SmokeResult, SuiteConfig, Timeouts, UrlWait,
};

pub const BASE: &str = "https://host";

/// What a route renders
#[derive(Debug, Clone, Default)]
pub struct FakeRoute {
    status: Option<u16>,
    redirect: Option<String>,
    title: String,
    html: String,
    body: String,
    counts: HashMap<String, usize>,
    texts: HashMap<String, String>,
    on_submit: Option<String>,
    failure: Option<String>,
}

impl FakeRoute {
    pub fn ok(title: &str, body: &str) -> Self {
        Self {
            status: Some(200),
            title: title.to_string(),
            html: format!(
                "<html><head><title>{}</title></head><body>{}</body></html>",
                title, body
            ),
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn no_response(mut self) -> Self {
        self.status = None;
        self
    }

    pub fn redirect(mut self, path: &str) -> Self {
        self.redirect = Some(path.to_string());
        self
    }

    pub fn with(mut self, selector: &str, count: usize) -> Self {
        self.counts.insert(selector.to_string(), count);
        self
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.counts.entry(selector.to_string()).or_insert(1);
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    /// Clicking anything on this page navigates to `path`
    pub fn on_submit(mut self, path: &str) -> Self {
        self.on_submit = Some(path.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct State {
    url: String,
    current: FakeRoute,
    visited: Vec<String>,
    filled: Vec<(String, String)>,
    clicked: Vec<String>,
    screenshots: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct FakePage {
    routes: HashMap<String, FakeRoute>,
    console: Vec<ConsoleEvent>,
    state: Mutex<State>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, route: FakeRoute) -> Self {
        self.routes.insert(path.to_string(), route);
        self
    }

    pub fn console(mut self, level: &str, text: &str) -> Self {
        self.console.push(ConsoleEvent { level: level.to_string(), text: text.to_string() });
        self
    }

    /// Events the browser would hand back on close
    pub fn console_events(&self) -> Vec<ConsoleEvent> {
        self.console.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().visited.clone()
    }

    pub fn filled(&self) -> Vec<(String, String)> {
        self.state.lock().filled.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().screenshots.clone()
    }

    fn path_of(url: &str) -> String {
        let path = url.strip_prefix(BASE).unwrap_or(url);
        let path = path.split('?').next().unwrap_or_default();
        if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        }
    }

    fn current(&self) -> FakeRoute {
        self.state.lock().current.clone()
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> SmokeResult<Navigation> {
        let path = Self::path_of(url);
        let route = self
            .routes
            .get(&path)
            .cloned()
            .ok_or_else(|| {
                SmokeError::Navigation(format!("net::ERR_CONNECTION_REFUSED at {}", url))
            })?;

        if let Some(message) = &route.failure {
            return Err(SmokeError::Navigation(message.clone()));
        }

        let final_url = match &route.redirect {
            Some(target) => format!("{}{}", BASE, target),
            None => url.to_string(),
        };

        let mut state = self.state.lock();
        state.visited.push(path);
        state.url = final_url.clone();
        state.current = route.clone();

        Ok(Navigation { status: route.status, url: final_url })
    }

    async fn url(&self) -> SmokeResult<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn title(&self) -> SmokeResult<String> {
        Ok(self.current().title)
    }

    async fn content(&self) -> SmokeResult<String> {
        Ok(self.current().html)
    }

    async fn body_text(&self) -> SmokeResult<String> {
        Ok(self.current().body)
    }

    async fn count(&self, selector: &str) -> SmokeResult<usize> {
        Ok(self.current().counts.get(selector).copied().unwrap_or(0))
    }

    async fn text_content(&self, selector: &str) -> SmokeResult<Option<String>> {
        let current = self.current();
        if current.counts.get(selector).copied().unwrap_or(0) == 0 {
            return Ok(None);
        }
        Ok(Some(current.texts.get(selector).cloned().unwrap_or_default()))
    }

    async fn fill(&self, selector: &str, value: &str) -> SmokeResult<()> {
        self.state.lock().filled.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> SmokeResult<()> {
        let mut state = self.state.lock();
        state.clicked.push(selector.to_string());
        if let Some(target) = state.current.on_submit.clone() {
            state.url = format!("{}{}", BASE, target);
            if let Some(route) = self.routes.get(&Self::path_of(&target)) {
                state.current = route.clone();
            }
        }
        Ok(())
    }

    async fn wait_for_url_change(&self, from: &str, _timeout: Duration) -> SmokeResult<UrlWait> {
        let url = self.state.lock().url.clone();
        if url != from {
            Ok(UrlWait::Changed(url))
        } else {
            Ok(UrlWait::TimedOut)
        }
    }

    async fn screenshot(&self, path: &Path) -> SmokeResult<()> {
        self.state.lock().screenshots.push(path.to_path_buf());
        Ok(())
    }
}

/// Suite config pointing at the fake host with no settle delays
pub fn suite_config(screenshot_dir: &Path) -> SuiteConfig {
    SuiteConfig {
        base_url: BASE.to_string(),
        screenshot_dir: screenshot_dir.to_path_buf(),
        timeouts: Timeouts {
            navigation: Duration::from_secs(10),
            url_change: Duration::ZERO,
            settle: Duration::ZERO,
            after_submit: Duration::ZERO,
            static_settle: Duration::ZERO,
        },
        ..Default::default()
    }
}

/// A login page with the usual inputs and a submit button
pub fn login_form(title: &str, body: &str) -> FakeRoute {
    FakeRoute::ok(title, body)
        .with(r#"input[type="email"]"#, 1)
        .with(r#"input[type="password"]"#, 1)
        .with(r#"button[type="submit"]"#, 1)
}

/// A site where every check passes
pub fn healthy_site() -> FakePage {
    FakePage::new()
        .route("/", FakeRoute::ok("Passio Tour", "Home Tours Sign In Sign Up").with("nav", 1))
        .route("/login", login_form("Sign in", "Email Password").on_submit("/dashboard"))
        .route("/dashboard", FakeRoute::ok("Dashboard", "Welcome back, admin"))
        .route("/tours", FakeRoute::ok("Tours", "Explore our tours"))
        .route("/about", FakeRoute::ok("About", "About us"))
        .route("/contact", FakeRoute::ok("Contact", "Get in touch"))
        .route("/privacy", FakeRoute::ok("Privacy", "Privacy policy"))
        .route("/terms", FakeRoute::ok("Terms", "Terms of service"))
        .route("/faq", FakeRoute::ok("FAQ", "Frequently asked questions"))
        .route(
            "/register",
            FakeRoute::ok("Register", "Create account").with("form", 1).with("input", 4),
        )
}
