//! The fixed check sequence
//!
//! Every check records one or more [`TestResult`]s. A fault inside a check is
//! turned into a FAILED result at the check boundary and the sequence moves
//! on; nothing here ever returns an error to the caller of [`run_suite`].

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::config::{StaticRoute, SuiteConfig, STATIC_ROUTES};
use crate::error::SmokeResult;
use crate::locator::{EMAIL_INPUT, PASSWORD_INPUT, SUBMIT_BUTTON};
use crate::page::{Page, UrlWait};
use crate::report::{TestResult, TestStatus};

static ERROR_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)error|404|not found").expect("valid error page pattern"));

static NOT_FOUND_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)404|not found").expect("valid not found pattern"));

const ALERT: &str = r#"[role="alert"]"#;

/// Accumulates results and screenshot paths across the run
#[derive(Debug, Default)]
pub struct Recorder {
    results: Vec<TestResult>,
    screenshots: Vec<PathBuf>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        name: &str,
        status: TestStatus,
        details: impl Into<String>,
        screenshot: Option<PathBuf>,
    ) {
        let result = TestResult::new(name, status, details, screenshot);

        match result.status {
            TestStatus::Passed => info!("✓ {} - {}", result.name, result.details),
            TestStatus::Info => info!("ℹ {} - {}", result.name, result.details),
            TestStatus::Warning => warn!("⚠ {} - {}", result.name, result.details),
            TestStatus::Failed => error!("✗ {} - {}", result.name, result.details),
        }

        if let Some(path) = &result.screenshot_path {
            self.screenshots.push(path.clone());
        }
        self.results.push(result);
    }

    /// Convert a check's fault into a FAILED entry
    pub fn absorb(&mut self, name: &str, outcome: SmokeResult<()>) {
        if let Err(e) = outcome {
            self.record(name, TestStatus::Failed, format!("Error: {}", e), None);
        }
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    pub fn into_parts(self) -> (Vec<TestResult>, Vec<PathBuf>) {
        (self.results, self.screenshots)
    }
}

/// Run every check in order against one page
pub async fn run_suite(page: &dyn Page, config: &SuiteConfig, rec: &mut Recorder) {
    info!("🏠 Testing homepage...");
    let outcome = homepage(page, config, rec).await;
    rec.absorb("Homepage Test", outcome);

    info!("🔐 Testing login flow...");
    let outcome = login_flow(page, config, rec).await;
    rec.absorb("Login Flow Test", outcome);

    info!("📊 Testing dashboard...");
    let outcome = dashboard(page, config, rec).await;
    rec.absorb("Dashboard Test", outcome);

    info!("🎫 Testing tours page...");
    let outcome = tours_page(page, config, rec).await;
    rec.absorb("Tours Page Test", outcome);

    info!("📄 Testing static pages...");
    static_pages(page, config, rec).await;

    info!("📝 Testing register page...");
    let outcome = register_page(page, config, rec).await;
    rec.absorb("Register Page Test", outcome);
}

async fn capture(page: &dyn Page, path: PathBuf) -> SmokeResult<PathBuf> {
    page.screenshot(&path).await?;
    Ok(path)
}

/// Case-insensitive substring match, the way a text locator finds partial text
fn mentions(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(&needle.to_lowercase())
}

pub async fn homepage(
    page: &dyn Page,
    config: &SuiteConfig,
    rec: &mut Recorder,
) -> SmokeResult<()> {
    let nav = page.goto(&config.url(""), config.timeouts.navigation).await?;
    let shot = capture(page, config.screenshot_path(1, "homepage")).await?;

    if !nav.is_ok() {
        rec.record(
            "Homepage Load",
            TestStatus::Failed,
            format!("HTTP status: {}", nav.status_label()),
            Some(shot),
        );
        return Ok(());
    }

    let nav_present = page.count("nav").await? > 0;
    let body = page.body_text().await?;
    let sign_in = mentions(&body, "Sign In");
    let sign_up = mentions(&body, "Sign Up");
    let title = page.title().await?;

    let details = format!(
        "Title: '{}', Navigation: {}, Sign In button: {}, Sign Up button: {}",
        title, nav_present, sign_in, sign_up
    );

    if nav_present || sign_in || sign_up {
        rec.record("Homepage Test", TestStatus::Passed, details, Some(shot));
    } else {
        rec.record(
            "Homepage Test",
            TestStatus::Warning,
            format!("Missing expected elements. {}", details),
            Some(shot),
        );
    }
    Ok(())
}

pub async fn login_flow(
    page: &dyn Page,
    config: &SuiteConfig,
    rec: &mut Recorder,
) -> SmokeResult<()> {
    let timeouts = &config.timeouts;

    page.goto(&config.url("/login"), timeouts.navigation).await?;
    let shot = capture(page, config.screenshot_path(2, "login_page")).await?;
    rec.record("Login Page Load", TestStatus::Passed, "Login page loaded", Some(shot));

    page.settle(timeouts.settle).await;

    let email = EMAIL_INPUT.first_match(page).await?;
    let password = PASSWORD_INPUT.first_match(page).await?;
    let (Some(email), Some(password)) = (email, password) else {
        rec.record(
            "Login Form Fill",
            TestStatus::Failed,
            "Could not find email or password input fields",
            None,
        );
        return Ok(());
    };

    page.fill(email, &config.credentials.email).await?;
    page.fill(password, &config.credentials.password).await?;
    let shot = capture(page, config.screenshot_path(3, "login_filled")).await?;
    rec.record("Login Form Fill", TestStatus::Passed, "Filled login credentials", Some(shot));

    let Some(submit) = SUBMIT_BUTTON.first_match(page).await? else {
        rec.record("Login Submit", TestStatus::Failed, "Could not find Sign In button", None);
        return Ok(());
    };

    let before = page.url().await?;
    page.click(submit).await?;

    match page.wait_for_url_change(&before, timeouts.url_change).await? {
        UrlWait::Changed(url) => debug!("Login navigated to {}", url),
        UrlWait::TimedOut => debug!("No navigation within {:?} of submit", timeouts.url_change),
    }

    page.settle(timeouts.after_submit).await;
    let shot = capture(page, config.screenshot_path(4, "after_login")).await?;

    let final_url = page.url().await?;
    if !final_url.contains("login") {
        rec.record(
            "Login Flow",
            TestStatus::Passed,
            format!("Successfully redirected to: {}", final_url),
            Some(shot),
        );
        return Ok(());
    }

    let alerts = page.count(ALERT).await?;
    let error_visible = alerts > 0 || mentions(&page.body_text().await?, "error");

    if error_visible {
        let message = match alerts {
            0 => None,
            _ => page.text_content(ALERT).await?,
        }
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|| "Unknown error".to_string());

        rec.record(
            "Login Flow",
            TestStatus::Failed,
            format!("Login failed: {}", message),
            Some(shot),
        );
    } else {
        rec.record(
            "Login Flow",
            TestStatus::Warning,
            format!("Still on login page: {}", final_url),
            Some(shot),
        );
    }
    Ok(())
}

pub async fn dashboard(
    page: &dyn Page,
    config: &SuiteConfig,
    rec: &mut Recorder,
) -> SmokeResult<()> {
    page.goto(&config.url("/dashboard"), config.timeouts.navigation).await?;
    page.settle(config.timeouts.settle).await;
    let shot = capture(page, config.screenshot_path(5, "dashboard")).await?;

    if page.url().await?.contains("login") {
        rec.record(
            "Dashboard Test",
            TestStatus::Info,
            "Dashboard requires authentication - redirected to login",
            Some(shot),
        );
        return Ok(());
    }

    let title = page.title().await?;
    let length = page.content().await?.chars().count();
    rec.record(
        "Dashboard Test",
        TestStatus::Passed,
        format!("Dashboard loaded. Title: '{}', Content length: {} chars", title, length),
        Some(shot),
    );
    Ok(())
}

pub async fn tours_page(
    page: &dyn Page,
    config: &SuiteConfig,
    rec: &mut Recorder,
) -> SmokeResult<()> {
    let nav = page.goto(&config.url("/tours"), config.timeouts.navigation).await?;
    page.settle(config.timeouts.settle).await;
    let shot = capture(page, config.screenshot_path(6, "tours")).await?;

    let status = nav.status_label();
    let url = page.url().await?;
    let title = page.title().await?;

    if ERROR_PAGE.is_match(&page.body_text().await?) {
        rec.record(
            "Tours Page Test",
            TestStatus::Failed,
            format!("Page shows error. Status: {}", status),
            Some(shot),
        );
    } else if nav.is_ok() {
        rec.record(
            "Tours Page Test",
            TestStatus::Passed,
            format!("Tours page loaded. Title: '{}', URL: {}", title, url),
            Some(shot),
        );
    } else {
        rec.record(
            "Tours Page Test",
            TestStatus::Warning,
            format!("Status: {}, URL: {}", status, url),
            Some(shot),
        );
    }
    Ok(())
}

/// Each route is isolated on its own; one failing route does not stop the rest
pub async fn static_pages(page: &dyn Page, config: &SuiteConfig, rec: &mut Recorder) {
    for route in STATIC_ROUTES {
        let outcome = static_page(page, config, route, rec).await;
        rec.absorb(&format!("{} Page", route.name), outcome);
    }
}

async fn static_page(
    page: &dyn Page,
    config: &SuiteConfig,
    route: &StaticRoute,
    rec: &mut Recorder,
) -> SmokeResult<()> {
    let name = format!("{} Page", route.name);

    let nav = page.goto(&config.url(route.path), config.timeouts.navigation).await?;
    page.settle(config.timeouts.static_settle).await;

    let url = page.url().await?;
    let title = page.title().await?;

    let shot = if route.screenshot {
        let file = format!("static_{}", route.name.to_lowercase());
        Some(capture(page, config.screenshot_path(7, &file)).await?)
    } else {
        None
    };

    if NOT_FOUND_PAGE.is_match(&page.body_text().await?) {
        rec.record(
            &name,
            TestStatus::Warning,
            format!("Page may not exist (404). URL: {}", url),
            shot,
        );
    } else if nav.is_ok() {
        rec.record(&name, TestStatus::Passed, format!("Page loaded. Title: '{}'", title), shot);
    } else {
        rec.record(&name, TestStatus::Warning, format!("Status: {}", nav.status_label()), shot);
    }
    Ok(())
}

pub async fn register_page(
    page: &dyn Page,
    config: &SuiteConfig,
    rec: &mut Recorder,
) -> SmokeResult<()> {
    page.goto(&config.url("/register"), config.timeouts.navigation).await?;
    page.settle(config.timeouts.settle).await;
    let shot = capture(page, config.screenshot_path(8, "register")).await?;

    let form_present = page.count("form").await? > 0;
    let inputs = page.count("input").await?;
    let title = page.title().await?;

    let details = format!(
        "Title: '{}', Form present: {}, Input fields: {}",
        title, form_present, inputs
    );

    if form_present && inputs > 0 {
        rec.record("Register Page Test", TestStatus::Passed, details, Some(shot));
    } else {
        rec.record(
            "Register Page Test",
            TestStatus::Warning,
            format!("Form may be missing. {}", details),
            Some(shot),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_is_case_insensitive() {
        assert!(mentions("Welcome! SIGN IN to continue", "Sign In"));
        assert!(!mentions("Welcome", "Sign Up"));
    }

    #[test]
    fn test_error_patterns() {
        assert!(ERROR_PAGE.is_match("Something went wrong: Error loading tours"));
        assert!(ERROR_PAGE.is_match("404"));
        assert!(!ERROR_PAGE.is_match("Explore our tours"));

        assert!(NOT_FOUND_PAGE.is_match("Page Not Found"));
        assert!(!NOT_FOUND_PAGE.is_match("Error boundary"));
    }

    #[test]
    fn test_absorb_records_failure_only_on_error() {
        let mut rec = Recorder::new();
        rec.absorb("Fine", Ok(()));
        let refused = crate::error::SmokeError::Navigation("net::ERR_CONNECTION_REFUSED".into());
        rec.absorb("Broken", Err(refused));

        assert_eq!(rec.results().len(), 1);
        let result = &rec.results()[0];
        assert_eq!(result.name, "Broken");
        assert_eq!(result.status, TestStatus::Failed);
        assert!(result.details.starts_with("Error: Navigation failed"));
        assert!(rec.screenshots().is_empty());
    }
}
