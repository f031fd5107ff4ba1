//! Main runner: browser lifecycle, check sequence and report

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::checks::{run_suite, Recorder};
use crate::config::SuiteConfig;
use crate::error::SmokeResult;
use crate::playwright::{PlaywrightConfig, PlaywrightHandle};
use crate::readiness::wait_until_reachable;
use crate::report::RunReport;

pub const REPORT_FILE: &str = "test_report.json";

/// Configuration for the runner
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub suite: SuiteConfig,

    /// Probe the base URL for this long before launching the browser
    pub wait_ready: Option<Duration>,
}

pub struct SmokeRunner {
    config: RunnerConfig,
}

impl SmokeRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the full suite and collect the report
    ///
    /// Errors only when the session cannot be set up. Once the browser is
    /// open every check runs and the browser is closed before returning.
    pub async fn run(&self) -> SmokeResult<RunReport> {
        let suite = self.config.suite.with_absolute_output()?;
        std::fs::create_dir_all(&suite.screenshot_dir)?;

        if let Some(budget) = self.config.wait_ready {
            if let Err(e) = wait_until_reachable(&suite.base_url, budget).await {
                warn!("{} - running checks anyway", e);
            }
        }

        let browser = PlaywrightHandle::launch(&self.config.playwright).await?;

        let mut recorder = Recorder::new();
        run_suite(&browser, &suite, &mut recorder).await;

        let console = browser.close().await;
        let (results, screenshots) = recorder.into_parts();

        info!("Run finished: {} result(s), {} console event(s)", results.len(), console.len());
        Ok(RunReport::new(results, console, screenshots))
    }

    pub fn report_path(&self) -> PathBuf {
        self.config.suite.screenshot_dir.join(REPORT_FILE)
    }

    /// Write the report to `test_report.json` in the output directory
    pub fn write_report(&self, report: &RunReport) -> SmokeResult<PathBuf> {
        report.write_json(&self.report_path())
    }
}

impl Default for SmokeRunner {
    fn default() -> Self {
        Self::new()
    }
}
