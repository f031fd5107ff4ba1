//! Run results, summary counts and the final report

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SmokeResult;
use crate::page::ConsoleEvent;

/// Console events listed in the rendered report before truncating
const CONSOLE_PREVIEW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Passed,
    Failed,
    Warning,
    Info,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::Warning => "WARNING",
            TestStatus::Info => "INFO",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            TestStatus::Passed => "✅",
            TestStatus::Failed => "❌",
            TestStatus::Warning | TestStatus::Info => "⚠️",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one check entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(rename = "test_name")]
    pub name: String,
    pub status: TestStatus,
    pub details: String,
    pub timestamp: DateTime<Local>,
    #[serde(rename = "screenshot")]
    pub screenshot_path: Option<PathBuf>,
}

impl TestResult {
    pub fn new(
        name: impl Into<String>,
        status: TestStatus,
        details: impl Into<String>,
        screenshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            details: details.into(),
            timestamp: Local::now(),
            screenshot_path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    /// WARNING and INFO together
    pub warnings: usize,
    pub screenshots: usize,
    pub console_errors: usize,
}

impl Summary {
    pub fn tally(results: &[TestResult], screenshots: usize, console_errors: usize) -> Self {
        let count = |wanted: &[TestStatus]| {
            results.iter().filter(|r| wanted.contains(&r.status)).count()
        };
        Self {
            total_tests: results.len(),
            passed: count(&[TestStatus::Passed]),
            failed: count(&[TestStatus::Failed]),
            warnings: count(&[TestStatus::Warning, TestStatus::Info]),
            screenshots,
            console_errors,
        }
    }

    pub fn overall(&self) -> OverallStatus {
        OverallStatus::classify(self.failed, self.total_tests)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    AllPassed,
    MostlyWorking,
    SignificantIssues,
}

impl OverallStatus {
    pub fn classify(failed: usize, total: usize) -> Self {
        if failed == 0 {
            OverallStatus::AllPassed
        } else if (failed as f64) < total as f64 / 2.0 {
            OverallStatus::MostlyWorking
        } else {
            OverallStatus::SignificantIssues
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            OverallStatus::AllPassed => "ALL TESTS PASSED",
            OverallStatus::MostlyWorking => "MOSTLY WORKING",
            OverallStatus::SignificantIssues => "SIGNIFICANT ISSUES",
        }
    }

    fn render(&self) -> String {
        match self {
            OverallStatus::AllPassed => {
                format!("✅ OVERALL STATUS: {}", self.headline().green().bold())
            }
            OverallStatus::MostlyWorking => format!(
                "⚠️  OVERALL STATUS: {} (some issues detected)",
                self.headline().yellow().bold()
            ),
            OverallStatus::SignificantIssues => {
                format!("❌ OVERALL STATUS: {} DETECTED", self.headline().red().bold())
            }
        }
    }
}

/// Everything a run produced, in the shape persisted to `test_report.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Local>,
    pub summary: Summary,
    pub test_results: Vec<TestResult>,
    pub console_errors: Vec<ConsoleEvent>,
    pub screenshots: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(
        test_results: Vec<TestResult>,
        console_errors: Vec<ConsoleEvent>,
        screenshots: Vec<PathBuf>,
    ) -> Self {
        let summary = Summary::tally(&test_results, screenshots.len(), console_errors.len());
        Self {
            timestamp: Local::now(),
            summary,
            test_results,
            console_errors,
            screenshots,
        }
    }

    pub fn overall(&self) -> OverallStatus {
        self.summary.overall()
    }

    /// Human-readable report
    pub fn render(&self, title: &str) -> String {
        let rule = "=".repeat(80);
        let s = &self.summary;
        let mut out = String::new();

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, " {}", title);
        let _ = writeln!(out, "{}", rule);

        let _ = writeln!(out, "\n📊 SUMMARY:");
        let _ = writeln!(out, "   Total Tests: {}", s.total_tests);
        let _ = writeln!(out, "   ✅ Passed: {}", s.passed);
        let _ = writeln!(out, "   ❌ Failed: {}", s.failed);
        let _ = writeln!(out, "   ⚠️  Warnings/Info: {}", s.warnings);
        let _ = writeln!(out, "   📸 Screenshots: {}", s.screenshots);
        let _ = writeln!(out, "   🐛 Console Errors: {}", s.console_errors);

        let _ = writeln!(out, "\n📝 DETAILED RESULTS:");
        for (i, result) in self.test_results.iter().enumerate() {
            let _ = writeln!(out, "\n{}. {} {}", i + 1, result.status.icon(), result.name);
            let _ = writeln!(out, "   Status: {}", colorize(result.status));
            let _ = writeln!(out, "   Details: {}", result.details);
            if let Some(path) = &result.screenshot_path {
                let _ = writeln!(out, "   Screenshot: {}", path.display());
            }
        }

        if !self.console_errors.is_empty() {
            let _ = writeln!(out, "\n🐛 CONSOLE ERRORS/WARNINGS:");
            for (i, event) in self.console_errors.iter().take(CONSOLE_PREVIEW).enumerate() {
                let _ = writeln!(out, "   {}. {}", i + 1, event);
            }
            if self.console_errors.len() > CONSOLE_PREVIEW {
                let hidden = self.console_errors.len() - CONSOLE_PREVIEW;
                let _ = writeln!(out, "   ... and {} more", hidden);
            }
        }

        let _ = writeln!(out, "\n📸 SCREENSHOTS TAKEN:");
        for path in &self.screenshots {
            let _ = writeln!(out, "   - {}", path.display());
        }

        let _ = writeln!(out, "\n{}", self.overall().render());
        let _ = writeln!(out, "\n{}", rule);
        out
    }

    /// Write the report as pretty JSON and return where it went
    pub fn write_json(&self, path: &Path) -> SmokeResult<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        info!("Report written to: {}", path.display());
        Ok(path.to_path_buf())
    }

    pub fn read_json(path: &Path) -> SmokeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn colorize(status: TestStatus) -> colored::ColoredString {
    match status {
        TestStatus::Passed => status.as_str().green(),
        TestStatus::Failed => status.as_str().red(),
        TestStatus::Warning => status.as_str().yellow(),
        TestStatus::Info => status.as_str().cyan(),
    }
}
