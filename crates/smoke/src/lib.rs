//! Tourcheck smoke suite
//!
//! Drives a headless browser through a fixed list of routes on a running
//! Passio Tour site and reports what it saw:
//! - Controls Playwright through a long-lived Node driver process
//! - Runs six checks in a fixed order, isolating faults per check
//! - Captures full-page screenshots along the way
//! - Renders a console summary and writes `test_report.json`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SmokeRunner (Rust)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  wait_until_reachable(base_url)          (optional)         │
//! │  PlaywrightHandle::launch() ──────► node driver.js          │
//! │    │   JSON lines on stdin/stdout        └─ browser/page    │
//! │    │   console events ──► shared list                      │
//! │  run_suite(&dyn Page, &SuiteConfig, &mut Recorder)          │
//! │    ├── homepage       /                                     │
//! │    ├── login_flow     /login                                │
//! │    ├── dashboard      /dashboard                            │
//! │    ├── tours_page     /tours                                │
//! │    ├── static_pages   /about /contact /privacy /terms /faq  │
//! │    └── register_page  /register                             │
//! │  PlaywrightHandle::close() -> Vec<ConsoleEvent>             │
//! │  RunReport::new(results, console, screenshots)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod checks;
pub mod config;
pub mod error;
pub mod locator;
pub mod page;
pub mod playwright;
pub mod readiness;
pub mod report;
pub mod runner;

pub use checks::{run_suite, Recorder};
pub use config::{Credentials, SuiteConfig, Timeouts};
pub use error::{SmokeError, SmokeResult};
pub use page::{ConsoleEvent, Navigation, Page, UrlWait};
pub use report::{OverallStatus, RunReport, Summary, TestResult, TestStatus};
pub use runner::{RunnerConfig, SmokeRunner};
