//! Tourcheck - smoke-test a running Passio Tour site
//!
//! Run with: tourcheck --base-url http://localhost:3000

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tourcheck_smoke::playwright::{Browser, PlaywrightConfig};
use tourcheck_smoke::{Credentials, RunnerConfig, SmokeRunner, SuiteConfig, Timeouts};

const REPORT_TITLE: &str = "PASSIO TOUR APPLICATION - COMPREHENSIVE TEST REPORT";

#[derive(Parser, Debug)]
#[command(name = "tourcheck")]
#[command(version, about = "Smoke-test a running Passio Tour site in a headless browser")]
struct Args {
    /// Base URL of the site under test
    #[arg(long, env = "TOURCHECK_BASE_URL", default_value = "http://localhost:3000")]
    base_url: String,

    /// Directory for screenshots and test_report.json
    #[arg(short, long, env = "TOURCHECK_OUTPUT_DIR", default_value = "test-results")]
    output_dir: PathBuf,

    /// Email used by the login check
    #[arg(long, env = "TOURCHECK_EMAIL", default_value = "admin@passiotour.com")]
    email: String,

    /// Password used by the login check
    #[arg(
        long,
        env = "TOURCHECK_PASSWORD",
        default_value = "Admin@123",
        hide_default_value = true,
        hide_env_values = true
    )]
    password: String,

    /// Browser engine
    #[arg(long, value_enum, default_value_t = Browser::Chromium)]
    browser: Browser,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Viewport width
    #[arg(long, default_value = "1920")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "1080")]
    viewport_height: u32,

    /// Wait up to this many seconds for the site to answer before launching the browser
    #[arg(long, value_name = "SECS")]
    wait_ready: Option<u64>,

    /// Exit with status 1 when any check failed
    #[arg(long)]
    fail_on_error: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> RunnerConfig {
        RunnerConfig {
            playwright: PlaywrightConfig {
                browser: self.browser,
                headless: !self.headed,
                viewport_width: self.viewport_width,
                viewport_height: self.viewport_height,
                ..Default::default()
            },
            suite: SuiteConfig {
                base_url: self.base_url,
                screenshot_dir: self.output_dir,
                credentials: Credentials {
                    email: self.email,
                    password: self.password,
                },
                timeouts: Timeouts::default(),
            },
            wait_ready: self.wait_ready.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match async_main(args).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> anyhow::Result<bool> {
    let fail_on_error = args.fail_on_error;
    let runner = SmokeRunner::with_config(args.into_config());

    info!("🚀 Starting smoke suite against {}", runner.config().suite.base_url);

    let report = runner.run().await.context("smoke run could not start")?;

    println!("\n{}", report.render(REPORT_TITLE));

    let path = runner
        .write_report(&report)
        .context("failed to write test report")?;
    println!("\n📄 Detailed JSON report saved to: {}", path.display());

    info!("✨ Test suite completed!");

    Ok(!(fail_on_error && report.summary.failed > 0))
}
