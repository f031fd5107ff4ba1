//! Readiness probe for the target site
//!
//! Polls the base URL until the server answers at all. Any HTTP status counts
//! as reachable; judging the response is the homepage check's job.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{SmokeError, SmokeResult};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Wait until `base_url` accepts HTTP requests, giving up after `budget`
pub async fn wait_until_reachable(base_url: &str, budget: Duration) -> SmokeResult<u16> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                info!("Target reachable at {} (HTTP {})", base_url, status);
                return Ok(status);
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to come up...", base_url);
                }
                // Refused connections are expected while the server is starting
                if !e.is_connect() {
                    debug!("Readiness probe error: {}", e);
                }
            }
        }

        if start.elapsed() + POLL_INTERVAL > budget {
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    Err(SmokeError::Unreachable {
        url: base_url.to_string(),
        attempts,
    })
}
