//! Playwright browser automation
//!
//! A generated Node script owns the browser, context and page for the whole
//! run. Rust talks to it over stdin/stdout with one JSON object per line:
//!
//! ```text
//! -> {"id":3,"op":"goto","url":"http://localhost:3000/login","timeout_ms":10000}
//! <- {"id":3,"ok":true,"value":{"status":200,"url":"http://localhost:3000/login"}}
//! <- {"event":"console","level":"error","text":"Failed to load resource"}
//! ```
//!
//! Console events arrive at any time and are collected by the reader task.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command as TokioCommand};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{SmokeError, SmokeResult};
use crate::page::{ConsoleEvent, Navigation, Page, UrlWait};

const DRIVER_TEMPLATE: &str = r#"
const playwrightPath = require.resolve('playwright', { paths: [process.cwd()] });
const { chromium, firefox, webkit } = require(playwrightPath);
const readline = require('readline');

const settings = __SETTINGS__;
const emit = (message) => process.stdout.write(JSON.stringify(message) + '\n');

(async () => {
  let browser;
  let context;
  let page;
  try {
    const engine = { chromium, firefox, webkit }[settings.browser];
    browser = await engine.launch({ headless: settings.headless });
    context = await browser.newContext({
      viewport: { width: settings.viewport_width, height: settings.viewport_height },
      userAgent: settings.user_agent,
    });
    page = await context.newPage();
  } catch (error) {
    emit({ id: 0, ok: false, error: error.message });
    process.exit(1);
  }

  page.on('console', (msg) => {
    const level = msg.type();
    if (level === 'error' || level === 'warning') {
      emit({ event: 'console', level, text: msg.text() });
    }
  });

  const ops = {
    goto: async (c) => {
      const response = await page.goto(c.url, { waitUntil: 'networkidle', timeout: c.timeout_ms });
      return { status: response ? response.status() : null, url: page.url() };
    },
    url: async () => page.url(),
    title: async () => page.title(),
    content: async () => page.content(),
    body_text: async () => page.evaluate(() => (document.body ? document.body.innerText : '')),
    count: async (c) => page.locator(c.selector).count(),
    text_content: async (c) => {
      const locator = page.locator(c.selector);
      return (await locator.count()) > 0 ? locator.first().textContent() : null;
    },
    fill: async (c) => {
      await page.locator(c.selector).first().fill(c.value);
      return null;
    },
    click: async (c) => {
      await page.locator(c.selector).first().click();
      return null;
    },
    wait_for_url_change: async (c) => {
      try {
        await page.waitForURL((url) => url.toString() !== c.from, { timeout: c.timeout_ms });
        return { changed: true, url: page.url() };
      } catch (error) {
        if (error.name === 'TimeoutError') {
          return { changed: false, url: page.url() };
        }
        // Anything else (e.g. a post-submit navigation that crashed) is
        // reported, and the login check records it as a failure.
        throw error;
      }
    },
    screenshot: async (c) => {
      await page.screenshot({ path: c.path, fullPage: true });
      return null;
    },
    close: async () => {
      await context.close();
      await browser.close();
      return null;
    },
  };

  emit({ id: 0, ok: true, value: null });

  const input = readline.createInterface({ input: process.stdin });
  for await (const line of input) {
    if (!line.trim()) continue;
    const command = JSON.parse(line);
    try {
      const handler = ops[command.op];
      if (!handler) throw new Error(`unknown op: ${command.op}`);
      const value = await handler(command);
      emit({ id: command.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      emit({ id: command.id, ok: false, error: error.message });
    }
    if (command.op === 'close') break;
  }

  if (browser.isConnected()) {
    await browser.close();
  }
  process.exit(0);
})();
"#;

const RESOLVE_PLAYWRIGHT: &str = "require.resolve('playwright', { paths: [process.cwd()] })";

/// Id the driver uses for its launch handshake
const READY_ID: u64 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,

    /// Directory `playwright` is resolved from
    pub working_dir: PathBuf,

    /// Budget for browser startup
    pub launch_timeout: Duration,

    /// Upper bound on any single driver round trip
    pub request_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
            working_dir: PathBuf::from("."),
            launch_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Serialize)]
struct LaunchSettings<'a> {
    browser: Browser,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    user_agent: &'a str,
}

/// Render the driver script for a configuration
pub fn build_driver_script(config: &PlaywrightConfig) -> SmokeResult<String> {
    let settings = serde_json::to_string(&LaunchSettings {
        browser: config.browser,
        headless: config.headless,
        viewport_width: config.viewport_width,
        viewport_height: config.viewport_height,
        user_agent: &config.user_agent,
    })?;
    Ok(DRIVER_TEMPLATE.replace("__SETTINGS__", &settings))
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverCommand<'a> {
    Goto { url: &'a str, timeout_ms: u64 },
    Url,
    Title,
    Content,
    BodyText,
    Count { selector: &'a str },
    TextContent { selector: &'a str },
    Fill { selector: &'a str, value: &'a str },
    Click { selector: &'a str },
    WaitForUrlChange { from: &'a str, timeout_ms: u64 },
    Screenshot { path: &'a str },
    Close,
}

impl DriverCommand<'_> {
    fn encode(&self, id: u64) -> SmokeResult<String> {
        let mut message = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut message {
            map.insert("id".to_string(), Value::from(id));
        }
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DriverMessage {
    Response(DriverResponse),
    Event(DriverEvent),
}

#[derive(Debug, Deserialize)]
struct DriverResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

impl DriverResponse {
    fn into_result(self) -> SmokeResult<Value> {
        if self.ok {
            Ok(self.value)
        } else {
            Err(SmokeError::Playwright(
                self.error.unwrap_or_else(|| "unknown driver error".to_string()),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum DriverEvent {
    Console { level: String, text: String },
}

#[derive(Debug, Deserialize)]
struct UrlChange {
    changed: bool,
    url: String,
}

struct DriverIo<W = ChildStdin> {
    stdin: W,
    responses: mpsc::UnboundedReceiver<DriverResponse>,
    next_id: u64,
}

impl<W> DriverIo<W> {
    async fn receive(&mut self, id: u64, timeout: Duration) -> SmokeResult<DriverResponse> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.responses.recv()).await {
                Err(_) => return Err(SmokeError::Timeout(format!("driver response #{}", id))),
                Ok(None) => return Err(SmokeError::DriverExited),
                Ok(Some(response)) if response.id == id => return Ok(response),
                Ok(Some(response)) => debug!("Discarding stale driver response #{}", response.id),
            }
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    child: Child,
    io: AsyncMutex<DriverIo>,
    console: Arc<Mutex<Vec<ConsoleEvent>>>,
    reader: JoinHandle<()>,
    request_timeout: Duration,
    browser: Browser,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightHandle {
    /// Start the driver and wait until the page is open
    pub async fn launch(config: &PlaywrightConfig) -> SmokeResult<Self> {
        Self::check_playwright_installed(&config.working_dir, config.launch_timeout).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, build_driver_script(config)?)?;

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SmokeError::Launch(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SmokeError::Launch("driver stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SmokeError::Launch("driver stdout not captured".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let console = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_driver_output(stdout, tx, Arc::clone(&console)));

        let mut io = DriverIo { stdin, responses: rx, next_id: READY_ID };
        io.receive(READY_ID, config.launch_timeout)
            .await
            .and_then(DriverResponse::into_result)
            .map_err(|e| SmokeError::Launch(e.to_string()))?;

        info!(
            "Launched {} ({}x{}, headless: {})",
            config.browser.as_str(),
            config.viewport_width,
            config.viewport_height,
            config.headless
        );

        Ok(Self {
            child,
            io: AsyncMutex::new(io),
            console,
            reader,
            request_timeout: config.request_timeout,
            browser: config.browser,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    ///
    /// Resolves the package exactly the way the driver does, from
    /// `working_dir`, so nothing is fetched from the registry.
    async fn check_playwright_installed(working_dir: &Path, timeout: Duration) -> SmokeResult<()> {
        let mut probe = TokioCommand::new("node");
        probe
            .args(["-e", RESOLVE_PLAYWRIGHT])
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(timeout, probe.status()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(_) => Err(SmokeError::PlaywrightNotFound),
            Err(_) => {
                warn!("Resolving playwright took longer than {:?}", timeout);
                Err(SmokeError::PlaywrightNotFound)
            }
        }
    }

    async fn request(&self, command: DriverCommand<'_>) -> SmokeResult<Value> {
        let mut io = self.io.lock().await;
        io.next_id += 1;
        let id = io.next_id;
        let line = command.encode(id)?;

        io.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|_| SmokeError::DriverExited)?;
        io.stdin.flush().await.map_err(|_| SmokeError::DriverExited)?;

        io.receive(id, self.request_timeout).await?.into_result()
    }

    /// Close the browser and return every console event seen during the session
    ///
    /// The reader task is joined before returning, so events emitted right
    /// before shutdown are included.
    pub async fn close(self) -> Vec<ConsoleEvent> {
        if let Err(e) = self.request(DriverCommand::Close).await {
            warn!("Browser did not close cleanly: {}", e);
        }

        let PlaywrightHandle { mut child, io, console, reader, browser, .. } = self;
        drop(io);

        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright driver exited with {}", status),
            _ => terminate(&mut child).await,
        }

        if let Err(e) = reader.await {
            warn!("Driver reader task failed: {}", e);
        }

        info!("Closed {}", browser.as_str());
        let events = std::mem::take(&mut *console.lock());
        events
    }
}

/// SIGTERM first, then kill if it is still around
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(Duration::from_millis(500), child.wait()).await.is_ok()
            {
                return;
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!("Failed to kill Playwright driver: {}", e);
    }
}

fn parse_driver_line(line: &str) -> Option<DriverMessage> {
    serde_json::from_str(line).ok()
}

async fn read_driver_output<R>(
    stdout: R,
    responses: mpsc::UnboundedSender<DriverResponse>,
    console: Arc<Mutex<Vec<ConsoleEvent>>>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_driver_line(&line) {
                Some(DriverMessage::Response(response)) => {
                    // The receiver is gone once the handle has closed
                    let _ = responses.send(response);
                }
                Some(DriverMessage::Event(DriverEvent::Console { level, text })) => {
                    info!("Console {}: {}", level, text);
                    console.lock().push(ConsoleEvent { level, text });
                }
                None if line.trim().is_empty() => {}
                None => debug!("[driver] {}", line),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read driver output: {}", e);
                break;
            }
        }
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[driver stderr] {}", line);
    }
}

fn as_navigation_error(e: SmokeError) -> SmokeError {
    match e {
        SmokeError::Playwright(message) => SmokeError::Navigation(message),
        other => other,
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[async_trait]
impl Page for PlaywrightHandle {
    async fn goto(&self, url: &str, timeout: Duration) -> SmokeResult<Navigation> {
        debug!("Navigating to {}", url);
        let value = self
            .request(DriverCommand::Goto { url, timeout_ms: millis(timeout) })
            .await
            .map_err(as_navigation_error)?;
        Ok(serde_json::from_value(value)?)
    }

    async fn url(&self) -> SmokeResult<String> {
        Ok(serde_json::from_value(self.request(DriverCommand::Url).await?)?)
    }

    async fn title(&self) -> SmokeResult<String> {
        Ok(serde_json::from_value(self.request(DriverCommand::Title).await?)?)
    }

    async fn content(&self) -> SmokeResult<String> {
        Ok(serde_json::from_value(self.request(DriverCommand::Content).await?)?)
    }

    async fn body_text(&self) -> SmokeResult<String> {
        Ok(serde_json::from_value(self.request(DriverCommand::BodyText).await?)?)
    }

    async fn count(&self, selector: &str) -> SmokeResult<usize> {
        Ok(serde_json::from_value(self.request(DriverCommand::Count { selector }).await?)?)
    }

    async fn text_content(&self, selector: &str) -> SmokeResult<Option<String>> {
        let value = self.request(DriverCommand::TextContent { selector }).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn fill(&self, selector: &str, value: &str) -> SmokeResult<()> {
        self.request(DriverCommand::Fill { selector, value }).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> SmokeResult<()> {
        self.request(DriverCommand::Click { selector }).await?;
        Ok(())
    }

    async fn wait_for_url_change(&self, from: &str, timeout: Duration) -> SmokeResult<UrlWait> {
        let value = self
            .request(DriverCommand::WaitForUrlChange { from, timeout_ms: millis(timeout) })
            .await?;
        let change: UrlChange = serde_json::from_value(value)?;
        if change.changed {
            Ok(UrlWait::Changed(change.url))
        } else {
            Ok(UrlWait::TimedOut)
        }
    }

    async fn screenshot(&self, path: &Path) -> SmokeResult<()> {
        let path = path.to_string_lossy();
        self.request(DriverCommand::Screenshot { path: &*path }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_script_embeds_settings() {
        let config = PlaywrightConfig {
            browser: Browser::Firefox,
            viewport_width: 1280,
            viewport_height: 720,
            ..Default::default()
        };
        let script = build_driver_script(&config).unwrap();

        assert!(!script.contains("__SETTINGS__"));
        assert!(script.contains(r#""browser":"firefox""#));
        assert!(script.contains(r#""viewport_width":1280"#));
        assert!(script.contains(r#""headless":true"#));
        assert!(script.contains("waitUntil: 'networkidle'"));
        assert!(script.contains("error.name === 'TimeoutError'"));
    }

    #[test]
    fn test_command_encoding_carries_id_and_op() {
        let line = DriverCommand::Goto { url: "http://localhost:3000/", timeout_ms: 10_000 }
            .encode(7)
            .unwrap();
        assert!(line.ends_with('\n'));

        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["op"], "goto");
        assert_eq!(value["timeout_ms"], 10_000);

        let line = DriverCommand::BodyText.encode(8).unwrap();
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["op"], "body_text");
    }

    #[test]
    fn test_parse_response_and_console_lines() {
        match parse_driver_line(r#"{"id":3,"ok":true,"value":{"status":200,"url":"http://x/"}}"#) {
            Some(DriverMessage::Response(response)) => {
                assert_eq!(response.id, 3);
                let value = response.into_result().unwrap();
                let nav: Navigation = serde_json::from_value(value).unwrap();
                assert_eq!(nav.status, Some(200));
            }
            other => panic!("unexpected message: {:?}", other),
        }

        match parse_driver_line(r#"{"event":"console","level":"error","text":"boom"}"#) {
            Some(DriverMessage::Event(DriverEvent::Console { level, text })) => {
                assert_eq!(level, "error");
                assert_eq!(text, "boom");
            }
            other => panic!("unexpected message: {:?}", other),
        }

        assert!(parse_driver_line("(node:123) ExperimentalWarning").is_none());
    }

    #[test]
    fn test_error_response_becomes_playwright_error() {
        let line = r#"{"id":4,"ok":false,"error":"Timeout 10000ms exceeded."}"#;
        let response = match parse_driver_line(line) {
            Some(DriverMessage::Response(response)) => response,
            other => panic!("unexpected message: {:?}", other),
        };
        let err = as_navigation_error(response.into_result().unwrap_err());
        assert!(matches!(err, SmokeError::Navigation(ref m) if m.contains("Timeout")));
    }

    fn spawn_reader(
        stdout: tokio::io::DuplexStream,
    ) -> (DriverIo<tokio::io::Sink>, Arc<Mutex<Vec<ConsoleEvent>>>, JoinHandle<()>) {
        let console = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_driver_output(stdout, tx, Arc::clone(&console)));
        let io = DriverIo { stdin: tokio::io::sink(), responses: rx, next_id: READY_ID };
        (io, console, reader)
    }

    #[tokio::test]
    async fn test_receive_skips_stale_responses_and_collects_console() {
        let (mut driver, stdout) = tokio::io::duplex(4096);
        let (mut io, console, _reader) = spawn_reader(stdout);

        let output = concat!(
            r#"{"id":1,"ok":false,"error":"Timeout 10000ms exceeded."}"#,
            "\n",
            r#"{"event":"console","level":"error","text":"Failed to load resource"}"#,
            "\n",
            r#"{"id":2,"ok":true,"value":"http://localhost:3000/login"}"#,
            "\n",
        );
        driver.write_all(output.as_bytes()).await.unwrap();

        let response = io.receive(2, Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.id, 2);
        assert_eq!(response.into_result().unwrap(), "http://localhost:3000/login");

        let events = console.lock().clone();
        assert_eq!(
            events,
            vec![ConsoleEvent { level: "error".into(), text: "Failed to load resource".into() }]
        );
    }

    #[tokio::test]
    async fn test_driver_exit_ends_request_and_keeps_late_events() {
        let (mut driver, stdout) = tokio::io::duplex(4096);
        let (mut io, console, reader) = spawn_reader(stdout);

        let output = concat!(
            r#"{"event":"console","level":"warning","text":"late"}"#,
            "\n",
            "(node:42) ExperimentalWarning: stray output\n",
        );
        driver.write_all(output.as_bytes()).await.unwrap();
        drop(driver);

        let err = io.receive(3, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, SmokeError::DriverExited));

        reader.await.unwrap();
        assert_eq!(
            *console.lock(),
            vec![ConsoleEvent { level: "warning".into(), text: "late".into() }]
        );
    }

    #[tokio::test]
    async fn test_silent_driver_times_out() {
        let (_driver, stdout) = tokio::io::duplex(64);
        let (mut io, _console, _reader) = spawn_reader(stdout);

        let err = io.receive(1, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, SmokeError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_launch_without_playwright_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlaywrightConfig {
            working_dir: dir.path().to_path_buf(),
            launch_timeout: Duration::from_secs(10),
            ..Default::default()
        };

        let launch = PlaywrightHandle::launch(&config);
        let result = tokio::time::timeout(Duration::from_secs(20), launch)
            .await
            .expect("launch should give up within its budget");
        assert!(matches!(result, Err(SmokeError::PlaywrightNotFound)));
    }
}
