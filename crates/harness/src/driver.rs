//! Playwright driver bridge
//!
//! Spawns a long-lived Node.js process running the embedded driver script and
//! speaks a JSON-line protocol over its stdio:
//!
//! - Requests: `{"id": n, "cmd": "...", ...params}`, one per line.
//! - Replies: `{"id": n, "ok": bool, "result"?: ..., "error"?: "..."}`,
//!   routed back to the caller by id.
//! - Events: `{"event": "response", "seq": n, ...}` interleaved with replies,
//!   fanned out to subscribers on a broadcast channel.
//!
//! Subscribers only observe events emitted after they subscribe; responses
//! that arrived earlier are gone. Callers that must not miss a response race
//! the wait against a network-settled signal.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{debug, trace, warn};

use crate::config::EnvironmentConfig;
use crate::error::{HarnessError, HarnessResult};

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One network response observed by the page.
///
/// `seq` identifies the response inside the driver's bounded buffer; the body
/// can be fetched with [`DriverHandle::response_body`] while it is buffered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEvent {
    pub seq: u64,
    pub url: String,
    pub status: u16,
    pub ok: bool,
    pub method: String,
    #[serde(default)]
    pub post_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<DriverReply>>>>;

/// Handle to the running driver process.
pub struct DriverHandle {
    child: Child,
    stdin: Mutex<tokio::process::ChildStdin>,
    pending: PendingReplies,
    events: broadcast::Sender<ResponseEvent>,
    next_id: AtomicU64,
    // Keeps driver.js on disk for the lifetime of the process.
    _script_dir: tempfile::TempDir,
}

impl DriverHandle {
    /// Launch the driver and wait until the browser is ready.
    pub async fn launch(config: &EnvironmentConfig) -> HarnessResult<Self> {
        check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;

        let mut cmd = Command::new("node");
        cmd.arg(&script_path)
            .env("DRIVER_BROWSER", config.browser.as_str())
            .env("DRIVER_HEADLESS", if config.headless { "1" } else { "0" })
            .env(
                "DRIVER_VIEWPORT",
                format!("{}x{}", config.viewport.width, config.viewport.height),
            )
            .env("DRIVER_BASE_URL", &config.base_url)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| HarnessError::DriverStartup(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HarnessError::DriverStartup("no stdin pipe".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::DriverStartup("no stdout pipe".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HarnessError::DriverStartup("no stderr pipe".to_string()))?;

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(read_loop(stdout, Arc::clone(&pending), events.clone()));
        tokio::spawn(stderr_loop(stderr));

        let handle = Self {
            child,
            stdin: Mutex::new(stdin),
            pending,
            events,
            next_id: AtomicU64::new(1),
            _script_dir: script_dir,
        };

        // The driver only starts reading commands once the browser is up, so
        // the first reply doubles as the readiness signal.
        handle
            .request("ping", json!({}))
            .await
            .map_err(|e| HarnessError::DriverStartup(e.to_string()))?;
        debug!("driver ready ({})", config.browser.as_str());

        Ok(handle)
    }

    /// Subscribe to the response event stream. Only events emitted after this
    /// call are delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<ResponseEvent> {
        self.events.subscribe()
    }

    /// Fetch the body text of a buffered response by sequence number.
    pub async fn response_body(&self, seq: u64) -> HarnessResult<String> {
        let result = self.request("body", json!({ "seq": seq })).await?;
        result
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| HarnessError::Protocol("body reply was not a string".to_string()))
    }

    /// Send a command and await its routed reply.
    pub async fn request(&self, cmd: &str, args: Value) -> HarnessResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let mut msg = json!({ "id": id, "cmd": cmd });
        if let (Some(target), Some(extra)) = (msg.as_object_mut(), args.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }
        let line = serde_json::to_string(&msg)?;
        trace!("driver request: {}", line);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let write_result: HarnessResult<()> = async {
            let mut stdin = self.stdin.lock().await;
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = write_result {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let reply = rx.await.map_err(|_| HarnessError::DriverClosed)?;
        if reply.ok {
            Ok(reply.result)
        } else {
            Err(HarnessError::CommandFailed {
                cmd: cmd.to_string(),
                reason: reply.error.unwrap_or_else(|| "unknown driver error".to_string()),
            })
        }
    }

    /// Ask the driver to close the browser, then reap the process.
    pub async fn close(mut self) {
        if let Err(e) = self.request("close", json!({})).await {
            debug!("driver close command failed: {}", e);
        }
        let _ = self.child.wait().await;
    }
}

async fn read_loop(
    stdout: ChildStdout,
    pending: PendingReplies,
    events: broadcast::Sender<ResponseEvent>,
) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        trace!("driver message: {}", line);

        let value: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!("driver emitted non-JSON line ({}): {}", e, line.trim());
                continue;
            }
        };

        if let Some(event) = value.get("event").and_then(Value::as_str) {
            match event {
                "response" => match serde_json::from_value::<ResponseEvent>(value) {
                    Ok(response) => {
                        // No subscribers is fine; the stream is fire-and-forget.
                        let _ = events.send(response);
                    }
                    Err(e) => warn!("malformed response event: {}", e),
                },
                "ready" => debug!("driver reported ready"),
                other => debug!("driver event '{}': {}", other, value),
            }
            continue;
        }

        match serde_json::from_value::<DriverReply>(value) {
            Ok(reply) => {
                if let Some(tx) = pending.lock().await.remove(&reply.id) {
                    let _ = tx.send(reply);
                } else {
                    warn!("driver reply for unknown id {}", reply.id);
                }
            }
            Err(e) => warn!("unroutable driver message: {}", e),
        }
    }

    // EOF: waking every in-flight request with DriverClosed.
    pending.lock().await.clear();
    debug!("driver stdout closed");
}

async fn stderr_loop(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("driver stderr: {}", line);
    }
}

/// Check that the Playwright CLI is reachable.
fn check_playwright_installed() -> HarnessResult<()> {
    let output = std::process::Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(HarnessError::PlaywrightNotFound),
    }
}

/// The Node.js driver executed by [`DriverHandle::launch`].
const DRIVER_JS: &str = r#"// Playwright driver: JSON-line protocol over stdio.
// Requests:  {"id": n, "cmd": "...", ...args}
// Replies:   {"id": n, "ok": true, "result": ...} | {"id": n, "ok": false, "error": "..."}
// Events:    {"event": "response", "seq": n, "url", "status", "ok", "method", "postData"}
const readline = require('readline');
const { chromium, firefox, webkit } = require('playwright');

const engines = { chromium, firefox, webkit };
const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const engine = engines[process.env.DRIVER_BROWSER] ?? chromium;
  const headless = process.env.DRIVER_HEADLESS !== '0';
  const [width, height] = (process.env.DRIVER_VIEWPORT ?? '1280x720').split('x').map(Number);
  const baseURL = process.env.DRIVER_BASE_URL;

  const browser = await engine.launch({ headless });
  const context = await browser.newContext({ viewport: { width, height }, baseURL });
  const page = await context.newPage();

  let seq = 0;
  const recent = new Map();
  page.on('response', (response) => {
    const id = ++seq;
    recent.set(id, response);
    if (recent.size > 200) {
      recent.delete(recent.keys().next().value);
    }
    const request = response.request();
    send({
      event: 'response',
      seq: id,
      url: response.url(),
      status: response.status(),
      ok: response.ok(),
      method: request.method(),
      postData: request.postData(),
    });
  });

  const handlers = {
    ping: async () => 'pong',
    goto: async ({ url, waitUntil }) => {
      await page.goto(url, { waitUntil: waitUntil ?? 'domcontentloaded' });
      return page.url();
    },
    click: async ({ selector, timeout }) => { await page.click(selector, { timeout }); },
    fill: async ({ selector, value, timeout }) => { await page.fill(selector, value, { timeout }); },
    press: async ({ selector, key }) => {
      if (selector) { await page.press(selector, key); } else { await page.keyboard.press(key); }
    },
    count: async ({ selector }) => page.locator(selector).count(),
    texts: async ({ selector }) => page.locator(selector).allTextContents(),
    attribute: async ({ selector, name }) => page.locator(selector).first().getAttribute(name),
    visible: async ({ selector }) => page.locator(selector).first().isVisible(),
    wait_selector: async ({ selector, timeout, state }) => {
      await page.waitForSelector(selector, { timeout, state: state ?? 'visible' });
    },
    wait_idle: async ({ timeout }) => { await page.waitForLoadState('networkidle', { timeout }); },
    evaluate: async ({ script }) => page.evaluate(script),
    body: async ({ seq: wanted }) => {
      const response = recent.get(wanted);
      if (!response) throw new Error(`response ${wanted} is no longer buffered`);
      return await response.text();
    },
    close: async () => { await browser.close(); process.exit(0); },
  };

  send({ event: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  rl.on('line', async (line) => {
    let msg;
    try { msg = JSON.parse(line); } catch (err) {
      send({ event: 'protocol-error', error: String(err) });
      return;
    }
    const handler = handlers[msg.cmd];
    if (!handler) {
      send({ id: msg.id, ok: false, error: `unknown command: ${msg.cmd}` });
      return;
    }
    try {
      const result = await handler(msg);
      send({ id: msg.id, ok: true, result: result === undefined ? null : result });
    } catch (err) {
      send({ id: msg.id, ok: false, error: String(err) });
    }
  });
})().catch((err) => {
  send({ event: 'fatal', error: String(err) });
  process.exit(1);
});
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_event_parsing() {
        let json = r#"{"event":"response","seq":7,"url":"https://api.themoviedb.org/3/discover/movie?page=2","status":200,"ok":true,"method":"GET","postData":null}"#;
        let event: ResponseEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.seq, 7);
        assert!(event.ok);
        assert_eq!(event.method, "GET");
        assert!(event.post_data.is_none());
    }

    #[test]
    fn test_reply_parsing() {
        let json = r#"{"id":3,"ok":true,"result":42}"#;
        let reply: DriverReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.id, 3);
        assert!(reply.ok);
        assert_eq!(reply.result, serde_json::json!(42));
    }

    #[test]
    fn test_error_reply_parsing() {
        let json = r#"{"id":4,"ok":false,"error":"unknown command: flip"}"#;
        let reply: DriverReply = serde_json::from_str(json).unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.error.as_deref(), Some("unknown command: flip"));
        assert!(reply.result.is_null());
    }
}
