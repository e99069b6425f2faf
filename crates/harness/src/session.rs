//! Page session over the driver bridge
//!
//! [`PageSession`] is the typed page surface the page objects and scenarios
//! drive. It owns one driver process (one browser page) and translates calls
//! into driver commands. The [`ResponseSource`] trait is the seam that lets
//! the correlator run against a stub stream in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::EnvironmentConfig;
use crate::driver::{DriverHandle, ResponseEvent};
use crate::error::{HarnessError, HarnessResult};

/// Anything exposing an observable response stream with body retrieval.
#[async_trait]
pub trait ResponseSource {
    /// A fresh receiver; only events emitted after this call are seen.
    fn responses(&self) -> broadcast::Receiver<ResponseEvent>;

    /// Body text of a previously observed response.
    async fn response_body(&self, seq: u64) -> HarnessResult<String>;
}

/// A live browser page driven through Playwright.
pub struct PageSession {
    driver: DriverHandle,
    action_timeout: Duration,
}

impl PageSession {
    /// Launch a browser and open a fresh page.
    pub async fn open(config: &EnvironmentConfig) -> HarnessResult<Self> {
        let driver = DriverHandle::launch(config).await?;
        Ok(Self {
            driver,
            action_timeout: config.default_timeout,
        })
    }

    /// Navigate to a path (resolved against the configured base URL) or a
    /// full URL. Returns the final URL after redirects.
    pub async fn goto(&self, url: &str) -> HarnessResult<String> {
        let result = self.driver.request("goto", json!({ "url": url })).await?;
        Ok(result.as_str().unwrap_or(url).to_string())
    }

    pub async fn click(&self, selector: &str, timeout: Duration) -> HarnessResult<()> {
        self.driver
            .request(
                "click",
                json!({ "selector": selector, "timeout": timeout.as_millis() as u64 }),
            )
            .await
            .map(drop)
    }

    pub async fn fill(&self, selector: &str, value: &str) -> HarnessResult<()> {
        self.driver
            .request(
                "fill",
                json!({
                    "selector": selector,
                    "value": value,
                    "timeout": self.action_timeout.as_millis() as u64,
                }),
            )
            .await
            .map(drop)
    }

    /// Press a key, either on a focused element or on the keyboard.
    pub async fn press(&self, selector: Option<&str>, key: &str) -> HarnessResult<()> {
        self.driver
            .request("press", json!({ "selector": selector, "key": key }))
            .await
            .map(drop)
    }

    pub async fn count(&self, selector: &str) -> HarnessResult<u64> {
        let result = self.driver.request("count", json!({ "selector": selector })).await?;
        result
            .as_u64()
            .ok_or_else(|| HarnessError::Protocol("count reply was not a number".to_string()))
    }

    /// Text contents of every element matching the selector.
    pub async fn texts(&self, selector: &str) -> HarnessResult<Vec<String>> {
        let result = self.driver.request("texts", json!({ "selector": selector })).await?;
        serde_json::from_value(result).map_err(HarnessError::from)
    }

    /// Attribute of the first matching element, if present.
    pub async fn attribute(&self, selector: &str, name: &str) -> HarnessResult<Option<String>> {
        let result = self
            .driver
            .request("attribute", json!({ "selector": selector, "name": name }))
            .await?;
        Ok(result.as_str().map(str::to_owned))
    }

    pub async fn is_visible(&self, selector: &str) -> HarnessResult<bool> {
        let result = self.driver.request("visible", json!({ "selector": selector })).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    /// Wait until the selector is visible, or fail with a timeout error.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> HarnessResult<()> {
        self.driver
            .request(
                "wait_selector",
                json!({ "selector": selector, "timeout": timeout.as_millis() as u64 }),
            )
            .await
            .map(drop)
            .map_err(|e| match e {
                HarnessError::CommandFailed { .. } => {
                    HarnessError::Timeout(format!("selector '{}' not visible", selector))
                }
                other => other,
            })
    }

    /// Wait until the page's network has settled.
    pub async fn wait_idle(&self, timeout: Duration) -> HarnessResult<()> {
        self.driver
            .request("wait_idle", json!({ "timeout": timeout.as_millis() as u64 }))
            .await
            .map(drop)
    }

    /// Evaluate a JavaScript expression in the page.
    pub async fn evaluate(&self, script: &str) -> HarnessResult<serde_json::Value> {
        self.driver.request("evaluate", json!({ "script": script })).await
    }

    /// Close the browser and reap the driver process.
    pub async fn close(self) {
        self.driver.close().await;
    }
}

#[async_trait]
impl ResponseSource for PageSession {
    fn responses(&self) -> broadcast::Receiver<ResponseEvent> {
        self.driver.subscribe()
    }

    async fn response_body(&self, seq: u64) -> HarnessResult<String> {
        self.driver.response_body(seq).await
    }
}

/// Probe the site with a plain GET before spending a browser launch on it.
pub async fn check_site_reachable(base_url: &str, timeout: Duration) -> HarnessResult<()> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    match client.get(base_url).send().await {
        Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
            info!("site reachable at {} ({})", base_url, resp.status());
            Ok(())
        }
        Ok(resp) => Err(HarnessError::SiteUnreachable {
            url: base_url.to_string(),
            reason: format!("status {}", resp.status()),
        }),
        Err(e) => Err(HarnessError::SiteUnreachable {
            url: base_url.to_string(),
            reason: e.to_string(),
        }),
    }
}
