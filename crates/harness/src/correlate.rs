//! Correlating UI actions to the network responses they trigger
//!
//! After a test step drives the page, [`wait_for_api`] waits for the next
//! response whose URL contains any of the given tokens and folds it into a
//! normalized [`ApiCapture`]. Matching starts at the moment of the call:
//! responses that fired before the wait was registered are missed, which is
//! why navigation-time callers race this against a network-settled signal.
//!
//! Concurrent waits on one session are independent; each may claim the same
//! physical response.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::driver::ResponseEvent;
use crate::session::ResponseSource;

/// Status code carried by the timeout sentinel.
///
/// Known inconsistency: a timed-out wait reports `200` with `ok: false`.
/// Downstream checks pattern-match on the literal value, so it stays; check
/// `ok` (or [`ApiCapture::is_timeout`]), not `status`, to detect the sentinel.
pub const TIMEOUT_SENTINEL_STATUS: u16 = 200;

/// URL carried by the timeout sentinel.
pub const TIMEOUT_SENTINEL_URL: &str = "timeout";

/// Characters of response body kept in the capture.
pub const RESPONSE_PREVIEW_LIMIT: usize = 1000;

/// Normalized record of one observed request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCapture {
    pub url: String,
    pub status: u16,
    pub ok: bool,
    pub request_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_post_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
}

impl ApiCapture {
    /// The sentinel returned when no response matched within the timeout.
    pub fn timeout_sentinel(reason: impl fmt::Display) -> Self {
        Self {
            url: TIMEOUT_SENTINEL_URL.to_string(),
            status: TIMEOUT_SENTINEL_STATUS,
            ok: false,
            request_method: "GET".to_string(),
            request_post_data: None,
            response_preview: Some(reason.to_string()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.url == TIMEOUT_SENTINEL_URL && !self.ok
    }
}

/// Wait for the first event satisfying `predicate`, or `None` on timeout.
///
/// Generic over the predicate; URL-token matching is one instance. Also
/// returns `None` if the stream closes before a match.
pub async fn first_matching_event<F>(
    rx: &mut broadcast::Receiver<ResponseEvent>,
    mut predicate: F,
    timeout: Duration,
) -> Option<ResponseEvent>
where
    F: FnMut(&ResponseEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Ok(event)) => {
                if predicate(&event) {
                    return Some(event);
                }
            }
            // Falling behind loses the oldest events; keep matching the rest.
            Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                debug!("response stream lagged, {} events dropped", skipped);
            }
            Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return None,
        }
    }
}

/// Wait for the next response whose URL contains any of `tokens` (substring,
/// case-sensitive, first match wins) and capture it.
///
/// `tokens` must be non-empty; an empty set matches nothing and times out.
pub async fn wait_for_api<S>(source: &S, tokens: &[&str], timeout: Duration) -> ApiCapture
where
    S: ResponseSource + Sync,
{
    debug_assert!(!tokens.is_empty(), "token set must be non-empty");

    let mut rx = source.responses();
    let matched = first_matching_event(
        &mut rx,
        |event| tokens.iter().any(|token| event.url.contains(token)),
        timeout,
    )
    .await;

    match matched {
        Some(event) => capture_response(source, &event).await,
        None => ApiCapture::timeout_sentinel(format!(
            "Timeout {}ms exceeded waiting for a response matching {:?}",
            timeout.as_millis(),
            tokens
        )),
    }
}

/// Capture a matched response, reading the body defensively: a failed read
/// becomes diagnostic text in the preview instead of an error.
pub async fn capture_response<S>(source: &S, event: &ResponseEvent) -> ApiCapture
where
    S: ResponseSource + Sync,
{
    let preview = match source.response_body(event.seq).await {
        Ok(text) => text.chars().take(RESPONSE_PREVIEW_LIMIT).collect(),
        Err(e) => e.to_string(),
    };

    ApiCapture {
        url: event.url.clone(),
        status: event.status,
        ok: event.ok,
        request_method: event.method.clone(),
        request_post_data: event.post_data.clone(),
        response_preview: Some(preview),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HarnessError, HarnessResult};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubSource {
        tx: broadcast::Sender<ResponseEvent>,
        bodies: HashMap<u64, Result<String, String>>,
    }

    impl StubSource {
        fn new() -> Self {
            let (tx, _) = broadcast::channel(64);
            Self {
                tx,
                bodies: HashMap::new(),
            }
        }

        fn with_body(mut self, seq: u64, body: &str) -> Self {
            self.bodies.insert(seq, Ok(body.to_string()));
            self
        }

        fn with_broken_body(mut self, seq: u64, reason: &str) -> Self {
            self.bodies.insert(seq, Err(reason.to_string()));
            self
        }

        fn emit(&self, seq: u64, url: &str, status: u16) {
            let _ = self.tx.send(ResponseEvent {
                seq,
                url: url.to_string(),
                status,
                ok: (200..300).contains(&status),
                method: "GET".to_string(),
                post_data: None,
            });
        }
    }

    #[async_trait]
    impl ResponseSource for StubSource {
        fn responses(&self) -> broadcast::Receiver<ResponseEvent> {
            self.tx.subscribe()
        }

        async fn response_body(&self, seq: u64) -> HarnessResult<String> {
            match self.bodies.get(&seq) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(reason)) => Err(HarnessError::Protocol(reason.clone())),
                None => Err(HarnessError::Protocol(format!(
                    "response {} is no longer buffered",
                    seq
                ))),
            }
        }
    }

    fn spawn_emit_after(source: &StubSource, delay: Duration, seq: u64, url: &str, status: u16) {
        let tx = source.tx.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ResponseEvent {
                seq,
                url,
                status,
                ok: (200..300).contains(&status),
                method: "GET".to_string(),
                post_data: None,
            });
        });
    }

    #[tokio::test]
    async fn test_match_returns_real_capture() {
        let source = StubSource::new().with_body(1, r#"{"page":1,"results":[]}"#);
        spawn_emit_after(
            &source,
            Duration::from_millis(5),
            1,
            "https://api.themoviedb.org/3/discover/movie?page=1",
            200,
        );

        let capture = wait_for_api(&source, &["discover"], Duration::from_secs(1)).await;
        assert!(capture.ok);
        assert_eq!(capture.status, 200);
        assert_eq!(capture.url, "https://api.themoviedb.org/3/discover/movie?page=1");
        assert_eq!(capture.request_method, "GET");
        assert_eq!(
            capture.response_preview.as_deref(),
            Some(r#"{"page":1,"results":[]}"#)
        );
        assert!(!capture.is_timeout());
    }

    #[tokio::test]
    async fn test_non_matching_responses_are_skipped() {
        let source = StubSource::new().with_body(3, "hit");
        spawn_emit_after(&source, Duration::from_millis(5), 1, "https://cdn.example.com/app.js", 200);
        spawn_emit_after(&source, Duration::from_millis(10), 2, "https://fonts.example.com/a.woff2", 200);
        spawn_emit_after(
            &source,
            Duration::from_millis(15),
            3,
            "https://api.themoviedb.org/3/search/movie?query=avatar",
            200,
        );

        let capture = wait_for_api(&source, &["search", "discover"], Duration::from_secs(1)).await;
        assert_eq!(capture.url, "https://api.themoviedb.org/3/search/movie?query=avatar");
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported_not_masked() {
        let source = StubSource::new().with_body(1, r#"{"status_message":"Invalid API key"}"#);
        spawn_emit_after(
            &source,
            Duration::from_millis(5),
            1,
            "https://api.themoviedb.org/3/discover/movie",
            401,
        );

        let capture = wait_for_api(&source, &["discover"], Duration::from_secs(1)).await;
        assert!(!capture.ok);
        assert_eq!(capture.status, 401);
        assert!(!capture.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_exact_sentinel() {
        let source = StubSource::new();

        let capture = wait_for_api(&source, &["discover"], Duration::from_millis(500)).await;
        assert_eq!(capture.url, TIMEOUT_SENTINEL_URL);
        assert_eq!(capture.status, TIMEOUT_SENTINEL_STATUS);
        assert!(!capture.ok);
        assert_eq!(capture.request_method, "GET");
        assert!(capture.request_post_data.is_none());
        let preview = capture.response_preview.as_deref().unwrap_or_default();
        assert!(preview.contains("Timeout 500ms exceeded"));
        assert!(capture.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_match_returns_sentinel() {
        // The matching response lands at 600ms but the wait allows 500ms.
        let source = StubSource::new().with_body(1, "late");
        spawn_emit_after(
            &source,
            Duration::from_millis(600),
            1,
            "https://api.themoviedb.org/3/discover/movie",
            200,
        );

        let capture = wait_for_api(&source, &["discover", "search"], Duration::from_millis(500)).await;
        assert!(capture.is_timeout());
    }

    #[tokio::test]
    async fn test_body_read_failure_folds_into_preview() {
        let source = StubSource::new().with_broken_body(1, "body stream already consumed");
        spawn_emit_after(
            &source,
            Duration::from_millis(5),
            1,
            "https://api.themoviedb.org/3/discover/movie",
            200,
        );

        let capture = wait_for_api(&source, &["discover"], Duration::from_secs(1)).await;
        assert!(capture.ok);
        let preview = capture.response_preview.as_deref().unwrap_or_default();
        assert!(preview.contains("body stream already consumed"));
    }

    #[tokio::test]
    async fn test_preview_is_truncated() {
        let long_body = "x".repeat(RESPONSE_PREVIEW_LIMIT + 500);
        let source = StubSource::new().with_body(1, &long_body);
        spawn_emit_after(
            &source,
            Duration::from_millis(5),
            1,
            "https://api.themoviedb.org/3/discover/movie",
            200,
        );

        let capture = wait_for_api(&source, &["discover"], Duration::from_secs(1)).await;
        assert_eq!(
            capture.response_preview.map(|p| p.chars().count()),
            Some(RESPONSE_PREVIEW_LIMIT)
        );
    }

    #[tokio::test]
    async fn test_concurrent_waits_each_claim_the_same_response() {
        let source = StubSource::new().with_body(1, "shared");
        spawn_emit_after(
            &source,
            Duration::from_millis(10),
            1,
            "https://api.themoviedb.org/3/discover/movie",
            200,
        );

        let (a, b) = tokio::join!(
            wait_for_api(&source, &["discover"], Duration::from_secs(1)),
            wait_for_api(&source, &["movie"], Duration::from_secs(1)),
        );
        assert_eq!(a.url, b.url);
        assert!(a.ok && b.ok);
    }

    #[tokio::test]
    async fn test_first_matching_event_with_custom_predicate() {
        let source = StubSource::new();
        spawn_emit_after(&source, Duration::from_millis(5), 1, "https://a.example/one", 500);
        spawn_emit_after(&source, Duration::from_millis(10), 2, "https://a.example/two", 200);

        let mut rx = source.responses();
        let event = first_matching_event(&mut rx, |e| e.ok, Duration::from_secs(1)).await;
        assert_eq!(event.map(|e| e.seq), Some(2));
    }

    #[tokio::test]
    async fn test_closed_stream_stops_the_wait() {
        let (tx, mut rx) = broadcast::channel::<ResponseEvent>(1);
        drop(tx);
        let event = first_matching_event(&mut rx, |_| true, Duration::from_secs(5)).await;
        assert!(event.is_none());
    }

    #[test]
    fn test_capture_serializes_camel_case() {
        let capture = ApiCapture::timeout_sentinel("Timeout 500ms exceeded");
        let json = serde_json::to_value(&capture).unwrap();
        assert_eq!(json["url"], "timeout");
        assert_eq!(json["status"], 200);
        assert_eq!(json["ok"], false);
        assert_eq!(json["requestMethod"], "GET");
        assert!(json.get("requestPostData").is_none());
    }
}
