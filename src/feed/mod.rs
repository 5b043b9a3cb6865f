//! # Telemetry Feed Module
//!
//! Polls the receiver node's HTTP API for the latest PVT solution and
//! observable list.
//!
//! This module handles:
//! - HTTP GET with a short per-request timeout
//! - Envelope unwrapping (`{ ok, pvt }` / `{ ok, observables }`)
//! - Collapsing every transport and parse failure into "no data this cycle"
//! - Rate-limited logging so a dead endpoint cannot flood the log
//!
//! Nothing downstream of this module ever sees an error value: the
//! aggregator only distinguishes "data" from "absence".

pub mod extract;

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::warn;

use crate::config::FeedConfig;
use crate::error::{HudBridgeError, Result};

/// Minimum interval between transport-failure log lines
const LOG_THROTTLE: Duration = Duration::from_secs(5);

/// Number of body bytes included in failure log previews
const PREVIEW_LEN: usize = 200;

/// Result of one fetch attempt against a feed endpoint
///
/// `Empty` and `TransportError` are deliberately treated identically by the
/// aggregator (both mean "absent this cycle"); the distinction exists only
/// for logging.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// Endpoint returned a well-formed record
    Data(T),
    /// Endpoint reachable but had nothing to report (empty body, null record)
    Empty,
    /// Endpoint unreachable, timed out, or returned a malformed body
    TransportError(String),
}

impl<T> FetchOutcome<T> {
    /// Collapse to the aggregator's view: data or absence
    pub fn into_option(self) -> Option<T> {
        match self {
            FetchOutcome::Data(v) => Some(v),
            FetchOutcome::Empty | FetchOutcome::TransportError(_) => None,
        }
    }

    /// True for the `Data` variant
    pub fn is_data(&self) -> bool {
        matches!(self, FetchOutcome::Data(_))
    }
}

/// Throttle for repetitive failure logging
///
/// Transport failures recur every poll cycle while the node is down; this
/// keeps the log at one line per [`LOG_THROTTLE`] window.
#[derive(Debug)]
pub struct LogThrottle {
    last: Option<Instant>,
    interval: Duration,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { last: None, interval }
    }

    /// Returns true if a log line is due, and records the emission
    pub fn should_log(&mut self, now: Instant) -> bool {
        match self.last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Unwrap the PVT endpoint envelope: `{ ok: true, pvt: <obj|null> }`
///
/// A null or missing `pvt` member means the node holds no solution yet,
/// which is absence rather than an error.
pub fn unwrap_pvt_envelope(body: Value) -> FetchOutcome<Value> {
    match body {
        Value::Object(mut map) => match map.remove("pvt") {
            Some(pvt @ Value::Object(_)) => FetchOutcome::Data(pvt),
            _ => FetchOutcome::Empty,
        },
        _ => FetchOutcome::TransportError("PVT envelope is not a JSON object".to_string()),
    }
}

/// Unwrap the observables envelope: `{ ok: true, meta: {...}, observables: [...] }`
pub fn unwrap_observables_envelope(body: Value) -> FetchOutcome<Vec<Value>> {
    match body {
        Value::Object(mut map) => match map.remove("observables") {
            Some(Value::Array(list)) => FetchOutcome::Data(list),
            _ => FetchOutcome::Empty,
        },
        _ => FetchOutcome::TransportError("observables envelope is not a JSON object".to_string()),
    }
}

/// HTTP client for the telemetry node
///
/// Uses a reusable `reqwest::Client` with connection pooling and the
/// configured per-request timeout. Both endpoints are polled once per
/// cycle; failures abort only the current attempt.
pub struct FeedClient {
    http: reqwest::Client,
    pvt_url: String,
    obs_url: String,
    throttle: LogThrottle,
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("pvt_url", &self.pvt_url)
            .field("obs_url", &self.obs_url)
            .finish_non_exhaustive()
    }
}

impl FeedClient {
    /// Build a client for the configured node
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be constructed
    /// (TLS backend initialization failure).
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()
            .map_err(|e| HudBridgeError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let base = config.base_url.trim_end_matches('/');

        Ok(Self {
            http,
            pvt_url: format!("{}/api/latest/pvt", base),
            obs_url: format!("{}/api/latest/observables?limit={}", base, config.observables_limit),
            throttle: LogThrottle::new(LOG_THROTTLE),
        })
    }

    /// Fetch the latest PVT record, if the node has one
    pub async fn fetch_pvt(&mut self) -> FetchOutcome<Value> {
        let url = self.pvt_url.clone();
        match self.get_json(&url).await {
            FetchOutcome::Data(body) => {
                let outcome = unwrap_pvt_envelope(body);
                self.note_envelope_error(&outcome, &url);
                outcome
            }
            FetchOutcome::Empty => FetchOutcome::Empty,
            FetchOutcome::TransportError(e) => FetchOutcome::TransportError(e),
        }
    }

    /// Fetch the latest observable list, if the node has one
    pub async fn fetch_observations(&mut self) -> FetchOutcome<Vec<Value>> {
        let url = self.obs_url.clone();
        match self.get_json(&url).await {
            FetchOutcome::Data(body) => {
                let outcome = unwrap_observables_envelope(body);
                self.note_envelope_error(&outcome, &url);
                outcome
            }
            FetchOutcome::Empty => FetchOutcome::Empty,
            FetchOutcome::TransportError(e) => FetchOutcome::TransportError(e),
        }
    }

    /// Log an envelope-shape failure, subject to the shared throttle
    ///
    /// A valid JSON body of the wrong shape is as much a transport problem
    /// as a non-JSON one, and recurs just as fast while the node
    /// misbehaves.
    fn note_envelope_error<T>(&mut self, outcome: &FetchOutcome<T>, url: &str) {
        if let FetchOutcome::TransportError(msg) = outcome {
            if self.throttle.should_log(Instant::now()) {
                warn!("{} (from {})", msg, url);
            }
        }
    }

    /// Robust JSON GET
    ///
    /// - `Data` if the body is valid JSON
    /// - `Empty` for an empty/whitespace body
    /// - `TransportError` for request failures, bad status, non-JSON body
    async fn get_json(&mut self, url: &str) -> FetchOutcome<Value> {
        let response = match self.http.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let msg = format!("request to {} failed: {}", url, e);
                if self.throttle.should_log(Instant::now()) {
                    warn!("{}", msg);
                }
                return FetchOutcome::TransportError(msg);
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let raw = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                let msg = format!("failed to read body from {}: {}", url, e);
                if self.throttle.should_log(Instant::now()) {
                    warn!("{}", msg);
                }
                return FetchOutcome::TransportError(msg);
            }
        };

        if !status.is_success() {
            let msg = format!("HTTP {} from {}", status.as_u16(), url);
            if self.throttle.should_log(Instant::now()) {
                warn!("{}. Preview: {:?}", msg, body_preview(&raw));
            }
            return FetchOutcome::TransportError(msg);
        }

        let text = String::from_utf8_lossy(&raw);
        if text.trim().is_empty() {
            return FetchOutcome::Empty;
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => FetchOutcome::Data(body),
            Err(_) => {
                let msg = format!("non-JSON body from {}", url);
                if self.throttle.should_log(Instant::now()) {
                    warn!("{} (ctype={}). Preview: {:?}", msg, content_type, body_preview(&raw));
                }
                FetchOutcome::TransportError(msg)
            }
        }
    }
}

/// First [`PREVIEW_LEN`] bytes of a body, lossily decoded for logging
fn body_preview(raw: &[u8]) -> String {
    let end = raw.len().min(PREVIEW_LEN);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fetch_outcome_into_option() {
        assert_eq!(FetchOutcome::Data(5).into_option(), Some(5));
        assert_eq!(FetchOutcome::<i32>::Empty.into_option(), None);
        assert_eq!(
            FetchOutcome::<i32>::TransportError("x".to_string()).into_option(),
            None
        );

        assert!(FetchOutcome::Data(5).is_data());
        assert!(!FetchOutcome::<i32>::Empty.is_data());
    }

    #[test]
    fn test_unwrap_pvt_envelope_with_record() {
        let body = json!({"ok": true, "pvt": {"lat": 45.0}});
        match unwrap_pvt_envelope(body) {
            FetchOutcome::Data(pvt) => assert_eq!(pvt["lat"].as_f64(), Some(45.0)),
            other => panic!("Expected Data, got {:?}", other),
        }
    }

    #[test]
    fn test_unwrap_pvt_envelope_null_record_is_empty() {
        let body = json!({"ok": true, "pvt": null});
        assert_eq!(unwrap_pvt_envelope(body), FetchOutcome::Empty);
    }

    #[test]
    fn test_unwrap_pvt_envelope_missing_member_is_empty() {
        let body = json!({"ok": true});
        assert_eq!(unwrap_pvt_envelope(body), FetchOutcome::Empty);
    }

    #[test]
    fn test_unwrap_pvt_envelope_non_object_record_is_empty() {
        // A scalar where an object belongs is absence, not data
        let body = json!({"ok": true, "pvt": 42});
        assert_eq!(unwrap_pvt_envelope(body), FetchOutcome::Empty);
    }

    #[test]
    fn test_unwrap_pvt_envelope_non_object_body_is_error() {
        assert!(matches!(
            unwrap_pvt_envelope(json!([1, 2])),
            FetchOutcome::TransportError(_)
        ));
    }

    #[test]
    fn test_unwrap_observables_envelope_with_list() {
        let body = json!({"ok": true, "meta": {}, "observables": [{"cn0_db_hz": 40.0}]});
        match unwrap_observables_envelope(body) {
            FetchOutcome::Data(list) => assert_eq!(list.len(), 1),
            other => panic!("Expected Data, got {:?}", other),
        }
    }

    #[test]
    fn test_unwrap_observables_envelope_empty_list_is_data() {
        // An empty list is a valid answer: zero tracked channels
        let body = json!({"ok": true, "observables": []});
        match unwrap_observables_envelope(body) {
            FetchOutcome::Data(list) => assert!(list.is_empty()),
            other => panic!("Expected Data, got {:?}", other),
        }
    }

    #[test]
    fn test_unwrap_observables_envelope_missing_is_empty() {
        let body = json!({"ok": false});
        assert_eq!(unwrap_observables_envelope(body), FetchOutcome::Empty);
    }

    #[test]
    fn test_log_throttle_first_fire() {
        let mut throttle = LogThrottle::new(Duration::from_secs(5));
        assert!(throttle.should_log(Instant::now()));
    }

    #[test]
    fn test_log_throttle_suppresses_within_window() {
        let mut throttle = LogThrottle::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(throttle.should_log(t0));
        assert!(!throttle.should_log(t0 + Duration::from_secs(1)));
        assert!(!throttle.should_log(t0 + Duration::from_millis(4999)));
    }

    #[test]
    fn test_log_throttle_fires_after_window() {
        let mut throttle = LogThrottle::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(throttle.should_log(t0));
        assert!(throttle.should_log(t0 + Duration::from_secs(5)));
        assert!(!throttle.should_log(t0 + Duration::from_secs(6)));
    }

    #[test]
    fn test_body_preview_truncates() {
        let raw = vec![b'x'; 1000];
        assert_eq!(body_preview(&raw).len(), PREVIEW_LEN);
        assert_eq!(body_preview(b"short"), "short");
    }

    #[test]
    fn test_feed_client_urls() {
        let config = crate::config::FeedConfig {
            base_url: "http://127.0.0.1:8080/".to_string(),
            poll_hz: 2.0,
            http_timeout_ms: 1000,
            observables_limit: 64,
        };
        let client = FeedClient::new(&config).unwrap();
        assert_eq!(client.pvt_url, "http://127.0.0.1:8080/api/latest/pvt");
        assert_eq!(
            client.obs_url,
            "http://127.0.0.1:8080/api/latest/observables?limit=64"
        );
    }

    #[test]
    fn test_envelope_shape_error_consumes_log_throttle() {
        // A well-formed JSON body of the wrong shape must be reported
        // through the same throttle as any other transport failure
        let config = crate::config::FeedConfig {
            base_url: "http://127.0.0.1:8080".to_string(),
            poll_hz: 2.0,
            http_timeout_ms: 1000,
            observables_limit: 64,
        };
        let mut client = FeedClient::new(&config).unwrap();

        let outcome = unwrap_pvt_envelope(json!([1, 2]));
        assert!(matches!(outcome, FetchOutcome::TransportError(_)));
        client.note_envelope_error(&outcome, "http://127.0.0.1:8080/api/latest/pvt");

        // The emission was recorded: further failures stay quiet within
        // the throttle window
        assert!(!client.throttle.should_log(Instant::now()));
    }

    #[test]
    fn test_envelope_success_leaves_throttle_untouched() {
        let config = crate::config::FeedConfig {
            base_url: "http://127.0.0.1:8080".to_string(),
            poll_hz: 2.0,
            http_timeout_ms: 1000,
            observables_limit: 64,
        };
        let mut client = FeedClient::new(&config).unwrap();

        let outcome = unwrap_pvt_envelope(json!({"ok": true, "pvt": {"lat": 1.0}}));
        client.note_envelope_error(&outcome, "http://127.0.0.1:8080/api/latest/pvt");

        assert!(client.throttle.should_log(Instant::now()));
    }

    #[tokio::test]
    async fn test_fetch_against_unreachable_node_is_transport_error() {
        // Nothing listens on this port; the request must fail fast and
        // collapse into a TransportError rather than propagate.
        let config = crate::config::FeedConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            poll_hz: 2.0,
            http_timeout_ms: 200,
            observables_limit: 64,
        };

        let mut client = FeedClient::new(&config).unwrap();
        let outcome = client.fetch_pvt().await;
        assert!(matches!(outcome, FetchOutcome::TransportError(_)));
        assert_eq!(outcome.into_option(), None);
    }
}
