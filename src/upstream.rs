// src/upstream.rs
//! Boundary to the two upstream providers: the binary alerts feed and the
//! JSON metadata API.

use async_trait::async_trait;
use metrics::counter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::PipelineError;

#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Raw GTFS-Realtime alerts payload.
    async fn fetch_alerts(&self) -> Result<Vec<u8>, PipelineError>;
    /// Raw JSON metadata document.
    async fn fetch_metadata(&self) -> Result<Vec<u8>, PipelineError>;
    fn name(&self) -> &'static str;
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }

    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }
}

pub struct HttpAlertSource {
    client: reqwest::Client,
    alerts_url: String,
    metadata_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpAlertSource {
    pub fn new(
        alerts_url: impl Into<String>,
        metadata_url: impl Into<String>,
        api_key: Option<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::upstream("http", e))?;
        Ok(Self {
            client,
            alerts_url: alerts_url.into(),
            metadata_url: metadata_url.into(),
            api_key,
            retry,
        })
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let mut req = self.client.get(url);
        if let Some(key) = &self.api_key {
            req = req.header(reqwest::header::AUTHORIZATION, format!("apikey {key}"));
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn get_with_retry(
        &self,
        url: &str,
        label: &'static str,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut attempts = 0u32;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if self.retry.should_retry(attempts) => {
                    let delay = self.retry.delay_for_attempt(attempts);
                    attempts += 1;
                    tracing::warn!(
                        target: "upstream",
                        error = %e,
                        provider = label,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "upstream fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    counter!("upstream_errors_total", "provider" => label).increment(1);
                    return Err(PipelineError::upstream(label, e));
                }
            }
        }
    }
}

#[async_trait]
impl AlertSource for HttpAlertSource {
    async fn fetch_alerts(&self) -> Result<Vec<u8>, PipelineError> {
        self.get_with_retry(&self.alerts_url, "alerts").await
    }

    async fn fetch_metadata(&self) -> Result<Vec<u8>, PipelineError> {
        self.get_with_retry(&self.metadata_url, "metadata").await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// In-memory payloads for tests and local runs. Counts fetches and can be
/// switched into a failing mode.
#[derive(Debug, Default)]
pub struct FixtureSource {
    payloads: Mutex<(Vec<u8>, Vec<u8>)>,
    failing: AtomicBool,
    alert_fetches: AtomicUsize,
    metadata_fetches: AtomicUsize,
}

impl FixtureSource {
    pub fn new(alerts: Vec<u8>, metadata: Vec<u8>) -> Self {
        Self {
            payloads: Mutex::new((alerts, metadata)),
            ..Default::default()
        }
    }

    pub fn replace(&self, alerts: Vec<u8>, metadata: Vec<u8>) {
        *self.payloads.lock().unwrap_or_else(|p| p.into_inner()) = (alerts, metadata);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of alert-feed fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.alert_fetches.load(Ordering::SeqCst)
    }

    pub fn metadata_fetch_count(&self) -> usize {
        self.metadata_fetches.load(Ordering::SeqCst)
    }

    fn check(&self, label: &str) -> Result<(), PipelineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PipelineError::upstream(label, "fixture set to fail"));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSource for FixtureSource {
    async fn fetch_alerts(&self) -> Result<Vec<u8>, PipelineError> {
        self.alert_fetches.fetch_add(1, Ordering::SeqCst);
        self.check("alerts")?;
        Ok(self.payloads.lock().unwrap_or_else(|p| p.into_inner()).0.clone())
    }

    async fn fetch_metadata(&self) -> Result<Vec<u8>, PipelineError> {
        self.metadata_fetches.fetch_add(1, Ordering::SeqCst);
        self.check("metadata")?;
        Ok(self.payloads.lock().unwrap_or_else(|p| p.into_inner()).1.clone())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for_attempt(0), Duration::from_millis(250));
        assert_eq!(p.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(p.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(p.delay_for_attempt(10), Duration::from_secs(5));
        assert!(p.should_retry(1));
        assert!(!p.should_retry(2));
    }

    #[tokio::test]
    async fn fixture_counts_and_fails_on_demand() {
        let src = FixtureSource::new(b"a".to_vec(), b"{}".to_vec());
        assert_eq!(src.fetch_alerts().await.unwrap(), b"a".to_vec());
        assert_eq!(src.fetch_metadata().await.unwrap(), b"{}".to_vec());
        assert_eq!(src.fetch_count(), 1);
        assert_eq!(src.metadata_fetch_count(), 1);

        src.set_failing(true);
        let err = src.fetch_alerts().await.unwrap_err();
        assert!(matches!(err, PipelineError::Upstream { .. }));
        assert_eq!(src.fetch_count(), 2);
    }

    #[tokio::test]
    async fn unreachable_host_is_upstream_error_after_retries() {
        let retry = RetryPolicy {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let src = HttpAlertSource::new(
            "http://127.0.0.1:9/alerts",
            "http://127.0.0.1:9/meta",
            None,
            retry,
            Duration::from_millis(500),
        )
        .unwrap();
        let err = src.fetch_alerts().await.unwrap_err();
        match err {
            PipelineError::Upstream { source_name, .. } => assert_eq!(source_name, "alerts"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
