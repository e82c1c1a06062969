// src/cache.rs
//! Single-slot, time-bounded cache for the pipeline output.
//!
//! A miss starts exactly one refresh; callers arriving while it runs wait on
//! the same result instead of fetching again. The refresh runs as its own
//! task, so it still lands in the slot when the caller that started it gives
//! up. The slot mutex is never held across an await.

use metrics::counter;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::error::PipelineError;
use crate::partition::AlertFeeds;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut g = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *g += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

pub type RefreshResult = Result<Arc<AlertFeeds>, PipelineError>;

#[derive(Default)]
struct Slot {
    entry: Option<(Instant, Arc<AlertFeeds>)>,
    inflight: Option<watch::Receiver<Option<RefreshResult>>>,
}

pub struct ResultCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn fresh(&self, slot: &Slot) -> Option<Arc<AlertFeeds>> {
        let (stored_at, value) = slot.entry.as_ref()?;
        let age = self.clock.now().saturating_duration_since(*stored_at);
        (age < self.ttl).then(|| Arc::clone(value))
    }

    /// Value stored less than one TTL ago.
    pub fn get(&self) -> Option<Arc<AlertFeeds>> {
        let slot = self.lock();
        self.fresh(&slot)
    }

    /// Last stored value regardless of age.
    pub fn stale(&self) -> Option<Arc<AlertFeeds>> {
        self.lock().entry.as_ref().map(|(_, v)| Arc::clone(v))
    }

    pub fn set(&self, value: Arc<AlertFeeds>) {
        let now = self.clock.now();
        self.lock().entry = Some((now, value));
    }

    /// Return the cached value, or run `compute` once for everyone waiting.
    ///
    /// On failure the previous entry stays in place and every waiter gets
    /// the same error.
    pub async fn get_or_refresh<F, Fut>(
        self: &Arc<Self>,
        compute: F,
    ) -> (RefreshResult, CacheStatus)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AlertFeeds, PipelineError>> + Send + 'static,
    {
        let mut rx = {
            let mut slot = self.lock();
            if let Some(v) = self.fresh(&slot) {
                counter!("alerts_cache_hits_total").increment(1);
                return (Ok(v), CacheStatus::Hit);
            }
            counter!("alerts_cache_misses_total").increment(1);

            // A closed channel with no value means the last refresh task died.
            let joinable = slot
                .inflight
                .as_ref()
                .filter(|rx| rx.has_changed().is_ok() || rx.borrow().is_some())
                .cloned();

            match joinable {
                Some(rx) => {
                    tracing::debug!(target: "cache", "joining in-flight refresh");
                    rx
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    slot.inflight = Some(rx.clone());
                    let fut = compute();
                    let cache = Arc::clone(self);
                    tracing::debug!(target: "cache", "cache miss, starting refresh");
                    tokio::spawn(async move {
                        let result = fut.await.map(Arc::new);
                        cache.finish(&result);
                        let _ = tx.send(Some(result));
                    });
                    rx
                }
            }
        };

        let result = match rx.wait_for(Option::is_some).await {
            Ok(v) => v
                .clone()
                .unwrap_or_else(|| Err(PipelineError::Aborted("empty refresh result".into()))),
            Err(_) => Err(PipelineError::Aborted("refresh task ended".into())),
        };
        (result, CacheStatus::Miss)
    }

    fn finish(&self, result: &RefreshResult) {
        let now = self.clock.now();
        let mut slot = self.lock();
        slot.inflight = None;
        match result {
            Ok(v) => slot.entry = Some((now, Arc::clone(v))),
            Err(e) => {
                counter!("alerts_refresh_errors_total").increment(1);
                tracing::warn!(target: "cache", error = %e, "refresh failed, keeping previous entry");
            }
        }
    }
}
