use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// A single-slot cache with a fixed lifetime.
///
/// `get` hands back the cached value until it is older than the lifetime,
/// then recomputes it through the supplied producer. Concurrent callers
/// during a miss may each trigger a recompute; the producer is expected to
/// be idempotent and cheap relative to the lifetime, so this is accepted
/// rather than serialised. An empty result is cached like any other.
pub struct TimedCache<T> {
    lifetime: Duration,
    now: Arc<dyn Fn() -> Instant + Send + Sync>,
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> TimedCache<T> {
    pub fn new(lifetime: Duration) -> Self {
        Self::with_clock(lifetime, Arc::new(Instant::now))
    }

    /// A cache reading time from the given clock instead of the system one
    pub fn with_clock(lifetime: Duration, now: Arc<dyn Fn() -> Instant + Send + Sync>) -> Self {
        Self {
            lifetime,
            now,
            slot: Mutex::new(None),
        }
    }

    pub async fn get<F, Fut, E>(&self, produce: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let now = (self.now)();
        {
            let slot = self.slot.lock().await;
            if let Some((cached_at, value)) = slot.as_ref() {
                if now.duration_since(*cached_at) < self.lifetime {
                    return Ok(value.clone());
                }
            }
        }

        // Compute outside the lock; a failed producer leaves any stale
        // value in place for the next caller to retry.
        let value = produce().await?;
        *self.slot.lock().await = Some(((self.now)(), value.clone()));
        Ok(value)
    }
}
