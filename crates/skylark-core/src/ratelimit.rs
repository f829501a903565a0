//! Fixed-window rate limiting.
//!
//! Policy (how many hits per window) is separated from storage (where the
//! counters live) so the store can be swapped for a shared backend
//! without touching call sites. The bundled [`MemoryRateLimitStore`] is
//! the single-process default.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Counter state after recording a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Hits in the current window, including this one.
    pub count: u64,
    /// Time until the window resets.
    pub resets_in: Duration,
}

/// Where rate-limit counters live. `increment` must be atomic per key:
/// concurrent callers each observe a distinct count.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record one hit against `key` within a fixed window of `window`
    /// length, starting a fresh window if the previous one has elapsed.
    async fn increment(&self, key: &str, window: Duration) -> WindowState;

    /// Drop counters whose window has already reset. Stores with native
    /// key expiry can leave this as the no-op default.
    async fn sweep(&self) {}
}

/// A named budget: at most `limit` hits per `window` for each client key.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub name: &'static str,
    pub limit: u64,
    pub window: Duration,
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

impl RatePolicy {
    pub const fn new(name: &'static str, limit: u64, window: Duration) -> Self {
        Self { name, limit, window }
    }

    /// Counter key for one client under this policy. Namespaced by the
    /// policy name so endpoints sharing a client never share a budget.
    pub fn key(&self, client: &str) -> String {
        format!("{}:{}", self.name, client)
    }

    /// Count the hit and decide. The hit is recorded even when the
    /// outcome is `Limited`.
    pub async fn check(&self, store: &dyn RateLimitStore, client: &str) -> RateDecision {
        let state = store.increment(&self.key(client), self.window).await;
        if state.count > self.limit {
            RateDecision::Limited {
                retry_after_seconds: retry_after_secs(state.resets_in),
            }
        } else {
            RateDecision::Allowed
        }
    }
}

/// Whole seconds until retry, rounded up and never zero.
fn retry_after_secs(resets_in: Duration) -> u64 {
    let secs = resets_in.as_secs_f64().ceil() as u64;
    secs.max(1)
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    started_at: Instant,
    window_len: Duration,
}

/// In-process counter store. One mutex over the whole map keeps
/// increments atomic; contention is negligible at admission-rate traffic.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<String, Window>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live windows, swept or not.
    pub async fn len(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn increment(&self, key: &str, window: Duration) -> WindowState {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
            window_len: window,
        });
        if now.duration_since(entry.started_at) >= entry.window_len {
            entry.count = 0;
            entry.started_at = now;
            entry.window_len = window;
        }
        entry.count += 1;
        WindowState {
            count: entry.count,
            resets_in: entry
                .window_len
                .saturating_sub(now.duration_since(entry.started_at)),
        }
    }

    async fn sweep(&self) {
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| w.started_at.elapsed() < w.window_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: RatePolicy = RatePolicy::new("checkout", 3, Duration::from_secs(60));

    #[tokio::test(start_paused = true)]
    async fn allows_up_to_the_limit_then_rejects() {
        let store = MemoryRateLimitStore::new();
        for _ in 0..3 {
            assert_eq!(POLICY.check(&store, "1.2.3.4").await, RateDecision::Allowed);
        }
        match POLICY.check(&store, "1.2.3.4").await {
            RateDecision::Limited { retry_after_seconds } => {
                assert!(retry_after_seconds >= 1);
                assert!(retry_after_seconds <= 60);
            }
            RateDecision::Allowed => panic!("fourth hit should be limited"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clients_have_independent_budgets() {
        let store = MemoryRateLimitStore::new();
        for _ in 0..3 {
            POLICY.check(&store, "1.2.3.4").await;
        }
        assert_eq!(POLICY.check(&store, "5.6.7.8").await, RateDecision::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn policies_with_the_same_client_do_not_share_counters() {
        let other = RatePolicy::new("subscribe", 3, Duration::from_secs(60));
        let store = MemoryRateLimitStore::new();
        for _ in 0..3 {
            POLICY.check(&store, "1.2.3.4").await;
        }
        assert_eq!(other.check(&store, "1.2.3.4").await, RateDecision::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn window_elapse_resets_the_counter() {
        let store = MemoryRateLimitStore::new();
        for _ in 0..4 {
            POLICY.check(&store, "1.2.3.4").await;
        }
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(POLICY.check(&store, "1.2.3.4").await, RateDecision::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_hits_still_count_against_the_window() {
        let narrow = RatePolicy::new("narrow", 1, Duration::from_secs(60));
        let store = MemoryRateLimitStore::new();
        narrow.check(&store, "c").await;
        for _ in 0..5 {
            assert!(matches!(
                narrow.check(&store, "c").await,
                RateDecision::Limited { .. }
            ));
        }
        let state = store.increment(&narrow.key("c"), narrow.window).await;
        assert_eq!(state.count, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_only_expired_windows() {
        let short = RatePolicy::new("short", 5, Duration::from_secs(10));
        let long = RatePolicy::new("long", 5, Duration::from_secs(100));
        let store = MemoryRateLimitStore::new();
        short.check(&store, "c").await;
        long.check(&store, "c").await;
        assert_eq!(store.len().await, 2);

        tokio::time::advance(Duration::from_secs(50)).await;
        store.sweep().await;
        assert_eq!(store.len().await, 1);

        tokio::time::advance(Duration::from_secs(100)).await;
        store.sweep().await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_is_at_least_one_second() {
        let zero = RatePolicy::new("zero", 0, Duration::from_millis(200));
        let store = MemoryRateLimitStore::new();
        match zero.check(&store, "c").await {
            RateDecision::Limited { retry_after_seconds } => {
                assert_eq!(retry_after_seconds, 1)
            }
            RateDecision::Allowed => panic!("zero-limit policy should reject"),
        }
    }
}
