//! Sliding-window rate limiter guarding outbound provider calls.
//!
//! One limiter is shared by every tool entry point of a process. It is
//! constructed explicitly and injected into [`crate::WeatherTools`].

use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Result, WeatherError};

/// What to do when the window is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPolicy {
    /// Sleep until the oldest call leaves the window.
    Block,
    /// Refuse with [`WeatherError::RateLimitExceeded`].
    #[default]
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default)]
    pub policy: RateLimitPolicy,
}

// Conservative compared to the provider's free-tier ceiling of 60/min.
const fn default_max_calls() -> usize {
    50
}

const fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            window_secs: default_window_secs(),
            policy: RateLimitPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    policy: RateLimitPolicy,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        Self::with_window(config.max_calls, Duration::from_secs(config.window_secs), config.policy)
    }

    pub fn with_window(max_calls: usize, window: Duration, policy: RateLimitPolicy) -> Result<Self> {
        if max_calls == 0 {
            return Err(WeatherError::InvalidInput(
                "rate limit max_calls must be at least 1".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(WeatherError::InvalidInput(
                "rate limit window must be longer than zero".to_string(),
            ));
        }

        Ok(Self { max_calls, window, policy, calls: Mutex::new(VecDeque::with_capacity(max_calls)) })
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Take a slot without waiting, regardless of policy.
    ///
    /// Pruning, the capacity check and recording happen under one lock, so two
    /// concurrent callers can never both take the last slot.
    pub fn try_acquire(&self) -> Result<()> {
        let now = Instant::now();
        let mut calls = self.lock();
        self.prune(&mut calls, now);

        if calls.len() < self.max_calls {
            calls.push_back(now);
            return Ok(());
        }

        let retry_after = calls
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .unwrap_or_default();

        Err(WeatherError::RateLimitExceeded { retry_after })
    }

    /// Take a slot according to the configured policy.
    pub async fn acquire(&self) -> Result<()> {
        loop {
            match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(WeatherError::RateLimitExceeded { retry_after })
                    if self.policy == RateLimitPolicy::Block =>
                {
                    debug!(wait_ms = retry_after.as_millis() as u64, "rate limiter full, waiting");
                    // Zero would spin if the clock has not moved yet.
                    tokio::time::sleep(retry_after.max(Duration::from_millis(1))).await;
                }
                Err(err) => {
                    warn!(max_calls = self.max_calls, window_secs = self.window.as_secs(), "rate limit exceeded");
                    return Err(err);
                }
            }
        }
    }

    /// Acquire a slot, then drive `call`.
    ///
    /// `call` is only polled after the slot is granted, so a refused call never
    /// touches the network.
    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.acquire().await?;
        call.await
    }

    /// Calls recorded in the trailing window.
    pub fn in_flight_window(&self) -> usize {
        let mut calls = self.lock();
        self.prune(&mut calls, Instant::now());
        calls.len()
    }

    fn prune(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = calls.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The deque is consistent after every push/pop, so a poisoned lock is still usable.
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn limiter(max_calls: usize, policy: RateLimitPolicy) -> RateLimiter {
        RateLimiter::with_window(max_calls, Duration::from_secs(60), policy).unwrap()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = RateLimiter::with_window(0, Duration::from_secs(60), RateLimitPolicy::FailFast)
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidInput(_)));
    }

    #[test]
    fn defaults_match_conservative_ceiling() {
        let cfg = RateLimitConfig::default();
        assert_eq!(cfg.max_calls, 50);
        assert_eq!(cfg.window_secs, 60);
        assert_eq!(cfg.policy, RateLimitPolicy::FailFast);
    }

    #[tokio::test(start_paused = true)]
    async fn fail_fast_refuses_call_past_ceiling() {
        let limiter = limiter(3, RateLimitPolicy::FailFast);

        for _ in 0..3 {
            limiter.acquire().await.expect("within ceiling");
        }

        let err = limiter.acquire().await.unwrap_err();
        match err {
            WeatherError::RateLimitExceeded { retry_after } => {
                assert!(retry_after <= Duration::from_secs(60));
                assert!(retry_after > Duration::ZERO);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(limiter.in_flight_window(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slots_free_up_as_window_slides() {
        let limiter = limiter(2, RateLimitPolicy::FailFast);

        limiter.try_acquire().unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_err());

        // First call leaves the window; second is still inside it.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(limiter.in_flight_window(), 1);
        limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_tracks_oldest_call() {
        let limiter = limiter(1, RateLimitPolicy::FailFast);

        limiter.try_acquire().unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;

        match limiter.try_acquire() {
            Err(WeatherError::RateLimitExceeded { retry_after }) => {
                assert_eq!(retry_after, Duration::from_secs(15));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn block_policy_waits_instead_of_failing() {
        let limiter = limiter(1, RateLimitPolicy::Block);
        let start = Instant::now();

        limiter.acquire().await.unwrap();
        limiter.acquire().await.expect("block policy never fails");

        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(limiter.in_flight_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_skips_refused_call() {
        let limiter = limiter(1, RateLimitPolicy::FailFast);
        let counter = AtomicUsize::new(0);
        let polled = &counter;

        let call = move || async move {
            polled.fetch_add(1, Ordering::SeqCst);
            Ok::<_, WeatherError>(())
        };

        limiter.run(call()).await.unwrap();
        let err = limiter.run(call()).await.unwrap_err();

        assert!(matches!(err, WeatherError::RateLimitExceeded { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_never_exceed_ceiling() {
        let limiter = Arc::new(limiter(10, RateLimitPolicy::FailFast));
        let granted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let granted = Arc::clone(&granted);
                tokio::spawn(async move {
                    if limiter.acquire().await.is_ok() {
                        granted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(granted.load(Ordering::SeqCst), 10);
    }
}
