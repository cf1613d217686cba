//! Fixed-interval scheduler for outgoing requests
//!
//! A `governor` token bucket with a burst of one: the first call passes
//! immediately, every later call waits until `delay` has elapsed since the
//! previous one. The clock is a type parameter so tests can run on a
//! [`FakeRelativeClock`] instead of sleeping.

use std::time::Duration;

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock, FakeRelativeClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use tracing::debug;

/// A governor clock that also knows how to wait
#[async_trait]
pub trait PacerClock: Clock + Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl PacerClock for DefaultClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual time: sleeping advances the clock instantly
#[async_trait]
impl PacerClock for FakeRelativeClock {
    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

type DirectLimiter<C> = RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

pub struct Pacer<C: PacerClock = DefaultClock> {
    limiter: Option<DirectLimiter<C>>,
    clock: C,
    delay: Duration,
    waited: Duration,
}

impl Pacer<DefaultClock> {
    /// Pacer on the wall clock
    pub fn new(delay: Duration) -> Self {
        Self::with_clock(delay, DefaultClock::default())
    }
}

impl<C: PacerClock> Pacer<C> {
    /// Pacer on a caller-provided clock. A zero delay disables pacing.
    pub fn with_clock(delay: Duration, clock: C) -> Self {
        let limiter = Quota::with_period(delay).map(|quota| RateLimiter::direct_with_clock(quota, &clock));
        Self {
            limiter,
            clock,
            delay,
            waited: Duration::ZERO,
        }
    }

    /// Wait for the next slot
    pub async fn ready(&mut self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        while let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            debug!("Pacing: waiting {:?} before next request", wait);
            self.waited += wait;
            self.clock.sleep(wait).await;
        }
    }

    /// Sleep for an externally mandated duration (e.g. a flood-wait)
    pub async fn pause(&mut self, duration: Duration) {
        self.waited += duration;
        self.clock.sleep(duration).await;
    }

    /// Configured spacing between requests
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total time spent waiting so far
    pub fn total_waited(&self) -> Duration {
        self.waited
    }
}
