use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio::time::interval_at;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::Balancer;
use crate::Reason;

const DEFAULT_PAUSE: Duration = Duration::from_secs(1);
// Roughly 30 years, the same horizon tokio uses for a far-future deadline
const MAX_PAUSE: Duration = Duration::from_secs(86400 * 365 * 30);

/// How long [`Balancer::acquire_wait`] keeps retrying.
///
/// The first acquisition is always attempted. After that, one attempt is spent per `pause`,
/// and the wait gives up when the budget reaches zero, so `attempts` of 0 or 1 never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    attempts: usize,
    pause: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: DEFAULT_PAUSE,
        }
    }
}

impl WaitPolicy {
    pub fn new(attempts: usize, pause: Duration) -> Self {
        Self { attempts, pause }
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the interval between attempts. A zero pause means one second, and pauses
    /// longer than about 30 years are clamped.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn pause(&self) -> Duration {
        if self.pause.is_zero() {
            DEFAULT_PAUSE
        } else {
            self.pause.min(MAX_PAUSE)
        }
    }
}

impl<T> Balancer<T> {
    /// Acquires an item, retrying every `pause` until one frees up.
    ///
    /// Returns `None` if the attempt budget runs out or `cancel` fires first.
    pub async fn acquire_wait(
        &self,
        cancel: &CancellationToken,
        attempts: usize,
        pause: Duration,
    ) -> Option<Arc<T>> {
        self.try_acquire_wait(cancel, WaitPolicy::new(attempts, pause))
            .await
            .ok()
    }

    /// Like [`Balancer::acquire_wait`], but reports why no item was acquired.
    ///
    /// # Errors
    ///
    /// * [`Reason::Exhausted`] if the attempt budget ran out.
    /// * [`Reason::Cancelled`] if `cancel` fired while waiting.
    ///
    /// [`Reason::Saturated`] is never returned; it is left for fail fast callers of
    /// [`Balancer::acquire`].
    pub async fn try_acquire_wait(
        &self,
        cancel: &CancellationToken,
        policy: WaitPolicy,
    ) -> Result<Arc<T>, Reason> {
        if let Some(resource) = self.acquire() {
            return Ok(resource);
        }

        let pause = policy.pause();
        let mut ticker = interval_at(Instant::now() + pause, pause);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut remaining = policy.attempts();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(remaining, "wait for item cancelled");
                    return Err(Reason::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                debug!(
                    attempts = policy.attempts(),
                    ?pause,
                    "gave up waiting for item"
                );
                return Err(Reason::Exhausted {
                    attempts: policy.attempts(),
                });
            }

            if let Some(resource) = self.acquire() {
                return Ok(resource);
            }
        }
    }
}
