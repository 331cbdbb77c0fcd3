//! Optional pauses between model calls.
//!
//! Pacing exists purely so that a human watching the transcript can follow along; it has no
//! effect on correctness. Tests use [`NoPacing`], servers use [`FixedPacing`].

use async_trait::async_trait;
use std::time::Duration;

/// Strategy invoked after every successful model call.
#[async_trait]
pub trait Pacing: Send + Sync {
    /// Suspend the run for as long as the strategy dictates.
    async fn pause(&self);
}

/// Never waits.
pub struct NoPacing;

#[async_trait]
impl Pacing for NoPacing {
    async fn pause(&self) {}
}

/// Sleeps for a fixed duration.
pub struct FixedPacing {
    delay: Duration,
}

impl FixedPacing {
    pub fn new(delay: Duration) -> Self {
        FixedPacing { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Pacing for FixedPacing {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_pacing_sleeps_for_delay() {
        let pacing = FixedPacing::from_millis(20);
        let before = tokio::time::Instant::now();
        pacing.pause().await;
        assert!(before.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        FixedPacing::from_millis(0).pause().await;
        NoPacing.pause().await;
    }
}
