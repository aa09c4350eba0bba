//! Courtesy delay between API requests.
//!
//! One delay is drawn per run and slept before every locale query and every
//! record, spreading the request rate of concurrent runs apart.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

const MIN_DELAY_MS: u64 = 25;
const MAX_DELAY_MS: u64 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    delay: Option<Duration>,
}

impl Throttle {
    /// Random delay between 25 and 75 milliseconds.
    pub fn random() -> Self {
        let ms = rand::thread_rng().gen_range(MIN_DELAY_MS..=MAX_DELAY_MS);
        debug!(delay_ms = ms, "Request throttle");
        Self::fixed(Duration::from_millis(ms))
    }

    pub fn fixed(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }

    pub fn disabled() -> Self {
        Self { delay: None }
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_delay_in_range() {
        for _ in 0..100 {
            let delay = Throttle::random().delay().unwrap();
            assert!(delay >= Duration::from_millis(MIN_DELAY_MS));
            assert!(delay <= Duration::from_millis(MAX_DELAY_MS));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_delay() {
        let throttle = Throttle::fixed(Duration::from_millis(50));
        let start = tokio::time::Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_disabled_does_not_sleep() {
        let throttle = Throttle::disabled();
        assert_eq!(throttle.delay(), None);
        throttle.wait().await;
    }
}
