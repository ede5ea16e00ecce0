use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Paces outbound calls so an external service sees at most one request per
/// configured interval, regardless of how many tasks share the client.
pub struct RateLimiter {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            last_request: Mutex::new(None),
        }
    }

    /// Sleeps until the interval since the previous call has elapsed. The
    /// lock is held across the sleep so concurrent callers queue up instead
    /// of racing past the limit together.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.delay {
                sleep(self.delay - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}
