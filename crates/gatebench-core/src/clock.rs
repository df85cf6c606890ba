use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

/// Injectable duration provider for simulated work.
///
/// Components that model latency burn it through a `Clock` rather than
/// calling `tokio::time::sleep` directly, so tests can elide the wait while
/// the modeled values still flow into results.
pub trait Clock: Send + Sync {
    fn sleep<'a>(&'a self, duration: Duration)
    -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Production clock: genuinely occupies wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep<'a>(
        &'a self,
        duration: Duration,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test clock: records every requested duration and returns immediately.
pub struct NoopClock {
    requested: Mutex<Vec<Duration>>,
}

impl NoopClock {
    pub fn new() -> Self {
        Self {
            requested: Mutex::new(Vec::new()),
        }
    }

    /// All durations requested so far, in call order.
    pub fn requests(&self) -> Vec<Duration> {
        self.requested.lock().expect("clock lock poisoned").clone()
    }

    /// Sum of all requested durations.
    pub fn total_requested(&self) -> Duration {
        self.requests().iter().sum()
    }
}

impl Default for NoopClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for NoopClock {
    fn sleep<'a>(
        &'a self,
        duration: Duration,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        self.requested
            .lock()
            .expect("clock lock poisoned")
            .push(duration);
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_clock_records_requests() {
        let clock = NoopClock::new();
        clock.sleep(Duration::from_millis(5)).await;
        clock.sleep(Duration::from_millis(7)).await;

        assert_eq!(clock.requests().len(), 2);
        assert_eq!(clock.total_requested(), Duration::from_millis(12));
    }

    #[tokio::test]
    async fn system_clock_sleeps() {
        let clock = SystemClock;
        let start = std::time::Instant::now();
        clock.sleep(Duration::from_millis(10)).await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
