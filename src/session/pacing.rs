//! Pacing gate for outbound generation calls

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Enforces a minimum wall-clock interval between successive generation
/// calls, globally across all sessions.
///
/// Advisory backpressure, not a queue: each caller sleeps relative to the
/// last recorded call time and records its own time only after the wait,
/// so under concurrency the interval is approximate (last-writer-wins on
/// the timestamp) and no fairness ordering is guaranteed.
pub struct PacingGate {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl PacingGate {
    /// Default spacing between generation calls
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(4);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn with_default_interval() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }

    /// Suspend until the configured interval has elapsed since the last
    /// recorded call, then record the new call time.
    pub async fn wait(&self) {
        let wait_for = {
            let last = self.last_call.lock();
            last.map(|t| self.interval.saturating_sub(t.elapsed()))
                .unwrap_or(Duration::ZERO)
        };
        if !wait_for.is_zero() {
            tracing::debug!(wait_ms = wait_for.as_millis() as u64, "pacing gate engaged");
            tokio::time::sleep(wait_for).await;
        }
        *self.last_call.lock() = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_passes_immediately() {
        let gate = PacingGate::new(Duration::from_secs(4));
        let start = tokio::time::Instant::now();
        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_waits_out_the_interval() {
        let gate = PacingGate::new(Duration::from_secs(4));
        gate.wait().await;
        let start = tokio::time::Instant::now();
        gate.wait().await;
        // Paused-clock sleeps auto-advance, so elapsed equals the wait.
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_zero_interval_never_blocks() {
        let gate = PacingGate::new(Duration::ZERO);
        gate.wait().await;
        gate.wait().await;
    }
}
