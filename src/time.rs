use std::sync::OnceLock;
use tokio::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic time in microseconds since the first call in this process.
///
/// Built on tokio's clock so paused-time tests see deterministic values.
pub fn absolute_time_us() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    Instant::now().saturating_duration_since(*epoch).as_micros() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_time_is_monotonic() {
        let a = absolute_time_us();
        tokio::time::advance(Duration::from_micros(1500)).await;
        let b = absolute_time_us();
        assert!(b >= a + 1500);
    }
}
