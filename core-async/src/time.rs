//! Time-related abstractions.
//!
//! Re-exports `tokio::time` for sleeping and timeouts together with the
//! standard library's monotonic `Instant`.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(20)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(20));
//! }
//! ```

pub use tokio::time::{error::Elapsed, interval, sleep, timeout, Interval, Sleep, Timeout};

pub use std::time::{Duration, Instant};

/// Converts a duration in seconds (as used on the engine's timelines) into a
/// `Duration`, clamping negative and non-finite inputs to zero.
pub fn secs_f64(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_f64_clamps_invalid_input() {
        assert_eq!(secs_f64(-1.0), Duration::ZERO);
        assert_eq!(secs_f64(f64::NAN), Duration::ZERO);
        assert_eq!(secs_f64(f64::INFINITY), Duration::ZERO);
        assert_eq!(secs_f64(0.25), Duration::from_millis(250));
    }
}
