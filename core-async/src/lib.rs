//! Runtime abstraction layer for the Uskut silence engine.
//!
//! All `core-*` crates depend on this crate instead of reaching for tokio
//! directly, so the engine's suspension points (sleeps, yields, cancellation
//! checks) live behind one seam.
//!
//! # Modules
//!
//! - `task`: Task spawning, blocking offload and cooperative yielding
//! - `time`: Time-related operations (sleep, timeout, instant)
//! - `sync`: Channels, locks and the cancellation token
//! - `cooperative`: Wall-clock yield budgeting for long sequential loops
//!
//! # Examples
//!
//! ```rust
//! use core_async::cooperative::YieldBudget;
//! use core_async::time::Duration;
//!
//! async fn scan(items: &[u32]) -> u64 {
//!     let mut budget = YieldBudget::new(Duration::from_millis(50));
//!     let mut total = 0u64;
//!     for item in items {
//!         total += u64::from(*item);
//!         budget.tick().await;
//!     }
//!     total
//! }
//! ```

pub mod cooperative;
pub mod sync;
pub mod task;
pub mod time;

pub use cooperative::YieldBudget;
pub use sync::CancellationToken;
pub use task::{spawn, yield_now};
pub use time::{sleep, Duration, Instant};
