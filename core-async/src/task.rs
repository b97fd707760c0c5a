//! Task spawning and execution abstractions.
//!
//! - `spawn`: runs an async task on the Tokio runtime
//! - `spawn_blocking`: offloads CPU-heavy work (whole-file decoding) to the
//!   blocking pool so the async executor stays responsive
//! - `yield_now`: gives the executor a chance to run other tasks
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let handle = task::spawn(async { 42 });
//!     assert_eq!(handle.await.unwrap(), 42);
//!
//!     let sum = task::spawn_blocking(|| (0..1000u64).sum::<u64>()).await.unwrap();
//!     assert_eq!(sum, 499500);
//! }
//! ```

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task using the Tokio runtime.
///
/// The spawned task may run on a different thread.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
