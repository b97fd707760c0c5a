//! Synchronization primitives.
//!
//! Async-aware primitives from `tokio::sync` plus the cooperative
//! cancellation token from `tokio-util`. All of them are `Send + Sync`.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{mpsc, CancellationToken};
//!
//! async fn example() {
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!     tx.send(7).unwrap();
//!     assert_eq!(rx.recv().await, Some(7));
//!
//!     let token = CancellationToken::new();
//!     let child = token.child_token();
//!     token.cancel();
//!     assert!(child.is_cancelled());
//! }
//! ```

pub use tokio::sync::{mpsc, oneshot, watch, Mutex, MutexGuard, Notify};

pub use tokio_util::sync::CancellationToken;
