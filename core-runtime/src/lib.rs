//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the engine crates:
//! - Logging and tracing bootstrap
//! - Runtime error type
//!
//! ## Overview
//!
//! Host applications call [`logging::init_logging`] once at startup. The
//! engine crates themselves only emit `tracing` events and never install a
//! subscriber.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
