//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-silence`, `core-export`). Host applications can
//! depend on `uskut-workspace` and enable the documented features without
//! wiring each crate individually.

#[cfg(feature = "engine")]
pub use core_silence as engine;

#[cfg(feature = "export")]
pub use core_export as export;
