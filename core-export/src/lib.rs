//! # Edit-Decision Export
//!
//! Renders the keep segments produced by `core-silence` into an edit list
//! that video editors can import.
//!
//! ## Overview
//!
//! - [`FcpXmlWriter`]: Final Cut Pro 7 XML (xmeml v4), also read by Premiere Pro
//! - [`ExportOptions`]: frame rate and output resolution
//! - [`export_file_name`]: conventional name of the exported file
//! - [`render_summary`]: plain-text report of an analysis run

pub mod error;
pub mod fcpxml;
pub mod options;
pub mod summary;

pub use error::{ExportError, Result};
pub use fcpxml::{export_file_name, FcpXmlWriter};
pub use options::{ExportOptions, VideoResolution};
pub use summary::{render_summary, timecode};
