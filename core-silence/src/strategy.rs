//! # Strategy Selector
//!
//! Picks the processing path for a file, runs it, and falls back from
//! streaming to whole-buffer decoding when that is both possible and allowed.
//!
//! ## Decision order
//!
//! 1. Containers the streaming path cannot parse, or backends without a
//!    streaming decoder, go straight to the whole-buffer path.
//! 2. Files strictly larger than `large_file_threshold` stream first.
//! 3. A failed streaming attempt falls back to the whole-buffer path unless
//!    the file is above `streaming_ceiling` or the failure is not retryable
//!    (cancellation, size limits).
//! 4. The whole-buffer path refuses anything above `whole_buffer_ceiling`.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::ingest::StreamingIngest;
use crate::progress::ProgressReporter;
use crate::segmentation::detect_keep_segments;
use crate::session::DecodeSession;
use crate::timeline::TimelineOutput;
use crate::traits::{BackendCapabilities, ContainerKind, MediaBackend, MediaSource};
use crate::types::{AnalysisSummary, AudioSegment, ProcessingSettings};
use crate::whole::WholeBufferPipeline;
use core_async::sync::CancellationToken;
use std::path::Path;
use tracing::{error, info, instrument, warn};

/// Bytes read from the start of a file to sniff its container.
const SNIFF_BYTES: usize = 12;

/// File extensions of the ISO base media family.
const ISO_BMFF_EXTENSIONS: &[&str] = &["mp4", "m4a", "m4v", "m4b", "mov", "3gp", "3g2"];

/// The two processing paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Read the whole file and decode it at once.
    WholeBuffer,
    /// Parse and decode incrementally with bounded memory.
    Streaming,
}

/// Pure path decision.
///
/// `size` equal to `large_file_threshold` still takes the whole-buffer path.
pub fn choose_strategy(
    size: u64,
    container: ContainerKind,
    capabilities: BackendCapabilities,
    config: &EngineConfig,
) -> Strategy {
    if !container.is_streamable() || !capabilities.streaming_decoder {
        return Strategy::WholeBuffer;
    }
    if size > config.large_file_threshold {
        Strategy::Streaming
    } else {
        Strategy::WholeBuffer
    }
}

/// Identify the container from the first bytes of the file, falling back to
/// the file extension and MIME type.
pub fn sniff_container(header: &[u8], name: &str, mime_type: Option<&str>) -> ContainerKind {
    if header.len() >= 8 && &header[4..8] == b"ftyp" {
        return ContainerKind::IsoBmff;
    }

    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    if extension
        .as_deref()
        .is_some_and(|ext| ISO_BMFF_EXTENSIONS.contains(&ext))
    {
        return ContainerKind::IsoBmff;
    }

    match mime_type.map(|m| m.to_ascii_lowercase()) {
        Some(mime) if mime == "video/mp4" || mime == "audio/mp4" || mime == "video/quicktime" => {
            ContainerKind::IsoBmff
        }
        Some(mime) if mime.starts_with("audio/x-m4") => ContainerKind::IsoBmff,
        _ => ContainerKind::Other,
    }
}

/// Read the file header and identify its container.
pub async fn detect_container(source: &dyn MediaSource) -> Result<ContainerKind> {
    let header = source.read_at(0, SNIFF_BYTES).await?;
    Ok(sniff_container(&header, source.name(), source.mime_type()))
}

/// Runs one file through the selected path.
pub struct StrategySelector<'a> {
    backend: &'a dyn MediaBackend,
    config: &'a EngineConfig,
}

impl<'a> StrategySelector<'a> {
    pub fn new(backend: &'a dyn MediaBackend, config: &'a EngineConfig) -> Self {
        Self { backend, config }
    }

    /// Produce the keep segments for `source`.
    pub async fn select_and_run(
        &self,
        source: &dyn MediaSource,
        settings: &ProcessingSettings,
        progress: &mut ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<AudioSegment>> {
        Ok(self
            .select_and_analyze(source, settings, progress, cancel)
            .await?
            .segments)
    }

    /// Produce the keep segments plus the totals shown to the user.
    pub async fn select_and_analyze(
        &self,
        source: &dyn MediaSource,
        settings: &ProcessingSettings,
        progress: &mut ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisSummary> {
        settings.validate()?;

        let output = self.produce_timeline(source, progress, cancel).await?;

        progress.message("Detecting silence...");
        let segments = detect_keep_segments(&output.timeline, settings);
        let summary = AnalysisSummary::new(segments, output.duration);

        info!(
            segments = summary.cut_count,
            original = summary.original_duration,
            kept = summary.new_duration,
            "Silence detection complete"
        );
        Ok(summary)
    }

    #[instrument(skip_all, fields(size = source.size()))]
    async fn produce_timeline(
        &self,
        source: &dyn MediaSource,
        progress: &mut ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<TimelineOutput> {
        let size = source.size();
        let container = detect_container(source).await?;
        let strategy = choose_strategy(size, container, self.backend.capabilities(), self.config);
        info!(?container, ?strategy, "Processing strategy selected");

        match strategy {
            Strategy::WholeBuffer => self.run_whole_buffer(source, progress, cancel).await,
            Strategy::Streaming => {
                progress.message("Large file detected, using streaming mode...");
                let err = match self.run_streaming(source, container, progress, cancel).await {
                    Ok(output) => return Ok(output),
                    Err(err) => err,
                };

                if !err.is_fallback_eligible() {
                    return Err(err);
                }
                if size > self.config.streaming_ceiling {
                    error!(
                        error = %err,
                        size,
                        ceiling = self.config.streaming_ceiling,
                        "Streaming failed and file is too large for fallback"
                    );
                    return Err(err);
                }

                if err.is_format_error() {
                    warn!(error = %err, "Streaming parser cannot read this file, falling back to whole-buffer decode");
                } else {
                    warn!(error = %err, "Streaming decode failed, falling back to whole-buffer decode");
                }
                progress.message(
                    "Streaming decode failed. Retrying with full decode, this will be slower...",
                );
                progress.restart();
                self.run_whole_buffer(source, progress, cancel).await
            }
        }
    }

    async fn run_streaming(
        &self,
        source: &dyn MediaSource,
        container: ContainerKind,
        progress: &mut ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<TimelineOutput> {
        let parser = self.backend.create_parser(container)?;
        let decoder = match self.backend.create_decoder() {
            Ok(decoder) => decoder,
            Err(err) => {
                let mut parser = parser;
                parser.flush().ok();
                parser.release();
                return Err(err);
            }
        };
        let session = DecodeSession::new(decoder, self.config);
        StreamingIngest::new(source, parser, session, self.config, cancel)
            .run(progress)
            .await
    }

    async fn run_whole_buffer(
        &self,
        source: &dyn MediaSource,
        progress: &mut ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<TimelineOutput> {
        WholeBufferPipeline::new(source, self.backend.whole_buffer_decoder(), self.config, cancel)
            .run(progress)
            .await
    }
}
