//! # Streaming Ingest
//!
//! Bounded-memory processing of large files. The source is read in
//! `read_chunk_bytes` slices and pushed through the container parser; the
//! coded chunks it extracts go to the [`DecodeSession`].
//!
//! ## Flow
//!
//! ```text
//! read_at(offset) ─▶ parser.feed ─▶ TrackReady ─▶ session.configure
//!       ▲                       └─▶ Samples ─────▶ wait_for_capacity ─▶ submit
//!       └──────── next_offset ◀──┘
//! ```
//!
//! The parser decides where to read next, so a media-data box stored before
//! the metadata box can be skipped and revisited once the sample table is
//! known.
//!
//! ## Cleanup
//!
//! Whatever the outcome, the parser is flushed and released exactly once and
//! the decoder is closed exactly once. Cancellation is checked at every
//! suspension point and takes the same cleanup path as any other failure.

use crate::config::EngineConfig;
use crate::error::{ProcessingError, Result};
use crate::progress::ProgressReporter;
use crate::session::DecodeSession;
use crate::timeline::TimelineOutput;
use crate::traits::{ContainerParser, FeedOutcome, MediaSource, ParserEvent, TrackInfo};
use core_async::cooperative::YieldBudget;
use core_async::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Share of the progress bar spent scanning for track metadata.
const SCAN_PERCENT: f64 = 10.0;
/// Progress value reached when every sample has been submitted.
const DECODE_PERCENT: f64 = 95.0;
/// Backward reads tolerated before the parser is considered stuck.
const MAX_REWINDS: u32 = 8;

/// Owns the parser for one run and guarantees the flush/release protocol.
struct ParserHandle {
    parser: Box<dyn ContainerParser>,
    flushed: bool,
    released: bool,
}

impl ParserHandle {
    fn new(parser: Box<dyn ContainerParser>) -> Self {
        Self {
            parser,
            flushed: false,
            released: false,
        }
    }

    fn feed(&mut self, offset: u64, bytes: &[u8]) -> Result<FeedOutcome> {
        self.parser.feed(offset, bytes)
    }

    fn release_consumed(&mut self, count: usize) {
        self.parser.release_consumed(count);
    }

    fn flush(&mut self) -> Result<Vec<ParserEvent>> {
        if self.flushed {
            return Ok(Vec::new());
        }
        self.flushed = true;
        self.parser.flush()
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.parser.release();
        }
    }
}

impl Drop for ParserHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Streaming ingest for one run.
pub struct StreamingIngest<'a> {
    source: &'a dyn MediaSource,
    parser: ParserHandle,
    session: DecodeSession,
    config: &'a EngineConfig,
    cancel: &'a CancellationToken,
    budget: YieldBudget,
    track: Option<TrackInfo>,
    bytes_read: u64,
    samples_processed: u64,
}

impl<'a> StreamingIngest<'a> {
    pub fn new(
        source: &'a dyn MediaSource,
        parser: Box<dyn ContainerParser>,
        session: DecodeSession,
        config: &'a EngineConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            source,
            parser: ParserHandle::new(parser),
            session,
            config,
            cancel,
            budget: YieldBudget::new(config.yield_interval),
            track: None,
            bytes_read: 0,
            samples_processed: 0,
        }
    }

    /// Run to completion and return the volume timeline.
    #[instrument(skip_all)]
    pub async fn run(mut self, progress: &mut ProgressReporter<'_>) -> Result<TimelineOutput> {
        info!(
            file = %self.source.name(),
            size = self.source.size(),
            chunk_bytes = self.config.read_chunk_bytes,
            "Starting streaming ingest"
        );
        progress.message("Scanning file structure...");

        let pumped = self.pump(progress).await;

        // The parser is flushed on every path; its tail is only used on success.
        let tail = self.parser.flush();
        let outcome = match (pumped, tail) {
            (Ok(()), Ok(events)) => self.handle_events(events, progress).await,
            (Err(e), _) | (Ok(()), Err(e)) => Err(e),
        };
        self.parser.release();

        let outcome = match outcome {
            Ok(()) => {
                progress.message("Finishing decode...");
                self.session.flush_and_close().await
            }
            Err(e) => {
                self.session.close();
                Err(e)
            }
        };

        let stats = self.session.stats();
        if let Err(e) = outcome {
            warn!(
                error = %e,
                submitted = stats.submitted,
                decoded = stats.decoded,
                "Streaming ingest failed"
            );
            return Err(e);
        }

        if self.track.is_none() {
            return Err(ProcessingError::EmptyResult(
                "container metadata was never found".to_string(),
            ));
        }
        if stats.decoded == 0 {
            return Err(ProcessingError::EmptyResult(format!(
                "no audio decoded from {} submitted chunks",
                stats.submitted
            )));
        }

        let output = self.session.take_timeline();
        if output.timeline.is_empty() {
            return Err(ProcessingError::EmptyResult(
                "decoded audio produced no volume data".to_string(),
            ));
        }

        info!(
            points = output.timeline.len(),
            duration = output.duration,
            submitted = stats.submitted,
            decoded = stats.decoded,
            backpressure_waits = stats.backpressure_waits,
            "Streaming ingest complete"
        );
        progress.percent(DECODE_PERCENT);
        Ok(output)
    }

    /// Read and parse until the parser is done or the file is exhausted.
    async fn pump(&mut self, progress: &mut ProgressReporter<'_>) -> Result<()> {
        let size = self.source.size();
        let mut offset = 0u64;
        let mut rewinds = 0u32;

        while offset < size {
            self.check_cancelled()?;

            let bytes = self.source.read_at(offset, self.config.read_chunk_bytes).await?;
            if bytes.is_empty() {
                debug!(offset, "Source returned no data, treating as end of input");
                break;
            }
            self.bytes_read += bytes.len() as u64;

            let outcome = self.parser.feed(offset, &bytes)?;
            self.handle_events(outcome.events, progress).await?;

            if self.track.is_none() {
                progress.fraction(self.bytes_read.min(size), size, 0.0, SCAN_PERCENT);
            }

            if outcome.finished {
                debug!(offset, "Parser finished");
                break;
            }

            let next = outcome.next_offset;
            if next <= offset {
                rewinds += 1;
                if rewinds > MAX_REWINDS {
                    return Err(ProcessingError::UnsupportedContainer(format!(
                        "parser keeps requesting offset {} (at {})",
                        next, offset
                    )));
                }
                debug!(from = offset, to = next, "Parser requested earlier offset");
            }
            offset = next;

            if self.budget.tick().await {
                self.check_cancelled()?;
            }
        }
        Ok(())
    }

    async fn handle_events(
        &mut self,
        events: Vec<ParserEvent>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<()> {
        for event in events {
            match event {
                ParserEvent::TrackReady(track) => {
                    if self.track.is_some() {
                        warn!(track_id = track.track_id, "Ignoring additional track metadata");
                        continue;
                    }
                    info!(
                        track_id = track.track_id,
                        codec = ?track.codec,
                        sample_rate = track.sample_rate,
                        channels = track.channels,
                        samples = track.sample_count,
                        "Audio track ready"
                    );
                    self.session.configure(&track)?;
                    self.track = Some(track);
                    progress.message("Decoding audio...");
                    progress.percent(SCAN_PERCENT);
                }
                ParserEvent::NoAudioTrack => {
                    return Err(ProcessingError::NoAudioTrack(self.source.name().to_string()));
                }
                ParserEvent::Samples(chunks) => {
                    if self.track.is_none() {
                        return Err(ProcessingError::Internal(
                            "parser delivered samples before track metadata".to_string(),
                        ));
                    }
                    let count = chunks.len();
                    for chunk in chunks {
                        self.check_cancelled()?;
                        if self.session.wait_for_capacity(self.cancel).await? {
                            self.budget.reset();
                        }
                        self.session.submit(chunk)?;
                        self.samples_processed += 1;

                        if self.budget.tick().await {
                            self.check_cancelled()?;
                        }
                    }
                    self.parser.release_consumed(count);
                    self.report_decode_progress(progress);
                }
            }
        }
        Ok(())
    }

    fn report_decode_progress(&self, progress: &mut ProgressReporter<'_>) {
        let total = self.track.as_ref().map(|t| t.sample_count).unwrap_or(0);
        progress.fraction(self.samples_processed, total, SCAN_PERCENT, DECODE_PERCENT);
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!("Streaming ingest cancelled");
            return Err(ProcessingError::Cancelled);
        }
        Ok(())
    }
}
