//! Whole-buffer path: read the file into memory, decode it in one go, and
//! measure the decoded samples.
//!
//! Decoding and windowing are CPU-bound and run on the blocking pool.

use crate::config::EngineConfig;
use crate::error::{ProcessingError, Result};
use crate::progress::ProgressReporter;
use crate::timeline::{TimelineOutput, WindowAccumulator};
use crate::traits::{MediaSource, WholeBufferDecoder};
use core_async::sync::CancellationToken;
use core_async::task::spawn_blocking;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct WholeBufferPipeline<'a> {
    source: &'a dyn MediaSource,
    decoder: Arc<dyn WholeBufferDecoder>,
    config: &'a EngineConfig,
    cancel: &'a CancellationToken,
}

impl<'a> WholeBufferPipeline<'a> {
    pub fn new(
        source: &'a dyn MediaSource,
        decoder: Arc<dyn WholeBufferDecoder>,
        config: &'a EngineConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            source,
            decoder,
            config,
            cancel,
        }
    }

    #[instrument(skip_all)]
    pub async fn run(self, progress: &mut ProgressReporter<'_>) -> Result<TimelineOutput> {
        let size = self.source.size();
        if size > self.config.whole_buffer_ceiling {
            return Err(ProcessingError::FileTooLarge {
                size,
                limit: self.config.whole_buffer_ceiling,
            });
        }
        info!(file = %self.source.name(), size, "Starting whole-buffer decode");

        progress.message("Reading file...");
        progress.percent(5.0);
        let data = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ProcessingError::Cancelled),
            data = self.source.read_all() => data?,
        };
        debug!(bytes = data.len(), "File loaded");

        progress.message("Decoding audio...");
        progress.percent(20.0);

        let decoder = Arc::clone(&self.decoder);
        let name = self.source.name().to_string();
        let mime_type = self.source.mime_type().map(str::to_string);
        let config = self.config.clone();
        let work = spawn_blocking(move || -> Result<TimelineOutput> {
            let audio = decoder.decode_all(data, &name, mime_type.as_deref())?;
            let mut accumulator = WindowAccumulator::new(&config);
            accumulator.push(0.0, audio.sample_rate, audio.samples.iter().copied());
            Ok(accumulator.finish())
        });

        let output = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ProcessingError::Cancelled),
            joined = work => joined
                .map_err(|e| ProcessingError::Internal(format!("decode task failed: {}", e)))??,
        };

        if output.timeline.is_empty() {
            return Err(ProcessingError::EmptyResult(
                "decoder returned no samples".to_string(),
            ));
        }

        info!(
            points = output.timeline.len(),
            duration = output.duration,
            "Whole-buffer decode complete"
        );
        progress.message("Analyzing volume...");
        progress.percent(90.0);
        Ok(output)
    }
}
