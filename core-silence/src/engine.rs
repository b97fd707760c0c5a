//! # Silence Engine
//!
//! Entry point of the crate. A [`SilenceEngine`] owns the media backend and
//! the engine configuration and turns one media file at a time into keep
//! segments.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_silence::{LocalFile, ProcessingSettings, SilenceEngine};
//! use std::sync::Arc;
//!
//! let mut engine = SilenceEngine::with_defaults()?;
//! let source = Arc::new(LocalFile::open("talk.mp4").await?);
//! let segments = engine
//!     .process(
//!         source,
//!         &ProcessingSettings::default(),
//!         |message| println!("{}", message),
//!         |percent| println!("{}%", percent),
//!     )
//!     .await?;
//! ```
//!
//! `process` borrows the engine mutably, so one engine never runs two files
//! at once. Independent engines may run concurrently.

use crate::config::EngineConfig;
use crate::error::{ProcessingError, Result};
use crate::progress::ProgressReporter;
use crate::strategy::StrategySelector;
use crate::traits::{MediaBackend, MediaSource};
use crate::types::{AnalysisSummary, AudioSegment, ProcessingSettings};
use core_async::sync::CancellationToken;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct SilenceEngine {
    backend: Arc<dyn MediaBackend>,
    config: EngineConfig,
    runs: u64,
}

impl SilenceEngine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::InvalidSettings`] if `config` fails
    /// validation.
    pub fn new(backend: Arc<dyn MediaBackend>, config: EngineConfig) -> Result<Self> {
        config.validate().map_err(ProcessingError::InvalidSettings)?;
        Ok(Self {
            backend,
            config,
            runs: 0,
        })
    }

    /// Engine backed by symphonia with the default configuration.
    #[cfg(feature = "symphonia-backend")]
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            Arc::new(crate::decoder::SymphoniaBackend::new()),
            EngineConfig::default(),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of runs started on this engine.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Detect keep segments in `source`.
    pub async fn process(
        &mut self,
        source: Arc<dyn MediaSource>,
        settings: &ProcessingSettings,
        on_progress_message: impl FnMut(&str) + Send,
        on_progress_percent: impl FnMut(u8) + Send,
    ) -> Result<Vec<AudioSegment>> {
        self.process_with_cancel(
            source,
            settings,
            on_progress_message,
            on_progress_percent,
            CancellationToken::new(),
        )
        .await
    }

    /// [`process`](Self::process) with a caller-controlled cancellation token.
    pub async fn process_with_cancel(
        &mut self,
        source: Arc<dyn MediaSource>,
        settings: &ProcessingSettings,
        on_progress_message: impl FnMut(&str) + Send,
        on_progress_percent: impl FnMut(u8) + Send,
        cancel: CancellationToken,
    ) -> Result<Vec<AudioSegment>> {
        Ok(self
            .analyze(
                source,
                settings,
                on_progress_message,
                on_progress_percent,
                cancel,
            )
            .await?
            .segments)
    }

    /// Detect keep segments and summarize the edit.
    #[instrument(skip_all, fields(file = %source.name()))]
    pub async fn analyze(
        &mut self,
        source: Arc<dyn MediaSource>,
        settings: &ProcessingSettings,
        mut on_progress_message: impl FnMut(&str) + Send,
        mut on_progress_percent: impl FnMut(u8) + Send,
        cancel: CancellationToken,
    ) -> Result<AnalysisSummary> {
        self.runs += 1;
        info!(
            size = source.size(),
            threshold_db = settings.threshold_db,
            min_silence = settings.min_silence_duration,
            padding = settings.padding,
            "Processing started"
        );

        let mut progress =
            ProgressReporter::new(&mut on_progress_message, &mut on_progress_percent);
        let selector = StrategySelector::new(self.backend.as_ref(), &self.config);

        match selector
            .select_and_analyze(source.as_ref(), settings, &mut progress, &cancel)
            .await
        {
            Ok(summary) => {
                progress.message("Done");
                progress.complete();
                Ok(summary)
            }
            Err(err) => {
                warn!(error = %err, "Processing failed");
                Err(err)
            }
        }
    }
}
