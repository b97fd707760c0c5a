//! # Engine Configuration
//!
//! Size thresholds, queue limits and pacing intervals for the two processing
//! paths.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Engine configuration.
///
/// Controls which processing path a file takes, how much memory each path may
/// use, and how often the streaming path hands control back to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Files strictly larger than this (in bytes) try the streaming path first.
    ///
    /// Default: 200 MiB.
    #[serde(default = "default_large_file_threshold")]
    pub large_file_threshold: u64,

    /// Files larger than this never fall back to the whole-buffer path after
    /// a streaming failure.
    ///
    /// Default: 1 GiB.
    #[serde(default = "default_streaming_ceiling")]
    pub streaming_ceiling: u64,

    /// Absolute size limit of the whole-buffer path.
    ///
    /// Default: 2 GiB.
    #[serde(default = "default_whole_buffer_ceiling")]
    pub whole_buffer_ceiling: u64,

    /// Maximum number of coded chunks outstanding in the decoder.
    ///
    /// Default: 100.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,

    /// Bytes read from the source per streaming step.
    ///
    /// Default: 1 MiB.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,

    /// Poll interval while waiting for decoder queue capacity.
    ///
    /// Default: 20 ms.
    #[serde(default = "default_backpressure_poll")]
    pub backpressure_poll: Duration,

    /// Longest stretch of wall time the streaming loop runs without yielding.
    ///
    /// Default: 50 ms.
    #[serde(default = "default_yield_interval")]
    pub yield_interval: Duration,

    /// Length of one volume analysis window in seconds.
    ///
    /// Default: 0.05 s.
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,

    /// Keep every n-th sample when computing RMS over large windows.
    /// `1` disables subsampling.
    ///
    /// Default: 4.
    #[serde(default = "default_subsample_stride")]
    pub subsample_stride: usize,

    /// Windows with fewer samples than this are never subsampled.
    ///
    /// Default: 4096.
    #[serde(default = "default_subsample_min_window")]
    pub subsample_min_window: usize,

    /// Maximum duration to wait for the decoder to drain on flush.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_decode_timeout")]
    pub decode_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            large_file_threshold: default_large_file_threshold(),
            streaming_ceiling: default_streaming_ceiling(),
            whole_buffer_ceiling: default_whole_buffer_ceiling(),
            max_queue_depth: default_max_queue_depth(),
            read_chunk_bytes: default_read_chunk_bytes(),
            backpressure_poll: default_backpressure_poll(),
            yield_interval: default_yield_interval(),
            window_secs: default_window_secs(),
            subsample_stride: default_subsample_stride(),
            subsample_min_window: default_subsample_min_window(),
            decode_timeout: default_decode_timeout(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration for memory-constrained hosts.
    ///
    /// - Streaming kicks in at 64 MiB
    /// - Whole-buffer path capped at 512 MiB
    /// - Shallower decoder queue and smaller reads
    pub fn low_memory() -> Self {
        Self {
            large_file_threshold: 64 * MIB,
            streaming_ceiling: 512 * MIB,
            whole_buffer_ceiling: 512 * MIB,
            max_queue_depth: 32,
            read_chunk_bytes: 256 * 1024, // 256 KB
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.large_file_threshold == 0 {
            return Err("large_file_threshold must be > 0".to_string());
        }

        if self.streaming_ceiling < self.large_file_threshold {
            return Err("streaming_ceiling cannot be below large_file_threshold".to_string());
        }

        if self.whole_buffer_ceiling < self.streaming_ceiling {
            return Err("whole_buffer_ceiling cannot be below streaming_ceiling".to_string());
        }

        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be > 0".to_string());
        }

        if self.read_chunk_bytes == 0 {
            return Err("read_chunk_bytes must be > 0".to_string());
        }

        if !self.window_secs.is_finite() || self.window_secs <= 0.0 {
            return Err("window_secs must be > 0".to_string());
        }

        if self.subsample_stride == 0 {
            return Err("subsample_stride must be > 0".to_string());
        }

        if self.backpressure_poll.is_zero() {
            return Err("backpressure_poll must be > 0".to_string());
        }

        Ok(())
    }

    /// Number of samples in one analysis window at `sample_rate`.
    pub fn window_samples(&self, sample_rate: u32) -> usize {
        ((self.window_secs * sample_rate as f64).round() as usize).max(1)
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_large_file_threshold() -> u64 {
    200 * MIB
}

fn default_streaming_ceiling() -> u64 {
    1024 * MIB
}

fn default_whole_buffer_ceiling() -> u64 {
    2048 * MIB
}

fn default_max_queue_depth() -> usize {
    100
}

fn default_read_chunk_bytes() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_backpressure_poll() -> Duration {
    Duration::from_millis(20)
}

fn default_yield_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_window_secs() -> f64 {
    0.05
}

fn default_subsample_stride() -> usize {
    4
}

fn default_subsample_min_window() -> usize {
    4096
}

fn default_decode_timeout() -> Duration {
    Duration::from_secs(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.large_file_threshold, 200 * 1024 * 1024);
        assert_eq!(config.streaming_ceiling, 1024 * 1024 * 1024);
        assert_eq!(config.whole_buffer_ceiling, 2 * 1024 * 1024 * 1024);
        assert_eq!(config.max_queue_depth, 100);
        assert_eq!(config.window_secs, 0.05);
    }

    #[test]
    fn test_low_memory_config() {
        let config = EngineConfig::low_memory();
        assert!(config.validate().is_ok());
        assert!(config.large_file_threshold < EngineConfig::default().large_file_threshold);
        assert!(config.max_queue_depth < EngineConfig::default().max_queue_depth);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        // Invalid: ceiling below threshold
        config.streaming_ceiling = config.large_file_threshold - 1;
        assert!(config.validate().is_err());
        config.streaming_ceiling = default_streaming_ceiling();

        // Invalid: whole-buffer ceiling below streaming ceiling
        config.whole_buffer_ceiling = config.streaming_ceiling - 1;
        assert!(config.validate().is_err());
        config.whole_buffer_ceiling = default_whole_buffer_ceiling();

        // Invalid: zero queue
        config.max_queue_depth = 0;
        assert!(config.validate().is_err());
        config.max_queue_depth = 100;

        // Invalid: zero window
        config.window_secs = 0.0;
        assert!(config.validate().is_err());
        config.window_secs = 0.05;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_samples() {
        let config = EngineConfig::default();
        assert_eq!(config.window_samples(44100), 2205);
        assert_eq!(config.window_samples(48000), 2400);
        assert_eq!(config.window_samples(1), 1);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_queue_depth": 8}"#).unwrap();
        assert_eq!(config.max_queue_depth, 8);
        assert_eq!(config.read_chunk_bytes, 1024 * 1024);
    }
}
