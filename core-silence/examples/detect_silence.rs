//! Print the keep segments of a media file.
//!
//! ```text
//! cargo run -p core-silence --example detect_silence -- talk.mp4 [threshold_db] [min_silence] [padding]
//! ```

use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_silence::{LocalFile, MediaSource, ProcessingSettings, SilenceEngine};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    ) {
        eprintln!("{}", e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(path) = args.first() else {
        eprintln!("usage: detect_silence <file> [threshold_db] [min_silence] [padding]");
        std::process::exit(2);
    };

    let defaults = ProcessingSettings::default();
    let arg = |index: usize, default: f64| -> f64 {
        args.get(index)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    };
    let settings = ProcessingSettings::new(
        arg(1, defaults.threshold_db),
        arg(2, defaults.min_silence_duration),
        arg(3, defaults.padding),
    );

    let source: Arc<dyn MediaSource> = match LocalFile::open(path).await {
        Ok(file) => Arc::new(file),
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    let mut engine = match SilenceEngine::with_defaults() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let result = engine
        .analyze(
            source,
            &settings,
            |message| eprintln!("{}", message),
            |percent| eprintln!("{:>3}%", percent),
            core_silence::CancellationToken::new(),
        )
        .await;

    match result {
        Ok(summary) => {
            for segment in &summary.segments {
                println!("{:.3}\t{:.3}", segment.start, segment.end);
            }
            eprintln!(
                "{} segments, {:.1}s of {:.1}s kept",
                summary.cut_count, summary.new_duration, summary.original_duration
            );
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
