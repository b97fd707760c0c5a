//! Integration tests for logging system

use core_runtime::logging::{init_logging, strip_path, LogFormat, LogLevel, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_logging_initialization() {
    // A global subscriber can only be installed once per process, so the
    // second call must report a configuration error instead of panicking.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.enable_spans);

    let first = init_logging(config.clone());
    let second = init_logging(config);
    assert!(first.is_ok());
    assert!(matches!(second, Err(Error::Config(_))));

    tracing::info!(file = %strip_path("/tmp/interview.mp4"), "Logging initialized");
}

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_silence=loudest");
    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}

#[test]
fn test_log_format_serde() {
    let json = serde_json::to_string(&LogFormat::Json).unwrap();
    assert_eq!(json, "\"json\"");
    let level: LogLevel = serde_json::from_str("\"warn\"").unwrap();
    assert_eq!(level, LogLevel::Warn);
}
