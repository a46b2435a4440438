//! Integration tests for logging system
//!
//! A global subscriber can only be installed once per process, so everything
//! that depends on `init_logging` lives in a single test.

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_url, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[tokio::test]
async fn test_global_logging_forwards_to_sink() {
    let sink = Arc::new(RecordingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_filter("debug")
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first initialization succeeds");

    tracing::debug!(target: "core_playback::session", url = "https://cdn.example.com/a.mp3?sig=x", "Loading media");
    tracing::trace!("below the sink level");

    // Sink calls are spawned on the current runtime.
    for _ in 0..50 {
        if !sink.messages().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let entries = sink.entries.lock().unwrap().clone();
    let entry = entries
        .iter()
        .find(|entry| entry.message == "Loading media")
        .expect("event forwarded to sink");
    assert_eq!(entry.level, LogLevel::Debug);
    assert_eq!(
        entry.fields.get("url"),
        Some(&"https://cdn.example.com/a.mp3".to_string())
    );
    assert!(!sink.messages().iter().any(|m| m == "below the sink level"));

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_media_url_redaction() {
    assert_eq!(
        redact_url("https://example.com/stream/1.m4a?token=abcdef"),
        "https://example.com/stream/1.m4a"
    );
    assert_eq!(
        redact_url("content://media/external/audio/media/42"),
        "content://media/external/audio/media/42"
    );
    assert_eq!(redact_url("C:\\Music\\a.mp3"), "a.mp3");
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/data/user/0/com.example/files/cover.jpg"), "cover.jpg");
    assert_eq!(strip_path("D:\\data\\file.txt"), "file.txt");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_format_selection() {
    let config = LoggingConfig::default();

    #[cfg(debug_assertions)]
    assert_eq!(config.format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(config.format, LogFormat::Json);
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
