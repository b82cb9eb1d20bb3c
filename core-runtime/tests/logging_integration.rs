//! Integration tests for logging initialisation
//!
//! A global subscriber can be installed once per process, so the install
//! path is covered by a single test in this binary.

use core_runtime::logging::{init_logging, strip_path, LogFormat, LogLevel, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_logging_installs_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    init_logging(config.clone()).unwrap();
    tracing::debug!(file = strip_path("/tmp/fixtures/sine.flac"), "Subscriber installed");

    assert!(matches!(
        init_logging(config),
        Err(Error::AlreadyInitialized(_))
    ));
}

#[test]
fn test_config_from_json() {
    let config: LoggingConfig = serde_json::from_str(
        r#"{ "format": "json", "level": "trace", "filter": "core_flac=trace" }"#,
    )
    .unwrap();

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Trace);
    assert_eq!(config.filter.as_deref(), Some("core_flac=trace"));
    assert!(config.enable_spans);
    assert!(config.display_target);
    assert!(!config.display_thread_info);
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/home/user/music/album/01.flac"), "01.flac");
    assert_eq!(strip_path("C:\\Users\\John\\Music\\01.flac"), "01.flac");
    assert_eq!(strip_path("01.flac"), "01.flac");
    assert_eq!(strip_path(""), "");
}
