//! Helpers shared by handler and router tests.

use axum_test::TestServer;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::config::{Config, SourceConfig};
use crate::dashboard::{LogRecord, MemorySource};

/// Configuration for an in-process server: file source, no metrics, no export.
pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        // Replaced by the in-memory source in `create_test_server`
        source: SourceConfig::File {
            path: PathBuf::from("logs.json"),
        },
        // The Prometheus recorder can only be installed once per process
        enable_metrics: false,
        enable_otel_export: false,
        ..Default::default()
    }
}

/// Build a test server over a fixed set of records.
pub fn create_test_server(records: Vec<LogRecord>) -> TestServer {
    let config = create_test_config();
    let app = crate::Application::with_source(config, std::sync::Arc::new(MemorySource::new(records)), None)
        .expect("Failed to create application");
    app.into_test_server()
}

/// A record with the given total tokens, split 60/40 between prompt and completion, costing a
/// thousandth per token and taking one second.
pub fn log_record(timestamp: DateTime<Utc>, provider: &str, model: &str, status: &str, total_tokens: i64) -> LogRecord {
    let completion_tokens = total_tokens * 2 / 5;
    LogRecord {
        timestamp,
        provider: provider.to_string(),
        model: model.to_string(),
        status: status.to_string(),
        prompt_tokens: total_tokens - completion_tokens,
        completion_tokens,
        total_tokens,
        cost: Decimal::new(total_tokens, 3),
        latency: 1000,
    }
}
