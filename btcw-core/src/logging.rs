//! Logging setup for transaction building
//!
//! Everything in the crate logs through the `log` facade. This module wires
//! an `env_logger` backend once per process and provides helpers that keep
//! addresses and txids truncated in log output.
//!
//! # Security Considerations
//!
//! - Private keys are never logged;
//!   [`SensitiveString`](crate::types::SensitiveString) redacts itself
//! - Addresses and transaction ids are truncated with [`sanitize_for_logging`]
//! - JSON output is available for machine processing
//!
//! # Usage
//!
//! ```
//! use btcw_core::logging::{self, LogConfig, LogLevel};
//!
//! logging::init(&LogConfig::default()).expect("Failed to initialize logging");
//! logging::log_transfer(LogLevel::Info, "transfer started", None);
//! ```

use chrono::Local;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write as IoWrite;
use std::sync::{Mutex, Once};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Where in the pipeline a structured log event comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogContext {
    /// Coin selection and fee estimation
    Selection,
    /// Key handling and signing
    Signing,
    /// Indexer and node traffic
    Network,
    /// The transfer pipeline as a whole
    Transfer,
}

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Path to log file (None for console-only)
    pub log_file: Option<String>,
    pub include_timestamps: bool,
    pub include_source_location: bool,
    /// One JSON object per line instead of human-readable text
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_file: None,
            include_timestamps: true,
            include_source_location: false,
            json_format: false,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

static LOGGING_INIT: Once = Once::new();
static INIT_ERROR: Mutex<Option<String>> = Mutex::new(None);

/// Initialize the logging system with the given configuration
///
/// Only the first call configures the backend. Later calls return the
/// outcome of that first call. A logger installed by someone else (common in
/// tests) is accepted as is.
///
/// # Arguments
/// * `config` - Configuration for the logging system
///
/// # Returns
/// * `Ok(())`, or a description of why the log file could not be opened
pub fn init(config: &LogConfig) -> Result<(), String> {
    let config = config.clone();

    LOGGING_INIT.call_once(|| {
        if let Err(e) = install(&config) {
            if let Ok(mut slot) = INIT_ERROR.lock() {
                *slot = Some(e);
            }
        }
    });

    match INIT_ERROR.lock() {
        Ok(slot) => match slot.as_ref() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        },
        Err(_) => Err("logging state poisoned".to_string()),
    }
}

fn install(config: &LogConfig) -> Result<(), String> {
    let include_timestamps = config.include_timestamps;
    let include_source_location = config.include_source_location;
    let json_format = config.json_format;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level.into());

    builder.format(move |buf, record| {
        let timestamp = if include_timestamps {
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        } else {
            String::new()
        };

        let source_location = if include_source_location {
            format!(
                " [{}:{}]",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0)
            )
        } else {
            String::new()
        };

        if json_format {
            let line = json!({
                "timestamp": timestamp,
                "level": record.level().to_string(),
                "target": record.target(),
                "location": source_location.trim(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        } else {
            let mut style = buf.style();
            style.set_bold(true);
            if include_timestamps {
                write!(buf, "{} ", timestamp)?;
            }
            writeln!(
                buf,
                "[{}{}] {}",
                style.value(record.level()),
                source_location,
                record.args()
            )
        }
    });

    if let Some(file_path) = &config.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .map_err(|e| format!("Failed to open log file {}: {}", file_path, e))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    // An already installed logger is fine
    let _ = builder.try_init();
    Ok(())
}

/// Truncate a potentially sensitive value for logging
///
/// Keeps the first and last four characters; short values are masked.
pub fn sanitize_for_logging(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= 8 {
        return "*****".to_string();
    }

    let first: String = chars[..4].iter().collect();
    let last: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", first, last)
}

/// Build a JSON parameter map from already sanitized values
pub fn log_params(params: Vec<(&str, String)>) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in params {
        map.insert(name.to_string(), serde_json::Value::String(value));
    }
    serde_json::Value::Object(map)
}

fn log_with_context(
    level: LogLevel,
    context: LogContext,
    message: &str,
    params: Option<serde_json::Value>,
) {
    match params {
        Some(params) => log::log!(level.into(), "[{:?}] {} {}", context, message, params),
        None => log::log!(level.into(), "[{:?}] {}", context, message),
    }
}

/// Log a transfer pipeline event
pub fn log_transfer(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    log_with_context(level, LogContext::Transfer, message, params);
}

/// Log an indexer or node event
pub fn log_network(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    log_with_context(level, LogContext::Network, message, params);
}

/// Log a selection event
pub fn log_selection(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    log_with_context(level, LogContext::Selection, message, params);
}

/// Log a signing event
pub fn log_signing(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    log_with_context(level, LogContext::Signing, message, params);
}
