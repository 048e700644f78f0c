use serde::{Deserialize, Serialize};

/// Observability configuration (structured logging).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default log level filter (overridable via RUST_LOG).
    #[serde(default = "default_level")]
    pub level: String,

    /// Console log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include timestamps in log lines.
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Include source file and line number in log lines.
    #[serde(default)]
    pub file_line: bool,

    /// Log the request's Cookie header in the request-timing middleware.
    /// Off by default; cookies carry session identifiers.
    #[serde(default)]
    pub log_cookies: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            timestamps: default_true(),
            file_line: false,
            log_cookies: false,
        }
    }
}

/// Console log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
