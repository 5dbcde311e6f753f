//! Logging infrastructure for the editing kernel
//!
//! Structured logging via `tracing`. Native builds install a
//! `tracing-subscriber` registry; in the browser the same events go to the
//! console through `tracing-wasm`.
//!
//! # Usage
//!
//! ```rust
//! use thinkmap::core::logging::init_logging;
//!
//! // Initialize with default settings
//! let _ = init_logging(None, None);
//!
//! // Or with custom level and format
//! let _ = init_logging(Some("debug"), Some("pretty"));
//! ```
//!
//! # Formats
//!
//! - `compact`: single line per event, no targets
//! - `pretty`: multi-line with file/line and span activity
//! - `json`: one JSON object per event for log shipping
//!
//! # Environment Variables
//!
//! - `THINKMAP_LOG_LEVEL`: level or filter directive (`debug`, `info,thinkmap::llm=trace`)
//! - `RUST_LOG`: standard fallback
//! - `THINKMAP_LOG_FORMAT`: `compact | pretty | json`
//!
//! # Conventions
//!
//! Managers log with structured fields so a fan-out can be followed per model:
//!
//! ```rust,ignore
//! let span = info_span!("call_llm", model = %model);
//! let _enter = span.enter();
//! debug!(diagram_type = %diagram_type, "Dispatching generation request");
//! ```
//!
//! Filter by component with directive syntax:
//!
//! ```bash
//! RUST_LOG="info,thinkmap::llm::engine=debug" thinkmap generate --prompt "water cycle" --type flow_map
//! RUST_LOG="thinkmap::core::event_bus=trace" thinkmap validate --type bubble_map -i spec.json
//! ```

use std::str::FromStr;

#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Environment variable consulted for the log level
pub const LEVEL_ENV: &str = "THINKMAP_LOG_LEVEL";

/// Environment variable consulted for the log format
pub const FORMAT_ENV: &str = "THINKMAP_LOG_FORMAT";

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact single-line format
    #[default]
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Resolved logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive handed to `EnvFilter`
    pub directive: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// Resolve settings from explicit values, then the environment, then defaults
    ///
    /// Level: argument → `THINKMAP_LOG_LEVEL` → `RUST_LOG` → `info`.
    /// Format: argument → `THINKMAP_LOG_FORMAT` → `compact`.
    pub fn resolve(level: Option<&str>, format: Option<&str>) -> Result<Self, String> {
        Self::resolve_with(level, format, |key| std::env::var(key).ok())
    }

    /// Same as [`LogSettings::resolve`] with an injectable environment lookup
    pub fn resolve_with(
        level: Option<&str>,
        format: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        let directive = level
            .map(str::to_string)
            .or_else(|| env(LEVEL_ENV))
            .or_else(|| env("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());

        let format = match format.map(str::to_string).or_else(|| env(FORMAT_ENV)) {
            Some(name) => LogFormat::from_str(&name)?,
            None => LogFormat::default(),
        };

        Ok(Self { directive, format })
    }
}

/// Initialize the global subscriber
///
/// # Arguments
///
/// * `level` - level or filter directive; see [`LogSettings::resolve`]
/// * `format` - `compact | pretty | json`
///
/// # Returns
///
/// An error for an unknown format or when a global subscriber is already set.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = LogSettings::resolve(level, format)
        .map_err(|e| format!("Invalid log format: {}", e))?;

    #[cfg(target_arch = "wasm32")]
    {
        let max_level = match settings.directive.as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        };
        let config = tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(max_level)
            .build();
        tracing_wasm::set_as_global_default_with_config(config);
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let filter = if settings.directive == "off" {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_new(&settings.directive).unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let registry = Registry::default().with(filter);
        match settings.format {
            LogFormat::Compact => registry
                .with(
                    fmt::Layer::default()
                        .with_target(false)
                        .with_span_events(FmtSpan::NONE),
                )
                .try_init()?,
            LogFormat::Pretty => registry
                .with(
                    fmt::Layer::default()
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::ACTIVE)
                        .pretty(),
                )
                .try_init()?,
            LogFormat::Json => registry
                .with(
                    fmt::Layer::default()
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .json(),
                )
                .try_init()?,
        }

        Ok(())
    }
}

/// Initialize logging with default settings (info level, compact format)
pub fn init_default_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None, None)
}
