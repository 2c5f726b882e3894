//! Logging for opensequel.
//!
//! A small leveled logger that writes to stderr and is configured entirely
//! through environment variables, so applications embedding the model layer
//! can turn on request tracing without wiring a subscriber.
//!
//! # Usage
//!
//! ```rust
//! use opensequel_log::{debug, info, warn};
//!
//! info!("connected to {}", "http://localhost:9200");
//! debug!({ method = "GET", path = "/movies/_doc/1" }, "sending request");
//! warn!(target: "opensequel::response", "engine rejected query");
//! ```
//!
//! # Environment Variables
//!
//! - `OPENSEQUEL_DEBUG=1` - Enable debug logging
//! - `OPENSEQUEL_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `OPENSEQUEL_LOG_FORMAT=pretty|compact|json` - Output format
//! - `OPENSEQUEL_LOG_TIMESTAMPS=1|0` - Include timestamps

use once_cell::sync::Lazy;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Most verbose.
    Trace = 0,
    /// Request-level detail.
    Debug = 1,
    /// Lifecycle events.
    Info = 2,
    /// Classified failures.
    Warn = 3,
    /// Unrecoverable problems.
    Error = 4,
    /// Nothing is logged.
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Upper-case level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `2024-01-01 12:00:00.000 DEBUG [target] message key=value`
    Pretty,
    /// `12:00:00 D target: message key=value`
    Compact,
    /// One JSON object per line.
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Warn as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Debug mode forces debug-level output.
    pub debug: bool,
    /// Minimum level written.
    pub level: Level,
    /// Output format.
    pub format: Format,
    /// Whether lines carry a timestamp.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Warn,
            format: Format::Compact,
            timestamps: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Read the configuration from `OPENSEQUEL_*` environment variables and
    /// publish the resulting level to the global filter.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let debug = env_flag("OPENSEQUEL_DEBUG").unwrap_or(defaults.debug);

        let level = env::var("OPENSEQUEL_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        let format = env::var("OPENSEQUEL_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(defaults.format);

        let timestamps = env_flag("OPENSEQUEL_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps);

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            timestamps,
        }
    }
}

/// Force the configuration to be read now instead of on the first log call.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Whether debug mode is on.
#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Whether `level` passes the current filter.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    Lazy::force(&CONFIG);
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Current minimum level.
pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Change the minimum level at runtime.
pub fn set_level(level: Level) {
    Lazy::force(&CONFIG);
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode at runtime. Enabling it lowers the level to `Debug`.
pub fn set_debug(enabled: bool) {
    Lazy::force(&CONFIG);
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        LOG_LEVEL.store(Level::Debug as u8, Ordering::SeqCst);
    }
}

/// The configuration read at startup.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Write one log line. Used by the macros.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str, fields: &[(&str, String)]) {
    if !is_level_enabled(level) {
        return;
    }

    let line = render(config(), level, target, message, fields);
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
}

fn render(
    config: &LogConfig,
    level: Level,
    target: &str,
    message: &str,
    fields: &[(&str, String)],
) -> String {
    match config.format {
        Format::Pretty => {
            let mut line = String::new();
            if config.timestamps {
                line.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
            }
            line.push_str(&format!("{:5} [{}] {}", level.as_str(), target, message));
            push_fields(&mut line, fields);
            line
        }
        Format::Compact => {
            let mut line = String::new();
            if config.timestamps {
                line.push_str(&chrono::Local::now().format("%H:%M:%S ").to_string());
            }
            let initial = level.as_str().chars().next().unwrap_or('?');
            line.push_str(&format!("{} {}: {}", initial, target, message));
            push_fields(&mut line, fields);
            line
        }
        Format::Json => render_json(config, level, target, message, fields),
    }
}

fn push_fields(line: &mut String, fields: &[(&str, String)]) {
    for (key, value) in fields {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        line.push_str(value);
    }
}

#[cfg(feature = "json")]
fn render_json(
    config: &LogConfig,
    level: Level,
    target: &str,
    message: &str,
    fields: &[(&str, String)],
) -> String {
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Entry<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        level: &'a str,
        target: &'a str,
        message: &'a str,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        fields: BTreeMap<&'a str, &'a str>,
    }

    let entry = Entry {
        timestamp: config.timestamps.then(|| chrono::Utc::now().to_rfc3339()),
        level: level.as_str(),
        target,
        message,
        fields: fields.iter().map(|(k, v)| (*k, v.as_str())).collect(),
    };

    serde_json::to_string(&entry).unwrap_or_else(|_| message.to_string())
}

#[cfg(not(feature = "json"))]
fn render_json(
    config: &LogConfig,
    level: Level,
    target: &str,
    message: &str,
    fields: &[(&str, String)],
) -> String {
    // Without serde the compact layout is the closest useful fallback.
    render(
        &LogConfig {
            format: Format::Compact,
            ..config.clone()
        },
        level,
        target,
        message,
        fields,
    )
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, $target, &format!($($arg)+), &[]);
        }
    };
    ($level:expr, { $($key:ident = $value:expr),* $(,)? }, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log(
                $level,
                module_path!(),
                &format!($($arg)+),
                &[$((stringify!($key), ($value).to_string())),*],
            );
        }
    };
    ($level:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, module_path!(), &format!($($arg)+), &[]);
        }
    };
}

/// Log at trace level.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Trace, $($arg)+) };
}

/// Log at debug level.
///
/// ```rust
/// use opensequel_log::debug;
///
/// let index = "movies";
/// debug!("searching {}", index);
/// debug!({ index = index, size = 10 }, "search");
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Debug, $($arg)+) };
}

/// Log at info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Info, $($arg)+) };
}

/// Log at warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Warn, $($arg)+) };
}

/// Log at error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Error, $($arg)+) };
}
