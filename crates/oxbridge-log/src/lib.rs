//! A minimal, zero-dependency logging crate for the `oxbridge` dispatch layer.
//!
//! The logger is a process-wide singleton holding an atomic level. It is
//! configured once from the `OXBRIDGE_LOG` environment variable on first use
//! and can be changed at runtime afterwards. Records go to stderr so they
//! never interleave with a host application's stdout.
//!
//! # Example
//!
//! ```
//! use oxbridge_log::{debug, error, info, warn, Level};
//!
//! oxbridge_log::set_level(Level::Debug);
//!
//! let selector = "count";
//! debug!("resolved selector {selector}");
//! info!("class {} available", "NSObject");
//! warn!("autorelease with no pool in place");
//! error!("unrecognized selector");
//! ```

use std::fmt::{self, Arguments};
use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Environment variable read once to pick the initial level.
pub const LEVEL_ENV: &str = "OXBRIDGE_LOG";

/// Level used when `OXBRIDGE_LOG` is unset or unparsable.
pub const DEFAULT_LEVEL: Level = Level::Warn;

/// Severity of a log record.
///
/// Lower numeric values are more severe; a logger set to `Info` lets
/// `Error`, `Warn` and `Info` through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Broken invariants and fatal dispatch failures.
    Error = 0,
    /// Recoverable misuse, e.g. autoreleasing outside any pool.
    Warn = 1,
    /// Coarse lifecycle events.
    Info = 2,
    /// Cache misses and registrations.
    Debug = 3,
    /// Per-call detail.
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Upper-case name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError {
    input: String,
}

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log level: {:?}", self.input)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring ASCII case.
    ///
    /// ```
    /// use oxbridge_log::Level;
    ///
    /// assert_eq!("trace".parse::<Level>(), Ok(Level::Trace));
    /// assert_eq!("WARN".parse::<Level>(), Ok(Level::Warn));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Level::Error,
            "WARN" | "WARNING" => Level::Warn,
            "INFO" => Level::Info,
            "DEBUG" => Level::Debug,
            "TRACE" => Level::Trace,
            _ => {
                return Err(ParseLevelError {
                    input: s.to_owned(),
                });
            }
        };
        Ok(level)
    }
}

/// The process-wide logger.
///
/// Obtained through [`get_logger`]; all state is atomic so records may be
/// emitted from any thread.
pub struct Logger {
    level: AtomicU8,
    color: AtomicBool,
}

impl Logger {
    const fn new(level: Level, color: bool) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            color: AtomicBool::new(color),
        }
    }

    /// Builds a logger from `OXBRIDGE_LOG` and `NO_COLOR`.
    fn from_env() -> Self {
        let level = std::env::var(LEVEL_ENV)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_LEVEL);
        let color = std::env::var_os("NO_COLOR").is_none();
        Logger::new(level, color)
    }

    /// Sets the minimum level that will be written.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Returns the current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Enables or disables ANSI colors.
    pub fn set_color(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Relaxed);
    }

    /// Returns `true` if a record at `level` would be written.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    fn format(&self, level: Level, target: &str, args: Arguments<'_>) -> String {
        if self.color.load(Ordering::Relaxed) {
            format!("{}[{level}]\x1b[0m {target}: {args}", level.color_code())
        } else {
            format!("[{level}] {target}: {args}")
        }
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, reading the environment on first call.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(Logger::from_env)
}

/// Sets the global minimum level.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Sets the global minimum level from its name.
///
/// # Errors
///
/// Returns [`ParseLevelError`] if `name` is not a level name; the current
/// level is left unchanged.
pub fn set_level_from_str(name: &str) -> Result<(), ParseLevelError> {
    set_level(name.parse()?);
    Ok(())
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments<'_>) {
    let logger = get_logger();
    if !logger.enabled(level) {
        return;
    }
    let line = logger.format(level, target, args);
    let mut stderr = std::io::stderr().lock();
    // A closed stderr is not worth failing a message send over.
    let _ = writeln!(stderr, "{line}");
}

/// Logs at an explicit level, capturing the caller's module path.
///
/// ```
/// use oxbridge_log::{log, Level};
///
/// log!(level: Level::Info, "pool depth {}", 2);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::get_logger().enabled(level) {
            $crate::__log_with_target(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}
