//! Logging
//!
//! The engine accepts an optional [`Logger`] collaborator. Absence of a
//! logger changes no behavior; only trace output is omitted.

use std::sync::Mutex;

use crate::error::ApiError;

/// Log severity, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Informational trace of engine activity.
    Info,
    /// Detail useful when debugging a call.
    Debug,
    /// Something unexpected that the engine recovered from.
    Warning,
    /// A classified request failure.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logger interface.
pub trait Logger: Send + Sync {
    /// Log at info level.
    fn info(&self, message: &str);

    /// Log at debug level.
    fn debug(&self, message: &str);

    /// Log at warning level.
    fn warning(&self, message: &str);

    /// Log a classified failure.
    fn error(&self, error: &ApiError);

    /// Check if a log level is enabled.
    fn is_enabled(&self, level: LogLevel) -> bool;
}

/// No-op logger implementation.
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _error: &ApiError) {}
    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }
}

/// Logger printing to stdout/stderr, filtered by a minimum level.
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    /// Console logger at the default minimum level (warning).
    pub fn new() -> Self {
        Self::with_level(LogLevel::Warning)
    }

    /// Console logger emitting everything at or above `min_level`.
    pub fn with_level(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for ConsoleLogger {
    fn info(&self, message: &str) {
        if self.is_enabled(LogLevel::Info) {
            println!("[{}] {}", LogLevel::Info, message);
        }
    }

    fn debug(&self, message: &str) {
        if self.is_enabled(LogLevel::Debug) {
            println!("[{}] {}", LogLevel::Debug, message);
        }
    }

    fn warning(&self, message: &str) {
        if self.is_enabled(LogLevel::Warning) {
            eprintln!("[{}] {}", LogLevel::Warning, message);
        }
    }

    fn error(&self, error: &ApiError) {
        if self.is_enabled(LogLevel::Error) {
            eprintln!("[{}] {} ({})", LogLevel::Error, error, error.kind());
        }
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }
}

/// Log entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity of the entry.
    pub level: LogLevel,
    /// Rendered message.
    pub message: String,
}

/// In-memory logger for testing.
#[derive(Default)]
pub struct InMemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl InMemoryLogger {
    /// Create new in-memory logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all log entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries at `level`.
    pub fn entries_at(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.level == level)
            .cloned()
            .collect()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn push(&self, level: LogLevel, message: String) {
        self.entries.lock().unwrap().push(LogEntry { level, message });
    }
}

impl Logger for InMemoryLogger {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message.to_string());
    }

    fn debug(&self, message: &str) {
        self.push(LogLevel::Debug, message.to_string());
    }

    fn warning(&self, message: &str) {
        self.push(LogLevel::Warning, message.to_string());
    }

    fn error(&self, error: &ApiError) {
        self.push(LogLevel::Error, error.to_string());
    }

    fn is_enabled(&self, _level: LogLevel) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn levels_order_least_severe_first() {
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn console_filters_below_minimum() {
        let logger = ConsoleLogger::with_level(LogLevel::Warning);
        assert!(!logger.is_enabled(LogLevel::Info));
        assert!(!logger.is_enabled(LogLevel::Debug));
        assert!(logger.is_enabled(LogLevel::Warning));
        assert!(logger.is_enabled(LogLevel::Error));
    }

    #[test]
    fn in_memory_captures_every_level() {
        let logger = InMemoryLogger::new();
        logger.info("starting");
        logger.debug("detail");
        logger.warning("odd");
        logger.error(&ApiError::Other {
            source: TransportError::Timeout { seconds: 30 },
        });

        assert_eq!(logger.entries().len(), 4);
        let errors = logger.entries_at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("timed out"));

        logger.clear();
        assert!(logger.entries().is_empty());
    }

    #[test]
    fn noop_reports_disabled() {
        let logger = NoOpLogger;
        assert!(!logger.is_enabled(LogLevel::Error));
    }
}
