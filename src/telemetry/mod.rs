//! Engine-level logging seam.

pub mod logging;

pub use logging::{ConsoleLogger, InMemoryLogger, LogEntry, LogLevel, Logger, NoOpLogger};
