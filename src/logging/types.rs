//! Core logging types: the [`Log`] trait and captured entries.

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) emits through `tracing`;
/// [`MemoryLog`](super::memory::MemoryLog) keeps entries in memory so engine
/// code can be inspected in tests.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
}

/// Severity/styling class of a captured message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Stage header.
    Stage,
    /// Informational.
    Info,
    /// Debug.
    Debug,
    /// Warning.
    Warn,
    /// Error.
    Error,
    /// Dry-run intent.
    DryRun,
}

/// A single captured log message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Level the message was logged at.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn log_level_equality() {
        assert_eq!(LogLevel::Info, LogLevel::Info);
        assert_ne!(LogLevel::Warn, LogLevel::Error);
        assert_ne!(LogLevel::Stage, LogLevel::DryRun);
    }

    #[test]
    fn log_entry_clone() {
        let entry = LogEntry {
            level: LogLevel::Warn,
            message: "conflict".to_string(),
        };
        assert_eq!(entry.clone(), entry);
    }
}
