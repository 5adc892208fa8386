// Logger - Trace logging for CPU and drive execution
//
// Provides:
// - CPU trace logging
// - Drive trace logging
// - Configurable log levels
// - Log output to file or memory

use super::cpu::CpuState;
use super::drive::DriveState;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warning,
    /// Info, warnings, and errors
    Info,
    /// Debug information (includes traces)
    Debug,
    /// Verbose trace logging
    Trace,
}

/// Trace entry
#[derive(Debug, Clone)]
pub enum TraceEntry {
    /// C64 CPU state trace
    Cpu(CpuState),
    /// Drive state trace
    Drive(DriveState),
    /// Custom message
    Message(String),
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEntry::Cpu(state) => write!(f, "CPU: {}", state),
            TraceEntry::Drive(state) => write!(f, "DRV: {}", state),
            TraceEntry::Message(msg) => write!(f, "{}", msg),
        }
    }
}

/// Logger
///
/// Handles trace logging for CPU and drive execution.
/// Can log to memory buffer or file.
pub struct Logger {
    /// Current log level
    log_level: LogLevel,

    /// Enable C64 CPU trace logging
    cpu_trace: bool,

    /// Enable drive trace logging
    drive_trace: bool,

    /// In-memory trace buffer
    trace_buffer: Vec<TraceEntry>,

    /// Maximum number of entries in trace buffer (0 = unlimited)
    max_buffer_size: usize,

    /// Output file
    output_file: Option<File>,
}

impl Logger {
    /// Create a new logger with default settings
    pub fn new() -> Self {
        Logger {
            log_level: LogLevel::None,
            cpu_trace: false,
            drive_trace: false,
            trace_buffer: Vec::new(),
            max_buffer_size: 10000,
            output_file: None,
        }
    }

    /// Set the log level
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    /// Get the current log level
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Enable CPU trace logging
    pub fn enable_cpu_trace(&mut self) {
        self.cpu_trace = true;
    }

    /// Disable CPU trace logging
    pub fn disable_cpu_trace(&mut self) {
        self.cpu_trace = false;
    }

    /// Check if CPU trace logging is enabled
    pub fn is_cpu_trace_enabled(&self) -> bool {
        self.cpu_trace && self.log_level >= LogLevel::Trace
    }

    /// Enable drive trace logging
    pub fn enable_drive_trace(&mut self) {
        self.drive_trace = true;
    }

    /// Disable drive trace logging
    pub fn disable_drive_trace(&mut self) {
        self.drive_trace = false;
    }

    /// Check if drive trace logging is enabled
    pub fn is_drive_trace_enabled(&self) -> bool {
        self.drive_trace && self.log_level >= LogLevel::Trace
    }

    /// Set maximum trace buffer size.
    ///
    /// When the buffer exceeds this size, old entries are removed.
    /// Set to 0 for unlimited size.
    pub fn set_max_buffer_size(&mut self, size: usize) {
        self.max_buffer_size = size;

        if size > 0 && self.trace_buffer.len() > size {
            self.trace_buffer.drain(0..self.trace_buffer.len() - size);
        }
    }

    /// Open a log file for output
    pub fn open_log_file<P: AsRef<Path>>(&mut self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        self.output_file = Some(file);
        Ok(())
    }

    /// Close the log file
    pub fn close_log_file(&mut self) {
        self.output_file = None;
    }

    /// Log a CPU state
    pub fn log_cpu_state(&mut self, state: &CpuState) {
        if !self.is_cpu_trace_enabled() {
            return;
        }
        self.add_entry(TraceEntry::Cpu(state.clone()));
    }

    /// Log a drive state
    pub fn log_drive_state(&mut self, state: &DriveState) {
        if !self.is_drive_trace_enabled() {
            return;
        }
        self.add_entry(TraceEntry::Drive(state.clone()));
    }

    /// Log a message at the given level
    pub fn log_message(&mut self, level: LogLevel, message: String) {
        if level > self.log_level {
            return;
        }
        self.add_entry(TraceEntry::Message(message));
    }

    /// Add an entry to the trace buffer and optionally write to file
    fn add_entry(&mut self, entry: TraceEntry) {
        if let Some(ref mut file) = self.output_file {
            let _ = writeln!(file, "{}", entry);
        }

        self.trace_buffer.push(entry);

        if self.max_buffer_size > 0 && self.trace_buffer.len() > self.max_buffer_size {
            self.trace_buffer.remove(0);
        }
    }

    /// Get the trace buffer
    pub fn trace_buffer(&self) -> &[TraceEntry] {
        &self.trace_buffer
    }

    /// Clear the trace buffer
    pub fn clear_buffer(&mut self) {
        self.trace_buffer.clear();
    }

    /// Get the last N trace entries
    pub fn last_entries(&self, count: usize) -> &[TraceEntry] {
        let start = self.trace_buffer.len().saturating_sub(count);
        &self.trace_buffer[start..]
    }

    /// Format the entire trace buffer as a string
    pub fn format_trace_buffer(&self) -> String {
        let mut output = String::new();
        for entry in &self.trace_buffer {
            output.push_str(&format!("{}\n", entry));
        }
        output
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_creation() {
        let logger = Logger::new();
        assert_eq!(logger.log_level(), LogLevel::None);
        assert!(!logger.is_cpu_trace_enabled());
        assert!(!logger.is_drive_trace_enabled());
    }

    #[test]
    fn test_trace_requires_trace_level() {
        let mut logger = Logger::new();

        logger.enable_drive_trace();
        logger.set_log_level(LogLevel::Debug);
        assert!(!logger.is_drive_trace_enabled());

        logger.set_log_level(LogLevel::Trace);
        assert!(logger.is_drive_trace_enabled());
    }

    #[test]
    fn test_log_message_respects_level() {
        let mut logger = Logger::new();
        logger.set_log_level(LogLevel::Info);

        logger.log_message(LogLevel::Info, "kept".to_string());
        logger.log_message(LogLevel::Debug, "filtered".to_string());

        assert_eq!(logger.trace_buffer().len(), 1);
        match &logger.trace_buffer()[0] {
            TraceEntry::Message(msg) => assert_eq!(msg, "kept"),
            _ => panic!("Expected Message entry"),
        }
    }

    #[test]
    fn test_max_buffer_size() {
        let mut logger = Logger::new();
        logger.set_log_level(LogLevel::Info);
        logger.set_max_buffer_size(3);

        for i in 0..5 {
            logger.log_message(LogLevel::Info, format!("{}", i));
        }

        assert_eq!(logger.trace_buffer().len(), 3);
        match &logger.trace_buffer()[0] {
            TraceEntry::Message(msg) => assert_eq!(msg, "2"),
            _ => panic!("Expected Message entry"),
        }
    }

    #[test]
    fn test_last_entries() {
        let mut logger = Logger::new();
        logger.set_log_level(LogLevel::Info);

        for i in 0..4 {
            logger.log_message(LogLevel::Info, format!("{}", i));
        }

        let last = logger.last_entries(2);
        assert_eq!(last.len(), 2);
        match &last[1] {
            TraceEntry::Message(msg) => assert_eq!(msg, "3"),
            _ => panic!("Expected Message entry"),
        }
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::None < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }
}
