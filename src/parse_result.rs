use crate::error::ParseError;
use crate::models::AccessLogEntry;

/// Outcome of parsing one line, with its position and timing
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// 1-based line number within its source
    pub line_number: usize,
    pub outcome: Result<AccessLogEntry, ParseError>,
    pub processing_time_micros: u64,
}

impl ParsedLine {
    pub fn new(line_number: usize, outcome: Result<AccessLogEntry, ParseError>, processing_time_micros: u64) -> Self {
        Self {
            line_number,
            outcome,
            processing_time_micros,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn entry(&self) -> Option<&AccessLogEntry> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.outcome.as_ref().err()
    }

    /// Error description prefixed with the line number
    pub fn detailed_error_description(&self) -> Option<String> {
        self.error()
            .map(|error| format!("Line {}: {}", self.line_number, error))
    }
}
