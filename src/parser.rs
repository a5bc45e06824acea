use crate::chain::{ErrorOrder, FormatChain};
use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::models::AccessLogEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use tracing::trace;

/// NCSA extended/combined log format
pub const COMBINED_LOG_FORMAT: &str =
    "%h %l %u %t \"%r\" %s %b \"%{Referer}i\" \"%{User-agent}i\"";

/// Common Log Format
pub const COMMON_LOG_FORMAT: &str = "%h %l %u %t \"%r\" %s %b";

/// A log format, either one of the well-known presets or a custom format string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Combined,
    Common,
    Custom(String),
}

impl LogFormat {
    /// Resolve a preset name, falling back to a custom format string
    pub fn from_name(name: &str) -> Self {
        match name {
            "combined" => LogFormat::Combined,
            "common" => LogFormat::Common,
            custom => LogFormat::Custom(custom.to_string()),
        }
    }

    pub fn format_string(&self) -> &str {
        match self {
            LogFormat::Combined => COMBINED_LOG_FORMAT,
            LogFormat::Common => COMMON_LOG_FORMAT,
            LogFormat::Custom(format) => format,
        }
    }

    pub fn compile(&self, order: ErrorOrder) -> Result<FormatChain, ParseError> {
        FormatChain::compile_with_order(self.format_string(), order)
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Combined => f.write_str("combined"),
            LogFormat::Common => f.write_str("common"),
            LogFormat::Custom(format) => f.write_str(format),
        }
    }
}

/// Streaming parser turning the lines of a reader into access log entries.
///
/// Each parser owns its reader position; share the compiled chain, not the
/// parser, between workers.
pub struct AccessLogParser<R> {
    reader: R,
    chain: Arc<FormatChain>,
    line: Vec<u8>,
    line_number: usize,
    exhausted: bool,
}

impl<R: Read> AccessLogParser<BufReader<R>> {
    /// Create a parser reading from `reader` with the given format string
    pub fn new(reader: R, format: &str) -> Result<Self, ParseError> {
        let chain = FormatChain::compile(format)?;
        Ok(Self::with_chain(BufReader::new(reader), Arc::new(chain)))
    }

    /// Create a parser for the combined log format
    pub fn combined(reader: R) -> Result<Self, ParseError> {
        Self::new(reader, COMBINED_LOG_FORMAT)
    }

    /// Create a parser for the common log format
    pub fn common(reader: R) -> Result<Self, ParseError> {
        Self::new(reader, COMMON_LOG_FORMAT)
    }

    pub fn from_config(reader: R, config: &ParserConfig) -> Result<Self, ParseError> {
        let chain = config.compile()?;
        Ok(Self::with_chain(
            BufReader::with_capacity(config.buffer_size, reader),
            Arc::new(chain),
        ))
    }
}

impl<R: BufRead> AccessLogParser<R> {
    /// Create a parser around an already compiled, possibly shared, chain
    pub fn with_chain(reader: R, chain: Arc<FormatChain>) -> Self {
        Self {
            reader,
            chain,
            line: Vec::new(),
            line_number: 0,
            exhausted: false,
        }
    }

    pub fn format_chain(&self) -> &Arc<FormatChain> {
        &self.chain
    }

    /// Number of lines read so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Parse the next access log entry.
    ///
    /// Returns `Ok(None)` once the reader is exhausted, and on every call after
    /// that. A malformed line yields the error of the directive that failed,
    /// and a line that is not UTF-8 yields `InvalidEncoding`; either way the
    /// following call moves on to the next line.
    pub fn parse_next(&mut self) -> Result<Option<AccessLogEntry>, ParseError> {
        if self.exhausted {
            return Ok(None);
        }

        self.line.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.line)
            .map_err(|e| ParseError::io("reading access log line", &e))?;
        if read == 0 {
            trace!(lines = self.line_number, "end of access log stream");
            self.exhausted = true;
            return Ok(None);
        }
        self.line_number += 1;

        let line_number = self.line_number;
        let line = std::str::from_utf8(&self.line).map_err(|_| ParseError::InvalidEncoding { line_number })?;
        self.chain.parse_line(line).map(Some)
    }
}

impl<R: BufRead> Iterator for AccessLogParser<R> {
    type Item = Result<AccessLogEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parse_next().transpose()
    }
}
