//! Parse Apache access logs with the format strings of mod_log_config.
//!
//! A format string such as `%h %l %u %t "%r" %s %b` is compiled once into a
//! [`FormatChain`], which is then run over each line of a log:
//!
//! ```
//! use apachelog::{AccessLogParser, COMMON_LOG_FORMAT};
//!
//! let log = "127.0.0.1 - - [12/Dec/2016:10:57:30 +0100] \"GET /a%20b HTTP/1.1\" 200 512\n";
//! let mut parser = AccessLogParser::new(log.as_bytes(), COMMON_LOG_FORMAT).unwrap();
//! let entry = parser.parse_next().unwrap().unwrap();
//! assert_eq!(entry.request_first_line.path(), "/a b");
//! assert_eq!(entry.response_size, 512);
//! ```

pub mod error;
pub mod format;
pub mod readers;
pub mod request_line;
pub mod models;
pub mod directive;
pub mod chain;
pub mod parser;
pub mod config;
pub mod statistics;
pub mod parse_result;
pub mod resilient_parser;
pub mod parallel_parser;
pub mod cli;
pub mod commands;


pub use models::AccessLogEntry;
pub use error::ParseError;
pub use format::FieldKind;
pub use request_line::RequestFirstLine;
pub use directive::Directive;
pub use chain::{ErrorOrder, FormatChain};
pub use parser::{AccessLogParser, LogFormat, COMBINED_LOG_FORMAT, COMMON_LOG_FORMAT};
pub use config::ParserConfig;
pub use statistics::{ParsingStatistics, StatisticsMonitor};
pub use parse_result::ParsedLine;
pub use resilient_parser::ResilientParser;
pub use parallel_parser::{ParallelParser, ParallelResult};
