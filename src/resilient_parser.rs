use crate::error::ParseError;
use crate::models::AccessLogEntry;
use crate::parser::AccessLogParser;
use crate::statistics::{ParsingStatistics, StatisticsMonitor};
use std::io::BufRead;
use std::time::Instant;
use tracing::warn;

/// Parser that skips malformed lines and keeps going, recording what it skipped.
///
/// I/O failures from the underlying reader are still returned.
pub struct ResilientParser<R> {
    parser: AccessLogParser<R>,
    statistics_monitor: StatisticsMonitor,
}

impl<R: BufRead> ResilientParser<R> {
    pub fn new(parser: AccessLogParser<R>) -> Self {
        Self {
            parser,
            statistics_monitor: StatisticsMonitor::new(),
        }
    }

    /// Create a resilient parser reporting progress every `report_interval` lines
    pub fn with_monitoring(parser: AccessLogParser<R>, report_interval: usize) -> Self {
        Self {
            parser,
            statistics_monitor: StatisticsMonitor::with_interval(report_interval),
        }
    }

    /// Next well-formed entry, or `Ok(None)` at end of input
    pub fn next_entry(&mut self) -> Result<Option<AccessLogEntry>, ParseError> {
        loop {
            let start_time = Instant::now();
            let result = self.parser.parse_next();
            let processing_time = start_time.elapsed().as_micros() as u64;

            match result {
                Ok(Some(entry)) => {
                    self.statistics_monitor.record_success(&entry, processing_time);
                    return Ok(Some(entry));
                }
                Ok(None) => return Ok(None),
                Err(error @ ParseError::IoError { .. }) => return Err(error),
                Err(error) => {
                    warn!(line = self.parser.line_number(), %error, "skipping malformed access log line");
                    self.statistics_monitor.record_failure(&error, processing_time);
                }
            }
        }
    }

    /// Parse the remaining input, skipping malformed lines
    pub fn parse_all(&mut self) -> Result<Vec<AccessLogEntry>, ParseError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    pub fn get_statistics(&self) -> &ParsingStatistics {
        self.statistics_monitor.get_statistics()
    }

    pub fn reset_statistics(&mut self) {
        self.statistics_monitor.reset();
    }

    pub fn into_inner(self) -> AccessLogParser<R> {
        self.parser
    }
}

impl<R: BufRead> Iterator for ResilientParser<R> {
    type Item = Result<AccessLogEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Cursor, Read};

    const MIXED: &str = "127.0.0.1 - - [12/Dec/2016:10:57:30 +0100] \"GET /a HTTP/1.1\" 200 10\n\
                         10.0.0.1 - - garbage\n\
                         127.0.0.1 - - [12/Dec/2016:10:57:31 +0100] \"GET /b HTTP/1.1 200 10\n\
                         10.0.0.2 - bob [12/Dec/2016:10:57:32 +0100] \"POST /c HTTP/1.1\" 201 -\n";

    #[test]
    fn test_skips_malformed_lines() {
        let parser = AccessLogParser::common(Cursor::new(MIXED)).unwrap();
        let mut resilient = ResilientParser::new(parser);
        let entries = resilient.parse_all().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].request_first_line.path(), "/a");
        assert_eq!(entries[1].remote_user, "bob");

        let stats = resilient.get_statistics();
        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.successful_parses, 2);
        assert_eq!(stats.failed_parses, 2);
        assert_eq!(stats.error_distribution.get("MissingClosingQuote"), Some(&1));
        assert_eq!(stats.error_distribution.get("UnexpectedCharacter"), Some(&1));
    }

    #[test]
    fn test_skips_line_with_invalid_utf8() {
        let mut input = Vec::new();
        input.extend_from_slice(b"127.0.0.1 - - [12/Dec/2016:10:57:30 +0100] \"GET /a HTTP/1.1\" 200 10\n");
        input.extend_from_slice(b"127.0.0.1 - - [12/Dec/2016:10:57:31 +0100] \"GET /caf\xe9 HTTP/1.1\" 200 10\n");
        input.extend_from_slice(b"127.0.0.1 - - [12/Dec/2016:10:57:32 +0100] \"GET /b HTTP/1.1\" 200 10\n");

        let parser = AccessLogParser::common(Cursor::new(input)).unwrap();
        let mut resilient = ResilientParser::new(parser);
        let entries = resilient.parse_all().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].request_first_line.path(), "/b");
        assert_eq!(resilient.get_statistics().error_distribution.get("InvalidEncoding"), Some(&1));
        assert_eq!(resilient.into_inner().line_number(), 3);
    }

    #[test]
    fn test_end_of_input() {
        let parser = AccessLogParser::common(Cursor::new("")).unwrap();
        let mut resilient = ResilientParser::new(parser);
        assert_eq!(resilient.next_entry(), Ok(None));
        assert_eq!(resilient.next_entry(), Ok(None));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_io_errors_propagate() {
        let parser = AccessLogParser::common(FailingReader).unwrap();
        let mut resilient = ResilientParser::new(parser);
        assert!(matches!(resilient.next_entry(), Err(ParseError::IoError { .. })));
    }

    #[test]
    fn test_iterator() {
        let parser = AccessLogParser::with_chain(
            BufReader::new(Cursor::new(MIXED)),
            std::sync::Arc::new(crate::FormatChain::compile(crate::COMMON_LOG_FORMAT).unwrap()),
        );
        let statuses: Vec<String> = ResilientParser::with_monitoring(parser, 0)
            .map(|r| r.unwrap().status)
            .collect();
        assert_eq!(statuses, vec!["200", "201"]);
    }
}
