use crate::chain::FormatChain;
use crate::cli::FormatArgs;
use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::models::AccessLogEntry;
use crate::parallel_parser::ParallelParser;
use crate::parse_result::ParsedLine;
use crate::parser::{AccessLogParser, LogFormat};
use crate::resilient_parser::ResilientParser;
use crate::statistics::ParsingStatistics;
use chrono::{DateTime, Utc};
use glob::glob;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub fn expand_globs(patterns: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern_str = pattern.to_string_lossy();
        if pattern_str.contains('*') || pattern_str.contains('?') || pattern_str.contains('[') {
            for entry in glob(&pattern_str)? {
                files.push(entry?);
            }
        } else {
            files.push(pattern.clone());
        }
    }
    Ok(files)
}

/// Parse a time filter: RFC 3339, a plain date/time, or a relative duration
/// such as "2 hours ago".
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(dt) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(DateTime::from_naive_utc_and_offset(dt.and_hms_opt(0, 0, 0)?, Utc));
    }

    if let Ok(duration) = humantime::parse_duration(s.trim_end_matches(" ago")) {
        let now = Utc::now();
        return Some(now - chrono::Duration::from_std(duration).ok()?);
    }

    None
}

/// Build the parser configuration from a config file and command line overrides
pub fn resolve_config(args: &FormatArgs, threads: usize) -> Result<ParserConfig, ParseError> {
    let mut config = match &args.config {
        Some(path) => ParserConfig::from_json_file(path)?,
        None => ParserConfig::default(),
    };
    if let Some(format) = &args.format {
        config.format = LogFormat::from_name(format);
    }
    if let Some(order) = args.error_order {
        config.error_order = order;
    }
    if threads > 0 {
        config.num_threads = threads;
    }
    config.validate()?;
    Ok(config)
}

/// Reads log files with one compiled chain, sequentially or on a thread pool
pub struct LogScanner {
    config: ParserConfig,
    chain: Arc<FormatChain>,
    parallel: Option<ParallelParser>,
    strict: bool,
}

impl LogScanner {
    pub fn new(config: ParserConfig, strict: bool) -> Result<Self, ParseError> {
        let parallel = if config.num_threads > 1 {
            Some(ParallelParser::from_config(&config)?)
        } else {
            None
        };
        let chain = match &parallel {
            Some(parallel) => Arc::clone(parallel.chain()),
            None => Arc::new(config.compile()?),
        };
        info!(format = %config.format, threads = config.num_threads, "scanner ready");

        Ok(Self {
            strict: strict || !config.skip_malformed,
            config,
            chain,
            parallel,
        })
    }

    pub fn chain(&self) -> &FormatChain {
        &self.chain
    }

    /// Hand every well-formed entry of `path` to `on_entry` until it breaks.
    ///
    /// Malformed lines are skipped with a warning unless the scanner is
    /// strict, in which case the first one aborts the scan.
    pub fn scan_file<F>(&self, path: &Path, mut on_entry: F) -> Result<ParsingStatistics, Box<dyn Error>>
    where
        F: FnMut(&AccessLogEntry) -> Result<ControlFlow<()>, Box<dyn Error>>,
    {
        let file = File::open(path).map_err(|e| ParseError::io(&format!("opening {}", path.display()), &e))?;
        let reader = BufReader::with_capacity(self.config.buffer_size, file);
        let source = path.display();

        if let Some(parallel) = &self.parallel {
            return parallel.parse_reader(reader, |parsed: ParsedLine| -> Result<ControlFlow<()>, Box<dyn Error>> {
                match &parsed.outcome {
                    Ok(entry) => on_entry(entry),
                    Err(error) if self.strict => Err(format!("{}:{}: {}", source, parsed.line_number, error).into()),
                    Err(error) => {
                        warn!(file = %source, line = parsed.line_number, %error, "skipping malformed access log line");
                        Ok(ControlFlow::Continue(()))
                    }
                }
            });
        }

        let parser = AccessLogParser::with_chain(reader, Arc::clone(&self.chain));
        if !self.strict {
            let mut resilient = ResilientParser::new(parser);
            while let Some(entry) = resilient.next_entry()? {
                if on_entry(&entry)?.is_break() {
                    break;
                }
            }
            return Ok(resilient.get_statistics().clone());
        }

        let mut parser = parser;
        let mut statistics = ParsingStatistics::new();
        loop {
            let start_time = Instant::now();
            match parser.parse_next() {
                Ok(None) => break,
                Ok(Some(entry)) => {
                    statistics.record_success(&entry, start_time.elapsed().as_micros() as u64);
                    if on_entry(&entry)?.is_break() {
                        break;
                    }
                }
                Err(error) => return Err(format!("{}:{}: {}", source, parser.line_number(), error).into()),
            }
        }
        Ok(statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ErrorOrder;
    use std::io::Write;

    const LOG: &str = "127.0.0.1 - - [12/Dec/2016:10:57:30 +0100] \"GET /a HTTP/1.1\" 200 10\n\
                       not a log line\n\
                       127.0.0.1 - - [12/Dec/2016:10:57:31 +0100] \"GET /b HTTP/1.1\" 404 -\n";

    fn temp_log(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("apachelog-{}-{}.log", name, std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(LOG.as_bytes()).unwrap();
        path
    }

    fn format_args(format: &str) -> FormatArgs {
        FormatArgs {
            format: Some(format.to_string()),
            config: None,
            error_order: None,
        }
    }

    #[test]
    fn test_parse_time() {
        let dt = parse_time("2016-12-12").unwrap();
        assert_eq!(dt.to_rfc3339(), "2016-12-12T00:00:00+00:00");
        let dt = parse_time("2016-12-12T10:57:30+01:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2016-12-12T09:57:30+00:00");
        assert!(parse_time("1 hour ago").unwrap() < Utc::now());
        assert!(parse_time("yesterday-ish").is_none());
    }

    #[test]
    fn test_resolve_config_overrides() {
        let mut args = format_args("common");
        args.error_order = Some(ErrorOrder::LeftToRight);
        let config = resolve_config(&args, 3).unwrap();
        assert_eq!(config.format, LogFormat::Common);
        assert_eq!(config.error_order, ErrorOrder::LeftToRight);
        assert_eq!(config.num_threads, 3);

        let err = resolve_config(&format_args("%h %Q"), 0).unwrap_err();
        assert_eq!(err.kind_name(), "ConfigurationError");
    }

    #[test]
    fn test_scan_skips_malformed_lines() {
        let path = temp_log("lenient");
        let scanner = LogScanner::new(resolve_config(&format_args("common"), 0).unwrap(), false).unwrap();

        let mut paths = Vec::new();
        let stats = scanner
            .scan_file(&path, |entry| {
                paths.push(entry.request_first_line.path().to_string());
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();

        assert_eq!(paths, vec!["/a", "/b"]);
        assert_eq!(stats.failed_parses, 1);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_scan_skips_invalid_utf8_and_keeps_line_numbers() {
        let path = std::env::temp_dir().join(format!("apachelog-latin1-{}.log", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(b"127.0.0.1 - - [12/Dec/2016:10:57:30 +0100] \"GET /caf\xe9 HTTP/1.1\" 200 10\n")
            .unwrap();
        file.write_all(LOG.as_bytes()).unwrap();

        for threads in [0, 2] {
            let scanner = LogScanner::new(resolve_config(&format_args("common"), threads).unwrap(), false).unwrap();
            let mut paths = Vec::new();
            let stats = scanner
                .scan_file(&path, |entry| {
                    paths.push(entry.request_first_line.path().to_string());
                    Ok(ControlFlow::Continue(()))
                })
                .unwrap();
            assert_eq!(paths, vec!["/a", "/b"]);
            assert_eq!(stats.error_distribution.get("InvalidEncoding"), Some(&1));

            let strict = LogScanner::new(resolve_config(&format_args("common"), threads).unwrap(), true).unwrap();
            let err = strict.scan_file(&path, |_| Ok(ControlFlow::Continue(()))).unwrap_err();
            assert!(err.to_string().contains(":1: line 1 is not valid UTF-8"));
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_strict_scan_reports_line() {
        let path = temp_log("strict");
        let scanner = LogScanner::new(resolve_config(&format_args("common"), 0).unwrap(), true).unwrap();

        let err = scanner
            .scan_file(&path, |_| Ok(ControlFlow::Continue(())))
            .unwrap_err();
        assert!(err.to_string().contains(":2: "));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parallel_scan_stops_on_break() {
        let path = temp_log("parallel");
        let mut config = resolve_config(&format_args("common"), 2).unwrap();
        config.batch_size = 1;
        let scanner = LogScanner::new(config, false).unwrap();

        let mut seen = 0;
        let stats = scanner
            .scan_file(&path, |_| {
                seen += 1;
                Ok(ControlFlow::Break(()))
            })
            .unwrap();

        assert_eq!(seen, 1);
        assert_eq!(stats.total_lines, 1);
        std::fs::remove_file(path).ok();
    }
}
