use crate::chain::FormatChain;
use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::parse_result::ParsedLine;
use crate::parser::AccessLogParser;
use crate::statistics::ParsingStatistics;
use rayon::prelude::*;
use std::io::{BufRead, BufReader, Read};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Result from parallel processing
#[derive(Debug, Clone)]
pub struct ParallelResult {
    pub results: Vec<ParsedLine>,
    pub statistics: ParsingStatistics,
}

impl ParallelResult {
    fn from_results(results: Vec<ParsedLine>) -> Self {
        let statistics = aggregate(&results);
        Self { results, statistics }
    }
}

fn aggregate(results: &[ParsedLine]) -> ParsingStatistics {
    let mut statistics = ParsingStatistics::new();
    for parsed in results {
        record(&mut statistics, parsed);
    }
    statistics
}

fn record(statistics: &mut ParsingStatistics, parsed: &ParsedLine) {
    match &parsed.outcome {
        Ok(entry) => statistics.record_success(entry, parsed.processing_time_micros),
        Err(error) => statistics.record_failure(error, parsed.processing_time_micros),
    }
}

fn parse_timed(chain: &FormatChain, line: &str, line_number: usize) -> ParsedLine {
    let start_time = Instant::now();
    let outcome = chain.parse_line(line);
    ParsedLine::new(line_number, outcome, start_time.elapsed().as_micros() as u64)
}

fn parse_raw(chain: &FormatChain, raw: &[u8], line_number: usize) -> ParsedLine {
    match std::str::from_utf8(raw) {
        Ok(line) => parse_timed(chain, line, line_number),
        Err(_) => ParsedLine::new(line_number, Err(ParseError::InvalidEncoding { line_number }), 0),
    }
}

/// Parses lines on a rayon pool, all workers sharing one compiled chain.
pub struct ParallelParser {
    chain: Arc<FormatChain>,
    pool: Option<rayon::ThreadPool>,
    batch_size: usize,
    buffer_size: usize,
}

impl ParallelParser {
    /// Create a parallel parser on the global rayon pool
    pub fn new(chain: Arc<FormatChain>) -> Self {
        let defaults = ParserConfig::default();
        Self {
            chain,
            pool: None,
            batch_size: defaults.batch_size,
            buffer_size: defaults.buffer_size,
        }
    }

    /// Create a parallel parser, with a dedicated pool when `num_threads` is
    /// above 1. Otherwise work runs on the global rayon pool.
    pub fn from_config(config: &ParserConfig) -> Result<Self, ParseError> {
        config.validate()?;
        let pool = if config.num_threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.num_threads)
                .build()
                .map_err(|e| ParseError::ConfigurationError {
                    parameter: "num_threads".to_string(),
                    error_message: e.to_string(),
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            chain: Arc::new(config.compile()?),
            pool,
            batch_size: config.batch_size,
            buffer_size: config.buffer_size,
        })
    }

    pub fn chain(&self) -> &Arc<FormatChain> {
        &self.chain
    }

    fn install<T: Send>(&self, work: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }

    /// Parse lines in parallel, keeping input order in the results
    pub fn parse_lines_parallel<S: AsRef<str> + Sync>(&self, lines: &[S]) -> ParallelResult {
        let results = self.parse_batch(lines, 0, |chain, line, line_number| {
            parse_timed(chain, line.as_ref(), line_number)
        });
        ParallelResult::from_results(results)
    }

    fn parse_batch<T, F>(&self, lines: &[T], first_line: usize, parse: F) -> Vec<ParsedLine>
    where
        T: Sync,
        F: Fn(&FormatChain, &T, usize) -> ParsedLine + Sync,
    {
        let chain: &FormatChain = &self.chain;
        self.install(|| {
            lines
                .par_iter()
                .enumerate()
                .map(|(i, line)| parse(chain, line, first_line + i + 1))
                .collect()
        })
    }

    /// Read `reader` in batches and parse each batch in parallel, handing the
    /// parsed lines to `on_line` in input order. The scan stops at the first
    /// error or `ControlFlow::Break` from `on_line`; the returned statistics
    /// cover the lines handed over up to that point.
    pub fn parse_reader<R, E, F>(&self, mut reader: R, mut on_line: F) -> Result<ParsingStatistics, E>
    where
        R: BufRead,
        E: From<ParseError>,
        F: FnMut(ParsedLine) -> Result<ControlFlow<()>, E>,
    {
        let mut statistics = ParsingStatistics::new();
        let mut line_count = 0;

        loop {
            let mut batch = Vec::with_capacity(self.batch_size);
            while batch.len() < self.batch_size {
                let mut line = Vec::new();
                let read = reader
                    .read_until(b'\n', &mut line)
                    .map_err(|e| ParseError::io("reading access log line", &e))?;
                if read == 0 {
                    break;
                }
                batch.push(line);
            }
            if batch.is_empty() {
                break;
            }

            let results = self.parse_batch(&batch, line_count, |chain, raw, line_number| {
                parse_raw(chain, raw, line_number)
            });
            line_count += batch.len();
            debug!(lines = batch.len(), total = line_count, "parsed batch");
            for parsed in results {
                record(&mut statistics, &parsed);
                if on_line(parsed)?.is_break() {
                    debug!(lines_read = line_count, "scan stopped by caller");
                    return Ok(statistics);
                }
            }
        }

        Ok(statistics)
    }

    /// Parse independent streams in parallel, one sequential parser per stream
    pub fn parse_streams_parallel<R: Read + Send>(
        &self,
        streams: Vec<(R, String)>,
    ) -> Vec<(String, Result<ParallelResult, ParseError>)> {
        self.install(|| {
            streams
                .into_par_iter()
                .map(|(reader, source)| {
                    let result = self.parse_single_stream(reader);
                    (source, result)
                })
                .collect()
        })
    }

    fn parse_single_stream<R: Read>(&self, reader: R) -> Result<ParallelResult, ParseError> {
        let buf_reader = BufReader::with_capacity(self.buffer_size, reader);
        let mut parser = AccessLogParser::with_chain(buf_reader, Arc::clone(&self.chain));
        let mut results = Vec::new();

        loop {
            let start_time = Instant::now();
            let outcome = match parser.parse_next() {
                Ok(None) => break,
                Err(error @ ParseError::IoError { .. }) => return Err(error),
                Ok(Some(entry)) => Ok(entry),
                Err(error) => Err(error),
            };
            let processing_time = start_time.elapsed().as_micros() as u64;
            results.push(ParsedLine::new(parser.line_number(), outcome, processing_time));
        }

        Ok(ParallelResult::from_results(results))
    }
}
