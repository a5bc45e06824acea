use crate::cli::ParseArgs;
use crate::commands::input::{expand_globs, parse_time, resolve_config, LogScanner};
use crate::commands::output::{print_stats_summary, EntryWriter};
use crate::models::AccessLogEntry;
use crate::statistics::ParsingStatistics;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::error::Error;
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::ops::ControlFlow;

/// Conditions an entry must meet to be written out
#[derive(Debug, Default)]
pub struct EntryFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub grep: Option<Regex>,
    pub statuses: Vec<String>,
}

impl EntryFilter {
    pub fn from_args(args: &ParseArgs) -> Result<Self, Box<dyn Error>> {
        let since = args.since.as_deref().map(parse_time_arg).transpose()?;
        let until = args.until.as_deref().map(parse_time_arg).transpose()?;
        let grep = args
            .grep
            .as_ref()
            .map(|p| Regex::new(&format!("(?i){}", p)))
            .transpose()?;

        Ok(Self {
            since,
            until,
            grep,
            statuses: args.status.clone().unwrap_or_default(),
        })
    }

    pub fn matches(&self, entry: &AccessLogEntry) -> bool {
        // entries without a timestamp are never dropped by the time window
        if let Some(ts) = entry.time.map(|t| t.with_timezone(&Utc)) {
            if self.since.is_some_and(|start| ts < start) {
                return false;
            }
            if self.until.is_some_and(|end| ts > end) {
                return false;
            }
        }

        if let Some(ref pattern) = self.grep {
            if !pattern.is_match(entry.request_first_line.as_str()) {
                return false;
            }
        }

        self.statuses.is_empty() || self.statuses.iter().any(|s| *s == entry.status)
    }
}

fn parse_time_arg(s: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
    parse_time(s).ok_or_else(|| format!("cannot parse time '{}'", s).into())
}

pub fn run_parse(args: ParseArgs, threads: usize) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&args.format, threads)?;
    let scanner = LogScanner::new(config, args.strict)?;
    let filter = EntryFilter::from_args(&args)?;

    let files = expand_globs(&args.files)?;
    if files.is_empty() {
        eprintln!("No files matched the given patterns");
        return Ok(());
    }

    let output: Box<dyn Write> = if let Some(ref path) = args.output_file {
        colored::control::set_override(false);
        Box::new(BufWriter::new(File::create(path)?))
    } else {
        Box::new(stdout())
    };
    let mut writer = EntryWriter::new(args.output, output).with_highlight(filter.grep.clone());
    writer.write_header()?;

    let mut statistics = ParsingStatistics::new();
    let mut output_count = 0;

    for file_path in &files {
        if args.limit.is_some_and(|limit| output_count >= limit) {
            break;
        }

        let file_stats = scanner.scan_file(file_path, |entry| {
            if !filter.matches(entry) {
                return Ok(ControlFlow::Continue(()));
            }
            writer.write_entry(entry)?;
            output_count += 1;
            if args.limit.is_some_and(|limit| output_count >= limit) {
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })?;
        statistics.merge(&file_stats);
    }
    writer.finish()?;

    // Print summary to stderr if outputting to file
    if args.output_file.is_some() {
        print_stats_summary(&statistics);
    }

    Ok(())
}
