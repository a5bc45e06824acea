use crate::cli::{ReportFormat, StatsArgs};
use crate::commands::input::{expand_globs, resolve_config, LogScanner};
use crate::commands::output::{print_distribution, print_stats_summary};
use crate::models::AccessLogEntry;
use crate::statistics::{sorted_counts, ParsingStatistics};
use chrono::{DateTime, FixedOffset};
use colored::*;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::ops::ControlFlow;

/// Traffic summary gathered while scanning access logs
#[derive(Debug, Default)]
pub struct TrafficSummary {
    pub statistics: ParsingStatistics,
    pub host_counts: HashMap<String, usize>,
    pub path_counts: HashMap<String, usize>,
    pub first_seen: Option<DateTime<FixedOffset>>,
    pub last_seen: Option<DateTime<FixedOffset>>,
}

impl TrafficSummary {
    pub fn record(&mut self, entry: &AccessLogEntry) {
        if !entry.remote_host.is_empty() {
            *self.host_counts.entry(entry.remote_host.clone()).or_insert(0) += 1;
        }
        let path = entry.request_first_line.path();
        if !path.is_empty() {
            *self.path_counts.entry(path.to_string()).or_insert(0) += 1;
        }
        if let Some(time) = entry.time {
            if self.first_seen.map_or(true, |first| time < first) {
                self.first_seen = Some(time);
            }
            if self.last_seen.map_or(true, |last| time > last) {
                self.last_seen = Some(time);
            }
        }
    }

    pub fn to_report(&self, top: usize) -> StatsReport<'_> {
        StatsReport {
            statistics: &self.statistics,
            top_hosts: sorted_counts(&self.host_counts).into_iter().take(top).collect(),
            top_paths: sorted_counts(&self.path_counts).into_iter().take(top).collect(),
            first_seen: self.first_seen.map(|t| t.to_rfc3339()),
            last_seen: self.last_seen.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsReport<'a> {
    pub statistics: &'a ParsingStatistics,
    pub top_hosts: Vec<(&'a str, usize)>,
    pub top_paths: Vec<(&'a str, usize)>,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
}

pub fn run_stats(args: StatsArgs, threads: usize) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&args.format, threads)?;
    let scanner = LogScanner::new(config, false)?;
    let files = expand_globs(&args.files)?;

    if files.is_empty() {
        eprintln!("No files matched the given patterns");
        return Ok(());
    }

    let mut summary = TrafficSummary::default();
    for file_path in &files {
        let file_stats = scanner.scan_file(file_path, |entry| {
            summary.record(entry);
            Ok(ControlFlow::Continue(()))
        })?;
        summary.statistics.merge(&file_stats);
    }

    match args.output {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary.to_report(args.top))?);
        }
        ReportFormat::Table => print_summary_table(&summary, args.top),
    }

    Ok(())
}

fn print_summary_table(summary: &TrafficSummary, top: usize) {
    let stats = &summary.statistics;
    print_stats_summary(stats);

    if let (Some(first), Some(last)) = (summary.first_seen, summary.last_seen) {
        println!("\n{}: {} .. {}", "Time Range".cyan().bold(), first, last);
    }

    let parsed = stats.successful_parses;
    print_distribution("Status Distribution", &stats.status_distribution, parsed, top);
    print_distribution("Method Distribution", &stats.method_distribution, parsed, top);
    print_distribution("Top Hosts", &summary.host_counts, parsed, top);
    print_distribution("Top Paths", &summary.path_counts, parsed, top);
}
