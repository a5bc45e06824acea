use crate::cli::OutputFormat;
use crate::models::AccessLogEntry;
use crate::statistics::{sorted_counts, ParsingStatistics};
use colored::*;
use std::collections::HashMap;
use std::error::Error;
use std::io::Write;

pub const CSV_HEADER: [&str; 11] = [
    "time",
    "remote_host",
    "remote_logname",
    "remote_user",
    "method",
    "path",
    "protocol",
    "status",
    "response_size",
    "referer",
    "user_agent",
];

enum Sink {
    Plain(Box<dyn Write>),
    Csv(csv::Writer<Box<dyn Write>>),
}

/// Writes access log entries in the selected output format
pub struct EntryWriter {
    format: OutputFormat,
    sink: Sink,
    highlight_pattern: Option<regex::Regex>,
}

impl EntryWriter {
    pub fn new(format: OutputFormat, writer: Box<dyn Write>) -> Self {
        let sink = match format {
            OutputFormat::Csv => Sink::Csv(csv::Writer::from_writer(writer)),
            _ => Sink::Plain(writer),
        };
        Self {
            format,
            sink,
            highlight_pattern: None,
        }
    }

    pub fn with_highlight(mut self, pattern: Option<regex::Regex>) -> Self {
        self.highlight_pattern = pattern;
        self
    }

    pub fn write_header(&mut self) -> Result<(), Box<dyn Error>> {
        match &mut self.sink {
            Sink::Csv(writer) => writer.write_record(CSV_HEADER)?,
            Sink::Plain(writer) if self.format == OutputFormat::Table => {
                writeln!(writer, "{}", "─".repeat(100).dimmed())?
            }
            Sink::Plain(_) => {}
        }
        Ok(())
    }

    pub fn write_entry(&mut self, entry: &AccessLogEntry) -> Result<(), Box<dyn Error>> {
        let line = match self.format {
            OutputFormat::Csv => {
                if let Sink::Csv(writer) = &mut self.sink {
                    writer.write_record(csv_record(entry))?;
                }
                return Ok(());
            }
            OutputFormat::Table => self.format_table(entry),
            OutputFormat::Json => serde_json::to_string_pretty(entry)?,
            OutputFormat::Ndjson => serde_json::to_string(entry)?,
        };
        if let Sink::Plain(writer) = &mut self.sink {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), Box<dyn Error>> {
        match &mut self.sink {
            Sink::Csv(writer) => writer.flush()?,
            Sink::Plain(writer) => writer.flush()?,
        }
        Ok(())
    }

    fn format_table(&self, entry: &AccessLogEntry) -> String {
        let mut output = String::new();

        let ts = entry
            .time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S %z").to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!("{} ", ts.cyan()));
        output.push_str(&format!("{:15} ", or_dash(&entry.remote_host)));

        let status = or_dash(&entry.status);
        let colored_status = match status.chars().next() {
            Some('2') => status.green(),
            Some('3') => status.cyan(),
            Some('4') => status.yellow(),
            Some('5') => status.red().bold(),
            _ => status.dimmed(),
        };
        output.push_str(&format!("{} ", colored_status));

        let request = entry.request_first_line.as_str();
        let request = if let Some(ref pattern) = self.highlight_pattern {
            pattern
                .replace_all(request, |caps: &regex::Captures| caps[0].to_string().on_yellow().black().to_string())
                .to_string()
        } else {
            request.to_string()
        };
        output.push_str(or_dash(&request));
        output.push_str(&format!(" {}", entry.response_size.to_string().dimmed()));

        if let Some(agent) = entry.header("User-agent") {
            output.push_str(&format!(" {}", agent.dimmed()));
        }

        output
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn csv_record(entry: &AccessLogEntry) -> Vec<String> {
    let request = &entry.request_first_line;
    vec![
        entry.time.map(|t| t.to_rfc3339()).unwrap_or_default(),
        entry.remote_host.clone(),
        entry.remote_logname.clone(),
        entry.remote_user.clone(),
        request.method().to_string(),
        request.path().to_string(),
        request.protocol().to_string(),
        entry.status.clone(),
        entry.response_size.to_string(),
        entry.header("Referer").unwrap_or_default().to_string(),
        entry.header("User-agent").unwrap_or_default().to_string(),
    ]
}

pub fn print_stats_summary(stats: &ParsingStatistics) {
    eprintln!("\n{}", "═".repeat(50).cyan());
    eprintln!("{}", "SUMMARY".cyan().bold());
    eprintln!("{}", "═".repeat(50).cyan());
    eprintln!("Total lines:      {}", stats.total_lines.to_string().white().bold());
    eprintln!(
        "Parsed OK:        {} ({:.1}%)",
        stats.successful_parses.to_string().green(),
        stats.success_rate()
    );
    eprintln!(
        "Malformed:        {} ({:.1}%)",
        stats.failed_parses.to_string().red(),
        stats.error_rate()
    );
    eprintln!("Response bytes:   {}", stats.total_response_bytes.to_string().cyan());

    if !stats.error_distribution.is_empty() {
        eprintln!("\n{}:", "Error Distribution".dimmed());
        for (kind, count) in sorted_counts(&stats.error_distribution) {
            eprintln!("  {}: {}", kind.white(), count);
        }
    }
}

/// Print a bar chart of the `top` largest counts
pub fn print_distribution(title: &str, counts: &HashMap<String, usize>, total: usize, top: usize) {
    if counts.is_empty() {
        return;
    }
    println!("\n{}:", title.cyan().bold());
    for (value, count) in sorted_counts(counts).into_iter().take(top) {
        let share = if total == 0 { 0.0 } else { count as f64 / total as f64 };
        let bar = "█".repeat((share * 40.0) as usize);
        println!("  {:40} {:>8} ({:5.1}%) {}", value, count, share * 100.0, bar.green());
    }
}
