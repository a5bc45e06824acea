use crate::error::ParseError;
use crate::models::AccessLogEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Parsing statistics for monitoring and reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsingStatistics {
    /// Total number of lines processed
    pub total_lines: usize,
    /// Number of successfully parsed lines
    pub successful_parses: usize,
    /// Number of lines that failed to parse
    pub failed_parses: usize,
    /// Error distribution by error kind
    pub error_distribution: HashMap<String, usize>,
    /// Status code distribution
    pub status_distribution: HashMap<String, usize>,
    /// Request method distribution
    pub method_distribution: HashMap<String, usize>,
    /// Sum of response sizes, in bytes
    pub total_response_bytes: i64,
    /// Processing time statistics (in microseconds)
    pub processing_time_micros: ProcessingTimeStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTimeStats {
    pub total_time: u64,
    pub min_time: u64,
    pub max_time: u64,
    pub avg_time: f64,
}

impl ParsingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully parsed entry
    pub fn record_success(&mut self, entry: &AccessLogEntry, processing_time_micros: u64) {
        self.total_lines += 1;
        self.successful_parses += 1;
        if !entry.status.is_empty() {
            *self.status_distribution.entry(entry.status.clone()).or_insert(0) += 1;
        }
        let method = entry.request_first_line.method();
        if !method.is_empty() {
            *self.method_distribution.entry(method.to_string()).or_insert(0) += 1;
        }
        self.total_response_bytes = self.total_response_bytes.saturating_add(entry.response_size);
        self.update_processing_time(processing_time_micros);
    }

    /// Record a line that failed to parse
    pub fn record_failure(&mut self, error: &ParseError, processing_time_micros: u64) {
        self.total_lines += 1;
        self.failed_parses += 1;
        *self.error_distribution.entry(error.kind_name().to_string()).or_insert(0) += 1;
        self.update_processing_time(processing_time_micros);
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            (self.successful_parses as f64 / self.total_lines as f64) * 100.0
        }
    }

    /// Get error rate as a percentage
    pub fn error_rate(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            (self.failed_parses as f64 / self.total_lines as f64) * 100.0
        }
    }

    /// Fold the statistics of another run into this one
    pub fn merge(&mut self, other: &ParsingStatistics) {
        let lines_before = self.total_lines;
        self.total_lines += other.total_lines;
        self.successful_parses += other.successful_parses;
        self.failed_parses += other.failed_parses;
        for (kind, count) in &other.error_distribution {
            *self.error_distribution.entry(kind.clone()).or_insert(0) += count;
        }
        for (status, count) in &other.status_distribution {
            *self.status_distribution.entry(status.clone()).or_insert(0) += count;
        }
        for (method, count) in &other.method_distribution {
            *self.method_distribution.entry(method.clone()).or_insert(0) += count;
        }
        self.total_response_bytes = self.total_response_bytes.saturating_add(other.total_response_bytes);

        let times = &mut self.processing_time_micros;
        let theirs = &other.processing_time_micros;
        times.total_time = times.total_time.saturating_add(theirs.total_time);
        if other.total_lines > 0 && (lines_before == 0 || theirs.min_time < times.min_time) {
            times.min_time = theirs.min_time;
        }
        times.max_time = times.max_time.max(theirs.max_time);
        times.avg_time = if self.total_lines == 0 {
            0.0
        } else {
            times.total_time as f64 / self.total_lines as f64
        };
    }

    fn update_processing_time(&mut self, time_micros: u64) {
        let times = &mut self.processing_time_micros;
        times.total_time = times.total_time.saturating_add(time_micros);

        // the first sample always sets the minimum, even when it is 0
        if self.total_lines == 1 || time_micros < times.min_time {
            times.min_time = time_micros;
        }
        if time_micros > times.max_time {
            times.max_time = time_micros;
        }

        times.avg_time = times.total_time as f64 / self.total_lines as f64;
    }

    /// Generate a compact status line for continuous monitoring
    pub fn generate_status_line(&self) -> String {
        format!(
            "Lines: {} | Success: {:.1}% | Errors: {:.1}% | Avg Time: {:.1}μs",
            self.total_lines,
            self.success_rate(),
            self.error_rate(),
            self.processing_time_micros.avg_time
        )
    }

    /// Generate a comprehensive report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Access Log Statistics Report ===\n");
        report.push_str(&format!("Total lines processed: {}\n", self.total_lines));
        report.push_str(&format!("Successful parses: {} ({:.2}%)\n", self.successful_parses, self.success_rate()));
        report.push_str(&format!("Failed parses: {} ({:.2}%)\n", self.failed_parses, self.error_rate()));
        report.push_str(&format!("Response bytes: {}\n", self.total_response_bytes));

        report.push_str("\n--- Status Distribution ---\n");
        for (status, count) in sorted_counts(&self.status_distribution) {
            report.push_str(&format!("{}: {}\n", status, count));
        }

        report.push_str("\n--- Method Distribution ---\n");
        for (method, count) in sorted_counts(&self.method_distribution) {
            report.push_str(&format!("{}: {}\n", method, count));
        }

        if !self.error_distribution.is_empty() {
            report.push_str("\n--- Error Distribution ---\n");
            for (kind, count) in sorted_counts(&self.error_distribution) {
                let percentage = (count as f64 / self.failed_parses as f64) * 100.0;
                report.push_str(&format!("{}: {} ({:.2}%)\n", kind, count, percentage));
            }
        }

        report.push_str("\n--- Performance Metrics ---\n");
        report.push_str(&format!("Total processing time: {}μs\n", self.processing_time_micros.total_time));
        report.push_str(&format!("Average processing time: {:.2}μs\n", self.processing_time_micros.avg_time));
        report.push_str(&format!("Min processing time: {}μs\n", self.processing_time_micros.min_time));
        report.push_str(&format!("Max processing time: {}μs\n", self.processing_time_micros.max_time));

        report
    }
}

/// Counts sorted by descending count, then key
pub fn sorted_counts(counts: &HashMap<String, usize>) -> Vec<(&str, usize)> {
    let mut sorted: Vec<(&str, usize)> = counts.iter().map(|(k, &v)| (k.as_str(), v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

/// Statistics with periodic progress reporting through `tracing`
#[derive(Debug, Clone)]
pub struct StatisticsMonitor {
    stats: ParsingStatistics,
    report_interval: usize,
    last_report_line: usize,
}

impl StatisticsMonitor {
    pub fn new() -> Self {
        Self::with_interval(1000)
    }

    /// Report every `report_interval` lines; 0 disables reporting
    pub fn with_interval(report_interval: usize) -> Self {
        Self {
            stats: ParsingStatistics::new(),
            report_interval,
            last_report_line: 0,
        }
    }

    pub fn record_success(&mut self, entry: &AccessLogEntry, processing_time_micros: u64) {
        self.stats.record_success(entry, processing_time_micros);
        self.check_and_report();
    }

    pub fn record_failure(&mut self, error: &ParseError, processing_time_micros: u64) {
        self.stats.record_failure(error, processing_time_micros);
        self.check_and_report();
    }

    pub fn get_statistics(&self) -> &ParsingStatistics {
        &self.stats
    }

    pub fn into_statistics(self) -> ParsingStatistics {
        self.stats
    }

    pub fn reset(&mut self) {
        self.stats = ParsingStatistics::new();
        self.last_report_line = 0;
    }

    fn check_and_report(&mut self) {
        if self.report_interval == 0 {
            return;
        }
        if self.stats.total_lines - self.last_report_line >= self.report_interval {
            info!(status = %self.stats.generate_status_line(), "parsing progress");
            self.last_report_line = self.stats.total_lines;
        }
    }
}

impl Default for StatisticsMonitor {
    fn default() -> Self {
        Self::new()
    }
}
