use crate::chain::ErrorOrder;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apachelog")]
#[command(author, version, about = "Parse Apache access logs with mod_log_config format strings")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Number of parallel threads (0 = sequential)
    #[arg(long, short = 'j', global = true, default_value = "0")]
    pub threads: usize,

    /// Log level for diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse access log files and output structured entries
    Parse(ParseArgs),

    /// Show statistics and summaries
    Stats(StatsArgs),

    /// Compile a format string and list its directives
    Check(CheckArgs),
}

/// Options shared by every command that reads log files
#[derive(Args)]
pub struct FormatArgs {
    /// Log format: "combined", "common" or a format string such as '%h %t "%r" %s'
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// JSON parser configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Which unsupported directive to report when several are present
    #[arg(long, value_enum)]
    pub error_order: Option<ErrorOrder>,
}

#[derive(Args)]
pub struct ParseArgs {
    /// Log files to parse (supports glob patterns)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub format: FormatArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Filter by time - start (e.g., "1 hour ago", "2025-01-01")
    #[arg(long)]
    pub since: Option<String>,

    /// Filter by time - end
    #[arg(long)]
    pub until: Option<String>,

    /// Pattern to search in the request line
    #[arg(long, short)]
    pub grep: Option<String>,

    /// Filter by status code(s)
    #[arg(long, short)]
    pub status: Option<Vec<String>>,

    /// Stop at the first malformed line
    #[arg(long)]
    pub strict: bool,

    /// Maximum number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Log files to analyze
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub format: FormatArgs,

    /// Show top N entries
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub output: ReportFormat,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Format string to compile
    #[arg(required = true)]
    pub format: String,

    /// Which unsupported directive to report when several are present
    #[arg(long, value_enum, default_value = "right-to-left")]
    pub error_order: ErrorOrder,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty-printed JSON per entry
    Json,
    /// Newline-delimited JSON
    Ndjson,
    /// CSV format
    Csv,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Table,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Ndjson => write!(f, "ndjson"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "apachelog", "-j", "4", "parse", "access.log", "--format", "common",
            "--status", "404", "--status", "500", "--output", "ndjson",
        ])
        .unwrap();
        assert_eq!(cli.threads, 4);
        match cli.command {
            Commands::Parse(args) => {
                assert_eq!(args.format.format.as_deref(), Some("common"));
                assert_eq!(args.status, Some(vec!["404".to_string(), "500".to_string()]));
                assert_eq!(args.output, OutputFormat::Ndjson);
                assert!(!args.strict);
            }
            _ => panic!("expected parse command"),
        }
    }

    #[test]
    fn test_check_arguments() {
        let cli = Cli::try_parse_from(["apachelog", "check", "%h %X", "--error-order", "left-to-right"]).unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.format, "%h %X");
                assert_eq!(args.error_order, ErrorOrder::LeftToRight);
            }
            _ => panic!("expected check command"),
        }
    }
}
