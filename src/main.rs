use apachelog::cli::{Cli, Commands};
use apachelog::commands::{run_check, run_parse, run_stats};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Parse(args) => run_parse(args, cli.threads),
        Commands::Stats(args) => run_stats(args, cli.threads),
        Commands::Check(args) => run_check(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
