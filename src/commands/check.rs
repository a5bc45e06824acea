use crate::chain::{ErrorOrder, FormatChain};
use crate::cli::CheckArgs;
use colored::*;
use std::error::Error;

/// One line per directive: its token, the field it fills and whether it is quoted
pub fn describe_chain(chain: &FormatChain) -> Vec<String> {
    chain
        .directives()
        .iter()
        .enumerate()
        .map(|(i, directive)| {
            let mut line = format!("{:>3}  {:<24} {:?}", i + 1, directive.to_string(), directive.kind());
            if let Some(name) = directive.name() {
                line.push_str(&format!(" [{}]", name));
            }
            if directive.is_quoted() {
                line.push_str(" (quoted)");
            }
            line
        })
        .collect()
}

pub fn check_format(format: &str, order: ErrorOrder) -> Result<Vec<String>, Box<dyn Error>> {
    let chain = FormatChain::compile_with_order(format, order)?;
    Ok(describe_chain(&chain))
}

pub fn run_check(args: CheckArgs) -> Result<(), Box<dyn Error>> {
    let lines = check_format(&args.format, args.error_order)?;
    println!("{} {} directive(s)", "OK".green().bold(), lines.len());
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
