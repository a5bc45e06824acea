use crate::directive::Directive;
use crate::error::ParseError;
use crate::models::AccessLogEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which unsupported token is reported when a format string holds several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorOrder {
    /// Report the last unsupported token
    #[default]
    RightToLeft,
    /// Report the first unsupported token
    LeftToRight,
}

/// A compiled format string: the ordered directives to run over each line.
///
/// Immutable once compiled, so one chain can be shared between any number of
/// parsers or threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatChain {
    directives: Vec<Directive>,
}

impl FormatChain {
    /// Compile a format string as defined by the mod_log_config module:
    ///    https://httpd.apache.org/docs/2.4/mod/mod_log_config.html#formats
    ///
    /// Unlike Apache, modifiers (`<`, `>`, `!`, status lists) are not supported.
    pub fn compile(format: &str) -> Result<Self, ParseError> {
        Self::compile_with_order(format, ErrorOrder::default())
    }

    pub fn compile_with_order(format: &str, order: ErrorOrder) -> Result<Self, ParseError> {
        if format.is_empty() {
            return Ok(Self::default());
        }
        let tokens: Vec<&str> = format.split(' ').collect();
        Self::from_tokens(&tokens, order)
    }

    /// Compile an already split list of directive tokens.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S], order: ErrorOrder) -> Result<Self, ParseError> {
        let mut directives = Vec::with_capacity(tokens.len());
        let mut failures = Vec::new();

        for token in tokens {
            match Directive::parse(token.as_ref()) {
                Ok(directive) => directives.push(directive),
                Err(e) => failures.push(e),
            }
        }

        let reported = match order {
            ErrorOrder::LeftToRight => failures.into_iter().next(),
            ErrorOrder::RightToLeft => failures.pop(),
        };
        if let Some(err) = reported {
            debug!(error = %err, "format compilation failed");
            return Err(err);
        }

        debug!(directives = directives.len(), "compiled format chain");
        Ok(Self { directives })
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Run every directive over `line`, left to right, storing values in
    /// `entry`.
    ///
    /// Extraction stops early once the cursor reaches the newline or the end
    /// of the line. The first reader error aborts the whole line.
    pub fn execute(&self, entry: &mut AccessLogEntry, line: &str) -> Result<(), ParseError> {
        let bytes = line.as_bytes();
        let mut cursor = 0;

        for directive in &self.directives {
            cursor += directive.apply(entry, &line[cursor..])?;
            if bytes.get(cursor) == Some(&b' ') {
                cursor += 1;
            }
            if matches!(bytes.get(cursor), None | Some(b'\n')) {
                break;
            }
        }

        Ok(())
    }

    /// Parse `line` into a fresh entry.
    pub fn parse_line(&self, line: &str) -> Result<AccessLogEntry, ParseError> {
        let mut entry = AccessLogEntry::new();
        self.execute(&mut entry, line)?;
        Ok(entry)
    }
}

impl fmt::Display for FormatChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.directives.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", directive)?;
        }
        Ok(())
    }
}
