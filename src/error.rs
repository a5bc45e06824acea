use std::fmt;
use serde::{Deserialize, Serialize};

/// Errors raised while compiling a format string or parsing an access log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseError {
    /// A format string token does not name a supported directive
    UnsupportedDirective {
        directive: String,
    },
    /// A field did not start with the character its reader requires
    UnexpectedCharacter {
        found: Option<char>,
        expected: String,
    },
    /// A quoted field has no closing double quote
    MissingClosingQuote,
    /// A bracketed timestamp has no closing ']'
    MissingClosingBracket,
    /// The timestamp interior does not match `%d/%b/%Y:%H:%M:%S %z`
    TimestampLayout {
        input: String,
        error_message: String,
    },
    /// A numeric field does not start with a digit
    ExpectedDigit {
        found: Option<char>,
    },
    /// A CLF response size is neither '-' nor an integer
    MalformedResponseSize {
        token: String,
        error_message: String,
    },
    /// A digit run does not fit in a 64 bit integer
    IntegerOverflow {
        digits: String,
        error_message: String,
    },
    /// A log line is not valid UTF-8
    InvalidEncoding {
        line_number: usize,
    },
    /// I/O error while reading lines or configuration
    IoError {
        operation: String,
        error_message: String,
    },
    /// Configuration error
    ConfigurationError {
        parameter: String,
        error_message: String,
    },
}

impl ParseError {
    /// Stable variant name, used as a key in error distributions
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParseError::UnsupportedDirective { .. } => "UnsupportedDirective",
            ParseError::UnexpectedCharacter { .. } => "UnexpectedCharacter",
            ParseError::MissingClosingQuote => "MissingClosingQuote",
            ParseError::MissingClosingBracket => "MissingClosingBracket",
            ParseError::TimestampLayout { .. } => "TimestampLayout",
            ParseError::ExpectedDigit { .. } => "ExpectedDigit",
            ParseError::MalformedResponseSize { .. } => "MalformedResponseSize",
            ParseError::IntegerOverflow { .. } => "IntegerOverflow",
            ParseError::InvalidEncoding { .. } => "InvalidEncoding",
            ParseError::IoError { .. } => "IoError",
            ParseError::ConfigurationError { .. } => "ConfigurationError",
        }
    }

    pub(crate) fn io(operation: &str, error: &std::io::Error) -> Self {
        ParseError::IoError {
            operation: operation.to_string(),
            error_message: error.to_string(),
        }
    }
}

fn describe(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("{:?}", c),
        None => "end of line".to_string(),
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnsupportedDirective { directive } => {
                write!(f, "{:?} format is not supported", directive)
            }
            ParseError::UnexpectedCharacter { found, expected } => {
                write!(f, "got {}, want {}", describe(found), expected)
            }
            ParseError::MissingClosingQuote => write!(f, "missing closing quote"),
            ParseError::MissingClosingBracket => write!(f, "missing closing ']'"),
            ParseError::TimestampLayout { input, error_message } => {
                write!(f, "failed to parse datetime {:?}: {}", input, error_message)
            }
            ParseError::ExpectedDigit { found } => {
                write!(f, "got {}, want digit between 0 and 9", describe(found))
            }
            ParseError::MalformedResponseSize { token, error_message } => {
                write!(f, "malformed response size {:?}: {}", token, error_message)
            }
            ParseError::IntegerOverflow { digits, error_message } => {
                write!(f, "cannot parse {:?} as integer: {}", digits, error_message)
            }
            ParseError::InvalidEncoding { line_number } => {
                write!(f, "line {} is not valid UTF-8", line_number)
            }
            ParseError::IoError { operation, error_message } => {
                write!(f, "I/O error during {}: {}", operation, error_message)
            }
            ParseError::ConfigurationError { parameter, error_message } => {
                write!(f, "Configuration error for '{}': {}", parameter, error_message)
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_directive_names_token() {
        let err = ParseError::UnsupportedDirective { directive: "foo".to_string() };
        assert_eq!(err.to_string(), "\"foo\" format is not supported");
        assert_eq!(err.kind_name(), "UnsupportedDirective");
    }

    #[test]
    fn test_display_mentions_found_character() {
        let err = ParseError::ExpectedDigit { found: Some('f') };
        assert_eq!(err.to_string(), "got 'f', want digit between 0 and 9");

        let err = ParseError::UnexpectedCharacter { found: None, expected: "'['".to_string() };
        assert_eq!(err.to_string(), "got end of line, want '['");

        let err = ParseError::InvalidEncoding { line_number: 2 };
        assert_eq!(err.to_string(), "line 2 is not valid UTF-8");
        assert_eq!(err.kind_name(), "InvalidEncoding");
    }

    #[test]
    fn test_errors_round_trip_through_json() {
        let err = ParseError::MalformedResponseSize {
            token: "abc".to_string(),
            error_message: "invalid digit found in string".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: ParseError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
