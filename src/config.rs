use crate::chain::{ErrorOrder, FormatChain};
use crate::error::ParseError;
use crate::parser::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for building access log parsers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Log format to compile
    pub format: LogFormat,
    /// Which unsupported directive is reported when several are present
    pub error_order: ErrorOrder,
    /// Skip malformed lines instead of stopping at the first one
    pub skip_malformed: bool,
    /// Buffer size for reading from streams
    pub buffer_size: usize,
    /// Worker threads for parallel parsing. 0 or 1 parses sequentially;
    /// larger values get a dedicated rayon pool of that size.
    pub num_threads: usize,
    /// Number of lines handed to the worker pool at once
    pub batch_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Combined,
            error_order: ErrorOrder::RightToLeft,
            skip_malformed: true,
            buffer_size: 64 * 1024, // 64KB
            num_threads: 0,
            batch_size: 1000,
        }
    }
}

impl ParserConfig {
    /// Load a configuration from a JSON file. Missing keys take their default.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ParseError::io(&format!("reading {}", path.display()), &e))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ParseError> {
        let config: Self = serde_json::from_str(content).map_err(|e| ParseError::ConfigurationError {
            parameter: "config".to_string(),
            error_message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Compile the configured format
    pub fn compile(&self) -> Result<FormatChain, ParseError> {
        self.format.compile(self.error_order)
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if self.buffer_size == 0 {
            return Err(ParseError::ConfigurationError {
                parameter: "buffer_size".to_string(),
                error_message: "must be greater than zero".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(ParseError::ConfigurationError {
                parameter: "batch_size".to_string(),
                error_message: "must be greater than zero".to_string(),
            });
        }
        self.compile().map_err(|e| ParseError::ConfigurationError {
            parameter: "format".to_string(),
            error_message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ParserConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compile().unwrap().len(), 9);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ParserConfig::from_json_str(r#"{"format": "common", "skip_malformed": false}"#).unwrap();
        assert_eq!(config.format, LogFormat::Common);
        assert!(!config.skip_malformed);
        assert_eq!(config.buffer_size, 64 * 1024);
        assert_eq!(config.error_order, ErrorOrder::RightToLeft);
    }

    #[test]
    fn test_custom_format_and_error_order() {
        let json = r#"{"format": {"custom": "%h %D"}, "error_order": "left-to-right"}"#;
        let config = ParserConfig::from_json_str(json).unwrap();
        assert_eq!(config.format, LogFormat::Custom("%h %D".to_string()));
        assert_eq!(config.error_order, ErrorOrder::LeftToRight);
    }

    #[test]
    fn test_invalid_configs() {
        let err = ParserConfig::from_json_str(r#"{"format": {"custom": "%h %X"}}"#).unwrap_err();
        assert!(matches!(err, ParseError::ConfigurationError { ref parameter, .. } if parameter == "format"));

        let err = ParserConfig::from_json_str(r#"{"buffer_size": 0}"#).unwrap_err();
        assert!(matches!(err, ParseError::ConfigurationError { ref parameter, .. } if parameter == "buffer_size"));

        let err = ParserConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ParseError::ConfigurationError { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ParserConfig::from_json_file("/nonexistent/apachelog.json").unwrap_err();
        assert_eq!(err.kind_name(), "IoError");
    }
}
