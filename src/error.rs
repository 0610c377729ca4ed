//! Error taxonomy of the analysis engine.
//!
//! Every engine operation either fully succeeds or fails with one of these
//! variants. Each variant carries enough context (column names, expected
//! kinds, counts) for the caller to render a precise message.

use thiserror::Error;

/// Errors produced by the table loader, profiler, aggregator, reporters and
/// forecaster.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The input could not be tokenized as delimited text.
    #[error("failed to parse {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// A referenced column does not exist in the table.
    #[error("column '{column}' not found (available: {})", available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    /// A column has the wrong kind for the requested operation.
    #[error("column '{column}' must be {expected}, but it is {actual}")]
    InvalidColumn {
        column: String,
        expected: String,
        actual: String,
    },

    /// An option is outside its accepted range.
    #[error("invalid value '{value}' for {name}: expected {expected}")]
    InvalidParameter {
        name: String,
        value: String,
        expected: String,
    },

    /// Too few usable rows remain after dropping missing values.
    #[error("insufficient data for {context}: need at least {needed}, got {got}")]
    InsufficientData {
        context: String,
        needed: usize,
        got: usize,
    },
}

impl EngineError {
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        EngineError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    pub fn insufficient(context: impl Into<String>, needed: usize, got: usize) -> Self {
        EngineError::InsufficientData {
            context: context.into(),
            needed,
            got,
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Parse { .. } => "ParseError",
            EngineError::ColumnNotFound { .. } => "ColumnNotFoundError",
            EngineError::InvalidColumn { .. } => "InvalidColumnError",
            EngineError::InvalidParameter { .. } => "InvalidParameterError",
            EngineError::InsufficientData { .. } => "InsufficientDataError",
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found_message_lists_columns() {
        let err = EngineError::ColumnNotFound {
            column: "price".to_string(),
            available: vec!["year".to_string(), "region".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'price'"));
        assert!(msg.contains("year, region"));
        assert_eq!(err.kind(), "ColumnNotFoundError");
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = EngineError::insufficient("forecast", 2, 1);
        assert_eq!(
            err.to_string(),
            "insufficient data for forecast: need at least 2, got 1"
        );
    }
}
