// Error types
// Every stage of a query (parse, fetch, load, execute, render) reports
// through QueryError so callers - including the C interface - can tell them apart

use thiserror::Error;

/// Errors produced while running a query
#[derive(Debug, Error)]
pub enum QueryError {
    /// The SQL text could not be parsed
    #[error("SQL parsing error: {0}")]
    Parse(String),

    /// The SQL parsed but uses a feature we don't execute
    #[error("unsupported SQL: {0}")]
    Unsupported(String),

    /// A referenced column does not exist in the source
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// The data source could not be retrieved
    #[error("failed to retrieve data from '{source_name}': {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// The retrieved content could not be loaded into a data set
    #[error("failed to load data: {0}")]
    Load(String),

    /// Evaluation failed while filtering, sorting or projecting
    #[error("execution error: {0}")]
    Execution(String),

    /// Unknown output format name
    #[error("output format '{0}' is not supported")]
    UnsupportedFormat(String),

    /// The result could not be rendered
    #[error("failed to render output: {0}")]
    Output(String),
}

impl QueryError {
    pub(crate) fn fetch(source_name: impl Into<String>, message: impl ToString) -> Self {
        QueryError::Fetch {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

impl From<sqlparser::parser::ParserError> for QueryError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        QueryError::Parse(err.to_string())
    }
}

impl From<csv::Error> for QueryError {
    fn from(err: csv::Error) -> Self {
        QueryError::Load(err.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Load(err.to_string())
    }
}

/// Result alias used throughout the library
pub type Result<T, E = QueryError> = std::result::Result<T, E>;
