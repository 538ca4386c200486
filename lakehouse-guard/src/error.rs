//! Error types for the lakehouse pipeline.
//!
//! Every stage of the pipeline reports failures through [`PipelineError`].
//! None of these errors are recovered locally: the first one aborts the run
//! and is handed back to the caller unchanged, which decides on retries.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The configured source file for a domain does not exist.
    #[error("Source file for domain '{domain}' not found: {}", path.display())]
    SourceNotFound {
        /// Domain whose source was requested
        domain: String,
        /// Path that was looked up
        path: PathBuf,
    },

    /// The source file exists but could not be decoded into tabular form.
    #[error("Failed to parse source '{}': {message}", path.display())]
    SourceParse {
        /// Path of the offending file
        path: PathBuf,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A rule of an expectation suite does not hold for the dataset.
    #[error("Expectation '{rule}' failed: {detail}")]
    ExpectationFailure {
        /// Rule kind that failed (e.g. `not_null`)
        rule: String,
        /// Column the rule targets, if any
        column: Option<String>,
        /// Human-readable description of the violation
        detail: String,
    },

    /// An expectation suite names a rule kind this engine does not implement.
    #[error("Unsupported expectation type: {kind}")]
    UnsupportedRuleKind {
        /// The unrecognised `expectation_type`
        kind: String,
    },

    /// An expectation suite document is malformed.
    #[error("Invalid expectation suite '{}': {message}", path.display())]
    InvalidSuite {
        /// Suite file (empty when parsed from memory)
        path: PathBuf,
        /// Detailed error message
        message: String,
    },

    /// A raw value could not be cast to its staging type.
    #[error("Cannot coerce {table}.{column} at row {row}: {message}")]
    Coercion {
        /// Staging table being built
        table: String,
        /// Column being coerced
        column: String,
        /// Zero-based row index in the raw dataset
        row: usize,
        /// Detailed error message
        message: String,
    },

    /// Persisting an artifact failed.
    #[error("Failed to write artifact '{}': {message}", path.display())]
    Write {
        /// Path being written
        path: PathBuf,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required column is not present in a table.
    #[error("Column '{column}' not found in {table}")]
    ColumnNotFound { table: String, column: String },

    /// A row does not fit the schema of its table.
    #[error("Schema mismatch in {table}: {message}")]
    SchemaMismatch { table: String, message: String },

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error that should not happen in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, PipelineError>`.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Creates a new source parse error.
    pub fn source_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SourceParse {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new source parse error with a source error.
    pub fn source_parse_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::SourceParse {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new expectation failure for a rule.
    pub fn expectation_failure(
        rule: impl Into<String>,
        column: Option<&str>,
        detail: impl Into<String>,
    ) -> Self {
        Self::ExpectationFailure {
            rule: rule.into(),
            column: column.map(str::to_string),
            detail: detail.into(),
        }
    }

    /// Creates a new invalid suite error.
    pub fn invalid_suite(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidSuite {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new coercion error.
    pub fn coercion(
        table: impl Into<String>,
        column: impl Into<String>,
        row: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            table: table.into(),
            column: column.into(),
            row,
            message: message.into(),
        }
    }

    /// Creates a new write error with a source error.
    pub fn write(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns a stable snake-case category for logs and exit reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "source_not_found",
            Self::SourceParse { .. } => "source_parse_error",
            Self::ExpectationFailure { .. } => "expectation_failure",
            Self::UnsupportedRuleKind { .. } => "unsupported_rule_kind",
            Self::InvalidSuite { .. } => "invalid_suite",
            Self::Coercion { .. } => "coercion_error",
            Self::Write { .. } => "write_error",
            Self::ColumnNotFound { .. } => "column_not_found",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::Configuration(_) => "configuration",
            Self::Internal(_) => "internal",
        }
    }
}
