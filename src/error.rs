use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::libxml2::StructuredError;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Validator error: {0}")]
    Validator(#[from] ValidatorError),

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },

    #[error("No example {pane} document configured")]
    MissingExample { pane: String },
}

/// Errors raised by the Document Access Port
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Line {line} out of range: document has {line_count} lines")]
    LineOutOfRange { line: usize, line_count: usize },

    #[error("Range {from}..{to} out of bounds: document has {len} characters")]
    RangeOutOfBounds { from: usize, to: usize, len: usize },
}

/// Failure of the schema validator itself, as opposed to an invalid document
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("{0}")]
    LibXml2(#[from] LibXml2Error),

    #[error("validator task failed: {details}")]
    Concurrency { details: String },

    #[error("{message}")]
    Transport { message: String },
}

/// LibXML2-specific error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: {}", render_details(.errors))]
    SchemaParseFailed { errors: Vec<StructuredError> },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("Document serialization failed: {details}")]
    SerializationFailed { details: String },

    #[error("Invalid input for libxml2: {details}")]
    InvalidInput { details: String },

    #[error("Schema validation internal error: {details}")]
    InternalError { details: String },
}

fn render_details(errors: &[StructuredError]) -> String {
    if errors.is_empty() {
        "null pointer returned".to_string()
    } else {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<ConfigError> for ValidationError {
    fn from(err: ConfigError) -> Self {
        ValidationError::Config(err.to_string())
    }
}

impl From<LibXml2Error> for ValidationError {
    fn from(err: LibXml2Error) -> Self {
        ValidationError::LibXml2Internal {
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Document result type alias
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Validator result type alias
pub type ValidatorResult<T> = std::result::Result<T, ValidatorError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
