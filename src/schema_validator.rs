//! Schema Validator Port
//!
//! Given the instance text and the schema text, a validator answers whether
//! the instance is schema-valid, lists structured errors (with a line when it
//! knows one) and, on request, returns a normalized rewrite of the instance.
//! A validator that fails to do its job returns a [`ValidatorError`] instead,
//! which is distinct from reporting an invalid document.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ValidatorResult;

/// Which document an error position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    #[default]
    Instance,
    Schema,
}

/// One validator error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaError {
    /// 1-based line, when known
    pub line: Option<usize>,
    pub message: String,
    #[serde(default)]
    pub origin: ErrorOrigin,
}

impl SchemaError {
    pub fn new(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            line: line.filter(|&l| l > 0),
            message: message.into(),
            origin: ErrorOrigin::Instance,
        }
    }

    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self::new(Some(line), message)
    }

    pub fn in_schema(mut self) -> Self {
        self.origin = ErrorOrigin::Schema;
        self
    }

    /// `Line <n>: <message>`, with `?` for an unknown line
    pub fn status_line(&self) -> String {
        let prefix = match self.origin {
            ErrorOrigin::Instance => "Line",
            ErrorOrigin::Schema => "Schema line",
        };
        match self.line {
            Some(line) => format!("{} {}: {}", prefix, line, self.message),
            None => format!("{} ?: {}", prefix, self.message),
        }
    }
}

/// Input of one validation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub document_text: String,
    pub schema_text: String,
    /// Ask for a normalized rewrite of a valid document
    pub normalize: bool,
}

impl ValidationRequest {
    pub fn new(
        document_text: impl Into<String>,
        schema_text: impl Into<String>,
        normalize: bool,
    ) -> Self {
        Self {
            document_text: document_text.into(),
            schema_text: schema_text.into(),
            normalize,
        }
    }
}

/// Result of a validation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<SchemaError>,
    /// Only meaningful when `valid` and normalization was requested
    pub normalized_text: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            normalized_text: None,
        }
    }

    pub fn normalized(text: impl Into<String>) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            normalized_text: Some(text.into()),
        }
    }

    pub fn invalid(errors: Vec<SchemaError>) -> Self {
        Self {
            valid: false,
            errors,
            normalized_text: None,
        }
    }
}

/// Aggregate status text for a failed schema check
pub fn render_schema_errors(errors: &[SchemaError]) -> String {
    if errors.is_empty() {
        return "Unknown error".to_string();
    }
    errors
        .iter()
        .map(SchemaError::status_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The external schema validation capability
pub trait SchemaValidator {
    fn validate(
        &self,
        request: ValidationRequest,
    ) -> impl Future<Output = ValidatorResult<ValidationOutcome>> + Send;
}
