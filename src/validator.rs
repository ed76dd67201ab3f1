//! libxml2-backed schema validator
//!
//! Async I/O and orchestration stay on the runtime; schema compilation,
//! document parsing, validation and formatting are CPU-bound libxml2 calls
//! and run on the blocking pool. Compiled schemas are shared through
//! [`ParsedSchemaCache`], so editing only the instance never recompiles the XSD.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::{DEFAULT_MAX_PARSED_SCHEMAS, ParsedSchemaCache};
use crate::error::{LibXml2Error, ValidatorError, ValidatorResult};
use crate::libxml2::{LibXml2Wrapper, StructuredError, ValidationResult, XmlSchemaPtr};
use crate::schema_validator::{SchemaError, SchemaValidator, ValidationOutcome, ValidationRequest};

/// Shown when libxml2 refused a schema without saying why
pub const SCHEMA_NOT_COMPILED: &str = "Schema could not be compiled";

/// [`SchemaValidator`] implemented on top of libxml2
#[derive(Clone)]
pub struct LibXml2SchemaValidator {
    wrapper: Arc<LibXml2Wrapper>,
    schemas: ParsedSchemaCache,
}

impl LibXml2SchemaValidator {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_MAX_PARSED_SCHEMAS)
    }

    pub fn with_cache_capacity(max_parsed_schemas: u64) -> Self {
        Self {
            wrapper: Arc::new(LibXml2Wrapper::new()),
            schemas: ParsedSchemaCache::new(max_parsed_schemas),
        }
    }

    pub fn schema_cache(&self) -> &ParsedSchemaCache {
        &self.schemas
    }

    async fn compiled_schema(
        wrapper: Arc<LibXml2Wrapper>,
        schemas: &ParsedSchemaCache,
        schema_text: String,
    ) -> Result<Arc<XmlSchemaPtr>, LibXml2Error> {
        let key = ParsedSchemaCache::key_for(&schema_text);

        schemas
            .get_or_load(key, || async move {
                debug!(bytes = schema_text.len(), "compiling schema");
                match tokio::task::spawn_blocking(move || {
                    wrapper.parse_schema_from_memory(schema_text.as_bytes())
                })
                .await
                {
                    Ok(parsed) => parsed.map(Arc::new),
                    Err(e) => Err(LibXml2Error::InternalError {
                        details: format!("Join error: {}", e),
                    }),
                }
            })
            .await
    }
}

impl Default for LibXml2SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator for LibXml2SchemaValidator {
    fn validate(
        &self,
        request: ValidationRequest,
    ) -> impl Future<Output = ValidatorResult<ValidationOutcome>> + Send {
        let wrapper = Arc::clone(&self.wrapper);
        let schemas = self.schemas.clone();

        async move {
            let ValidationRequest {
                document_text,
                schema_text,
                normalize,
            } = request;

            let schema =
                match Self::compiled_schema(Arc::clone(&wrapper), &schemas, schema_text).await {
                    Ok(schema) => schema,
                    Err(LibXml2Error::SchemaParseFailed { errors }) => {
                        return Ok(schema_failure(errors));
                    }
                    Err(other) => return Err(other.into()),
                };

            tokio::task::spawn_blocking(move || {
                check_document(&wrapper, &schema, &document_text, normalize)
            })
            .await
            .map_err(|e| ValidatorError::Concurrency {
                details: format!("Join error: {}", e),
            })?
        }
    }
}

fn to_schema_errors(errors: Vec<StructuredError>) -> Vec<SchemaError> {
    errors
        .into_iter()
        .map(|error| SchemaError::new(error.line, error.message))
        .collect()
}

fn schema_failure(errors: Vec<StructuredError>) -> ValidationOutcome {
    let mut errors: Vec<SchemaError> = to_schema_errors(errors)
        .into_iter()
        .map(SchemaError::in_schema)
        .collect();
    if errors.is_empty() {
        errors.push(SchemaError::new(None, SCHEMA_NOT_COMPILED).in_schema());
    }
    ValidationOutcome::invalid(errors)
}

/// Parse, validate and optionally format the instance. Runs on the blocking pool.
fn check_document(
    wrapper: &LibXml2Wrapper,
    schema: &XmlSchemaPtr,
    document_text: &str,
    normalize: bool,
) -> ValidatorResult<ValidationOutcome> {
    let parsed = wrapper.read_document_from_memory(document_text, normalize)?;
    let document = match parsed.document {
        Some(document) if parsed.errors.is_empty() => document,
        _ => {
            trace!(errors = parsed.errors.len(), "instance is not well-formed");
            return Ok(ValidationOutcome::invalid(to_schema_errors(parsed.errors)));
        }
    };

    match wrapper.validate_document(schema, &document)? {
        ValidationResult::Valid if normalize => Ok(ValidationOutcome::normalized(
            wrapper.format_document(&document)?,
        )),
        ValidationResult::Valid => Ok(ValidationOutcome::valid()),
        ValidationResult::Invalid { errors, .. } => {
            Ok(ValidationOutcome::invalid(to_schema_errors(errors)))
        }
        ValidationResult::InternalError { code } => Err(LibXml2Error::InternalError {
            details: format!("Internal error code: {}", code),
        }
        .into()),
    }
}
