//! Validation Orchestrator
//!
//! One pass reads both panes, asks the schema validator for a verdict,
//! annotates schema errors on the pane they belong to and, for a
//! schema-valid instance, runs the structural integrity checks. A normalize
//! pass instead rewrites a valid instance with the validator's canonical form.
//!
//! Every pass starts by clearing both overlays, so markers never outlive the
//! pass that produced them.

use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::document::DocumentAccess;
use crate::integrity;
use crate::pane::EditorPane;
use crate::schema_validator::{
    ErrorOrigin, SchemaValidator, ValidationOutcome, ValidationRequest,
    render_schema_errors,
};

/// Status shown when normalization is asked of an invalid document
pub const NOT_NORMALIZABLE: &str = "The XML is invalid, it can't be normalized.";

/// Where pass results are reported
pub trait StatusSurface {
    /// An empty `message` with `failed == false` means success
    fn set_status(&mut self, failed: bool, message: &str);
}

/// Keeps the latest status message and failure flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBoard {
    message: String,
    failed: bool,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn is_success(&self) -> bool {
        !self.failed && self.message.is_empty()
    }
}

impl StatusSurface for StatusBoard {
    fn set_status(&mut self, failed: bool, message: &str) {
        self.failed = failed;
        self.message = message.to_string();
    }
}

/// Terminal state of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Valid,
    SchemaInvalid,
    IntegrityInvalid,
    /// The validator itself failed
    Failed,
}

/// What a pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub state: PassState,
    pub status: String,
    pub failed: bool,
    /// The instance text was replaced by its normalized form
    pub normalized: bool,
    pub instance_markers: usize,
    pub schema_markers: usize,
    /// Errors whose line could not be annotated
    pub skipped_markers: usize,
}

impl PassReport {
    pub fn is_valid(&self) -> bool {
        self.state == PassState::Valid
    }
}

/// Sequences one validation pass over an instance pane and a schema pane
pub struct ValidationOrchestrator<V, S> {
    validator: V,
    status: S,
    passes: u64,
}

impl<V: SchemaValidator, S: StatusSurface> ValidationOrchestrator<V, S> {
    pub fn new(validator: V, status: S) -> Self {
        Self {
            validator,
            status,
            passes: 0,
        }
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub fn status(&self) -> &S {
        &self.status
    }

    /// Number of passes run so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run one validation (or normalization) pass
    pub async fn run_validation<D: DocumentAccess>(
        &mut self,
        instance: &mut EditorPane<D>,
        schema: &mut EditorPane<D>,
        want_normalize: bool,
    ) -> PassReport {
        self.passes += 1;
        let span = info_span!("validation_pass", pass = self.passes, normalize = want_normalize);

        async {
            instance.clear_markers();
            schema.clear_markers();

            let request =
                ValidationRequest::new(instance.text(), schema.text(), want_normalize);

            let report = match self.validator.validate(request).await {
                Err(error) => {
                    warn!(%error, "schema validator failed");
                    self.finish(
                        PassState::Failed,
                        true,
                        format!("Validation error: {}", error),
                        instance,
                        schema,
                    )
                }
                Ok(outcome) if !outcome.valid => {
                    self.schema_invalid(outcome, want_normalize, instance, schema)
                }
                Ok(outcome) if want_normalize => self.normalize(outcome, instance, schema),
                Ok(_) => self.check_integrity(instance, schema),
            };

            info!(state = ?report.state, markers = report.instance_markers, "pass finished");
            report
        }
        .instrument(span)
        .await
    }

    fn schema_invalid<D: DocumentAccess>(
        &mut self,
        outcome: ValidationOutcome,
        want_normalize: bool,
        instance: &mut EditorPane<D>,
        schema: &mut EditorPane<D>,
    ) -> PassReport {
        let mut skipped = 0;
        for error in &outcome.errors {
            let Some(line) = error.line else { continue };
            let pane = match error.origin {
                ErrorOrigin::Instance => &mut *instance,
                ErrorOrigin::Schema => &mut *schema,
            };
            if !pane.annotate_or_skip(line, &error.message) {
                skipped += 1;
            }
        }

        let status = if want_normalize {
            NOT_NORMALIZABLE.to_string()
        } else {
            render_schema_errors(&outcome.errors)
        };
        debug!(errors = outcome.errors.len(), skipped, "schema invalid");

        let mut report = self.finish(PassState::SchemaInvalid, true, status, instance, schema);
        report.skipped_markers = skipped;
        report
    }

    fn normalize<D: DocumentAccess>(
        &mut self,
        outcome: ValidationOutcome,
        instance: &mut EditorPane<D>,
        schema: &mut EditorPane<D>,
    ) -> PassReport {
        let normalized = match outcome.normalized_text {
            Some(text) => {
                instance.set_text(&text);
                true
            }
            None => false,
        };

        let mut report = self.finish(PassState::Valid, false, String::new(), instance, schema);
        report.normalized = normalized;
        report
    }

    fn check_integrity<D: DocumentAccess>(
        &mut self,
        instance: &mut EditorPane<D>,
        schema: &mut EditorPane<D>,
    ) -> PassReport {
        let elements = match integrity::extract_elements(&instance.text()) {
            Ok(elements) => elements,
            Err(error) => {
                warn!(%error, "could not extract elements, skipping integrity checks");
                Vec::new()
            }
        };

        let violations = integrity::check(&elements);
        if violations.is_empty() {
            self.finish(PassState::Valid, false, String::new(), instance, schema)
        } else {
            debug!(violations = violations.len(), "integrity violations");
            self.finish(
                PassState::IntegrityInvalid,
                true,
                integrity::render_violations(&violations),
                instance,
                schema,
            )
        }
    }

    fn finish<D: DocumentAccess>(
        &mut self,
        state: PassState,
        failed: bool,
        status: String,
        instance: &EditorPane<D>,
        schema: &EditorPane<D>,
    ) -> PassReport {
        self.status.set_status(failed, &status);
        PassReport {
            state,
            status,
            failed,
            normalized: false,
            instance_markers: instance.markers().len(),
            schema_markers: schema.markers().len(),
            skipped_markers: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_board() {
        let mut board = StatusBoard::new();
        assert!(board.is_success());

        board.set_status(true, "Line 4: bad");
        assert!(board.failed());
        assert_eq!(board.message(), "Line 4: bad");
        assert!(!board.is_success());

        board.set_status(false, "");
        assert!(board.is_success());
    }

    #[test]
    fn test_pass_report_serializes_state() {
        let report = PassReport {
            state: PassState::IntegrityInvalid,
            status: "x".to_string(),
            failed: true,
            normalized: false,
            instance_markers: 0,
            schema_markers: 0,
            skipped_markers: 0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "integrity_invalid");
        assert!(!report.is_valid());
    }
}
