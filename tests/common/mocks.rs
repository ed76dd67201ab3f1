use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use trdp_xml_validate::error::{ValidatorError, ValidatorResult};
use trdp_xml_validate::orchestrator::StatusSurface;
use trdp_xml_validate::schema_validator::{SchemaValidator, ValidationOutcome, ValidationRequest};

/// What the scripted validator answers next
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Outcome(ValidationOutcome),
    Failure(String),
}

/// Validator answering from a script and logging every request.
///
/// Once the script runs out every document is reported valid.
#[derive(Clone, Default)]
pub struct ScriptedValidator {
    script: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    requests: Arc<Mutex<Vec<ValidationRequest>>>,
}

impl ScriptedValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_outcome(&self, outcome: ValidationOutcome) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedResponse::Outcome(outcome));
        self
    }

    pub fn push_failure(&self, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedResponse::Failure(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<ValidationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl SchemaValidator for ScriptedValidator {
    fn validate(
        &self,
        request: ValidationRequest,
    ) -> impl Future<Output = ValidatorResult<ValidationOutcome>> + Send {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();

        let result = match next {
            Some(ScriptedResponse::Outcome(outcome)) => Ok(outcome),
            Some(ScriptedResponse::Failure(message)) => Err(ValidatorError::Transport { message }),
            None => Ok(ValidationOutcome::valid()),
        };

        async move { result }
    }
}

/// Status surface keeping every update
#[derive(Clone, Default)]
pub struct RecordingStatus {
    history: Arc<Mutex<Vec<(bool, String)>>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<(bool, String)> {
        self.history.lock().unwrap().clone()
    }

    pub fn latest(&self) -> Option<(bool, String)> {
        self.history.lock().unwrap().last().cloned()
    }
}

impl StatusSurface for RecordingStatus {
    fn set_status(&mut self, failed: bool, message: &str) {
        self.history
            .lock()
            .unwrap()
            .push((failed, message.to_string()));
    }
}
