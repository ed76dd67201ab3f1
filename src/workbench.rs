//! The two-pane validation workbench.
//!
//! Holds the instance and schema panes, turns document changes and user
//! actions into a FIFO queue and runs one orchestrator pass per queued
//! validation, each to completion before the next starts.
//!
//! A pass reads the documents as they are when it runs, not as they were
//! when its change was queued. Change notifications that are next to each
//! other in the queue would therefore all see the same text, so only the
//! last of such a run is kept.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tracing::{debug, info};

use crate::config::FileConfig;
use crate::document::{DocumentAccess, DocumentChange, TextDocument, TextRange};
use crate::error::{Result, ValidationError};
use crate::orchestrator::{PassReport, StatusBoard, StatusSurface, ValidationOrchestrator};
use crate::overlay::ThemePolicy;
use crate::pane::EditorPane;
use crate::schema_validator::SchemaValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneId {
    Instance,
    Schema,
}

impl std::fmt::Display for PaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaneId::Instance => write!(f, "instance"),
            PaneId::Schema => write!(f, "schema"),
        }
    }
}

/// User-facing triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiAction {
    /// Either document changed
    ValidateOnChange,
    Normalize,
    LoadExampleInstance,
    LoadExampleSchema,
    ClearInstance,
    ClearSchema,
}

pub struct Workbench<V, S = StatusBoard> {
    orchestrator: ValidationOrchestrator<V, S>,
    instance: EditorPane,
    schema: EditorPane,
    examples: FileConfig,
    sender: UnboundedSender<UiAction>,
    receiver: UnboundedReceiver<UiAction>,
    last_report: Option<PassReport>,
}

impl<V: SchemaValidator, S: StatusSurface> Workbench<V, S> {
    /// Empty panes; every later change to either document queues a validation
    pub fn new(validator: V, status: S, theme: Arc<dyn ThemePolicy>, examples: FileConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut instance = EditorPane::new(TextDocument::default(), Arc::clone(&theme));
        let mut schema = EditorPane::new(TextDocument::default(), theme);
        for pane in [&mut instance, &mut schema] {
            let notify = sender.clone();
            pane.document_mut()
                .on_change(Arc::new(move |_change: &DocumentChange| {
                    // The receiver lives as long as the workbench
                    let _ = notify.send(UiAction::ValidateOnChange);
                }));
        }

        Self {
            orchestrator: ValidationOrchestrator::new(validator, status),
            instance,
            schema,
            examples,
            sender,
            receiver,
            last_report: None,
        }
    }

    pub fn pane(&self, id: PaneId) -> &EditorPane {
        match id {
            PaneId::Instance => &self.instance,
            PaneId::Schema => &self.schema,
        }
    }

    fn pane_mut(&mut self, id: PaneId) -> &mut EditorPane {
        match id {
            PaneId::Instance => &mut self.instance,
            PaneId::Schema => &mut self.schema,
        }
    }

    pub fn instance(&self) -> &EditorPane {
        &self.instance
    }

    pub fn schema(&self) -> &EditorPane {
        &self.schema
    }

    pub fn status(&self) -> &S {
        self.orchestrator.status()
    }

    pub fn orchestrator(&self) -> &ValidationOrchestrator<V, S> {
        &self.orchestrator
    }

    /// Report of the most recent pass
    pub fn last_report(&self) -> Option<&PassReport> {
        self.last_report.as_ref()
    }

    /// Queue an action for [`process_pending`](Self::process_pending)
    pub fn dispatch(&self, action: UiAction) {
        debug!(?action, "action queued");
        let _ = self.sender.send(action);
    }

    /// Sender for producers outside the workbench
    pub fn sender(&self) -> UnboundedSender<UiAction> {
        self.sender.clone()
    }

    /// Edit part of a pane
    pub fn edit(&mut self, id: PaneId, range: TextRange, text: &str) -> Result<DocumentChange> {
        Ok(self.pane_mut(id).edit(range, text)?)
    }

    /// Replace a pane's text
    pub fn set_text(&mut self, id: PaneId, text: &str) -> DocumentChange {
        self.pane_mut(id).set_text(text)
    }

    /// Handle queued actions in order until the queue is empty.
    ///
    /// Actions may queue further ones (a load or a normalization edits a
    /// document, which queues a validation); those run in the same call.
    /// A run of consecutive `ValidateOnChange` actions collapses into one
    /// pass. Returns the reports of the passes that ran.
    pub async fn process_pending(&mut self) -> Result<Vec<PassReport>> {
        let mut reports = Vec::new();
        let mut next = self.next_action();
        while let Some(action) = next {
            next = self.next_action();

            if action == UiAction::ValidateOnChange && next == Some(UiAction::ValidateOnChange) {
                debug!("coalescing change notification");
                continue;
            }

            if let Some(report) = self.handle(action).await? {
                reports.push(report);
            }
            if next.is_none() {
                next = self.next_action();
            }
        }
        Ok(reports)
    }

    fn next_action(&mut self) -> Option<UiAction> {
        match self.receiver.try_recv() {
            Ok(action) => Some(action),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Handle one action immediately
    pub async fn handle(&mut self, action: UiAction) -> Result<Option<PassReport>> {
        debug!(?action, "handling action");
        match action {
            UiAction::ValidateOnChange => Ok(Some(self.run_pass(false).await)),
            UiAction::Normalize => Ok(Some(self.run_pass(true).await)),
            UiAction::LoadExampleInstance => {
                self.load_example(PaneId::Instance).await?;
                Ok(None)
            }
            UiAction::LoadExampleSchema => {
                self.load_example(PaneId::Schema).await?;
                Ok(None)
            }
            UiAction::ClearInstance => {
                self.set_text(PaneId::Instance, "");
                Ok(None)
            }
            UiAction::ClearSchema => {
                self.set_text(PaneId::Schema, "");
                Ok(None)
            }
        }
    }

    /// Load a file into a pane
    pub async fn load_file(&mut self, id: PaneId, path: &Path) -> Result<()> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ValidationError::Load {
                path: path.to_path_buf(),
                source,
            })?;
        info!(pane = %id, path = %path.display(), "document loaded");
        self.set_text(id, &text);
        Ok(())
    }

    async fn load_example(&mut self, id: PaneId) -> Result<()> {
        let path = match id {
            PaneId::Instance => self.examples.instance.clone(),
            PaneId::Schema => self.examples.schema.clone(),
        };
        let path = path.ok_or_else(|| ValidationError::MissingExample {
            pane: id.to_string(),
        })?;
        self.load_file(id, &path).await
    }

    async fn run_pass(&mut self, want_normalize: bool) -> PassReport {
        let report = self
            .orchestrator
            .run_validation(&mut self.instance, &mut self.schema, want_normalize)
            .await;
        self.last_report = Some(report.clone());
        report
    }
}
