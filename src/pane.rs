//! An editor pane: one document and the overlay drawn over it.

use std::sync::Arc;

use tracing::warn;

use crate::document::{DocumentAccess, DocumentChange, TextDocument, TextRange};
use crate::error::{DocumentError, DocumentResult};
use crate::overlay::{AnnotationOverlay, Marker, ThemePolicy};

pub struct EditorPane<D: DocumentAccess = TextDocument> {
    document: D,
    overlay: AnnotationOverlay,
}

impl<D: DocumentAccess> EditorPane<D> {
    pub fn new(document: D, theme: Arc<dyn ThemePolicy>) -> Self {
        Self {
            document,
            overlay: AnnotationOverlay::new(theme),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    /// Mutable access for subscription management; edits should go through
    /// [`edit`](Self::edit) or [`set_text`](Self::set_text) so markers follow.
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn overlay(&self) -> &AnnotationOverlay {
        &self.overlay
    }

    pub fn markers(&self) -> &[Marker] {
        self.overlay.markers()
    }

    pub fn text(&self) -> String {
        self.document.text()
    }

    /// Replace `range` and carry the markers along
    pub fn edit(&mut self, range: TextRange, text: &str) -> DocumentResult<DocumentChange> {
        let change = self.document.replace(range, text)?;
        self.overlay.map_through(&self.document, &change);
        Ok(change)
    }

    /// Replace the whole text and carry the markers along
    pub fn set_text(&mut self, text: &str) -> DocumentChange {
        let change = self.document.replace_all(text);
        self.overlay.map_through(&self.document, &change);
        change
    }

    pub fn clear_markers(&mut self) {
        self.overlay.clear();
    }

    pub fn annotate(&mut self, line: usize, message: &str) -> DocumentResult<()> {
        self.overlay.annotate(&self.document, line, message)
    }

    /// Annotate, logging and skipping lines the document no longer has.
    ///
    /// Returns whether a marker was added.
    pub fn annotate_or_skip(&mut self, line: usize, message: &str) -> bool {
        match self.annotate(line, message) {
            Ok(()) => true,
            Err(DocumentError::LineOutOfRange { line, line_count }) => {
                warn!(line, line_count, "skipping marker for missing line");
                false
            }
            Err(error) => {
                warn!(%error, "skipping marker");
                false
            }
        }
    }
}

impl<D: DocumentAccess + std::fmt::Debug> std::fmt::Debug for EditorPane<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorPane")
            .field("document", &self.document)
            .field("overlay", &self.overlay)
            .finish()
    }
}
