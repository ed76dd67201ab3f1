//! Document Access Port
//!
//! The validation core only needs a handful of capabilities from an editor
//! buffer: read the full text, replace text, map a 1-based line number to a
//! character range, and hear about every edit. [`DocumentAccess`] captures
//! those, and [`TextDocument`] is a rope-backed implementation used by the
//! workbench and the CLI.
//!
//! Every edit produces a [`DocumentChange`], which doubles as the change-log
//! primitive that position-derived state (overlay markers) is mapped through.
//! All positions are character offsets.

use std::sync::Arc;

use ropey::Rope;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{DocumentError, DocumentResult};

/// Half-open character range `from..to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub from: usize,
    pub to: usize,
}

impl TextRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.to <= self.from
    }
}

/// Which side of an insertion a mapped position sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay in front of text inserted exactly at the position
    Before,
    /// Move past text inserted exactly at the position
    After,
}

/// A single replacement applied to a document.
///
/// `from..to` is the replaced range in the document *before* the edit and
/// `inserted` the number of characters that took its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChange {
    pub from: usize,
    pub to: usize,
    pub inserted: usize,
    /// Document version after the edit
    pub version: u64,
}

impl DocumentChange {
    /// Characters removed by the edit; zero for an inverted range
    pub fn deleted(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    /// Map a pre-edit position to its post-edit position.
    ///
    /// Positions inside the replaced range collapse onto its start (or onto
    /// the end of the inserted text for [`Assoc::After`]).
    pub fn map_position(&self, pos: usize, assoc: Assoc) -> usize {
        if pos < self.from || (pos == self.from && assoc == Assoc::Before) {
            pos
        } else if pos >= self.to {
            pos - self.deleted() + self.inserted
        } else {
            match assoc {
                Assoc::Before => self.from,
                Assoc::After => self.from + self.inserted,
            }
        }
    }

    /// Map a pre-edit range through the edit.
    ///
    /// Returns `None` when the edit deleted the range: the deletion covers it
    /// completely and extends past at least one of its ends. Clearing the
    /// content of a line keeps a range on it, removing the line drops it.
    pub fn map_range(&self, range: TextRange) -> Option<TextRange> {
        let deletes = self.deleted() > 0;
        let covered = self.from <= range.from && range.to <= self.to;
        let extends = self.from < range.from || range.to < self.to;
        if deletes && covered && extends {
            return None;
        }

        let from = self.map_position(range.from, Assoc::Before);
        let to = self.map_position(range.to, Assoc::After).max(from);
        Some(TextRange { from, to })
    }
}

/// Callback invoked after every applied edit
pub type ChangeCallback = Arc<dyn Fn(&DocumentChange) + Send + Sync>;

/// Handle returned by [`DocumentAccess::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Capabilities the validation core needs from an editor buffer
pub trait DocumentAccess {
    /// Full document text
    fn text(&self) -> String;

    /// Replace `range` with `text`, notifying subscribers
    fn replace(&mut self, range: TextRange, text: &str) -> DocumentResult<DocumentChange>;

    /// Replace the entire document, notifying subscribers
    fn replace_all(&mut self, text: &str) -> DocumentChange;

    /// Number of lines; an empty document has one
    fn line_count(&self) -> usize;

    /// Character range of a 1-based line, excluding its line break
    fn line_to_range(&self, line: usize) -> DocumentResult<TextRange>;

    /// 1-based line containing a character position (clamped to the document)
    fn position_to_line(&self, pos: usize) -> usize;

    fn on_change(&mut self, callback: ChangeCallback) -> Subscription;

    fn unsubscribe(&mut self, subscription: Subscription) -> bool;
}

/// In-memory, rope-backed document
pub struct TextDocument {
    rope: Rope,
    version: u64,
    next_subscription: u64,
    subscribers: Vec<(Subscription, ChangeCallback)>,
}

impl TextDocument {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            version: 0,
            next_subscription: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    fn notify(&self, change: &DocumentChange) {
        trace!(
            from = change.from,
            to = change.to,
            inserted = change.inserted,
            version = change.version,
            "document changed"
        );
        for (_, callback) in &self.subscribers {
            callback(change);
        }
    }
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new("")
    }
}

impl std::fmt::Debug for TextDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDocument")
            .field("len_chars", &self.rope.len_chars())
            .field("lines", &self.rope.len_lines())
            .field("version", &self.version)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl DocumentAccess for TextDocument {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn replace(&mut self, range: TextRange, text: &str) -> DocumentResult<DocumentChange> {
        let len = self.rope.len_chars();
        if range.from > range.to || range.to > len {
            return Err(DocumentError::RangeOutOfBounds {
                from: range.from,
                to: range.to,
                len,
            });
        }

        self.rope.remove(range.from..range.to);
        self.rope.insert(range.from, text);
        self.version += 1;

        let change = DocumentChange {
            from: range.from,
            to: range.to,
            inserted: text.chars().count(),
            version: self.version,
        };
        self.notify(&change);
        Ok(change)
    }

    fn replace_all(&mut self, text: &str) -> DocumentChange {
        let old_len = self.rope.len_chars();
        self.rope = Rope::from_str(text);
        self.version += 1;

        let change = DocumentChange {
            from: 0,
            to: old_len,
            inserted: self.rope.len_chars(),
            version: self.version,
        };
        self.notify(&change);
        change
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_to_range(&self, line: usize) -> DocumentResult<TextRange> {
        let line_count = self.rope.len_lines();
        if line == 0 || line > line_count {
            return Err(DocumentError::LineOutOfRange { line, line_count });
        }

        let index = line - 1;
        let from = self.rope.line_to_char(index);
        let slice = self.rope.line(index);
        let mut len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && slice.char(len - 1) == '\r' {
                len -= 1;
            }
        }

        Ok(TextRange {
            from,
            to: from + len,
        })
    }

    fn position_to_line(&self, pos: usize) -> usize {
        let pos = pos.min(self.rope.len_chars());
        self.rope.char_to_line(pos) + 1
    }

    fn on_change(&mut self, callback: ChangeCallback) -> Subscription {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((subscription, callback));
        subscription
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(id, _)| *id != subscription);
        self.subscribers.len() != before
    }
}
