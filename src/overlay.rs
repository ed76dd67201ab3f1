//! Annotation Overlay Manager
//!
//! Owns the error markers shown on top of one document. A marker is a
//! whole-line highlight plus an inline message rendered at the end of that
//! line. Markers are created from a 1-based line number, but what is stored is
//! the character range the line had at that moment; later edits remap the
//! range through [`DocumentChange::map_range`] so the marker stays on the same
//! text, or disappears with it.
//!
//! The marker set is never diffed: every validation pass starts with
//! [`AnnotationOverlay::clear`] and then adds the markers of that pass only.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EnvProvider, SystemEnvProvider};
use crate::document::{DocumentAccess, DocumentChange, TextRange};
use crate::error::DocumentResult;

/// Arrow placed between the line content and the inline message
pub const MESSAGE_ARROW: &str = "\u{27f6}";

/// Color scheme of the editing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

/// Style pair applied to one marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    /// Background of the highlighted line
    pub line_background: &'static str,
    /// Color of the inline message
    pub message_color: &'static str,
}

impl MarkerStyle {
    pub const LIGHT: MarkerStyle = MarkerStyle {
        line_background: "#fee",
        message_color: "red",
    };

    pub const DARK: MarkerStyle = MarkerStyle {
        line_background: "#442222",
        message_color: "#ff6666",
    };

    pub fn for_scheme(scheme: ColorScheme) -> Self {
        match scheme {
            ColorScheme::Light => Self::LIGHT,
            ColorScheme::Dark => Self::DARK,
        }
    }

    /// Inline style of the line highlight
    pub fn line_css(&self) -> String {
        format!("background: {};", self.line_background)
    }

    /// Inline style of the message widget
    pub fn message_css(&self) -> String {
        format!(
            "color: {}; padding-left: .5em; font-size: 0.8em",
            self.message_color
        )
    }
}

/// Source of marker styles, consulted once per `annotate` call
pub trait ThemePolicy: Send + Sync {
    fn color_scheme(&self) -> ColorScheme;

    fn styles(&self) -> MarkerStyle {
        MarkerStyle::for_scheme(self.color_scheme())
    }
}

/// Always the same scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTheme(pub ColorScheme);

impl ThemePolicy for FixedTheme {
    fn color_scheme(&self) -> ColorScheme {
        self.0
    }
}

/// Scheme taken from the environment.
///
/// `TRDP_XML_COLOR_SCHEME` (`light` or `dark`) wins; otherwise the terminal
/// background from `COLORFGBG` decides, defaulting to light.
pub struct SystemTheme<E: EnvProvider = SystemEnvProvider> {
    env: E,
}

impl SystemTheme<SystemEnvProvider> {
    pub fn new() -> Self {
        Self {
            env: SystemEnvProvider,
        }
    }
}

impl Default for SystemTheme<SystemEnvProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EnvProvider> SystemTheme<E> {
    pub fn with_env(env: E) -> Self {
        Self { env }
    }
}

impl<E: EnvProvider + Send + Sync> ThemePolicy for SystemTheme<E> {
    fn color_scheme(&self) -> ColorScheme {
        if let Some(scheme) = self.env.get("TRDP_XML_COLOR_SCHEME") {
            match scheme.trim().to_lowercase().as_str() {
                "dark" => return ColorScheme::Dark,
                "light" => return ColorScheme::Light,
                _ => {}
            }
        }

        // COLORFGBG is "<fg>;<bg>" (sometimes with a middle field)
        self.env
            .get("COLORFGBG")
            .and_then(|value| value.rsplit(';').next().map(str::to_string))
            .and_then(|bg| bg.trim().parse::<u8>().ok())
            .map(|bg| {
                if bg <= 6 || bg == 8 {
                    ColorScheme::Dark
                } else {
                    ColorScheme::Light
                }
            })
            .unwrap_or_default()
    }
}

/// A line-level annotation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub line: usize,
    pub message: String,
}

impl Annotation {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// One visible marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    /// Current 1-based line of the marker
    pub line: usize,
    pub message: String,
    /// Character range of the highlighted line; the message sits at `range.to`
    pub range: TextRange,
    pub style: MarkerStyle,
}

impl Marker {
    /// Text of the inline message widget
    pub fn widget_text(&self) -> String {
        format!(" {} {}", MESSAGE_ARROW, self.message)
    }
}

/// Externally visible overlay state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverlayState {
    Empty,
    Populated(usize),
}

/// Marker set for one document
pub struct AnnotationOverlay {
    markers: Vec<Marker>,
    theme: Arc<dyn ThemePolicy>,
}

impl AnnotationOverlay {
    pub fn new(theme: Arc<dyn ThemePolicy>) -> Self {
        Self {
            markers: Vec::new(),
            theme,
        }
    }

    pub fn state(&self) -> OverlayState {
        if self.markers.is_empty() {
            OverlayState::Empty
        } else {
            OverlayState::Populated(self.markers.len())
        }
    }

    /// Markers ordered by position
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Remove every marker
    pub fn clear(&mut self) {
        if !self.markers.is_empty() {
            debug!(removed = self.markers.len(), "clearing markers");
        }
        self.markers.clear();
    }

    /// Add a marker on `line` of `document`
    pub fn annotate<D: DocumentAccess + ?Sized>(
        &mut self,
        document: &D,
        line: usize,
        message: &str,
    ) -> DocumentResult<()> {
        let range = document.line_to_range(line)?;
        let marker = Marker {
            line,
            message: message.to_string(),
            range,
            style: self.theme.styles(),
        };

        let index = self
            .markers
            .partition_point(|existing| existing.range.from <= range.from);
        self.markers.insert(index, marker);
        debug!(line, "marker added");
        Ok(())
    }

    /// Clear, then add exactly `annotations`.
    ///
    /// Stops at the first line the document does not have; markers added
    /// before it stay.
    pub fn replace<D: DocumentAccess + ?Sized>(
        &mut self,
        document: &D,
        annotations: &[Annotation],
    ) -> DocumentResult<()> {
        self.clear();
        for annotation in annotations {
            self.annotate(document, annotation.line, &annotation.message)?;
        }
        Ok(())
    }

    /// Remap markers through an edit already applied to `document`
    pub fn map_through<D: DocumentAccess + ?Sized>(
        &mut self,
        document: &D,
        change: &DocumentChange,
    ) {
        if self.markers.is_empty() {
            return;
        }

        let before = self.markers.len();
        self.markers.retain_mut(|marker| match change.map_range(marker.range) {
            Some(range) => {
                marker.range = range;
                marker.line = document.position_to_line(range.from);
                true
            }
            None => false,
        });

        let dropped = before - self.markers.len();
        if dropped > 0 {
            debug!(dropped, "markers dropped by edit");
        }
    }
}

impl std::fmt::Debug for AnnotationOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationOverlay")
            .field("markers", &self.markers)
            .finish_non_exhaustive()
    }
}
