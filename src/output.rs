//! Simple Output and Reporting
//!
//! Renders a workbench run for the terminal or as JSON.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::cli::VerbosityLevel;
use crate::orchestrator::{PassReport, PassState};
use crate::overlay::Marker;
use crate::workbench::PaneId;

/// A marker as reported outside the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerView {
    pub pane: PaneId,
    pub line: usize,
    pub message: String,
    pub line_style: String,
    pub message_style: String,
}

impl MarkerView {
    pub fn from_marker(pane: PaneId, marker: &Marker) -> Self {
        Self {
            pane,
            line: marker.line,
            message: marker.message.clone(),
            line_style: marker.style.line_css(),
            message_style: marker.style.message_css(),
        }
    }
}

/// Everything printed for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub instance: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub report: PassReport,
    pub markers: Vec<MarkerView>,
    /// Set when the normalized text was written back
    pub written: Option<PathBuf>,
    pub duration_ms: u128,
}

impl RunSummary {
    pub fn new(report: PassReport, markers: Vec<MarkerView>, duration: Duration) -> Self {
        Self {
            instance: None,
            schema: None,
            report,
            markers,
            written: None,
            duration_ms: duration.as_millis(),
        }
    }
}

/// Simple output formatter for human-readable results
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Formatter with colors forced on or off
    pub fn with_colors(verbosity: VerbosityLevel, show_colors: bool) -> Self {
        Self {
            verbosity,
            show_colors,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn headline(&self, state: PassState) -> String {
        match state {
            PassState::Valid => self.colorize("✓ VALID", "32"),
            PassState::SchemaInvalid => self.colorize("✗ SCHEMA INVALID", "31"),
            PassState::IntegrityInvalid => self.colorize("✗ INTEGRITY INVALID", "31"),
            PassState::Failed => self.colorize("⚠ ERROR", "33"),
        }
    }

    pub fn format_summary(&self, summary: &RunSummary) -> String {
        let report = &summary.report;
        let mut output = String::new();

        if self.verbosity == VerbosityLevel::Quiet {
            if report.failed {
                output.push_str(&report.status);
                output.push('\n');
            }
            return output;
        }

        let target = summary
            .instance
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<instance>".to_string());
        output.push_str(&format!(
            "{}  {} ({})\n",
            self.headline(report.state),
            target,
            format_duration(Duration::from_millis(
                u64::try_from(summary.duration_ms).unwrap_or(u64::MAX)
            ))
        ));

        for line in report.status.lines().filter(|line| !line.is_empty()) {
            output.push_str(&format!("    {}\n", line));
        }

        if report.normalized {
            match &summary.written {
                Some(path) => output.push_str(&format!("  Normalized, written to {}\n", path.display())),
                None => output.push_str("  Normalized\n"),
            }
        }

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&self.format_markers(&summary.markers));
            if report.skipped_markers > 0 {
                output.push_str(&format!(
                    "  {} error{} without a matching line\n",
                    report.skipped_markers,
                    if report.skipped_markers == 1 { "" } else { "s" }
                ));
            }
        }

        output
    }

    fn format_markers(&self, markers: &[MarkerView]) -> String {
        let mut output = String::new();
        if markers.is_empty() {
            return output;
        }

        output.push_str("Markers:\n");
        for marker in markers {
            output.push_str(&format!(
                "  {}:{} {}\n",
                marker.pane,
                marker.line,
                self.colorize(&format!("{} {}", crate::overlay::MESSAGE_ARROW, marker.message), "31")
            ));
        }
        output
    }

    pub fn format_json(&self, summary: &RunSummary) -> serde_json::Result<String> {
        serde_json::to_string_pretty(summary)
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
