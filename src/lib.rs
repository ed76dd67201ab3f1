//! # trdp-xml-validate
//!
//! Live validation of TRDP device configurations: an XML instance is checked
//! against its XSD through libxml2, then for identifier uniqueness and
//! cross-references, and every problem is pinned to a line of the document
//! it came from. Markers follow edits until the next pass replaces them.

pub mod cache;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod integrity;
pub mod libxml2;
pub mod orchestrator;
pub mod output;
pub mod overlay;
pub mod pane;
pub mod schema_validator;
pub mod validator;
pub mod workbench;

pub use cache::ParsedSchemaCache;
pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigManager, EnvProvider, SystemEnvProvider};
pub use document::{DocumentAccess, DocumentChange, TextDocument, TextRange};
pub use error::{DocumentError, LibXml2Error, ValidationError, ValidatorError};
pub use integrity::{IdentifiedElement, IntegrityViolation, ViolationCategory};
pub use libxml2::{LibXml2Wrapper, StructuredError, ValidationResult, XmlSchemaPtr};
pub use orchestrator::{PassReport, PassState, StatusBoard, StatusSurface, ValidationOrchestrator};
pub use output::Output;
pub use overlay::{AnnotationOverlay, ColorScheme, FixedTheme, Marker, SystemTheme, ThemePolicy};
pub use pane::EditorPane;
pub use schema_validator::{
    ErrorOrigin, SchemaError, SchemaValidator, ValidationOutcome, ValidationRequest,
};
pub use validator::LibXml2SchemaValidator;
pub use workbench::{PaneId, UiAction, Workbench};
