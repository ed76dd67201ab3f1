//! Structural Integrity Checker
//!
//! Schema validation cannot express every rule of the TRDP configuration
//! format. Identifiers must be unique within their element kind, and the
//! references a `telegram` makes to `data-set` and `com-parameter` elements
//! must resolve. This module extracts the identifier-bearing elements from a
//! (schema-valid) document and checks those two invariant classes.
//!
//! The checker is a pure function: an empty element list, or elements without
//! identifiers, simply produce no violations.

use std::collections::{BTreeMap, HashSet};

use roxmltree::{Attribute, Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// (element kind, identifier attribute) pairs whose values must be unique
/// among elements of that kind.
pub const UNIQUE_IDENTIFIERS: [(&str, &str); 4] = [
    ("bus-interface", "network-id"),
    ("telegram", "com-id"),
    ("com-parameter", "id"),
    ("data-set", "id"),
];

const TELEGRAM: &str = "telegram";
const DATA_SET: &str = "data-set";
const COM_PARAMETER: &str = "com-parameter";
const COM_ID: &str = "com-id";
const DATA_SET_ID: &str = "data-set-id";
const COM_PARAMETER_ID: &str = "com-parameter-id";
const ID: &str = "id";

/// Placeholder used for a telegram that has no `com-id`
pub const UNKNOWN_TELEGRAM: &str = "?";

/// One element of the document carrying at least one identifier attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedElement {
    /// Tag name of the element (e.g. `telegram`)
    pub kind: String,
    /// Identifier attributes only, see [`is_identifier_attribute`]
    pub identifiers: BTreeMap<String, String>,
}

impl IdentifiedElement {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            identifiers: BTreeMap::new(),
        }
    }

    /// Builder-style helper, mostly for tests and fixtures
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.identifiers.insert(attribute.into(), value.into());
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn identifier(&self, attribute: &str) -> Option<&str> {
        self.identifiers.get(attribute).map(String::as_str)
    }
}

/// Class of an integrity violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationCategory {
    /// Two elements of one kind share an identifier value
    Uniqueness,
    /// A telegram references a data-set or com-parameter that does not exist
    Reference,
}

/// One detected inconsistency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
    pub category: ViolationCategory,
    pub message: String,
}

impl IntegrityViolation {
    pub fn uniqueness(kind: &str, attribute: &str) -> Self {
        Self {
            category: ViolationCategory::Uniqueness,
            message: format!("Two or more '{}' have same '{}'.", kind, attribute),
        }
    }

    pub fn reference(telegram: &TelegramReferences) -> Self {
        Self {
            category: ViolationCategory::Reference,
            message: format!(
                "Telegram '{}': {}",
                telegram.com_id,
                telegram.issues.join("; ")
            ),
        }
    }
}

/// Reference check result for a single telegram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramReferences {
    /// The telegram's `com-id`, or `"?"` when absent
    pub com_id: String,
    /// Unresolved references; empty means the telegram is OK
    pub issues: Vec<String>,
}

impl TelegramReferences {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Extraction failure; the document is not well-formed XML
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Identifier extraction failed: {details}")]
pub struct ExtractionError {
    pub details: String,
}

/// Whether an attribute counts as an identifier.
///
/// Any attribute whose name ends with `id` qualifies, which covers the plain
/// `id` attribute and the compound `network-id`, `com-id`, `data-set-id` and
/// `com-parameter-id` names. Only the pairs in [`UNIQUE_IDENTIFIERS`] and the
/// two telegram references are ever checked.
pub fn is_identifier_attribute(name: &str) -> bool {
    name.ends_with("id")
}

/// Collect every identifier-bearing element in document order
pub fn extract_elements(xml: &str) -> Result<Vec<IdentifiedElement>, ExtractionError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options).map_err(|e| ExtractionError {
        details: e.to_string(),
    })?;

    let elements = document
        .descendants()
        .filter(|node| node.is_element())
        .filter_map(|node| {
            let identifiers: BTreeMap<String, String> = node
                .attributes()
                .map(|attr| (qualified_name(node, &attr), attr.value().to_string()))
                .filter(|(name, _)| is_identifier_attribute(name))
                .collect();

            if identifiers.is_empty() {
                None
            } else {
                Some(IdentifiedElement {
                    kind: node.tag_name().name().to_string(),
                    identifiers,
                })
            }
        })
        .collect();

    Ok(elements)
}

/// Attribute name as written, `prefix:local` for namespaced attributes.
///
/// Element kinds compare by local name; attributes keep their prefix so that
/// `x:data-set-id` is not mistaken for the telegram's `data-set-id`.
fn qualified_name(node: Node<'_, '_>, attr: &Attribute<'_, '_>) -> String {
    match attr.namespace().and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) => format!("{}:{}", prefix, attr.name()),
        None => attr.name().to_string(),
    }
}

/// Check both invariant classes.
///
/// Uniqueness violations take priority: when any exist, reference violations
/// are not reported for this pass.
pub fn check(elements: &[IdentifiedElement]) -> Vec<IntegrityViolation> {
    let uniqueness = check_uniqueness(elements);
    if !uniqueness.is_empty() {
        return uniqueness;
    }

    check_references(elements)
        .iter()
        .filter(|telegram| !telegram.is_ok())
        .map(IntegrityViolation::reference)
        .collect()
}

/// One violation per (kind, attribute) pair that has a repeated value
pub fn check_uniqueness(elements: &[IdentifiedElement]) -> Vec<IntegrityViolation> {
    UNIQUE_IDENTIFIERS
        .iter()
        .filter(|(kind, attribute)| !has_unique_values(elements, kind, attribute))
        .map(|(kind, attribute)| IntegrityViolation::uniqueness(kind, attribute))
        .collect()
}

fn has_unique_values(elements: &[IdentifiedElement], kind: &str, attribute: &str) -> bool {
    let mut seen = HashSet::new();
    elements
        .iter()
        .filter(|element| element.is(kind))
        .filter_map(|element| element.identifier(attribute))
        .all(|value| seen.insert(value))
}

/// Resolve every telegram's references, in document order
pub fn check_references(elements: &[IdentifiedElement]) -> Vec<TelegramReferences> {
    let data_set_ids = ids_of(elements, DATA_SET);
    let com_parameter_ids = ids_of(elements, COM_PARAMETER);

    elements
        .iter()
        .filter(|element| element.is(TELEGRAM))
        .map(|telegram| {
            let mut issues = Vec::new();

            if let Some(data_set_id) = declared(telegram, DATA_SET_ID)
                && !data_set_ids.contains(data_set_id)
            {
                issues.push(format!("{} '{}' not found", DATA_SET_ID, data_set_id));
            }

            if let Some(com_parameter_id) = declared(telegram, COM_PARAMETER_ID)
                && !com_parameter_ids.contains(com_parameter_id)
            {
                issues.push(format!(
                    "{} '{}' not found",
                    COM_PARAMETER_ID, com_parameter_id
                ));
            }

            TelegramReferences {
                com_id: declared(telegram, COM_ID)
                    .unwrap_or(UNKNOWN_TELEGRAM)
                    .to_string(),
                issues,
            }
        })
        .collect()
}

fn ids_of<'a>(elements: &'a [IdentifiedElement], kind: &str) -> HashSet<&'a str> {
    elements
        .iter()
        .filter(|element| element.is(kind))
        .filter_map(|element| declared(element, ID))
        .collect()
}

/// Non-empty identifier value; an empty attribute counts as not set
fn declared<'a>(element: &'a IdentifiedElement, attribute: &str) -> Option<&'a str> {
    element.identifier(attribute).filter(|value| !value.is_empty())
}

/// Status text for a list of violations, one per line
pub fn render_violations(violations: &[IntegrityViolation]) -> String {
    violations
        .iter()
        .map(|violation| violation.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
