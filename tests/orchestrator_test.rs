mod common;

use common::*;
use trdp_xml_validate::document::TextRange;
use trdp_xml_validate::orchestrator::{NOT_NORMALIZABLE, PassState, StatusBoard, ValidationOrchestrator};
use trdp_xml_validate::overlay::OverlayState;
use trdp_xml_validate::schema_validator::{SchemaError, ValidationOutcome};

fn orchestrator(validator: &ScriptedValidator) -> ValidationOrchestrator<ScriptedValidator, StatusBoard> {
    ValidationOrchestrator::new(validator.clone(), StatusBoard::new())
}

const TEN_LINES: &str = "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n";

#[tokio::test]
async fn test_invalid_then_fixed_document() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![SchemaError::at(
        4,
        "Element 'telegram': The attribute 'com-id' is required but missing.",
    )]));
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(TEN_LINES);
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.state, PassState::SchemaInvalid);
    assert_eq!(
        orchestrator.status().message(),
        "Line 4: Element 'telegram': The attribute 'com-id' is required but missing."
    );
    assert!(orchestrator.status().failed());
    assert_eq!(instance.markers().len(), 1);
    assert_eq!(instance.markers()[0].line, 4);
    assert_eq!(
        instance.markers()[0].message,
        "Element 'telegram': The attribute 'com-id' is required but missing."
    );

    // The script is exhausted, so the next pass is clean
    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.state, PassState::Valid);
    assert_eq!(instance.overlay().state(), OverlayState::Empty);
    assert!(orchestrator.status().is_success());
}

#[tokio::test]
async fn test_markers_do_not_survive_a_clean_pass() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![SchemaError::at(5, "bad")]));
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(TEN_LINES);
    let mut schema = pane(TRDP_XSD);

    orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;
    assert_eq!(instance.markers().len(), 1);

    orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;
    assert!(instance.markers().is_empty());
}

#[tokio::test]
async fn test_status_lists_every_error() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![
        SchemaError::at(2, "first"),
        SchemaError::new(None, "somewhere"),
        SchemaError::at(7, "second"),
    ]));
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(TEN_LINES);
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.status, "Line 2: first\nLine ?: somewhere\nLine 7: second");
    let lines: Vec<usize> = instance.markers().iter().map(|m| m.line).collect();
    assert_eq!(lines, vec![2, 7]);
}

#[tokio::test]
async fn test_invalid_without_errors_reports_unknown_error() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![]));
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane("<device/>");
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.state, PassState::SchemaInvalid);
    assert_eq!(report.status, "Unknown error");
    assert!(instance.markers().is_empty());
}

#[tokio::test]
async fn test_missing_line_is_skipped() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![
        SchemaError::at(40, "stale"),
        SchemaError::at(1, "fresh"),
    ]));
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane("<device>\n</device>");
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.skipped_markers, 1);
    assert_eq!(report.instance_markers, 1);
    assert_eq!(report.status, "Line 40: stale\nLine 1: fresh");
}

#[tokio::test]
async fn test_schema_errors_annotate_the_schema_pane() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![
        SchemaError::at(3, "bad element declaration").in_schema(),
    ]));
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(VALID_DEVICE);
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.status, "Schema line 3: bad element declaration");
    assert!(instance.markers().is_empty());
    assert_eq!(schema.markers().len(), 1);
    assert_eq!(schema.markers()[0].line, 3);
    assert_eq!(report.schema_markers, 1);
}

#[tokio::test]
async fn test_validator_failure() {
    let validator = ScriptedValidator::new();
    validator
        .push_outcome(ValidationOutcome::invalid(vec![SchemaError::at(2, "x")]))
        .push_failure("worker went away");
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(TEN_LINES);
    let mut schema = pane(TRDP_XSD);

    orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;
    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.state, PassState::Failed);
    assert_eq!(orchestrator.status().message(), "Validation error: worker went away");
    assert!(orchestrator.status().failed());
    assert!(instance.markers().is_empty());
}

#[tokio::test]
async fn test_request_carries_both_documents() {
    let validator = ScriptedValidator::new();
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(VALID_DEVICE);
    let mut schema = pane(TRDP_XSD);

    orchestrator
        .run_validation(&mut instance, &mut schema, true)
        .await;

    let requests = validator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].document_text, VALID_DEVICE);
    assert_eq!(requests[0].schema_text, TRDP_XSD);
    assert!(requests[0].normalize);
}

#[tokio::test]
async fn test_uniqueness_hides_reference_problems() {
    let validator = ScriptedValidator::new();
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(DUPLICATE_COM_ID_DEVICE);
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.state, PassState::IntegrityInvalid);
    assert_eq!(report.status, "Two or more 'telegram' have same 'com-id'.");
    assert!(report.failed);
    // Integrity problems are reported in the status only
    assert!(instance.markers().is_empty());
}

#[tokio::test]
async fn test_dangling_references() {
    let validator = ScriptedValidator::new();
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(DANGLING_REFERENCE_DEVICE);
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(report.state, PassState::IntegrityInvalid);
    assert_eq!(
        report.status,
        "Telegram '1002': data-set-id '7' not found; com-parameter-id '3' not found"
    );
}

#[tokio::test]
async fn test_normalize_replaces_text_without_integrity_checks() {
    // Duplicate com-ids would fail the integrity check if it ran
    let normalized = "<device>\n  <telegram com-id=\"1\"/>\n  <telegram com-id=\"1\"/>\n</device>\n";
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::normalized(normalized));
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane("<device><telegram com-id=\"1\"/><telegram com-id=\"1\"/></device>");
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, true)
        .await;

    assert_eq!(report.state, PassState::Valid);
    assert!(report.normalized);
    assert_eq!(instance.text(), normalized);
    assert!(orchestrator.status().is_success());
}

#[tokio::test]
async fn test_normalize_invalid_document() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![SchemaError::at(2, "bad")]));
    let mut orchestrator = orchestrator(&validator);
    let original = "<device>\n<oops/>\n</device>";
    let mut instance = pane(original);
    let mut schema = pane(TRDP_XSD);

    let report = orchestrator
        .run_validation(&mut instance, &mut schema, true)
        .await;

    assert_eq!(report.state, PassState::SchemaInvalid);
    assert_eq!(report.status, NOT_NORMALIZABLE);
    assert!(!report.normalized);
    assert_eq!(instance.text(), original);
    assert_eq!(instance.markers().len(), 1);
}

#[tokio::test]
async fn test_markers_follow_edits_between_passes() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![SchemaError::at(4, "bad")]));
    let mut orchestrator = orchestrator(&validator);
    let mut instance = pane(TEN_LINES);
    let mut schema = pane(TRDP_XSD);

    orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    instance.edit(TextRange::new(0, 0), "0\n").unwrap();

    assert_eq!(instance.markers()[0].line, 5);
}

#[tokio::test]
async fn test_recording_status_sees_every_pass() {
    let validator = ScriptedValidator::new();
    validator.push_outcome(ValidationOutcome::invalid(vec![SchemaError::at(1, "bad")]));
    let status = RecordingStatus::new();
    let mut orchestrator = ValidationOrchestrator::new(validator.clone(), status.clone());
    let mut instance = pane("<device/>");
    let mut schema = pane(TRDP_XSD);

    orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;
    orchestrator
        .run_validation(&mut instance, &mut schema, false)
        .await;

    assert_eq!(
        status.history(),
        vec![(true, "Line 1: bad".to_string()), (false, String::new())]
    );
    assert_eq!(orchestrator.passes(), 2);
}
