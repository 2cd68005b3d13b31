//! Integration tests for `AmfeService` over in-memory record tables

mod support;

use std::sync::Arc;
use std::time::Duration;

use amfe_common::resilience::RetryOptions;
use amfe_core::{AmfeService, AmfeTables};
use amfe_domain::{
    ActionStatus, Amfe, AmfeError, AmfeItem, AmfeItemPatch, AmfePatch, AmfeStatus, AmfeType,
    CorrectiveAction, Evidence, Metadata, NewAmfe, NewAmfeItem, NewCorrectiveAction, RemoteFailure,
    RiskLevel,
};
use chrono::{DateTime, TimeZone, Utc};
use support::MockRecordTable;

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn amfe(id: &str, name: &str) -> Amfe {
    Amfe {
        id: id.into(),
        name: name.into(),
        amfe_type: AmfeType::Dfmea,
        status: AmfeStatus::Draft,
        description: None,
        metadata: Metadata::new(),
        created_by: None,
        created_at: at(),
        updated_at: at(),
    }
}

fn item(id: &str, amfe_id: &str, (severity, occurrence, detection): (i32, i32, i32)) -> AmfeItem {
    let npr = severity * occurrence * detection;
    AmfeItem {
        id: id.into(),
        amfe_id: amfe_id.into(),
        failure_mode_id: None,
        process_step: None,
        function: None,
        failure_mode: format!("mode {id}"),
        failure_effects: None,
        severity,
        occurrence,
        detection,
        npr,
        risk_level: RiskLevel::from_npr(npr),
        current_controls: None,
        recommendations: None,
        metadata: Metadata::new(),
        created_at: at(),
        updated_at: at(),
    }
}

fn action(id: &str, item_id: &str, status: ActionStatus) -> CorrectiveAction {
    CorrectiveAction {
        id: id.into(),
        amfe_item_id: item_id.into(),
        action_text: format!("action {id}"),
        responsible_party: None,
        due_date: None,
        status,
        estimated_cost: None,
        actual_cost: None,
        effectiveness: None,
        notes: None,
        metadata: Metadata::new(),
        created_at: at(),
        updated_at: at(),
    }
}

fn evidence(id: &str, action_id: &str) -> Evidence {
    Evidence {
        id: id.into(),
        corrective_action_id: Some(action_id.into()),
        file_name: format!("{id}.pdf"),
        file_path: format!("evidence/{id}.pdf"),
        file_type: Some("application/pdf".into()),
        file_size: Some(2048),
        uploaded_by: None,
        description: None,
        metadata: Metadata::new(),
        created_at: at(),
        updated_at: at(),
    }
}

struct Harness {
    service: AmfeService,
    amfes: Arc<MockRecordTable<Amfe>>,
    items: Arc<MockRecordTable<AmfeItem>>,
    actions: Arc<MockRecordTable<CorrectiveAction>>,
    evidence: Arc<MockRecordTable<Evidence>>,
}

fn harness() -> Harness {
    let amfes: Arc<MockRecordTable<Amfe>> = MockRecordTable::new();
    let items: Arc<MockRecordTable<AmfeItem>> = MockRecordTable::new();
    let actions: Arc<MockRecordTable<CorrectiveAction>> = MockRecordTable::new();
    let evidence: Arc<MockRecordTable<Evidence>> = MockRecordTable::new();
    let tables = AmfeTables {
        amfes: amfes.clone(),
        items: items.clone(),
        actions: actions.clone(),
        evidence: evidence.clone(),
    };
    let read_retry = RetryOptions::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(100))
        .max_delay(Duration::from_millis(1000))
        .no_jitter()
        .build()
        .unwrap();
    Harness { service: AmfeService::with_read_retry(tables, read_retry), amfes, items, actions, evidence }
}

#[tokio::test]
async fn test_complete_amfe_assembles_tree_in_listing_order() {
    let h = harness();
    h.amfes.add(None, amfe("a1", "Brake line"));
    h.amfes.add(None, amfe("a2", "Other"));
    h.items.add(Some("a1"), item("i1", "a1", (8, 5, 3)));
    h.items.add(Some("a1"), item("i2", "a1", (2, 2, 2)));
    h.items.add(Some("a2"), item("i3", "a2", (10, 10, 10)));
    h.actions.add(Some("i1"), action("c1", "i1", ActionStatus::Pending));
    h.actions.add(Some("i1"), action("c2", "i1", ActionStatus::Completed));
    h.evidence.add(Some("c1"), evidence("e1", "c1"));

    let complete = h.service.get_complete_amfe("a1").await.unwrap().unwrap();

    assert_eq!(complete.amfe.id, "a1");
    let item_ids: Vec<&str> = complete.items.iter().map(|e| e.item.id.as_str()).collect();
    assert_eq!(item_ids, vec!["i1", "i2"]);
    assert_eq!(complete.items[0].corrective_actions.len(), 2);
    assert_eq!(complete.items[0].corrective_actions[0].evidence[0].id, "e1");
    assert!(complete.items[0].corrective_actions[1].evidence.is_empty());
    assert!(complete.items[1].corrective_actions.is_empty());
    assert_eq!(complete.highest_risk_item().map(|i| i.id.as_str()), Some("i1"));
    assert_eq!(complete.open_action_count(), 1);
}

#[tokio::test]
async fn test_missing_amfe_is_none_without_loading_children() {
    let h = harness();

    assert!(h.service.get_complete_amfe("nope").await.unwrap().is_none());
    assert!(h.service.get_amfe("nope").await.unwrap().is_none());
    assert_eq!(h.items.list_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transient_list_failure_is_retried() {
    let h = harness();
    h.amfes.add(None, amfe("a1", "Brake line"));
    h.amfes.fail_next(RemoteFailure::status(503, None, "Service Unavailable"));

    let listed = h.service.list_amfes().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(h.amfes.list_calls(), 2);
}

#[tokio::test]
async fn test_permanent_list_failure_is_user_safe() {
    let h = harness();
    h.items.fail_next(RemoteFailure::status(401, None, "JWT expired"));

    let err = h.service.get_amfe_items("a1").await.unwrap_err();

    assert!(matches!(err, AmfeError::PermanentRemote { .. }));
    assert_eq!(err.to_string(), "Failed to fetch AMFE item records");
    assert_eq!(h.items.list_calls(), 1);
}

#[tokio::test]
async fn test_create_amfe_sends_draft_payload() {
    let h = harness();
    h.amfes.answer_insert_with(amfe("a9", "Pump"));

    let created = h
        .service
        .create_amfe(&NewAmfe::new("Pump", AmfeType::Pfmea).with_description("Line 2"))
        .await
        .unwrap();

    assert_eq!(created.id, "a9");
    let sent = &h.amfes.inserted()[0];
    assert_eq!(sent["status"], "draft");
    assert_eq!(sent["type"], "PFMEA");
    assert_eq!(sent["description"], "Line 2");
}

#[tokio::test]
async fn test_invalid_item_is_rejected_before_any_call() {
    let h = harness();

    let err = h
        .service
        .create_amfe_item(&NewAmfeItem::new("a1", "Seal leak", (0, 4, 4)))
        .await
        .unwrap_err();

    assert!(matches!(err, AmfeError::InvalidInput(_)));
    assert!(h.items.inserted().is_empty());

    let err = h
        .service
        .update_amfe_item("i1", &AmfeItemPatch { severity: Some(12), ..AmfeItemPatch::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, AmfeError::InvalidInput(_)));
    assert!(h.items.patched().is_empty());
}

#[tokio::test]
async fn test_create_action_starts_pending() {
    let h = harness();
    h.actions.answer_insert_with(action("c1", "i1", ActionStatus::Pending));

    h.service
        .create_corrective_action(&NewCorrectiveAction::new("i1", "Add torque check"))
        .await
        .unwrap();

    assert_eq!(h.actions.inserted()[0]["status"], "pending");
}

#[tokio::test]
async fn test_update_of_missing_record_is_not_found() {
    let h = harness();

    let patch = AmfePatch { status: Some(AmfeStatus::InProgress), ..AmfePatch::default() };
    let err = h.service.update_amfe("gone", &patch).await.unwrap_err();

    assert_eq!(err, AmfeError::NotFound("AMFE gone".into()));
    assert_eq!(h.amfes.patched()[0].1, serde_json::json!({"status": "in_progress"}));
}

#[tokio::test]
async fn test_writes_are_not_retried() {
    let h = harness();
    h.amfes.fail_next(RemoteFailure::status(503, None, "Service Unavailable"));

    let err = h.service.create_amfe(&NewAmfe::new("Pump", AmfeType::Dfmea)).await.unwrap_err();

    assert!(matches!(err, AmfeError::TransientRemote { .. }));
    assert_eq!(err.to_string(), "Failed to create AMFE");
    assert!(h.amfes.inserted().is_empty());
}

#[tokio::test]
async fn test_delete_requires_an_id() {
    let h = harness();
    h.evidence.add(Some("c1"), evidence("e1", "c1"));

    assert!(matches!(h.service.delete_evidence(" ").await, Err(AmfeError::InvalidInput(_))));
    h.service.delete_evidence("e1").await.unwrap();

    assert_eq!(h.evidence.deleted(), vec!["e1"]);
    assert!(h.service.get_evidence("c1").await.unwrap().is_empty());
}
