//! Equipment CRUD over HTTP: field rules, tenant isolation, the update
//! whitelist and the delete role gate.

mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use equipment_service::models::Role;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

fn id_of(body: &Value) -> String {
    body["id"].as_str().unwrap().to_string()
}

fn future_date(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days)).to_string()
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn create_assigns_organization_and_default_status() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;

    let body = app.create_equipment(&caller, "SN-1").await;

    assert_eq!(body["organization_id"], caller.organization_id.to_string());
    assert_eq!(body["serial_number"], "SN-1");
    assert_eq!(body["status_id"], 1);
    assert_eq!(body["created_by"], caller.user_id.to_string());
    assert_eq!(body["updated_by"], caller.user_id.to_string());
    assert!(body.get("deleted_at").is_none());
}

#[tokio::test]
async fn create_reports_first_failing_rule() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;

    let cases = [
        (json!({"make": "Cat", "model": "320"}), "serial_number is required"),
        (json!({"serial_number": "SN-1", "model": "320"}), "make is required"),
        (json!({"serial_number": "SN-1", "make": "Cat", "model": "  "}), "model is required"),
        (
            json!({"serial_number": "SN-1", "make": "Cat", "model": "320", "location": ""}),
            "location cannot be empty string",
        ),
        (
            json!({"serial_number": "SN-1", "make": "Cat", "model": "320", "status_id": 4}),
            "status_id is invalid",
        ),
        (
            json!({"serial_number": "SN-1", "make": "Cat", "model": "320", "status_id": 99}),
            "status_id is invalid",
        ),
        (
            json!({"serial_number": "SN-1", "make": "Cat", "model": "320",
                   "warranty_expires": Utc::now().date_naive().to_string()}),
            "warranty_expires must be in the future",
        ),
        (
            json!({"serial_number": "SN-1", "make": "Cat", "model": "320",
                   "purchased_date": future_date(30), "warranty_expires": future_date(10)}),
            "warranty_expires must be after purchased_date",
        ),
    ];

    for (payload, expected) in cases {
        let (status, body) = app.post("/api/equipment", &caller.token, payload).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", expected);
        assert_eq!(body["error"], expected);
    }
}

#[tokio::test]
async fn create_accepts_warranty_on_purchase_date() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;
    let day = future_date(5);

    let (status, body) = app
        .post(
            "/api/equipment",
            &caller.token,
            json!({"serial_number": "SN-1", "make": "Cat", "model": "320",
                   "purchased_date": day, "warranty_expires": day, "status_id": 2}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["warranty_expires"], day);
    assert_eq!(body["status_id"], 2);
}

#[tokio::test]
async fn malformed_date_is_bad_request() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;

    let (status, _) = app
        .post(
            "/api/equipment",
            &caller.token,
            json!({"serial_number": "SN-1", "make": "Cat", "model": "320",
                   "warranty_expires": "31/12/2030"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_serial_conflicts_within_organization_only() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;
    let other = app.member(Uuid::new_v4()).await;
    app.create_equipment(&caller, "SN-DUP").await;

    let (status, body) = app
        .post(
            "/api/equipment",
            &caller.token,
            json!({"serial_number": "SN-DUP", "make": "Deere", "model": "310L"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "serial_number already exists in organization");

    app.create_equipment(&other, "SN-DUP").await;
}

#[tokio::test]
async fn deleted_serial_can_be_reused() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;
    let manager = app.with_role(&caller, Role::Manager);

    let first = app.create_equipment(&caller, "SN-REUSE").await;
    let (status, _) = app
        .delete(&format!("/api/equipment/{}", id_of(&first)), &manager.token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    app.create_equipment(&caller, "SN-REUSE").await;
}

// ============================================================================
// Reads and tenant isolation
// ============================================================================

#[tokio::test]
async fn foreign_records_are_not_found() {
    let app = TestApp::spawn().await;
    let owner = app.member(Uuid::new_v4()).await;
    let intruder = app.member(Uuid::new_v4()).await;
    let intruder_manager = app.with_role(&intruder, Role::Owner);

    let record = app.create_equipment(&owner, "SN-PRIVATE").await;
    let uri = format!("/api/equipment/{}", id_of(&record));

    let (status, body) = app.get(&uri, &intruder.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Equipment not found");

    let (status, _) = app.patch(&uri, &intruder.token, json!({"make": "Hacked"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&uri, &intruder_manager.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Untouched for its owner
    let (status, body) = app.get(&uri, &owner.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["make"], "Caterpillar");
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;

    let (status, _) = app
        .get(&format!("/api/equipment/{}", Uuid::new_v4()), &caller.token)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_is_scoped_filtered_and_newest_first() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;
    let other = app.member(Uuid::new_v4()).await;

    app.create_equipment(&caller, "SN-A").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let (status, _) = app
        .post(
            "/api/equipment",
            &caller.token,
            json!({"serial_number": "EX-42", "make": "Komatsu", "model": "PC210",
                   "location": "North Depot", "status_id": 2}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.create_equipment(&other, "SN-OTHER").await;

    let (status, body) = app.get("/api/equipment", &caller.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let serials: Vec<&str> = body["equipment"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["serial_number"].as_str().unwrap())
        .collect();
    assert_eq!(serials, vec!["EX-42", "SN-A"]);

    let (_, body) = app.get("/api/equipment?status_id=2", &caller.token).await;
    assert_eq!(body["equipment"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/equipment?location=north", &caller.token).await;
    assert_eq!(body["equipment"][0]["serial_number"], "EX-42");

    let (_, body) = app.get("/api/equipment?search=komat", &caller.token).await;
    assert_eq!(body["equipment"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/equipment?search=other", &caller.token).await;
    assert!(body["equipment"].as_array().unwrap().is_empty());

    let (status, body) = app.get("/api/equipment?status_id=", &caller.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["equipment"].as_array().unwrap().len(), 2);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn update_ignores_non_whitelisted_fields() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;
    let record = app.create_equipment(&caller, "SN-1").await;
    let uri = format!("/api/equipment/{}", id_of(&record));

    let (status, body) = app
        .patch(
            &uri,
            &caller.token,
            json!({
                "make": "Deere",
                "serial_number": "SN-CHANGED",
                "organization_id": Uuid::new_v4(),
                "created_by": Uuid::new_v4(),
                "id": Uuid::new_v4(),
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], record["id"]);
    assert_eq!(body["make"], "Deere");
    assert_eq!(body["serial_number"], "SN-1");
    assert_eq!(body["organization_id"], caller.organization_id.to_string());
    assert_eq!(body["created_by"], caller.user_id.to_string());
}

#[tokio::test]
async fn update_null_clears_and_absent_keeps() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;
    let record = app.create_equipment(&caller, "SN-1").await;
    let uri = format!("/api/equipment/{}", id_of(&record));

    let (status, body) = app
        .patch(&uri, &caller.token, json!({"notes": "Hydraulic leak"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "Hydraulic leak");
    assert_eq!(body["location"], "Yard A");

    let (status, body) = app
        .patch(&uri, &caller.token, json!({"location": null}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("location").is_none());
    assert_eq!(body["notes"], "Hydraulic leak");
}

#[tokio::test]
async fn update_validates_the_merged_record() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;
    let record = app.create_equipment(&caller, "SN-1").await;
    let uri = format!("/api/equipment/{}", id_of(&record));

    let (status, body) = app.patch(&uri, &caller.token, json!({"make": ""})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "make is required");

    let (status, body) = app.patch(&uri, &caller.token, json!({"status_id": 4})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "status_id is invalid");

    let (status, body) = app
        .patch(&uri, &caller.token, json!({"purchased_date": future_date(400), "warranty_expires": future_date(200)}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "warranty_expires must be after purchased_date");

    let (_, body) = app.get(&uri, &caller.token).await;
    assert_eq!(body["make"], "Caterpillar");
}

#[tokio::test]
async fn update_status_zero_selects_default() {
    let app = TestApp::spawn().await;
    let caller = app.member(Uuid::new_v4()).await;
    let record = app.create_equipment(&caller, "SN-1").await;
    let uri = format!("/api/equipment/{}", id_of(&record));

    let (_, body) = app.patch(&uri, &caller.token, json!({"status_id": 3})).await;
    assert_eq!(body["status_id"], 3);

    let (status, body) = app.patch(&uri, &caller.token, json!({"status_id": 0})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status_id"], 1);
}

#[tokio::test]
async fn update_records_the_editor() {
    let app = TestApp::spawn().await;
    let org = Uuid::new_v4();
    let author = app.member(org).await;
    let editor = app.member(org).await;
    let record = app.create_equipment(&author, "SN-1").await;
    let uri = format!("/api/equipment/{}", id_of(&record));

    let (status, body) = app.patch(&uri, &editor.token, json!({"model": "330"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created_by"], author.user_id.to_string());
    assert_eq!(body["updated_by"], editor.user_id.to_string());
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn delete_requires_manager_role() {
    let app = TestApp::spawn().await;
    let member = app.member(Uuid::new_v4()).await;
    let record = app.create_equipment(&member, "SN-1").await;
    let uri = format!("/api/equipment/{}", id_of(&record));

    let (status, body) = app.delete(&uri, &member.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient role. Required: manager");

    let (status, _) = app.get(&uri, &member.token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn soft_delete_hides_the_record() {
    let app = TestApp::spawn().await;
    let member = app.member(Uuid::new_v4()).await;
    let admin = app.with_role(&member, Role::Admin);
    let record = app.create_equipment(&member, "SN-1").await;
    let id: Uuid = id_of(&record).parse().unwrap();
    let uri = format!("/api/equipment/{}", id);

    let (status, body) = app.delete(&uri, &admin.token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app.get(&uri, &member.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&uri, &admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/equipment", &member.token).await;
    assert_eq!(body["total"], 0);

    let raw = app.store.raw_equipment(id).await.unwrap();
    assert!(raw.deleted_at.is_some());
}
