/// HTTP-level tests for interactions logged against leads
mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

async fn seeded_lead(store: &Arc<MemoryStore>) -> String {
    let app = test_app(store.clone(), Some(RecordingMailer::new()));
    let (status, body) = post(
        &app,
        "/api/v1/leads",
        json!({"name": "Ada", "email": "ada@analytical.io", "company": "AE"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["lead_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_interaction_is_created_with_server_timestamp() {
    let store = MemoryStore::new();
    let lead_id = seeded_lead(&store).await;
    let app = test_app(store, None);

    let (status, body) = post(
        &app,
        "/api/v1/interactions",
        json!({
            "lead_id": lead_id,
            "interaction_type": "call",
            "description": "Intro call",
            "notes": "Wants a demo",
            "created_at": "1999-01-01T00:00:00Z"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let interaction = &body["interaction"];
    assert_eq!(interaction["lead_id"], json!(lead_id));
    assert_eq!(interaction["interaction_type"], json!("call"));
    assert_eq!(interaction["notes"], json!("Wants a demo"));
    assert!(!interaction["created_at"].as_str().unwrap().starts_with("1999"));
}

#[tokio::test]
async fn test_interaction_requires_fields() {
    let app = test_app(MemoryStore::new(), None);

    let (status, body) = post(
        &app,
        "/api/v1/interactions",
        json!({"lead_id": "00000000-0000-0000-0000-000000000001", "interaction_type": "email"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing required fields"));
}

#[tokio::test]
async fn test_interaction_rejects_malformed_lead_id() {
    let app = test_app(MemoryStore::new(), None);

    let (status, body) = post(
        &app,
        "/api/v1/interactions",
        json!({"lead_id": "lead-42", "interaction_type": "email", "description": "Sent deck"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid lead_id"));
}

#[tokio::test]
async fn test_interaction_for_unknown_lead_is_not_found() {
    let app = test_app(MemoryStore::new(), None);

    let (status, body) = post(
        &app,
        "/api/v1/interactions",
        json!({
            "lead_id": "00000000-0000-0000-0000-000000000001",
            "interaction_type": "email",
            "description": "Sent deck"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Lead not found"));
}

#[tokio::test]
async fn test_lead_interactions_listed_newest_first() {
    let store = MemoryStore::new();
    let lead_id = seeded_lead(&store).await;
    let app = test_app(store, None);

    for description in ["First touch", "Follow-up"] {
        let (status, _) = post(
            &app,
            "/api/v1/interactions",
            json!({"lead_id": lead_id, "interaction_type": "email", "description": description}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        // Distinct timestamps for the ordering check
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let (status, body) = get(&app, &format!("/api/v1/leads/{}/interactions", lead_id)).await;

    assert_eq!(status, StatusCode::OK);
    let descriptions: Vec<&str> = body["interactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["description"].as_str().unwrap())
        .collect();
    assert_eq!(descriptions, vec!["Follow-up", "First touch"]);
}

#[tokio::test]
async fn test_interactions_of_unknown_lead_are_not_found() {
    let app = test_app(MemoryStore::new(), None);

    let (status, body) = get(
        &app,
        "/api/v1/leads/00000000-0000-0000-0000-000000000001/interactions",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Lead not found"));

    let (status, _) = get(&app, "/api/v1/leads/nope/interactions").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
