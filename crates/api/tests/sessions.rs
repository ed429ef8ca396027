//! Integration tests for HTTP sessions and CSRF protection.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, delete, open_session, post_json_with_token, session_get,
    start_flow, Creds,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: opening a session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sessions_get_distinct_ids_and_tokens() {
    let app = build_test_app();
    let first = open_session(&app.router).await;
    let second = open_session(&app.router).await;

    assert_ne!(first.session_id, second.session_id);
    assert_ne!(first.csrf_token, second.csrf_token);
    assert_eq!(first.csrf_token.len(), 32);
}

// ---------------------------------------------------------------------------
// Test: session header is required
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_session_is_401() {
    let app = build_test_app();
    let creds = Creds {
        session_id: "not-a-session".into(),
        csrf_token: "whatever".into(),
    };

    let response = session_get(&app.router, &creds, &format!("/api/v1/apply/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Test: CSRF token
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_csrf_token_is_rejected_and_nothing_saved() {
    let app = build_test_app();
    let creds = open_session(&app.router).await;
    let id = start_flow(&app.router, &creds).await;

    let uri = format!("/api/v1/apply/{id}/steps/type-application");
    let response = post_json_with_token(
        &app.router,
        &creds,
        "forged-token",
        &uri,
        json!({ "type_of_application": "adult" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CSRF_MISMATCH");

    let response = session_get(&app.router, &creds, &format!("/api/v1/apply/{id}")).await;
    let json = body_json(response).await;
    assert!(json["data"]["value"].get("type_of_application").is_none());
}

#[tokio::test]
async fn token_of_another_session_is_rejected() {
    let app = build_test_app();
    let mine = open_session(&app.router).await;
    let theirs = open_session(&app.router).await;
    let id = start_flow(&app.router, &mine).await;

    let uri = format!("/api/v1/apply/{id}/steps/tax-filing");
    let response =
        post_json_with_token(&app.router, &mine, &theirs.csrf_token, &uri, json!({ "tax_filing": true })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: closing a session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_session_can_no_longer_be_used() {
    let app = build_test_app();
    let creds = open_session(&app.router).await;
    let id = start_flow(&app.router, &creds).await;

    let response = delete(&app.router, &creds, "/api/v1/sessions").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = session_get(&app.router, &creds, &format!("/api/v1/apply/{id}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Test: idle sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn idle_session_is_dropped_after_an_hour() {
    let app = build_test_app();
    let creds = open_session(&app.router).await;
    let id = start_flow(&app.router, &creds).await;

    // Each request restarts the HTTP session's window.
    app.clock.advance_minutes(45);
    let response = session_get(&app.router, &creds, &format!("/api/v1/apply/{id}")).await;
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);

    app.clock.advance_minutes(61);
    let response = session_get(&app.router, &creds, &format!("/api/v1/apply/{id}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}
