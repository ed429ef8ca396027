#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::TimeZone;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use cdcp_api::config::{BenefitApiConfig, ServerConfig};
use cdcp_api::middleware::trace::make_request_span;
use cdcp_api::routes;
use cdcp_api::session::{CSRF_TOKEN_HEADER, SESSION_ID_HEADER};
use cdcp_api::state::AppState;
use cdcp_client::{BenefitApiError, BenefitApplicationService};
use cdcp_core::clock::Clock;
use cdcp_core::mapping::entity::{
    BenefitApplicationEntity, BenefitApplicationResponse, BenefitApplicationResponseEntity,
    Identification,
};
use cdcp_core::mapping::{BenefitCodes, IDENTIFICATION_CONFIRMATION_NUMBER};
use cdcp_core::types::Timestamp;

/// Confirmation code returned by [`StubBenefitApi`].
pub const CONFIRMATION_CODE: &str = "CONF-0001";

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// A clock the test can move forward.
pub struct TestClock(Mutex<Timestamp>);

impl TestClock {
    /// 2024-06-01 09:00 UTC.
    pub fn new() -> Self {
        Self(Mutex::new(
            chrono::Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ))
    }

    pub fn advance_minutes(&self, minutes: i64) {
        *self.0.lock().unwrap() += chrono::Duration::minutes(minutes);
    }
}

impl Clock for TestClock {
    fn now(&self) -> Timestamp {
        *self.0.lock().unwrap()
    }
}

/// In-process stand-in for the benefits system.
#[derive(Default)]
pub struct StubBenefitApi {
    /// Every entity passed to `submit_application`.
    pub submitted: Mutex<Vec<BenefitApplicationEntity>>,
    /// Returned by `find_client_application` for any SIN.
    pub on_file: Option<BenefitApplicationEntity>,
    /// Answer submissions with a 503.
    pub unavailable: bool,
}

impl StubBenefitApi {
    pub fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl BenefitApplicationService for StubBenefitApi {
    async fn submit_application(
        &self,
        application: &BenefitApplicationEntity,
    ) -> Result<BenefitApplicationResponseEntity, BenefitApiError> {
        if self.unavailable {
            return Err(BenefitApiError::ApiError {
                status: 503,
                body: "maintenance".into(),
            });
        }
        self.submitted.lock().unwrap().push(application.clone());
        Ok(BenefitApplicationResponseEntity {
            benefit_application: BenefitApplicationResponse {
                benefit_application_identification: vec![Identification::tagged(
                    CONFIRMATION_CODE,
                    IDENTIFICATION_CONFIRMATION_NUMBER,
                )],
            },
        })
    }

    async fn find_client_application(
        &self,
        _social_insurance_number: &str,
    ) -> Result<Option<BenefitApplicationEntity>, BenefitApiError> {
        Ok(self.on_file.clone())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        session_timeout_minutes: 20,
        http_session_idle_minutes: 60,
        benefit_api: BenefitApiConfig {
            base_uri: "http://127.0.0.1:1".to_string(),
            subscription_key: "test-key".to_string(),
            timeout_secs: 5,
        },
        codes: BenefitCodes::default(),
    }
}

/// Everything a test needs to drive the app and inspect its collaborators.
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<TestClock>,
    pub benefit_api: Arc<StubBenefitApi>,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(StubBenefitApi::default())
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses.
pub fn build_test_app_with(benefit_api: StubBenefitApi) -> TestApp {
    let clock = Arc::new(TestClock::new());
    let benefit_api = Arc::new(benefit_api);
    let state = AppState::new(test_config(), clock.clone(), benefit_api.clone());

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(SESSION_ID_HEADER),
            HeaderName::from_static(CSRF_TOKEN_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        clock,
        benefit_api,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Session id and CSRF token of an open session.
#[derive(Debug, Clone)]
pub struct Creds {
    pub session_id: String,
    pub csrf_token: String,
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

fn with_creds(
    method: Method,
    uri: &str,
    creds: &Creds,
    csrf_token: Option<&str>,
) -> axum::http::request::Builder {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(SESSION_ID_HEADER, &creds.session_id);
    match csrf_token {
        Some(token) => builder.header(CSRF_TOKEN_HEADER, token),
        None => builder,
    }
}

/// `GET` inside a session.
pub async fn session_get(app: &Router, creds: &Creds, uri: &str) -> Response {
    let request = with_creds(Method::GET, uri, creds, None)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// `POST` with a JSON body and the session's CSRF token.
pub async fn post_json(
    app: &Router,
    creds: &Creds,
    uri: &str,
    body: serde_json::Value,
) -> Response {
    post_json_with_token(app, creds, &creds.csrf_token, uri, body).await
}

pub async fn post_json_with_token(
    app: &Router,
    creds: &Creds,
    csrf_token: &str,
    uri: &str,
    body: serde_json::Value,
) -> Response {
    let request = with_creds(Method::POST, uri, creds, Some(csrf_token))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// `POST` without a body.
pub async fn post_empty(app: &Router, creds: &Creds, uri: &str) -> Response {
    let request = with_creds(Method::POST, uri, creds, Some(&creds.csrf_token))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, creds: &Creds, uri: &str) -> Response {
    let request = with_creds(Method::DELETE, uri, creds, Some(&creds.csrf_token))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Flow helpers
// ---------------------------------------------------------------------------

pub async fn open_session(app: &Router) -> Creds {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/sessions")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    Creds {
        session_id: json["data"]["session_id"].as_str().unwrap().to_string(),
        csrf_token: json["data"]["csrf_token"].as_str().unwrap().to_string(),
    }
}

/// Start a flow and return its id.
pub async fn start_flow(app: &Router, creds: &Creds) -> String {
    let response = post_empty(app, creds, "/api/v1/apply").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    json["data"]["state"]["id"].as_str().unwrap().to_string()
}

/// Submit one applicant step, asserting it was accepted. Returns `data.value`.
pub async fn step(
    app: &Router,
    creds: &Creds,
    flow_id: &str,
    step: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let uri = format!("/api/v1/apply/{flow_id}/steps/{step}");
    let response = post_json(app, creds, &uri, body).await;
    assert_eq!(response.status(), StatusCode::OK, "step {step} failed");

    let json = body_json(response).await;
    assert_eq!(json["data"]["kind"], "ok", "step {step} redirected: {json}");
    json["data"]["value"].clone()
}

/// Submit one child step, asserting it was accepted. Returns `data.value`.
pub async fn child_step(
    app: &Router,
    creds: &Creds,
    flow_id: &str,
    child_id: &str,
    step: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let uri = format!("/api/v1/apply/{flow_id}/children/{child_id}/steps/{step}");
    let response = post_json(app, creds, &uri, body).await;
    assert_eq!(response.status(), StatusCode::OK, "child step {step} failed");

    let json = body_json(response).await;
    assert_eq!(json["data"]["kind"], "ok", "child step {step} redirected: {json}");
    json["data"]["value"].clone()
}

/// Applicant steps shared by the adult and adult-child sections, up to and
/// including communication preferences. The applicant is 40 and single.
pub async fn fill_applicant_steps(app: &Router, creds: &Creds, flow_id: &str, kind: &str) {
    use serde_json::json;

    step(app, creds, flow_id, "type-application", json!({ "type_of_application": kind })).await;
    step(
        app,
        creds,
        flow_id,
        "terms-and-conditions",
        json!({ "acknowledge_terms": true, "acknowledge_privacy": true, "share_data": true }),
    )
    .await;
    step(app, creds, flow_id, "tax-filing", json!({ "tax_filing": true })).await;
    step(app, creds, flow_id, "date-of-birth", json!({ "date_of_birth": "1984-03-15" })).await;
    step(app, creds, flow_id, "disability-tax-credit", json!({ "disability_tax_credit": true })).await;
    step(
        app,
        creds,
        flow_id,
        "applicant-information",
        json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "social_insurance_number": "046 454 286"
        }),
    )
    .await;
    step(app, creds, flow_id, "marital-status", json!({ "marital_status": "single" })).await;
    step(
        app,
        creds,
        flow_id,
        "contact-information",
        json!({
            "phone_number": "613-555-0100",
            "mailing_address": "123 Main St",
            "mailing_city": "Ottawa",
            "mailing_country": "CAN",
            "mailing_province": "ON",
            "mailing_postal_code": "K1A 0B1",
            "copy_mailing_address": true
        }),
    )
    .await;
    step(
        app,
        creds,
        flow_id,
        "communication-preference",
        json!({
            "preferred_language": "en",
            "preferred_method": "email",
            "email": "jane@example.com",
            "confirm_email": "jane@example.com"
        }),
    )
    .await;
}

/// Every step of an adult application.
pub async fn fill_adult_flow(app: &Router, creds: &Creds, flow_id: &str) {
    use serde_json::json;

    fill_applicant_steps(app, creds, flow_id, "adult").await;
    step(app, creds, flow_id, "dental-insurance", json!({ "dental_insurance": false })).await;
    step(
        app,
        creds,
        flow_id,
        "confirm-federal-provincial-territorial-benefits",
        json!({ "has_federal_provincial_territorial_benefits": false }),
    )
    .await;
}
