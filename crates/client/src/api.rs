//! REST client for the benefits system HTTP endpoints.
//!
//! Every request carries the `Ocp-Apim-Subscription-Key` header expected by
//! the API gateway in front of the benefits system.

use async_trait::async_trait;
use cdcp_core::mapping::entity::{BenefitApplicationEntity, BenefitApplicationResponseEntity};
use reqwest::StatusCode;

use crate::service::BenefitApplicationService;

/// Header carrying the gateway subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// HTTP client for the benefits system.
pub struct BenefitApplicationApi {
    client: reqwest::Client,
    base_uri: String,
    subscription_key: String,
}

/// Errors from the benefits REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum BenefitApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The benefits system returned a non-2xx status code.
    #[error("Benefits API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl BenefitApplicationApi {
    /// * `base_uri` - e.g. `https://api.example.gc.ca/dental-care/applicant-information/v1`.
    pub fn new(base_uri: String, subscription_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_uri, subscription_key)
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling, timeouts).
    pub fn with_client(client: reqwest::Client, base_uri: String, subscription_key: String) -> Self {
        Self {
            client,
            base_uri: base_uri.trim_end_matches('/').to_string(),
            subscription_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_uri)
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BenefitApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BenefitApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BenefitApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl BenefitApplicationService for BenefitApplicationApi {
    /// `POST {base}/benefit-application`.
    async fn submit_application(
        &self,
        application: &BenefitApplicationEntity,
    ) -> Result<BenefitApplicationResponseEntity, BenefitApiError> {
        let response = self
            .client
            .post(self.url("benefit-application"))
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .json(application)
            .send()
            .await?;

        tracing::debug!(status = %response.status(), "Benefit application submitted");
        Self::parse_response(response).await
    }

    /// `POST {base}/client-application` with the SIN in the body, so it never
    /// appears in a URL. 404 means no application on file.
    async fn find_client_application(
        &self,
        social_insurance_number: &str,
    ) -> Result<Option<BenefitApplicationEntity>, BenefitApiError> {
        let body = serde_json::json!({
            "Applicant": {
                "PersonSINIdentification": {
                    "IdentificationID": social_insurance_number,
                }
            }
        });

        let response = self
            .client
            .post(self.url("client-application"))
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::parse_response(response).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;

    const KEY: &str = "test-key";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(SUBSCRIPTION_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            == Some(KEY)
    }

    async fn submit(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "no key" })));
        }
        let sin = body["BenefitApplication"]["Applicant"]["PersonSINIdentification"]["IdentificationID"].clone();
        (
            StatusCode::OK,
            Json(json!({
                "BenefitApplication": {
                    "BenefitApplicationIdentification": [
                        { "IdentificationID": format!("CONF-{}", sin.as_str().unwrap_or("")), "IdentificationCategoryText": "Confirmation Number" }
                    ]
                }
            })),
        )
    }

    async fn client_application(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let sin = body["Applicant"]["PersonSINIdentification"]["IdentificationID"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        match sin.as_str() {
            "046454286" => (
                StatusCode::OK,
                Json(json!({
                    "BenefitApplication": {
                        "Applicant": {
                            "PersonName": [{ "PersonGivenName": ["Jane"], "PersonSurName": "Doe" }],
                            "PersonSINIdentification": { "IdentificationID": "046454286" }
                        },
                        "BenefitApplicationCategoryCode": { "ReferenceDataID": "775170000" }
                    }
                })),
            ),
            "500000000" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" }))),
            _ => (StatusCode::NOT_FOUND, Json(json!({}))),
        }
    }

    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route("/benefit-application", post(submit))
            .route("/client-application", post(client_application));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn application() -> BenefitApplicationEntity {
        serde_json::from_value(json!({
            "BenefitApplication": {
                "Applicant": {
                    "PersonSINIdentification": { "IdentificationID": "046454286" }
                },
                "BenefitApplicationCategoryCode": { "ReferenceDataID": "775170000" }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn submit_sends_subscription_key_and_parses_receipt() {
        let api = BenefitApplicationApi::new(spawn_upstream().await, KEY.into());
        let response = api.submit_application(&application()).await.unwrap();
        let ids = &response.benefit_application.benefit_application_identification;
        assert_eq!(ids[0].identification_id, "CONF-046454286");
    }

    #[tokio::test]
    async fn submit_with_wrong_key_is_api_error() {
        let api = BenefitApplicationApi::new(spawn_upstream().await, "wrong".into());
        let err = api.submit_application(&application()).await.unwrap_err();
        assert_matches!(err, BenefitApiError::ApiError { status: 401, .. });
    }

    #[tokio::test]
    async fn find_client_application_maps_not_found_to_none() {
        let api = BenefitApplicationApi::new(spawn_upstream().await, KEY.into());
        assert!(api.find_client_application("800000002").await.unwrap().is_none());

        let found = api.find_client_application("046454286").await.unwrap().unwrap();
        assert_eq!(
            found.benefit_application.applicant.person_name[0].person_sur_name,
            "Doe"
        );
    }

    #[tokio::test]
    async fn find_client_application_surfaces_server_errors() {
        let api = BenefitApplicationApi::new(spawn_upstream().await, KEY.into());
        let err = api.find_client_application("500000000").await.unwrap_err();
        assert_matches!(err, BenefitApiError::ApiError { status: 500, ref body } if body.contains("boom"));
    }
}
