//! Payload CMS client for the dive collection.
//!
//! Payload reports a unique-index collision either as `409 Conflict` or as a
//! `400` `ValidationError` listing the offending field path. Both map to
//! [`WriteOutcome::AlreadyExists`].

use crate::config::PayloadConfig;
use crate::utils::{body_snippet, error_from_response, http_client};
use crate::{Credentials, GarminDivesError, NormalizedDive, PayloadClient, Session, WriteOutcome};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Field carrying the collection's unique index.
pub const UNIQUE_KEY: &str = "garminActivityId";

#[derive(Clone, Debug)]
pub struct ReqwestPayloadClient {
    base_url: String,
    collection: String,
    auth_collection: String,
    client: reqwest::Client,
}

impl ReqwestPayloadClient {
    pub fn new(
        base_url: &str,
        collection: impl Into<String>,
        auth_collection: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GarminDivesError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.into(),
            auth_collection: auth_collection.into(),
            client: http_client(timeout)?,
        })
    }

    pub fn from_config(config: &PayloadConfig) -> Result<Self, GarminDivesError> {
        Self::new(
            &config.base_url,
            config.collection.clone(),
            config.auth_collection.clone(),
            config.timeout,
        )
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }

    fn authorized(&self, request: reqwest::RequestBuilder, session: &Session) -> reqwest::RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("JWT {}", session.token().expose_secret()),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    name: Option<String>,
    data: Option<ErrorData>,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
struct FieldError {
    path: Option<String>,
}

/// Whether a Payload error body is a validation failure on the unique key.
fn is_unique_key_violation(body: &str) -> bool {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return false;
    };
    parsed
        .errors
        .iter()
        .filter(|e| e.name.as_deref() == Some("ValidationError"))
        .filter_map(|e| e.data.as_ref())
        .flat_map(|d| d.errors.iter())
        .any(|f| f.path.as_deref() == Some(UNIQUE_KEY))
}

#[async_trait]
impl PayloadClient for ReqwestPayloadClient {
    async fn login(&self, credentials: &Credentials) -> Result<Session, GarminDivesError> {
        let url = format!("{}/{}/login", self.base_url, self.auth_collection);
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp, true).await);
        }

        #[derive(Deserialize)]
        struct LoginPayload {
            token: Option<String>,
        }

        let payload: LoginPayload = resp.json().await?;
        let token = payload
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GarminDivesError::Auth("no token returned from Payload login".into()))?;
        Ok(Session::new(SecretString::new(token.into())))
    }

    async fn latest_start_time_gmt(
        &self,
        session: &Session,
    ) -> Result<Option<String>, GarminDivesError> {
        let request = self
            .client
            .get(self.collection_url())
            .query(&[("limit", "1"), ("sort", "-startTimeGMT")]);
        let resp = self.authorized(request, session).send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp, false).await);
        }

        #[derive(Deserialize)]
        struct Page {
            #[serde(default)]
            docs: Vec<serde_json::Value>,
        }

        let page: Page = resp.json().await?;
        let Some(doc) = page.docs.first() else {
            return Ok(None);
        };
        doc.get("startTimeGMT")
            .and_then(|v| v.as_str())
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| GarminDivesError::Decode("latest dive has no startTimeGMT".into()))
    }

    async fn create_dive(
        &self,
        session: &Session,
        dive: &NormalizedDive,
    ) -> Result<WriteOutcome, GarminDivesError> {
        let request = self.client.post(self.collection_url()).json(dive);
        let resp = self.authorized(request, session).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(WriteOutcome::Created);
        }
        match status.as_u16() {
            401 => Err(error_from_response(resp, false).await),
            409 => Ok(WriteOutcome::AlreadyExists),
            code => {
                let body = resp.text().await.unwrap_or_default();
                if code == 400 && is_unique_key_violation(&body) {
                    return Ok(WriteOutcome::AlreadyExists);
                }
                Ok(WriteOutcome::Failed {
                    status: code,
                    body: body_snippet(&body),
                })
            }
        }
    }
}
