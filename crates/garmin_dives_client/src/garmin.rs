//! Garmin Connect client.
//!
//! This module provides a reqwest-based implementation of the [`GarminClient`](crate::GarminClient) trait.

use crate::config::GarminConfig;
use crate::utils::{error_from_response, http_client};
use crate::{ActivityFileFormat, Credentials, GarminClient, GarminDivesError, RawActivity, Session};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Activities requested per page of the activity search.
const PAGE_SIZE: usize = 100;

/// Activity files larger than this are refused.
pub const MAX_DOWNLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// Client for the Garmin Connect API using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestGarminClient {
    api_url: String,
    token_url: String,
    client: reqwest::Client,
}

impl ReqwestGarminClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `api_url` - Base URL of the Connect API (e.g. "https://connectapi.garmin.com")
    /// * `token_url` - Endpoint exchanging account credentials for a bearer token
    /// * `timeout` - Fixed timeout applied to every request
    pub fn new(api_url: &str, token_url: &str, timeout: Duration) -> Result<Self, GarminDivesError> {
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            client: http_client(timeout)?,
        })
    }

    pub fn from_config(config: &GarminConfig) -> Result<Self, GarminDivesError> {
        Self::new(&config.api_url, &config.token_url, config.timeout)
    }

    /// Build an authenticated GET request.
    fn get_request(&self, url: &str, session: &Session) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(session.token().expose_secret())
    }

    fn download_url(&self, activity_id: &str, format: ActivityFileFormat) -> String {
        let export = match format {
            ActivityFileFormat::Original => {
                return format!(
                    "{}/download-service/files/activity/{}",
                    self.api_url, activity_id
                );
            }
            ActivityFileFormat::Tcx => "tcx",
            ActivityFileFormat::Gpx => "gpx",
            ActivityFileFormat::Kml => "kml",
            ActivityFileFormat::Csv => "csv",
        };
        format!(
            "{}/download-service/export/{}/activity/{}",
            self.api_url, export, activity_id
        )
    }
}

#[async_trait]
impl GarminClient for ReqwestGarminClient {
    async fn login(&self, credentials: &Credentials) -> Result<Session, GarminDivesError> {
        let body = serde_json::json!({
            "username": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        let resp = self.client.post(&self.token_url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp, true).await);
        }

        #[derive(serde::Deserialize)]
        struct TokenPayload {
            access_token: Option<String>,
        }

        let payload: TokenPayload = resp.json().await?;
        let token = payload
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GarminDivesError::Auth("no access_token in token response".into()))?;
        tracing::debug!("garmin: session established");
        Ok(Session::new(SecretString::new(token.into())))
    }

    async fn get_activities_by_date(
        &self,
        session: &Session,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawActivity>, GarminDivesError> {
        let url = format!(
            "{}/activitylist-service/activities/search/activities",
            self.api_url
        );
        let start_date = start.format("%Y-%m-%d").to_string();
        let end_date = end.format("%Y-%m-%d").to_string();

        let mut activities: Vec<RawActivity> = Vec::new();
        loop {
            let offset = activities.len().to_string();
            let limit = PAGE_SIZE.to_string();
            let qp = [
                ("startDate", start_date.as_str()),
                ("endDate", end_date.as_str()),
                ("start", offset.as_str()),
                ("limit", limit.as_str()),
            ];
            let resp = self.get_request(&url, session).query(&qp).send().await?;
            if !resp.status().is_success() {
                return Err(error_from_response(resp, false).await);
            }
            let page: Vec<RawActivity> = resp.json().await?;
            let fetched = page.len();
            tracing::debug!(offset = %offset, fetched, "garmin: activity page");
            activities.extend(page);
            if fetched < PAGE_SIZE {
                break;
            }
        }
        Ok(activities)
    }

    async fn download_activity_file(
        &self,
        session: &Session,
        activity_id: &str,
        format: ActivityFileFormat,
    ) -> Result<Vec<u8>, GarminDivesError> {
        let url = self.download_url(activity_id, format);
        let resp = self.get_request(&url, session).send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp, false).await);
        }

        let mut stream = resp.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            if (buf.len() + bytes.len()) as u64 > MAX_DOWNLOAD_BYTES {
                return Err(GarminDivesError::TooLarge {
                    limit: MAX_DOWNLOAD_BYTES,
                });
            }
            buf.extend_from_slice(&bytes);
        }
        tracing::debug!(activity_id, bytes = buf.len(), "garmin: activity file downloaded");
        Ok(buf)
    }
}
