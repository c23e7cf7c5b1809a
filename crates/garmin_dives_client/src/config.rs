use crate::{Credentials, GarminDivesError};
use secrecy::SecretString;
use std::time::Duration;

const DEFAULT_GARMIN_API_URL: &str = "https://connectapi.garmin.com";
const DEFAULT_COLLECTION: &str = "garmin-dives";
const DEFAULT_AUTH_COLLECTION: &str = "users";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection settings for Garmin Connect.
#[derive(Clone, Debug)]
pub struct GarminConfig {
    pub credentials: Credentials,
    pub api_url: String,
    /// Endpoint that trades account credentials for a Connect API bearer token.
    pub token_url: String,
    pub timeout: Duration,
}

/// Connection settings for the Payload CMS instance holding the dives.
#[derive(Clone, Debug)]
pub struct PayloadConfig {
    pub credentials: Credentials,
    pub base_url: String,
    pub collection: String,
    pub auth_collection: String,
    pub timeout: Duration,
}

impl GarminConfig {
    pub fn from_env() -> Result<Self, GarminDivesError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, GarminDivesError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let email = required(&mut get, "GARMIN_EMAIL")?;
        let password = required(&mut get, "GARMIN_PASSWORD")?;
        let token_url = required(&mut get, "GARMIN_TOKEN_URL")?;
        let api_url = get("GARMIN_API_URL").unwrap_or_else(|| DEFAULT_GARMIN_API_URL.into());
        Ok(Self {
            credentials: Credentials::new(email, SecretString::new(password.into())),
            api_url,
            token_url,
            timeout: timeout(&mut get)?,
        })
    }
}

impl PayloadConfig {
    pub fn from_env() -> Result<Self, GarminDivesError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Result<Self, GarminDivesError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base_url = required(&mut get, "PAYLOAD_URL")?;
        let email = required(&mut get, "PAYLOAD_USER_EMAIL")?;
        let password = required(&mut get, "PAYLOAD_USER_PASSWORD")?;
        Ok(Self {
            credentials: Credentials::new(email, SecretString::new(password.into())),
            base_url,
            collection: get("PAYLOAD_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.into()),
            auth_collection: get("PAYLOAD_AUTH_COLLECTION")
                .unwrap_or_else(|| DEFAULT_AUTH_COLLECTION.into()),
            timeout: timeout(&mut get)?,
        })
    }
}

fn required<F>(get: &mut F, key: &str) -> Result<String, GarminDivesError>
where
    F: FnMut(&str) -> Option<String>,
{
    get(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GarminDivesError::Config(format!("{key} missing")))
}

fn timeout<F>(get: &mut F) -> Result<Duration, GarminDivesError>
where
    F: FnMut(&str) -> Option<String>,
{
    match get("HTTP_TIMEOUT_SECS") {
        None => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| GarminDivesError::Config(format!("HTTP_TIMEOUT_SECS invalid: {raw}"))),
    }
}
