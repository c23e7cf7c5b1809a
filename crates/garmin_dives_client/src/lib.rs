//! Typed models and collaborator traits for syncing Garmin Connect dives into
//! a Payload CMS collection.
//!
//! The source side ([`GarminClient`]) yields loosely shaped [`RawActivity`]
//! records; the destination side ([`PayloadClient`]) accepts
//! [`NormalizedDive`] documents. Both have reqwest implementations in
//! [`garmin`] and [`payload`].

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod config;
pub mod garmin;
pub mod payload;
mod utils;

#[derive(Debug, Error)]
pub enum GarminDivesError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("authorization expired: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected response ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("decoding response: {0}")]
    Decode(String),
    #[error("download exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

impl GarminDivesError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => Self::NotFound(body),
            _ => Self::Api { status, body },
        }
    }
}

/// Account credentials for either remote service.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

/// An authenticated session token issued by a `login` call.
#[derive(Clone, Debug)]
pub struct Session {
    token: SecretString,
}

impl Session {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }
}

/// A number as sent by the source API: usually a JSON number, sometimes a
/// numeric string, occasionally junk. Coercion happens on read.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct LooseNumber(serde_json::Value);

impl LooseNumber {
    /// The value as a finite float, or `None` when it is not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match &self.0 {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }
}

impl From<serde_json::Value> for LooseNumber {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityType {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub type_key: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiveGas {
    pub oxygen_content: Option<LooseNumber>,
    pub helium_content: Option<LooseNumber>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedDiveInfo {
    /// Entries that are null or not objects are dropped.
    #[serde(default, deserialize_with = "deserialize_lenient_list")]
    pub summarized_dive_gases: Option<Vec<DiveGas>>,
}

/// One activity as returned by the Garmin Connect activity list.
///
/// Every attribute is optional and oddly typed values read as absent, so one
/// malformed activity never fails the whole page.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub activity_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub activity_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub activity_type: Option<ActivityType>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub start_time_local: Option<String>,
    #[serde(
        rename = "startTimeGMT",
        default,
        deserialize_with = "deserialize_opt_string"
    )]
    pub start_time_gmt: Option<String>,
    pub duration: Option<LooseNumber>,
    pub bottom_time: Option<LooseNumber>,
    pub moving_duration: Option<LooseNumber>,
    pub elapsed_duration: Option<LooseNumber>,
    pub max_depth: Option<LooseNumber>,
    pub avg_depth: Option<LooseNumber>,
    pub surface_interval: Option<LooseNumber>,
    pub min_temperature: Option<LooseNumber>,
    pub max_temperature: Option<LooseNumber>,
    pub start_latitude: Option<LooseNumber>,
    pub start_longitude: Option<LooseNumber>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub location_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub summarized_dive_info: Option<SummarizedDiveInfo>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiveType {
    #[default]
    Recreational,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasMix {
    pub oxygen_percent: f64,
    pub helium_percent: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Tank pressure at the first and last telemetry sample, in device units.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CylinderPressure {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

/// A dive document as stored in the `garmin-dives` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDive {
    pub garmin_activity_id: String,
    pub title: Option<String>,
    pub duration_seconds: Option<f64>,
    pub max_depth_meters: Option<f64>,
    pub avg_depth_meters: Option<f64>,
    pub surface_interval_seconds: Option<f64>,
    pub gases: Vec<GasMix>,
    pub location: Option<String>,
    pub temperature: Temperature,
    pub coordinates: Coordinates,
    pub start_time_local: String,
    #[serde(rename = "startTimeGMT")]
    pub start_time_gmt: String,
    pub dive_type: DiveType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cylinder_pressure: Option<CylinderPressure>,
}

impl NormalizedDive {
    pub fn with_cylinder_pressure(self, pressure: CylinderPressure) -> Self {
        Self {
            cylinder_pressure: Some(pressure),
            ..self
        }
    }
}

/// Result of a create request against the destination collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    /// The unique `garminActivityId` is already stored.
    AlreadyExists,
    Failed { status: u16, body: String },
}

/// File flavours offered by the Garmin download service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityFileFormat {
    /// The device-recorded file, zipped FIT.
    Original,
    Tcx,
    Gpx,
    Kml,
    Csv,
}

/// Strings pass through, numbers are stringified, anything else is absent.
fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A nested object that does not have the expected shape reads as absent.
fn deserialize_lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn deserialize_lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

#[async_trait]
pub trait GarminClient: Send + Sync + 'static {
    async fn login(&self, credentials: &Credentials) -> Result<Session, GarminDivesError>;

    /// All activities whose start date falls in `[start, end]`.
    async fn get_activities_by_date(
        &self,
        session: &Session,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawActivity>, GarminDivesError>;

    async fn download_activity_file(
        &self,
        session: &Session,
        activity_id: &str,
        format: ActivityFileFormat,
    ) -> Result<Vec<u8>, GarminDivesError>;
}

#[async_trait]
pub trait PayloadClient: Send + Sync + 'static {
    async fn login(&self, credentials: &Credentials) -> Result<Session, GarminDivesError>;

    /// `startTimeGMT` of the newest stored dive, if any.
    ///
    /// Returns [`GarminDivesError::Unauthorized`] when the session token has expired.
    async fn latest_start_time_gmt(
        &self,
        session: &Session,
    ) -> Result<Option<String>, GarminDivesError>;

    /// Returns [`GarminDivesError::Unauthorized`] when the session token has expired;
    /// every other response is folded into a [`WriteOutcome`].
    async fn create_dive(
        &self,
        session: &Session,
        dive: &NormalizedDive,
    ) -> Result<WriteOutcome, GarminDivesError>;
}
