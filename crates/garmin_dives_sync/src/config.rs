use garmin_dives_client::config::{GarminConfig, PayloadConfig};

use crate::error::{SyncError, SyncResult};
use crate::sync::SyncOptions;
use crate::transforms::HeliumPolicy;

/// Everything a run needs, read from the environment.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub garmin: GarminConfig,
    pub payload: PayloadConfig,
    pub options: SyncOptions,
}

impl SyncConfig {
    pub fn from_env() -> SyncResult<Self> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> SyncResult<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let garmin = GarminConfig::from_env_with(&mut get)?;
        let payload = PayloadConfig::from_env_with(&mut get)?;

        let mut options = SyncOptions::default();
        if let Some(raw) = get("GARMIN_DIVES_LOOKBACK_DAYS") {
            options.lookback_days = raw
                .trim()
                .parse()
                .map_err(|_| invalid("GARMIN_DIVES_LOOKBACK_DAYS", &raw))?;
        }
        if let Some(raw) = get("GARMIN_DIVES_HELIUM_DEFAULT") {
            options.helium = raw.parse::<HeliumPolicy>().map_err(SyncError::Configuration)?;
        }
        if let Some(raw) = get("GARMIN_DIVES_PRESSURE_FIELDS") {
            let fields: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();
            if fields.is_empty() {
                return Err(invalid("GARMIN_DIVES_PRESSURE_FIELDS", &raw));
            }
            options.pressure_fields = fields;
        }
        if let Some(raw) = get("GARMIN_DIVES_TELEMETRY") {
            options.telemetry = parse_bool(&raw)
                .ok_or_else(|| invalid("GARMIN_DIVES_TELEMETRY", &raw))?;
        }

        Ok(Self {
            garmin,
            payload,
            options,
        })
    }
}

fn invalid(key: &str, raw: &str) -> SyncError {
    SyncError::Configuration(format!("{key} invalid: {raw}"))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
