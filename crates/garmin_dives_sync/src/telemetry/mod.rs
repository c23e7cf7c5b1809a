//! Tank pressure enrichment from the device-recorded activity file.
//!
//! Decoding sits behind the `telemetry` feature, backed by `fitparser`.
//! Builds without it report [`TelemetryError::Unavailable`] and dives are
//! stored without pressure.

#[cfg(feature = "telemetry")]
mod container;
#[cfg(all(test, feature = "telemetry"))]
pub(crate) mod fixture;

use garmin_dives_client::CylinderPressure;
use thiserror::Error;

/// Record field names tried, in order, for the tank pressure reading.
pub const DEFAULT_PRESSURE_FIELDS: &[&str] = &[
    "tank_pressure",
    "cylinder_pressure",
    "air_pressure",
    "pressure",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("telemetry decode failed: {0}")]
    Decode(String),
    #[error("telemetry download failed: {0}")]
    Download(String),
    #[error("telemetry decoding is not available in this build")]
    Unavailable,
}

/// First and last tank pressure reading of a dive.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PressureReadings {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl PressureReadings {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl From<PressureReadings> for CylinderPressure {
    fn from(readings: PressureReadings) -> Self {
        CylinderPressure {
            start: readings.start,
            end: readings.end,
        }
    }
}

/// Whether this build can decode telemetry files.
pub fn is_available() -> bool {
    cfg!(feature = "telemetry")
}

/// Extract the first and last tank pressure from a FIT file, optionally
/// wrapped in a ZIP archive.
///
/// Each `record` message contributes the value of the first alias that is
/// present and numeric. Standard fields shadow developer fields of the
/// same name.
#[cfg(feature = "telemetry")]
pub fn extract_tank_pressure(
    blob: &[u8],
    aliases: &[String],
) -> Result<PressureReadings, TelemetryError> {
    let fit_bytes = container::unpack(blob)?;
    let records = fit::decode(&fit_bytes)?;
    Ok(fit::scan_records(&records, aliases))
}

#[cfg(not(feature = "telemetry"))]
pub fn extract_tank_pressure(
    _blob: &[u8],
    _aliases: &[String],
) -> Result<PressureReadings, TelemetryError> {
    Err(TelemetryError::Unavailable)
}

#[cfg(feature = "telemetry")]
mod fit {
    use std::collections::HashMap;
    use std::panic;

    use fitparser::profile::MesgNum;
    use fitparser::{FitDataRecord, Value};

    use super::{PressureReadings, TelemetryError};

    /// Decode every message of a (possibly chained) FIT file.
    ///
    /// The parser runs on untrusted bytes; a panic inside it is reported as
    /// a decode failure.
    pub(super) fn decode(bytes: &[u8]) -> Result<Vec<FitDataRecord>, TelemetryError> {
        match panic::catch_unwind(|| fitparser::from_bytes(bytes)) {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(err)) => Err(TelemetryError::Decode(err.to_string())),
            Err(_) => Err(TelemetryError::Decode(
                "FIT parser aborted on malformed input".into(),
            )),
        }
    }

    fn merged_fields(record: &FitDataRecord) -> HashMap<&str, &Value> {
        let mut merged = HashMap::with_capacity(record.fields().len());
        for field in record.fields() {
            merged.entry(field.name()).or_insert(field.value());
        }
        merged
    }

    fn numeric(value: &Value) -> Option<f64> {
        let v = match value {
            Value::SInt8(v) => f64::from(*v),
            Value::UInt8(v) | Value::UInt8z(v) => f64::from(*v),
            Value::SInt16(v) => f64::from(*v),
            Value::UInt16(v) | Value::UInt16z(v) => f64::from(*v),
            Value::SInt32(v) => f64::from(*v),
            Value::UInt32(v) | Value::UInt32z(v) => f64::from(*v),
            Value::SInt64(v) => *v as f64,
            Value::UInt64(v) | Value::UInt64z(v) => *v as f64,
            Value::Float32(v) => f64::from(*v),
            Value::Float64(v) => *v,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }

    pub(super) fn scan_records(records: &[FitDataRecord], aliases: &[String]) -> PressureReadings {
        let mut readings = PressureReadings::default();
        for record in records.iter().filter(|r| r.kind() == MesgNum::Record) {
            let fields = merged_fields(record);
            let reading = aliases
                .iter()
                .find_map(|alias| fields.get(alias.as_str()).and_then(|v| numeric(v)));
            if let Some(value) = reading {
                readings.start.get_or_insert(value);
                readings.end = Some(value);
            }
        }
        readings
    }
}
