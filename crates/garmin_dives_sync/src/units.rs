//! Unit normalization for Garmin activity summaries.
//!
//! Garmin reports depths in centimetres and surface intervals in
//! milliseconds. Missing or non-numeric inputs become `None`, never errors.

use garmin_dives_client::LooseNumber;

/// Coerce a loosely typed number to `f64`.
pub fn number(value: Option<&LooseNumber>) -> Option<f64> {
    value?.as_f64()
}

pub fn cm_to_m(value: Option<&LooseNumber>) -> Option<f64> {
    number(value).map(|cm| cm / 100.0)
}

pub fn ms_to_s(value: Option<&LooseNumber>) -> Option<f64> {
    number(value).map(|ms| ms / 1000.0)
}
