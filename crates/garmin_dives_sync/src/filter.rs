use garmin_dives_client::RawActivity;

/// Whether an activity type key names a diving activity, e.g. `scuba_diving`.
pub fn is_dive_type(type_key: &str) -> bool {
    type_key.to_lowercase().contains("diving")
}

/// Whether a raw activity is a dive. Activities without a type are not.
pub fn is_dive(activity: &RawActivity) -> bool {
    let type_key = activity
        .activity_type
        .as_ref()
        .and_then(|t| t.type_key.as_deref())
        .unwrap_or("");
    is_dive_type(type_key)
}
