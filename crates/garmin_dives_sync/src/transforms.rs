//! Mapping of raw Garmin activities onto stored dive documents.

use std::fmt;
use std::str::FromStr;

use garmin_dives_client::{
    Coordinates, DiveType, GasMix, LooseNumber, NormalizedDive, RawActivity, Temperature,
};

use crate::units::{cm_to_m, ms_to_s, number};

/// How a gas mix without a helium reading is stored.
///
/// Garmin omits `heliumContent` for plain nitrox mixes. Storing `0` keeps the
/// collection's required `heliumPercent` satisfied; passing the gap through
/// keeps "not reported" distinguishable from "no helium".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeliumPolicy {
    #[default]
    DefaultZero,
    PassThrough,
}

impl FromStr for HeliumPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(Self::DefaultZero),
            "null" | "none" | "passthrough" => Ok(Self::PassThrough),
            other => Err(format!("unknown helium policy {other:?} (expected zero or null)")),
        }
    }
}

/// Why an activity was left out of the sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    MissingActivityId,
    MissingStartTimeLocal,
    MissingStartTimeGmt,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingActivityId => "missing_activity_id",
            SkipReason::MissingStartTimeLocal => "missing_start_time_local",
            SkipReason::MissingStartTimeGmt => "missing_start_time_gmt",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SkipReason::MissingActivityId => "no activityId",
            SkipReason::MissingStartTimeLocal => "no startTimeLocal",
            SkipReason::MissingStartTimeGmt => "no startTimeGMT",
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Transformed {
    Dive(NormalizedDive),
    Skip(SkipReason),
}

fn present(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Dive time in seconds: the first coercible of bottom time, moving
/// duration, duration and elapsed duration.
pub fn select_duration(activity: &RawActivity) -> Option<f64> {
    [
        &activity.bottom_time,
        &activity.moving_duration,
        &activity.duration,
        &activity.elapsed_duration,
    ]
    .into_iter()
    .find_map(|candidate| number(candidate.as_ref()))
}

fn gases(activity: &RawActivity, helium: HeliumPolicy) -> Vec<GasMix> {
    let Some(list) = activity
        .summarized_dive_info
        .as_ref()
        .and_then(|info| info.summarized_dive_gases.as_ref())
    else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|gas| {
            let oxygen_percent = number(gas.oxygen_content.as_ref())?;
            let reported: Option<&LooseNumber> = gas.helium_content.as_ref();
            let helium_percent = match helium {
                HeliumPolicy::DefaultZero => Some(number(reported).unwrap_or(0.0)),
                HeliumPolicy::PassThrough => number(reported),
            };
            Some(GasMix {
                oxygen_percent,
                helium_percent,
            })
        })
        .collect()
}

/// Turn one raw activity into a dive document, or say why it is skipped.
///
/// Pure: the same input always produces the same output.
pub fn transform(activity: &RawActivity, helium: HeliumPolicy) -> Transformed {
    let Some(garmin_activity_id) = present(activity.activity_id.as_ref()) else {
        return Transformed::Skip(SkipReason::MissingActivityId);
    };
    let Some(start_time_local) = present(activity.start_time_local.as_ref()) else {
        return Transformed::Skip(SkipReason::MissingStartTimeLocal);
    };
    let Some(start_time_gmt) = present(activity.start_time_gmt.as_ref()) else {
        return Transformed::Skip(SkipReason::MissingStartTimeGmt);
    };

    Transformed::Dive(NormalizedDive {
        garmin_activity_id,
        title: activity.activity_name.clone(),
        duration_seconds: select_duration(activity),
        max_depth_meters: cm_to_m(activity.max_depth.as_ref()),
        avg_depth_meters: cm_to_m(activity.avg_depth.as_ref()),
        surface_interval_seconds: ms_to_s(activity.surface_interval.as_ref()),
        gases: gases(activity, helium),
        location: activity.location_name.clone(),
        temperature: Temperature {
            min: number(activity.min_temperature.as_ref()),
            max: number(activity.max_temperature.as_ref()),
        },
        coordinates: Coordinates {
            latitude: number(activity.start_latitude.as_ref()),
            longitude: number(activity.start_longitude.as_ref()),
        },
        start_time_local,
        start_time_gmt,
        dive_type: DiveType::Recreational,
        cylinder_pressure: None,
    })
}
