//! The sync run: resolve the window, fetch, filter, transform, enrich, write.

use std::sync::Arc;

use chrono::NaiveDate;
use garmin_dives_client::{
    ActivityFileFormat, Credentials, GarminClient, NormalizedDive, PayloadClient, Session,
    WriteOutcome,
};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::cursor::{self, DateRange};
use crate::error::{SyncError, SyncResult};
use crate::filter;
use crate::session::PayloadSession;
use crate::telemetry::{self, TelemetryError};
use crate::transforms::{HeliumPolicy, Transformed, transform};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 400;

/// Knobs for a single run.
#[derive(Clone, Debug)]
pub struct SyncOptions {
    /// Window reached back on an empty collection.
    pub lookback_days: u32,
    pub helium: HeliumPolicy,
    /// Record field names tried, in order, for tank pressure.
    pub pressure_fields: Vec<String>,
    pub telemetry: bool,
    /// Transform and log without writing.
    pub dry_run: bool,
    /// Fixed window start, bypassing the stored cursor.
    pub since: Option<NaiveDate>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            helium: HeliumPolicy::default(),
            pressure_fields: telemetry::DEFAULT_PRESSURE_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            telemetry: true,
            dry_run: false,
            since: None,
        }
    }
}

/// What a run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub non_dives: usize,
    pub skipped: usize,
    pub created: usize,
    pub already_present: usize,
    pub enriched: usize,
    pub dry_run: usize,
}

pub struct DiveSync {
    garmin: Arc<dyn GarminClient>,
    garmin_credentials: Credentials,
    payload: Arc<dyn PayloadClient>,
    payload_credentials: Credentials,
    options: SyncOptions,
}

impl DiveSync {
    pub fn new(
        garmin: Arc<dyn GarminClient>,
        garmin_credentials: Credentials,
        payload: Arc<dyn PayloadClient>,
        payload_credentials: Credentials,
        options: SyncOptions,
    ) -> Self {
        Self {
            garmin,
            garmin_credentials,
            payload,
            payload_credentials,
            options,
        }
    }

    /// Run one sync ending at `today`.
    ///
    /// Writes are sequential and idempotent on `garminActivityId`; the first
    /// unexpected write failure aborts the run, leaving earlier writes in place.
    pub async fn run(&self, today: NaiveDate) -> SyncResult<SyncReport> {
        let mut store =
            PayloadSession::open(self.payload.clone(), self.payload_credentials.clone()).await?;

        let range = match self.options.since {
            Some(start) => DateRange { start, end: today },
            None => {
                let last = store.latest_start_time_gmt().await?;
                debug!(cursor = ?last, "newest stored dive");
                cursor::resolve(last.as_deref(), today, self.options.lookback_days)?
            }
        };
        info!(start = %range.start, end = %range.end, "fetching Garmin activities");

        let garmin_session = self.garmin.login(&self.garmin_credentials).await?;
        let activities = self
            .garmin
            .get_activities_by_date(&garmin_session, range.start, range.end)
            .await?;

        let mut report = SyncReport {
            fetched: activities.len(),
            ..SyncReport::default()
        };
        info!(count = report.fetched, "activities found");

        let telemetry_enabled = self.options.telemetry && telemetry::is_available();
        if self.options.telemetry && !telemetry_enabled {
            warn!("telemetry decoding not built in; dives are stored without cylinder pressure");
        }

        for activity in &activities {
            if !filter::is_dive(activity) {
                report.non_dives += 1;
                continue;
            }

            let dive = match transform(activity, self.options.helium) {
                Transformed::Dive(dive) => dive,
                Transformed::Skip(reason) => {
                    info!(
                        activity_id = activity.activity_id.as_deref().unwrap_or("?"),
                        %reason,
                        "skipping activity"
                    );
                    counter!("garmin_dives_skipped_total", "reason" => reason.as_str())
                        .increment(1);
                    report.skipped += 1;
                    continue;
                }
            };

            let dive = if telemetry_enabled {
                self.enrich(&garmin_session, dive, &mut report).await
            } else {
                dive
            };

            if self.options.dry_run {
                info!(
                    activity_id = %dive.garmin_activity_id,
                    start = %dive.start_time_gmt,
                    "dry run: would write dive"
                );
                report.dry_run += 1;
                continue;
            }

            match store.create_dive(&dive).await? {
                WriteOutcome::Created => {
                    info!(activity_id = %dive.garmin_activity_id, "dive created");
                    counter!("garmin_dives_written_total", "outcome" => "created").increment(1);
                    report.created += 1;
                }
                WriteOutcome::AlreadyExists => {
                    info!(activity_id = %dive.garmin_activity_id, "dive already stored");
                    counter!("garmin_dives_written_total", "outcome" => "already_exists")
                        .increment(1);
                    report.already_present += 1;
                }
                WriteOutcome::Failed { status, body } => {
                    counter!("garmin_dives_written_total", "outcome" => "failed").increment(1);
                    return Err(SyncError::UnexpectedWriteFailure {
                        activity_id: dive.garmin_activity_id,
                        status,
                        body,
                    });
                }
            }
        }

        info!(
            fetched = report.fetched,
            non_dives = report.non_dives,
            skipped = report.skipped,
            created = report.created,
            already_present = report.already_present,
            enriched = report.enriched,
            dry_run = report.dry_run,
            "sync finished"
        );
        Ok(report)
    }

    /// Attach cylinder pressure from the original activity file. Failures
    /// leave the dive unchanged.
    async fn enrich(
        &self,
        session: &Session,
        dive: NormalizedDive,
        report: &mut SyncReport,
    ) -> NormalizedDive {
        let readings = match self
            .garmin
            .download_activity_file(session, &dive.garmin_activity_id, ActivityFileFormat::Original)
            .await
        {
            Ok(blob) => telemetry::extract_tank_pressure(&blob, &self.options.pressure_fields),
            Err(err) => Err(TelemetryError::Download(err.to_string())),
        };

        match readings {
            Ok(readings) if readings.is_empty() => {
                debug!(activity_id = %dive.garmin_activity_id, "no tank pressure in telemetry");
                counter!("garmin_dives_telemetry_total", "result" => "no_readings").increment(1);
                dive
            }
            Ok(readings) => {
                counter!("garmin_dives_telemetry_total", "result" => "enriched").increment(1);
                report.enriched += 1;
                dive.with_cylinder_pressure(readings.into())
            }
            Err(err) => {
                warn!(
                    activity_id = %dive.garmin_activity_id,
                    error = %err,
                    "storing dive without cylinder pressure"
                );
                counter!("garmin_dives_telemetry_total", "result" => "failed").increment(1);
                dive
            }
        }
    }
}
