//! In-memory collaborators for orchestrator and session tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use garmin_dives_client::{
    ActivityFileFormat, Coordinates, Credentials, DiveType, GarminClient, GarminDivesError,
    NormalizedDive, PayloadClient, RawActivity, Session, Temperature, WriteOutcome,
};
use secrecy::SecretString;

pub fn credentials() -> Credentials {
    Credentials::new("diver@example.com", SecretString::new("hunter2".into()))
}

fn session() -> Session {
    Session::new(SecretString::new("token".into()))
}

pub fn dive(id: &str, start_gmt: &str) -> NormalizedDive {
    NormalizedDive {
        garmin_activity_id: id.to_string(),
        title: None,
        duration_seconds: None,
        max_depth_meters: None,
        avg_depth_meters: None,
        surface_interval_seconds: None,
        gases: Vec::new(),
        location: None,
        temperature: Temperature::default(),
        coordinates: Coordinates::default(),
        start_time_local: start_gmt.to_string(),
        start_time_gmt: start_gmt.to_string(),
        dive_type: DiveType::Recreational,
        cylinder_pressure: None,
    }
}

pub fn activity(v: serde_json::Value) -> RawActivity {
    serde_json::from_value(v).expect("activity")
}

/// Garmin stand-in serving a fixed activity list and per-activity files.
#[derive(Default)]
pub struct MockGarmin {
    pub activities: Vec<RawActivity>,
    pub files: HashMap<String, Vec<u8>>,
    pub reject_login: bool,
    pub(crate) requested: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    pub(crate) downloads: AtomicUsize,
}

impl MockGarmin {
    pub fn with_activities(activities: Vec<RawActivity>) -> Self {
        Self {
            activities,
            ..Self::default()
        }
    }

    pub fn requested_ranges(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.requested.lock().expect("lock").clone()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GarminClient for MockGarmin {
    async fn login(&self, _credentials: &Credentials) -> Result<Session, GarminDivesError> {
        if self.reject_login {
            return Err(GarminDivesError::Auth("bad garmin credentials".into()));
        }
        Ok(session())
    }

    async fn get_activities_by_date(
        &self,
        _session: &Session,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawActivity>, GarminDivesError> {
        self.requested.lock().expect("lock").push((start, end));
        Ok(self.activities.clone())
    }

    async fn download_activity_file(
        &self,
        _session: &Session,
        activity_id: &str,
        _format: ActivityFileFormat,
    ) -> Result<Vec<u8>, GarminDivesError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(activity_id)
            .cloned()
            .ok_or_else(|| GarminDivesError::NotFound(activity_id.to_string()))
    }
}

/// Payload stand-in enforcing the unique `garminActivityId` key.
#[derive(Default)]
pub struct MemoryPayload {
    docs: Mutex<Vec<NormalizedDive>>,
    logins: AtomicUsize,
    expired: AtomicUsize,
    reject_login: bool,
    fail_with: Option<(u16, String)>,
}

impl MemoryPayload {
    pub fn with_docs(docs: Vec<NormalizedDive>) -> Self {
        Self {
            docs: Mutex::new(docs),
            ..Self::default()
        }
    }

    pub fn rejecting_login() -> Self {
        Self {
            reject_login: true,
            ..Self::default()
        }
    }

    pub fn failing_writes(status: u16, body: &str) -> Self {
        Self {
            fail_with: Some((status, body.to_string())),
            ..Self::default()
        }
    }

    /// Make the next `n` authenticated requests answer 401.
    pub fn expire_tokens(&self, n: usize) {
        self.expired.store(n, Ordering::SeqCst);
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<NormalizedDive> {
        self.docs.lock().expect("lock").clone()
    }

    fn check_token(&self) -> Result<(), GarminDivesError> {
        let expired = self
            .expired
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match expired {
            Ok(_) => Err(GarminDivesError::Unauthorized("token expired".into())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl PayloadClient for MemoryPayload {
    async fn login(&self, _credentials: &Credentials) -> Result<Session, GarminDivesError> {
        if self.reject_login {
            return Err(GarminDivesError::Auth("bad payload credentials".into()));
        }
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(session())
    }

    async fn latest_start_time_gmt(
        &self,
        _session: &Session,
    ) -> Result<Option<String>, GarminDivesError> {
        self.check_token()?;
        let docs = self.docs.lock().expect("lock");
        Ok(docs.iter().map(|d| d.start_time_gmt.clone()).max())
    }

    async fn create_dive(
        &self,
        _session: &Session,
        dive: &NormalizedDive,
    ) -> Result<WriteOutcome, GarminDivesError> {
        self.check_token()?;
        if let Some((status, body)) = &self.fail_with {
            return Ok(WriteOutcome::Failed {
                status: *status,
                body: body.clone(),
            });
        }
        let mut docs = self.docs.lock().expect("lock");
        if docs
            .iter()
            .any(|d| d.garmin_activity_id == dive.garmin_activity_id)
        {
            return Ok(WriteOutcome::AlreadyExists);
        }
        docs.push(dive.clone());
        Ok(WriteOutcome::Created)
    }
}
