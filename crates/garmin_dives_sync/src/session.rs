//! Authenticated Payload session owned by a single sync run.

use std::sync::Arc;

use garmin_dives_client::{
    Credentials, GarminDivesError, NormalizedDive, PayloadClient, Session, WriteOutcome,
};

use crate::error::{SyncError, SyncResult};

/// Holds the Payload token for one run and logs in again when it expires.
///
/// A request rejected with 401 triggers one re-login and one retry; a second
/// rejection is an [`SyncError::Authentication`].
pub struct PayloadSession {
    client: Arc<dyn PayloadClient>,
    credentials: Credentials,
    session: Session,
}

impl PayloadSession {
    pub async fn open(client: Arc<dyn PayloadClient>, credentials: Credentials) -> SyncResult<Self> {
        let session = client.login(&credentials).await?;
        tracing::debug!(email = %credentials.email, "payload session opened");
        Ok(Self {
            client,
            credentials,
            session,
        })
    }

    async fn refresh(&mut self) -> SyncResult<()> {
        tracing::info!("payload session expired; logging in again");
        self.session = self.client.login(&self.credentials).await?;
        Ok(())
    }

    pub async fn latest_start_time_gmt(&mut self) -> SyncResult<Option<String>> {
        match self.client.latest_start_time_gmt(&self.session).await {
            Err(GarminDivesError::Unauthorized(_)) => {
                self.refresh().await?;
                self.client
                    .latest_start_time_gmt(&self.session)
                    .await
                    .map_err(still_rejected)
            }
            other => Ok(other?),
        }
    }

    pub async fn create_dive(&mut self, dive: &NormalizedDive) -> SyncResult<WriteOutcome> {
        match self.client.create_dive(&self.session, dive).await {
            Err(GarminDivesError::Unauthorized(_)) => {
                self.refresh().await?;
                self.client
                    .create_dive(&self.session, dive)
                    .await
                    .map_err(still_rejected)
            }
            other => Ok(other?),
        }
    }
}

fn still_rejected(err: GarminDivesError) -> SyncError {
    match err {
        GarminDivesError::Unauthorized(msg) => {
            SyncError::Authentication(format!("session rejected after re-login: {msg}"))
        }
        other => other.into(),
    }
}
