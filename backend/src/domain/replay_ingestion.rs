//! Upload orchestration: parse, store, then evaluate the record trigger.
//!
//! Storing a record and evaluating the trigger for it happen under a
//! per-track async lock, so concurrent uploads to one track observe each
//! other's podium changes in order and each displaced leader is notified at
//! most once per overtaking event. Parsing runs outside the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use mockable::Clock;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::leaderboard::LeaderboardService;
use super::ports::{NotificationDispatcher, ReplayRepository, UserSettingsRepository};
use super::record_trigger::{RecordTrigger, TriggerOutcome};
use super::replay_builder::ReplayRecordBuilder;
use super::{Error, ReplayRecord, ReplayUpload, TrackId, parse_ghost};

/// A replay accepted into the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedReplay {
    /// Stored record.
    pub record: ReplayRecord,
    /// Trigger decision; `None` when the podium could not be re-read.
    pub trigger: Option<TriggerOutcome>,
}

/// Result for one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Submitted filename.
    pub filename: String,
    /// Accepted replay or the reason it was rejected.
    pub result: Result<IngestedReplay, Error>,
}

/// Per-track async locks; an entry lives only while someone holds or awaits it.
#[derive(Default)]
struct TrackLocks {
    locks: Mutex<HashMap<TrackId, Arc<AsyncMutex<()>>>>,
}

impl TrackLocks {
    async fn acquire(&self, track_id: &TrackId) -> TrackGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(track_id.clone()).or_default())
        };
        TrackGuard {
            locks: self,
            track_id: track_id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

struct TrackGuard<'a> {
    locks: &'a TrackLocks,
    track_id: TrackId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TrackGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own handle left: nobody holds or awaits this track.
        if locks
            .get(&self.track_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.track_id);
        }
    }
}

/// Accepts replay uploads.
pub struct ReplayIngestionService<R, S, D> {
    builder: ReplayRecordBuilder<R>,
    trigger: RecordTrigger<R, S, D>,
    locks: TrackLocks,
}

impl<R, S, D> ReplayIngestionService<R, S, D> {
    /// Wire the service to its collaborators.
    pub fn new(repo: Arc<R>, settings: Arc<S>, dispatcher: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self {
            builder: ReplayRecordBuilder::new(Arc::clone(&repo), Arc::clone(&clock)),
            trigger: RecordTrigger::new(LeaderboardService::new(repo, clock), settings, dispatcher),
            locks: TrackLocks::default(),
        }
    }
}

impl<R, S, D> ReplayIngestionService<R, S, D>
where
    R: ReplayRepository,
    S: UserSettingsRepository,
    D: NotificationDispatcher,
{
    /// Parse and store one upload, then run the record trigger for it.
    ///
    /// # Errors
    ///
    /// Returns parsing, validation, resolution, and duplicate errors. Trigger
    /// and notification problems are logged, never returned.
    pub async fn ingest(&self, upload: &ReplayUpload) -> Result<IngestedReplay, Error> {
        let ghost = parse_ghost(upload)?;
        let _guard = self.locks.acquire(&ghost.track_id).await;

        let record = self.builder.store(ghost, &upload.uploader).await?;
        info!(
            track = %record.track_id,
            login = %record.login,
            race_time_ms = record.race_time.as_millis(),
            uploader = %record.uploader,
            "accepted replay"
        );

        let trigger = match self.trigger.evaluate(&record).await {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                warn!(track = %record.track_id, %error, "record trigger could not read podium");
                None
            }
        };
        Ok(IngestedReplay { record, trigger })
    }

    /// Ingest files one after another; a failing file does not stop the
    /// rest.
    pub async fn ingest_batch(&self, uploads: &[ReplayUpload]) -> Vec<FileReport> {
        let mut reports = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let result = self.ingest(upload).await;
            if let Err(error) = &result {
                warn!(
                    filename = %upload.filename,
                    code = ?error.code(),
                    %error,
                    "rejected replay"
                );
            }
            reports.push(FileReport {
                filename: upload.filename.clone(),
                result,
            });
        }
        reports
    }
}
