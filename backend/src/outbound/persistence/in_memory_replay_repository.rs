//! Mutex-guarded `ReplayRepository` implementation.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{ReplayRepository, ReplayRepositoryError};
use crate::domain::{ContentHash, ReplayRecord, Track, TrackId};

#[derive(Default)]
struct Store {
    /// Records in arrival order.
    records: Vec<ReplayRecord>,
    hashes: HashSet<ContentHash>,
    tracks: BTreeMap<TrackId, Track>,
}

impl Store {
    fn ranked(&self, track_id: &TrackId) -> Vec<ReplayRecord> {
        let mut ranked: Vec<ReplayRecord> = self
            .records
            .iter()
            .filter(|record| &record.track_id == track_id)
            .cloned()
            .collect();
        // Stable: equal times keep arrival order.
        ranked.sort_by_key(|record| record.race_time);
        ranked
    }
}

/// Replay repository holding records and tracks in memory.
#[derive(Default)]
pub struct InMemoryReplayRepository {
    store: Mutex<Store>,
}

impl InMemoryReplayRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ReplayRepository for InMemoryReplayRepository {
    async fn create(&self, record: &ReplayRecord) -> Result<(), ReplayRepositoryError> {
        let mut store = self.lock();
        if !store.hashes.insert(record.content_hash.clone()) {
            debug!(content_hash = %record.content_hash, "duplicate replay content");
            return Err(ReplayRepositoryError::duplicate_content(
                record.content_hash.clone(),
            ));
        }
        store.records.push(record.clone());
        Ok(())
    }

    async fn upsert_track(&self, track: &Track) -> Result<(), ReplayRepositoryError> {
        self.lock()
            .tracks
            .insert(track.track_id.clone(), track.clone());
        Ok(())
    }

    async fn records_for_track(
        &self,
        track_id: &TrackId,
    ) -> Result<Vec<ReplayRecord>, ReplayRepositoryError> {
        Ok(self.lock().ranked(track_id))
    }

    async fn logins_at_rank(&self, rank: usize) -> Result<Vec<String>, ReplayRepositoryError> {
        let Some(index) = rank.checked_sub(1) else {
            return Err(ReplayRepositoryError::query("rank positions start at 1"));
        };
        let store = self.lock();
        Ok(store
            .tracks
            .keys()
            .filter_map(|track_id| store.ranked(track_id).into_iter().nth(index))
            .map(|record| record.login)
            .collect())
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, ReplayRepositoryError> {
        Ok(self.lock().tracks.values().cloned().collect())
    }
}
