//! Shared wiring for replay ingestion integration tests.
//!
//! Integration tests compile as separate crates, so the harness lives here
//! and each test file pulls it in with `mod support;`.

#![expect(
    dead_code,
    reason = "each integration test crate uses a different subset of the harness"
)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use replayboard::domain::ports::{
    Notification, NotificationDispatchError, NotificationDispatcher, ReplayRepository,
    ReplayRepositoryError,
};
use replayboard::domain::{LeaderboardService, ReplayIngestionService, ReplayRecord, Track, TrackId};
use replayboard::outbound::persistence::{
    InMemoryReplayRepository, InMemoryUserSettingsRepository,
};
use replayboard::test_support::fixture_clock;

/// Dispatcher that records every notification it is handed.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn targets(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|notification| notification.target_user)
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationDispatchError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}

/// In-memory repository that stalls on every insert, widening the window
/// between storing a record and reading the podium back.
#[derive(Default)]
pub struct SlowReplayRepository {
    inner: InMemoryReplayRepository,
}

#[async_trait]
impl ReplayRepository for SlowReplayRepository {
    async fn create(&self, record: &ReplayRecord) -> Result<(), ReplayRepositoryError> {
        self.inner.create(record).await?;
        tokio::time::sleep(Duration::from_millis(25)).await;
        Ok(())
    }

    async fn upsert_track(&self, track: &Track) -> Result<(), ReplayRepositoryError> {
        self.inner.upsert_track(track).await
    }

    async fn records_for_track(
        &self,
        track_id: &TrackId,
    ) -> Result<Vec<ReplayRecord>, ReplayRepositoryError> {
        self.inner.records_for_track(track_id).await
    }

    async fn logins_at_rank(&self, rank: usize) -> Result<Vec<String>, ReplayRepositoryError> {
        self.inner.logins_at_rank(rank).await
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, ReplayRepositoryError> {
        self.inner.list_tracks().await
    }
}

pub type Ingestion<R> =
    ReplayIngestionService<R, InMemoryUserSettingsRepository, RecordingDispatcher>;

/// Services wired to shared in-memory adapters.
pub struct Harness<R = InMemoryReplayRepository> {
    pub repo: Arc<R>,
    pub settings: Arc<InMemoryUserSettingsRepository>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub ingestion: Arc<Ingestion<R>>,
    pub leaderboard: LeaderboardService<R>,
}

impl<R: ReplayRepository + Default> Harness<R> {
    pub fn new() -> Self {
        let repo = Arc::new(R::default());
        let settings = Arc::new(InMemoryUserSettingsRepository::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let ingestion = Arc::new(ReplayIngestionService::new(
            Arc::clone(&repo),
            Arc::clone(&settings),
            Arc::clone(&dispatcher),
            fixture_clock(),
        ));
        let leaderboard = LeaderboardService::new(Arc::clone(&repo), fixture_clock());
        Self {
            repo,
            settings,
            dispatcher,
            ingestion,
            leaderboard,
        }
    }
}
