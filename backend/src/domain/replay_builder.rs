//! Creation of canonical replay records.
//!
//! [`ReplayRecordBuilder`] is the only code path that writes records or
//! tracks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;

use super::leaderboard::map_replay_repository_error;
use super::ports::ReplayRepository;
use super::{Error, ParsedGhost, ReplayRecord, Track};

/// Merge a parsed ghost with its submission context.
///
/// The track's display name is its id; tracks are keyed and shown by the
/// name found in the file or filename.
pub fn build_record(
    ghost: ParsedGhost,
    uploader: &str,
    uploaded_at: DateTime<Utc>,
) -> (ReplayRecord, Track) {
    let track = Track {
        display_name: ghost.track_id.as_str().to_owned(),
        track_id: ghost.track_id.clone(),
        game_variant: ghost.game_variant,
    };
    let record = ReplayRecord {
        content_hash: ghost.content_hash,
        race_time: ghost.race_time,
        login: ghost.login,
        raw_identity_token: ghost.raw_identity_token,
        uploader: uploader.to_owned(),
        track_id: ghost.track_id,
        checkpoint_times: ghost.checkpoint_times,
        uploaded_at,
        game_variant: ghost.game_variant,
    };
    (record, track)
}

/// Stores records and upserts their tracks.
#[derive(Clone)]
pub struct ReplayRecordBuilder<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> ReplayRecordBuilder<R> {
    /// Create a builder writing to `repo` and stamping uploads with `clock`.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> ReplayRecordBuilder<R>
where
    R: ReplayRepository,
{
    /// Persist the record for `ghost`, submitted by `uploader` now.
    ///
    /// The track is merged first; the upsert is idempotent, so a failed
    /// insert leaves no partial record behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateReplay`] when the content hash is already
    /// stored and maps other repository failures.
    pub async fn store(&self, ghost: ParsedGhost, uploader: &str) -> Result<ReplayRecord, Error> {
        let (record, track) = build_record(ghost, uploader, self.clock.utc());
        self.repo
            .upsert_track(&track)
            .await
            .map_err(map_replay_repository_error)?;
        self.repo
            .create(&record)
            .await
            .map_err(map_replay_repository_error)?;
        Ok(record)
    }
}
