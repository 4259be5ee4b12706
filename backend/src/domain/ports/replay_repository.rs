//! Port for replay and track persistence.
//!
//! Records are write-once. Adapters must enforce content-hash uniqueness
//! themselves; the domain never checks for duplicates before inserting.

use async_trait::async_trait;

use crate::domain::{ContentHash, ReplayRecord, Track, TrackId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by replay repository adapters.
    pub enum ReplayRepositoryError {
        /// Storage could not be reached.
        Connection { message: String } =>
            "replay repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "replay repository query failed: {message}",
        /// A record with the same content hash already exists.
        DuplicateContent { content_hash: ContentHash } =>
            "replay {content_hash} is already stored",
    }
}

/// Port for storing replay records and the tracks they reference.
///
/// # Ordering
///
/// Read methods order a track's records by ascending race time. Records
/// with equal times keep the order in which they were created.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplayRepository: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with [`ReplayRepositoryError::DuplicateContent`] when a record
    /// with the same content hash exists; nothing is written in that case.
    async fn create(&self, record: &ReplayRecord) -> Result<(), ReplayRepositoryError>;

    /// Insert or replace a track, keyed by its id.
    async fn upsert_track(&self, track: &Track) -> Result<(), ReplayRepositoryError>;

    /// Snapshot of one track's records in ranking order.
    async fn records_for_track(
        &self,
        track_id: &TrackId,
    ) -> Result<Vec<ReplayRecord>, ReplayRepositoryError>;

    /// For every track with at least `rank` records, the login holding that
    /// 1-based position in ranking order.
    async fn logins_at_rank(&self, rank: usize) -> Result<Vec<String>, ReplayRepositoryError>;

    /// All known tracks, ordered by id.
    async fn list_tracks(&self) -> Result<Vec<Track>, ReplayRepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn duplicate_error_names_the_hash() {
        let hash = ContentHash::of(b"ghost");
        let err = ReplayRepositoryError::duplicate_content(hash.clone());
        assert!(err.to_string().contains(&hash.to_hex()));
    }
}
