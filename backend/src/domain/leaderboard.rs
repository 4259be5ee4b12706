//! Read-side ranking queries over stored replay records.
//!
//! Every query reads an owned snapshot of the track's records through the
//! [`ReplayRepository`] port; nothing is cached between calls. Ties on race
//! time are broken by the smaller content hash for `best` and `second_best`.

use std::collections::HashMap;
use std::sync::Arc;

use mockable::Clock;
use serde::Serialize;

use crate::domain::ports::{ReplayRepository, ReplayRepositoryError};
use crate::domain::{Error, ReplayRecord, Track, TrackId, canonical_login};

/// Smallest rank accepted by [`LeaderboardService::rank_distribution`].
pub const MIN_RANK: usize = 1;
/// Largest rank accepted by [`LeaderboardService::rank_distribution`].
pub const MAX_RANK: usize = 10;

/// Number of tracks on which one player holds a given rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankCount {
    /// Player login.
    pub login: String,
    /// Tracks on which the player holds the rank.
    pub tracks: usize,
}

/// Summary of one track's leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStanding {
    /// Track summarised.
    pub track: Track,
    /// Fastest record.
    pub best: ReplayRecord,
    /// Fastest record by a different player.
    pub second_best: Option<ReplayRecord>,
    /// Gap text as produced by [`percent_diff_text`].
    pub percent_diff: String,
    /// Whole days since the best record was uploaded.
    pub age_days: i64,
}

/// Fastest record; equal times fall back to the smaller content hash.
pub fn best_of(records: &[ReplayRecord]) -> Option<&ReplayRecord> {
    records
        .iter()
        .min_by(|a, b| (a.race_time, &a.content_hash).cmp(&(b.race_time, &b.content_hash)))
}

/// Fastest record whose login differs from `best`'s.
pub fn second_best_of<'a>(
    records: &'a [ReplayRecord],
    best: &ReplayRecord,
) -> Option<&'a ReplayRecord> {
    records
        .iter()
        .filter(|record| record.login != best.login)
        .min_by(|a, b| (a.race_time, &a.content_hash).cmp(&(b.race_time, &b.content_hash)))
}

/// Gap between the leader and the runner-up.
///
/// # Examples
///
/// ```
/// # use replayboard::domain::percent_diff_text;
/// # use replayboard::test_support::sample_record;
/// let best = sample_record("speedy", "A01-Race", 30_000);
/// let second = sample_record("bob/alt", "A01-Race", 31_000);
/// assert_eq!(percent_diff_text(&best, Some(&second)), "+ 3.33% by bob");
/// assert_eq!(percent_diff_text(&best, None), "");
/// ```
pub fn percent_diff_text(best: &ReplayRecord, second: Option<&ReplayRecord>) -> String {
    let Some(second) = second else {
        return String::new();
    };
    let runner_up = canonical_login(&second.login);
    if second.race_time == best.race_time {
        return format!("Tied by {runner_up}");
    }
    let best_ms = f64::from(best.race_time.as_millis());
    let second_ms = f64::from(second.race_time.as_millis());
    let percent = (second_ms - best_ms) / best_ms * 100.0;
    format!("+ {percent:.2}% by {runner_up}")
}

/// Count, per login, how often it appears; most frequent first, then by
/// login.
pub fn tally_logins(logins: impl IntoIterator<Item = String>) -> Vec<RankCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for login in logins {
        *counts.entry(login).or_default() += 1;
    }
    let mut tally: Vec<RankCount> = counts
        .into_iter()
        .map(|(login, tracks)| RankCount { login, tracks })
        .collect();
    tally.sort_by(|a, b| b.tracks.cmp(&a.tracks).then_with(|| a.login.cmp(&b.login)));
    tally
}

pub(crate) fn map_replay_repository_error(error: ReplayRepositoryError) -> Error {
    match error {
        ReplayRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("replay repository unavailable: {message}"))
        }
        ReplayRepositoryError::Query { message } => {
            Error::internal(format!("replay repository error: {message}"))
        }
        ReplayRepositoryError::DuplicateContent { content_hash } => {
            Error::duplicate_replay(content_hash.to_hex())
        }
    }
}

/// Leaderboard queries parameterised by track.
#[derive(Clone)]
pub struct LeaderboardService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> LeaderboardService<R> {
    /// Create a service reading from `repo`, with ages measured by `clock`.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> LeaderboardService<R>
where
    R: ReplayRepository,
{
    async fn records(&self, track_id: &TrackId) -> Result<Vec<ReplayRecord>, Error> {
        self.repo
            .records_for_track(track_id)
            .await
            .map_err(map_replay_repository_error)
    }

    /// Fastest record on the track.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn best(&self, track_id: &TrackId) -> Result<Option<ReplayRecord>, Error> {
        let records = self.records(track_id).await?;
        Ok(best_of(&records).cloned())
    }

    /// Fastest record by a player other than the leader.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn second_best(&self, track_id: &TrackId) -> Result<Option<ReplayRecord>, Error> {
        let records = self.records(track_id).await?;
        Ok(best_of(&records).and_then(|best| second_best_of(&records, best).cloned()))
    }

    /// Leader and runner-up from a single snapshot.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn podium(
        &self,
        track_id: &TrackId,
    ) -> Result<Option<(ReplayRecord, Option<ReplayRecord>)>, Error> {
        let records = self.records(track_id).await?;
        Ok(best_of(&records)
            .map(|best| (best.clone(), second_best_of(&records, best).cloned())))
    }

    /// Gap text between leader and runner-up; empty without a runner-up.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn percent_diff(&self, track_id: &TrackId) -> Result<String, Error> {
        Ok(match self.podium(track_id).await? {
            Some((best, second)) => percent_diff_text(&best, second.as_ref()),
            None => String::new(),
        })
    }

    /// Whole days since the leading record was uploaded.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn age_days(&self, track_id: &TrackId) -> Result<Option<i64>, Error> {
        let best = self.best(track_id).await?;
        Ok(best.map(|record| self.age_of(&record)))
    }

    /// For every track, who holds position `rank`, tallied per player.
    ///
    /// Positions follow ascending race time with ties in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RankQuery`] for ranks outside `1..=10` and propagates
    /// repository failures.
    pub async fn rank_distribution(&self, rank: usize) -> Result<Vec<RankCount>, Error> {
        if !(MIN_RANK..=MAX_RANK).contains(&rank) {
            return Err(Error::rank_query(rank));
        }
        let logins = self
            .repo
            .logins_at_rank(rank)
            .await
            .map_err(map_replay_repository_error)?;
        Ok(tally_logins(logins))
    }

    /// Standing of every track that has at least one record.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn standings(&self) -> Result<Vec<TrackStanding>, Error> {
        let tracks = self
            .repo
            .list_tracks()
            .await
            .map_err(map_replay_repository_error)?;
        let mut standings = Vec::with_capacity(tracks.len());
        for track in tracks {
            let records = self.records(&track.track_id).await?;
            let Some(best) = best_of(&records) else {
                continue;
            };
            let second_best = second_best_of(&records, best).cloned();
            standings.push(TrackStanding {
                percent_diff: percent_diff_text(best, second_best.as_ref()),
                age_days: self.age_of(best),
                best: best.clone(),
                second_best,
                track,
            });
        }
        Ok(standings)
    }

    fn age_of(&self, record: &ReplayRecord) -> i64 {
        (self.clock.utc() - record.uploaded_at).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockReplayRepository;
    use crate::domain::{ErrorCode, GameVariant};
    use crate::test_support::{fixture_clock, fixture_timestamp, sample_record};
    use chrono::Duration;
    use rstest::rstest;

    fn service_with(records: Vec<ReplayRecord>) -> LeaderboardService<MockReplayRepository> {
        let mut repo = MockReplayRepository::new();
        repo.expect_records_for_track()
            .returning(move |_| Ok(records.clone()));
        LeaderboardService::new(Arc::new(repo), fixture_clock())
    }

    fn track() -> TrackId {
        TrackId::new("A01-Race")
    }

    #[tokio::test]
    async fn best_and_second_best_rank_distinct_players() {
        let service = service_with(vec![
            sample_record("speedy", "A01-Race", 30_000),
            sample_record("speedy", "A01-Race", 30_500),
            sample_record("bob", "A01-Race", 31_000),
        ]);

        let best = service.best(&track()).await.expect("best").expect("some");
        let second = service
            .second_best(&track())
            .await
            .expect("second")
            .expect("some");
        assert_eq!(best.race_time.as_millis(), 30_000);
        assert_eq!(second.login, "bob");
        assert_eq!(
            service.percent_diff(&track()).await.expect("diff"),
            "+ 3.33% by bob"
        );
    }

    #[tokio::test]
    async fn equal_times_report_a_tie() {
        let service = service_with(vec![
            sample_record("speedy", "A01-Race", 30_000),
            sample_record("bob/on-behalf", "A01-Race", 30_000),
        ]);
        let diff = service.percent_diff(&track()).await.expect("diff");
        let best = service.best(&track()).await.expect("best").expect("some");
        let runner_up = if best.login == "speedy" { "bob" } else { "speedy" };
        assert_eq!(diff, format!("Tied by {runner_up}"));
    }

    #[rstest]
    fn equal_times_pick_the_smaller_hash() {
        let a = sample_record("speedy", "A01-Race", 30_000);
        let b = sample_record("bob", "A01-Race", 30_000);
        let expected = if a.content_hash < b.content_hash { &a } else { &b };
        let records = vec![a.clone(), b.clone()];
        assert_eq!(best_of(&records), Some(expected));
        let reversed = vec![b.clone(), a.clone()];
        assert_eq!(best_of(&reversed), Some(expected));
    }

    #[tokio::test]
    async fn single_player_track_has_no_runner_up() {
        let service = service_with(vec![
            sample_record("speedy", "A01-Race", 30_000),
            sample_record("speedy", "A01-Race", 29_000),
        ]);
        assert_eq!(service.second_best(&track()).await.expect("second"), None);
        assert_eq!(service.percent_diff(&track()).await.expect("diff"), "");
    }

    #[tokio::test]
    async fn empty_track_has_no_standing() {
        let service = service_with(Vec::new());
        assert_eq!(service.best(&track()).await.expect("best"), None);
        assert_eq!(service.age_days(&track()).await.expect("age"), None);
        assert_eq!(service.percent_diff(&track()).await.expect("diff"), "");
    }

    #[tokio::test]
    async fn age_counts_whole_days() {
        let mut record = sample_record("speedy", "A01-Race", 30_000);
        record.uploaded_at = fixture_timestamp() - Duration::hours(73);
        let service = service_with(vec![record]);
        assert_eq!(service.age_days(&track()).await.expect("age"), Some(3));
    }

    #[rstest]
    #[case::zero(0)]
    #[case::eleven(11)]
    #[tokio::test]
    async fn rank_outside_range_is_rejected(#[case] rank: usize) {
        let service = LeaderboardService::new(Arc::new(MockReplayRepository::new()), fixture_clock());
        let err = service.rank_distribution(rank).await.expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::RankQuery);
    }

    #[tokio::test]
    async fn rank_distribution_tallies_per_player() {
        let mut repo = MockReplayRepository::new();
        repo.expect_logins_at_rank()
            .withf(|rank| *rank == 1)
            .return_once(|_| {
                Ok(vec![
                    "bob".to_owned(),
                    "speedy".to_owned(),
                    "speedy".to_owned(),
                    "alice".to_owned(),
                ])
            });
        let service = LeaderboardService::new(Arc::new(repo), fixture_clock());
        let tally = service.rank_distribution(1).await.expect("tally");
        assert_eq!(
            tally,
            vec![
                RankCount {
                    login: "speedy".to_owned(),
                    tracks: 2
                },
                RankCount {
                    login: "alice".to_owned(),
                    tracks: 1
                },
                RankCount {
                    login: "bob".to_owned(),
                    tracks: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn repository_outage_maps_to_service_unavailable() {
        let mut repo = MockReplayRepository::new();
        repo.expect_records_for_track()
            .return_once(|_| Err(ReplayRepositoryError::connection("pool exhausted")));
        let service = LeaderboardService::new(Arc::new(repo), fixture_clock());
        let err = service.best(&track()).await.expect_err("outage");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }

    #[tokio::test]
    async fn standings_skip_tracks_without_records() {
        let mut repo = MockReplayRepository::new();
        repo.expect_list_tracks().return_once(|| {
            Ok(vec![
                Track {
                    track_id: TrackId::new("A01-Race"),
                    display_name: "A01-Race".to_owned(),
                    game_variant: GameVariant::Legacy,
                },
                Track {
                    track_id: TrackId::new("A02-Race"),
                    display_name: "A02-Race".to_owned(),
                    game_variant: GameVariant::Legacy,
                },
            ])
        });
        repo.expect_records_for_track().returning(|track_id| {
            Ok(if track_id.as_str() == "A01-Race" {
                vec![sample_record("speedy", "A01-Race", 30_000)]
            } else {
                Vec::new()
            })
        });
        let service = LeaderboardService::new(Arc::new(repo), fixture_clock());
        let standings = service.standings().await.expect("standings");
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].track.track_id, TrackId::new("A01-Race"));
        assert_eq!(standings[0].percent_diff, "");
    }
}
