//! Post-commit detection of broken records.
//!
//! After a record is stored the trigger re-reads the track's podium. When the
//! new record took the lead from another uploader, that uploader is
//! notified unless they opted out. Settings and dispatch failures are
//! logged and reported as outcomes, never as errors.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::leaderboard::LeaderboardService;
use super::ports::{
    Notification, NotificationDispatcher, ReplayRepository, UserSettingsRepository,
};
use super::{Error, ReplayRecord, UserSettings};

/// What the trigger decided for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The previous leader was sent a message.
    Notified {
        /// Recipient.
        target_user: String,
    },
    /// Nobody else has a record on the track.
    NoRunnerUp,
    /// The new record is not the track's best.
    NotLeader,
    /// The displaced record was uploaded by the same user.
    SelfDisplacement,
    /// The new record only tied the runner-up's time.
    Tied,
    /// The displaced user disabled notifications.
    OptedOut {
        /// User who opted out.
        target_user: String,
    },
    /// The displaced user's settings could not be read.
    SettingsUnavailable,
    /// The dispatcher failed to deliver the message.
    DispatchFailed,
}

/// Message sent to a displaced leader.
///
/// # Examples
///
/// ```
/// # use replayboard::domain::record_broken_message;
/// # use replayboard::test_support::sample_record;
/// let old = sample_record("bob", "A01-Race", 31_000);
/// let new = sample_record("speedy/alt", "A01-Race", 30_000);
/// assert_eq!(
///     record_broken_message(&old, &new),
///     "Trackmania: Record broken on A01-Race\nOld time: 00:31.00\nNew time: 00:30.00\nby speedy"
/// );
/// ```
pub fn record_broken_message(previous: &ReplayRecord, new: &ReplayRecord) -> String {
    format!(
        "Trackmania: Record broken on {track}\nOld time: {old}\nNew time: {new_time}\nby {login}",
        track = new.track_id,
        old = previous.display_time(),
        new_time = new.display_time(),
        login = new.canonical_login(),
    )
}

/// Decides whether a stored record dethroned someone and notifies them.
pub struct RecordTrigger<R, S, D> {
    leaderboard: LeaderboardService<R>,
    settings: Arc<S>,
    dispatcher: Arc<D>,
}

impl<R, S, D> RecordTrigger<R, S, D> {
    /// Create a trigger.
    pub fn new(leaderboard: LeaderboardService<R>, settings: Arc<S>, dispatcher: Arc<D>) -> Self {
        Self {
            leaderboard,
            settings,
            dispatcher,
        }
    }
}

impl<R, S, D> RecordTrigger<R, S, D>
where
    R: ReplayRepository,
    S: UserSettingsRepository,
    D: NotificationDispatcher,
{
    /// Evaluate a record that has just been persisted.
    ///
    /// Callers must serialise evaluations per track so that each overtaking
    /// event sees the podium it produced.
    ///
    /// # Errors
    ///
    /// Returns an error only when the podium cannot be read.
    pub async fn evaluate(&self, record: &ReplayRecord) -> Result<TriggerOutcome, Error> {
        let Some((best, second)) = self.leaderboard.podium(&record.track_id).await? else {
            return Ok(TriggerOutcome::NoRunnerUp);
        };
        let Some(second) = second else {
            debug!(track = %record.track_id, "no runner-up; nothing to notify");
            return Ok(TriggerOutcome::NoRunnerUp);
        };
        if best.content_hash != record.content_hash {
            debug!(track = %record.track_id, "record did not take the lead");
            return Ok(TriggerOutcome::NotLeader);
        }
        if second.uploader == record.uploader {
            debug!(track = %record.track_id, uploader = %record.uploader, "uploader displaced own record");
            return Ok(TriggerOutcome::SelfDisplacement);
        }
        if record.race_time >= second.race_time {
            debug!(track = %record.track_id, "record tied the previous best");
            return Ok(TriggerOutcome::Tied);
        }

        let target_user = second.uploader.clone();
        let settings = match self.settings.find_by_user(&target_user).await {
            Ok(found) => found.unwrap_or_default(),
            Err(error) => {
                warn!(%target_user, %error, "could not read notification settings");
                return Ok(TriggerOutcome::SettingsUnavailable);
            }
        };
        if !Self::wants_notification(&settings) {
            debug!(%target_user, "displaced user opted out of notifications");
            return Ok(TriggerOutcome::OptedOut { target_user });
        }

        let notification = Notification {
            target_user: target_user.clone(),
            message: record_broken_message(&second, record),
        };
        match self.dispatcher.dispatch(&notification).await {
            Ok(()) => {
                info!(%target_user, track = %record.track_id, "sent record-broken notification");
                Ok(TriggerOutcome::Notified { target_user })
            }
            Err(error) => {
                warn!(%target_user, %error, "failed to hand off notification");
                Ok(TriggerOutcome::DispatchFailed)
            }
        }
    }

    fn wants_notification(settings: &UserSettings) -> bool {
        settings.notify_on_displacement
    }
}
