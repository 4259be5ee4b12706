//! Domain primitives, parsing, and leaderboard services.
//!
//! Purpose: turn uploaded replay bytes into immutable [`ReplayRecord`]s and
//! answer ranking queries over them. Everything here is transport agnostic;
//! storage and notification delivery sit behind the traits in [`ports`].
//!
//! Public surface:
//! - [`parse_ghost`] and the identity resolvers: replay decoding.
//! - [`ReplayIngestionService`]: upload orchestration with per-track
//!   serialisation of the record trigger.
//! - [`LeaderboardService`]: best, runner-up, gap, age, rank distribution.
//! - [`UserSettings`] and [`latest_season`]: supporting models.

pub mod error;
pub mod ghost;
pub mod identity;
pub mod leaderboard;
pub mod ports;
pub mod race_time;
pub mod record_trigger;
pub mod replay;
pub mod replay_builder;
pub mod replay_ingestion;
pub mod season;
pub mod user_settings;

pub use self::error::{Error, ErrorCode, ResolutionFailure, ValidationFailure};
pub use self::ghost::{ParsedGhost, ReplayUpload, parse_ghost};
pub use self::identity::{
    IdentityInput, IdentityResolver, LegacyIdentityResolver, ModernIdentityResolver,
    ResolvedIdentity,
};
pub use self::leaderboard::{
    LeaderboardService, MAX_RANK, MIN_RANK, RankCount, TrackStanding, best_of,
    percent_diff_text, second_best_of, tally_logins,
};
pub use self::race_time::RaceTime;
pub use self::record_trigger::{RecordTrigger, TriggerOutcome, record_broken_message};
pub use self::replay::{
    CONTENT_HASH_LEN, ContentHash, ContentHashError, GameVariant, ReplayRecord, Track, TrackId,
    canonical_login,
};
pub use self::replay_builder::{ReplayRecordBuilder, build_record};
pub use self::replay_ingestion::{FileReport, IngestedReplay, ReplayIngestionService};
pub use self::season::{Season, SeasonPeriod, latest_season};
pub use self::user_settings::{SettingKey, SettingUpdate, UnknownSettingKey, UserSettings};
