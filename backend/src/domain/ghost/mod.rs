//! Replay file parsing.
//!
//! Decodes the GBX container, locates the embedded ghost, and normalises the
//! two game generations into one [`ParsedGhost`]. Parsing is pure: the same
//! bytes and filename always yield the same result.

mod chunks;
mod container;
mod cursor;
pub(crate) mod lzo;

use std::path::Path;

use super::identity::{
    IdentityInput, IdentityResolver, LegacyIdentityResolver, ModernIdentityResolver,
};
use super::{ContentHash, Error, GameVariant, RaceTime, TrackId};

pub(crate) use self::container::{CLASS_GHOST, CLASS_REPLAY};

const REPLAY_EXTENSION: &str = "gbx";
const LEGACY_VERSION_PREFIX: &str = "TmForever";
const UNSET_RACE_TIME: u32 = u32::MAX;

/// A replay file as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayUpload {
    /// Submission filename; legacy replays encode the track in it.
    pub filename: String,
    /// Full file content.
    pub bytes: Vec<u8>,
    /// Account submitting the file.
    pub uploader: String,
}

impl ReplayUpload {
    /// Bundle an upload.
    pub fn new(
        filename: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        uploader: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            uploader: uploader.into(),
        }
    }
}

/// Normalised ghost data, independent of the game generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGhost {
    /// Generation inferred from the embedded game version.
    pub game_variant: GameVariant,
    /// Game version string carried by the ghost; empty when absent.
    pub game_version: String,
    /// Finish time.
    pub race_time: RaceTime,
    /// Readable player login.
    pub login: String,
    /// Anonymised token for modern replays.
    pub raw_identity_token: Option<String>,
    /// Track the run belongs to.
    pub track_id: TrackId,
    /// Checkpoint splits in milliseconds.
    pub checkpoint_times: Vec<u32>,
    /// Digest of the full file.
    pub content_hash: ContentHash,
}

/// Parse an uploaded replay.
///
/// # Errors
///
/// Returns [`Error::InputFormat`] for a wrong extension, an undecodable
/// container, or a ghost lacking a finished race time or a login. A ghost
/// without a game version is treated as modern. Identity resolution errors
/// are passed through from the variant's resolver.
pub fn parse_ghost(upload: &ReplayUpload) -> Result<ParsedGhost, Error> {
    let has_extension = Path::new(&upload.filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(REPLAY_EXTENSION));
    if !has_extension {
        return Err(Error::input_format(format!(
            "`{}` is not a .Gbx replay file",
            upload.filename
        )));
    }

    let content_hash = ContentHash::of(&upload.bytes);
    let container = container::Container::decode(&upload.bytes)?;
    let fields = chunks::decode(chunks::ghost_stream(&container)?)?;

    let race_time = fields
        .race_time
        .filter(|millis| *millis != 0 && *millis != UNSET_RACE_TIME)
        .map(RaceTime::from_millis)
        .ok_or_else(|| Error::input_format("ghost carries no finished race time"))?;
    let ghost_login = fields
        .login
        .ok_or_else(|| Error::input_format("ghost carries no login"))?;
    let game_version = fields.game_version.unwrap_or_default();

    let game_variant = variant_for(&game_version);
    let resolver: &dyn IdentityResolver = match game_variant {
        GameVariant::Legacy => &LegacyIdentityResolver,
        GameVariant::Modern => &ModernIdentityResolver,
    };
    let identity = resolver.resolve(IdentityInput {
        filename: &upload.filename,
        bytes: &upload.bytes,
        header_xml: container.header_xml.as_deref(),
        ghost_login: &ghost_login,
    })?;

    Ok(ParsedGhost {
        game_variant,
        game_version,
        race_time,
        login: identity.login,
        raw_identity_token: identity.raw_identity_token,
        track_id: identity.track_id,
        checkpoint_times: fields.checkpoint_times,
        content_hash,
    })
}

fn variant_for(game_version: &str) -> GameVariant {
    if game_version.starts_with(LEGACY_VERSION_PREFIX) {
        GameVariant::Legacy
    } else {
        GameVariant::Modern
    }
}
