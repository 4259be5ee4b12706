//! Canonical replay records and the tracks they belong to.
//!
//! A [`ReplayRecord`] is produced exactly once per accepted upload and is never
//! mutated afterwards. Tracks are merged on every record creation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use super::RaceTime;

/// Length in bytes of a [`ContentHash`].
pub const CONTENT_HASH_LEN: usize = 64;

/// Validation errors for [`ContentHash`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentHashError {
    /// Input was not hexadecimal.
    #[error("content hash must be hexadecimal: {message}")]
    InvalidHex {
        /// Decoder diagnostic.
        message: String,
    },
    /// Input decoded to the wrong number of bytes.
    #[error("content hash must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        actual: usize,
    },
}

/// SHA-512 digest of a replay file's full byte stream.
///
/// This is the deduplication identity of a replay: at most one record per
/// distinct digest is ever stored. Ordering is lexicographic over the digest
/// bytes, which matches ordering of the lowercase hex form.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash([u8; CONTENT_HASH_LEN]);

impl ContentHash {
    /// Hash the given bytes.
    ///
    /// # Examples
    /// ```
    /// use replayboard::domain::ContentHash;
    ///
    /// let first = ContentHash::of(b"ghost");
    /// assert_eq!(first, ContentHash::of(b"ghost"));
    /// assert_eq!(first.to_hex().len(), 128);
    /// ```
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha512::digest(bytes);
        let mut out = [0_u8; CONTENT_HASH_LEN];
        out.copy_from_slice(digest.as_slice());
        Self(out)
    }

    /// Parse a lowercase or uppercase hex digest.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is not 128 hex characters.
    pub fn from_hex(hex_digest: &str) -> Result<Self, ContentHashError> {
        let bytes = hex::decode(hex_digest).map_err(|err| ContentHashError::InvalidHex {
            message: err.to_string(),
        })?;
        let actual = bytes.len();
        let digest: [u8; CONTENT_HASH_LEN] =
            bytes
                .try_into()
                .map_err(|_| ContentHashError::InvalidLength {
                    expected: CONTENT_HASH_LEN,
                    actual,
                })?;
        Ok(Self(digest))
    }

    /// Encode the digest as lowercase hexadecimal.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContentHash").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = ContentHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ContentHash> for String {
    fn from(value: ContentHash) -> Self {
        value.to_hex()
    }
}

/// Binary-format generation a replay was recorded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    /// Older engine family (`TmForever`); track comes from the filename.
    Legacy,
    /// Newer engine family; track comes from the embedded header.
    Modern,
}

impl GameVariant {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Modern => "modern",
        }
    }
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a track (map).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Wrap a raw track identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A track referenced by at least one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Track key.
    pub track_id: TrackId,
    /// Name shown to players.
    pub display_name: String,
    /// Format generation of the replays on this track.
    pub game_variant: GameVariant,
}

/// Immutable canonical record of one accepted replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRecord {
    /// Digest of the full file; primary identity.
    pub content_hash: ContentHash,
    /// Finish time.
    pub race_time: RaceTime,
    /// Canonical player login.
    pub login: String,
    /// Token found in the file before resolution (modern replays only).
    pub raw_identity_token: Option<String>,
    /// Account that submitted the file.
    pub uploader: String,
    /// Track the run was driven on.
    pub track_id: TrackId,
    /// Checkpoint split times in milliseconds.
    pub checkpoint_times: Vec<u32>,
    /// Instant the upload was accepted.
    pub uploaded_at: DateTime<Utc>,
    /// Format generation of the source file.
    pub game_variant: GameVariant,
}

impl ReplayRecord {
    /// Race time rendered in the variant's precision.
    pub fn display_time(&self) -> String {
        self.race_time.display(self.game_variant)
    }

    /// Login without any `/`-delimited disambiguation suffix.
    pub fn canonical_login(&self) -> &str {
        canonical_login(&self.login)
    }
}

/// Strip a `/`-delimited disambiguation suffix from a login.
///
/// # Examples
/// ```
/// use replayboard::domain::canonical_login;
///
/// assert_eq!(canonical_login("speedy/uploaded-by-bob"), "speedy");
/// assert_eq!(canonical_login("speedy"), "speedy");
/// ```
pub fn canonical_login(login: &str) -> &str {
    login.split('/').next().unwrap_or(login)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn content_hash_is_sha512_of_input() {
        let hash = ContentHash::of(b"abc");
        assert!(hash.to_hex().starts_with("ddaf35a193617aba"));
    }

    #[rstest]
    fn content_hash_parses_its_own_hex() {
        let hash = ContentHash::of(b"replay bytes");
        let parsed = ContentHash::from_hex(&hash.to_hex()).expect("valid hex");
        assert_eq!(parsed, hash);
    }

    #[rstest]
    #[case::not_hex("zz")]
    #[case::too_short("abcd")]
    fn content_hash_rejects_invalid_input(#[case] input: &str) {
        assert!(ContentHash::from_hex(input).is_err());
    }

    #[rstest]
    fn content_hash_order_matches_hex_order() {
        let a = ContentHash::of(b"one");
        let b = ContentHash::of(b"two");
        assert_eq!(a.cmp(&b), a.to_hex().cmp(&b.to_hex()));
    }

    #[rstest]
    #[case::plain("speedy", "speedy")]
    #[case::suffixed("speedy/bob", "speedy")]
    #[case::several("a/b/c", "a")]
    #[case::empty("", "")]
    fn canonical_login_strips_suffix(#[case] login: &str, #[case] expected: &str) {
        assert_eq!(canonical_login(login), expected);
    }
}
