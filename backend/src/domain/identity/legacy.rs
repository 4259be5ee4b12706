//! Filename-driven track resolution for legacy replays.

use super::{IdentityInput, IdentityResolver, ResolvedIdentity, lossy_ascii};
use crate::domain::{Error, TrackId, ValidationFailure};

const REPLAY_MARKER: &str = ".Replay";

/// Resolves legacy replays named `<login>_<trackToken>.Replay.<ext>`.
///
/// The login comes from the ghost block; the filename only contributes the
/// track, which must literally occur in the file content.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyIdentityResolver;

impl LegacyIdentityResolver {
    /// Extract the track token from a submission filename.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFilename`] unless the basename splits on `_`
    /// into exactly two parts with a non-empty track token.
    ///
    /// # Examples
    /// ```
    /// use replayboard::domain::LegacyIdentityResolver;
    ///
    /// let token = LegacyIdentityResolver::track_token("speedy_A01-Race.Replay.Gbx")
    ///     .expect("well-formed name");
    /// assert_eq!(token, "A01-Race");
    /// ```
    pub fn track_token(filename: &str) -> Result<&str, Error> {
        let basename = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
        let parts: Vec<&str> = basename.split('_').collect();
        if parts.len() != 2 {
            return Err(Error::malformed_filename(
                filename,
                format!(
                    "expected `<login>_<track>.Replay.Gbx` but found {} `_`-separated parts; \
                     remove underscores from the track name",
                    parts.len()
                ),
            ));
        }
        let token = parts[1];
        let token = token.split(REPLAY_MARKER).next().unwrap_or(token);
        if token.is_empty() {
            return Err(Error::malformed_filename(filename, "track token is empty"));
        }
        Ok(token)
    }
}

impl IdentityResolver for LegacyIdentityResolver {
    fn resolve(&self, input: IdentityInput<'_>) -> Result<ResolvedIdentity, Error> {
        let token = Self::track_token(input.filename)?;
        if !lossy_ascii(input.bytes).contains(token) {
            return Err(ValidationFailure::MapMismatch {
                track_token: token.to_owned(),
            }
            .into());
        }
        Ok(ResolvedIdentity {
            track_id: TrackId::new(token),
            login: input.ghost_login.to_owned(),
            raw_identity_token: None,
        })
    }
}
