//! Track and player identity resolution for the two replay generations.
//!
//! Legacy replays name their track in the upload filename, which is then
//! cross-checked against the file content. Modern replays embed the track in
//! an XML header and only carry an anonymised account token, which is mapped
//! back to a readable login by scanning the raw bytes.

mod legacy;
mod modern;

pub use self::legacy::LegacyIdentityResolver;
pub use self::modern::ModernIdentityResolver;

use super::{Error, TrackId};

/// Identity facts derived for one replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Track the replay was driven on.
    pub track_id: TrackId,
    /// Readable player login.
    pub login: String,
    /// Token taken verbatim from the ghost block when it differs in kind
    /// from the readable login.
    pub raw_identity_token: Option<String>,
}

/// Inputs available to a resolver.
#[derive(Debug, Clone, Copy)]
pub struct IdentityInput<'a> {
    /// Submission filename.
    pub filename: &'a str,
    /// Raw file bytes.
    pub bytes: &'a [u8],
    /// Payload of the container's XML header chunk, if decoded.
    pub header_xml: Option<&'a [u8]>,
    /// Login read from the ghost block.
    pub ghost_login: &'a str,
}

/// Strategy deriving a replay's track and login.
pub trait IdentityResolver {
    /// Resolve identity facts for one replay.
    ///
    /// # Errors
    ///
    /// Returns filename, validation, or resolution errors depending on the
    /// strategy.
    fn resolve(&self, input: IdentityInput<'_>) -> Result<ResolvedIdentity, Error>;
}

/// Best-effort ASCII view of raw bytes; non-ASCII bytes are dropped.
pub(crate) fn lossy_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .copied()
        .filter(u8::is_ascii)
        .map(char::from)
        .collect()
}
