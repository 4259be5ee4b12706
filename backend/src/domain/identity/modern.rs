//! Header- and byte-scan-driven identity resolution for modern replays.

use super::{IdentityInput, IdentityResolver, ResolvedIdentity, lossy_ascii};
use crate::domain::{Error, ResolutionFailure, TrackId};

const HEADER_OPEN: &[u8] = b"<header";
const HEADER_CLOSE: &[u8] = b"</header>";
const LOGIN_SCAN_SEGMENTS: usize = 100;
const NAME_PREFIX: u8 = 0x16;

/// Resolves modern replays from their embedded header and raw bytes.
///
/// The readable login is the null-delimited segment immediately preceding
/// the first segment that mentions the ghost's account token. The first
/// match wins; nothing guarantees it is the only one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModernIdentityResolver;

impl ModernIdentityResolver {
    /// Track id from the `name` attribute of the header's `<map>` element.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionFailure`] when the header block is absent,
    /// unparsable, or carries no map name.
    pub fn track_id(bytes: &[u8]) -> Result<TrackId, Error> {
        let block = header_block(bytes).ok_or(ResolutionFailure::HeaderNotFound)?;
        let text = std::str::from_utf8(block).map_err(|err| ResolutionFailure::HeaderMalformed {
            message: err.to_string(),
        })?;
        let document =
            roxmltree::Document::parse(text).map_err(|err| ResolutionFailure::HeaderMalformed {
                message: err.to_string(),
            })?;
        let name = document
            .root_element()
            .children()
            .find(|node| node.has_tag_name("map"))
            .and_then(|map| map.attribute("name"))
            .filter(|name| !name.is_empty())
            .ok_or(ResolutionFailure::TrackNameMissing)?;
        Ok(TrackId::new(name))
    }

    /// Readable login correlated with the anonymised `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionFailure::LoginNotFound`] when no scanned segment
    /// mentions the token, when the first match has no predecessor, or when
    /// the predecessor is empty once its prefix is stripped.
    pub fn login(bytes: &[u8], token: &str) -> Result<String, Error> {
        let not_found = || ResolutionFailure::LoginNotFound {
            token: token.to_owned(),
        };
        let segments: Vec<&[u8]> = bytes
            .split(|byte| *byte == 0)
            .take(LOGIN_SCAN_SEGMENTS)
            .filter(|segment| !segment.is_empty())
            .collect();
        let matched = segments
            .iter()
            .position(|segment| lossy_ascii(segment).contains(token))
            .ok_or_else(not_found)?;
        let previous = matched
            .checked_sub(1)
            .and_then(|index| segments.get(index))
            .ok_or_else(not_found)?;
        let login = String::from_utf8_lossy(trim_name_prefix(previous)).into_owned();
        if login.is_empty() {
            return Err(not_found().into());
        }
        Ok(login)
    }
}

impl IdentityResolver for ModernIdentityResolver {
    fn resolve(&self, input: IdentityInput<'_>) -> Result<ResolvedIdentity, Error> {
        let track_id = Self::track_id(input.header_xml.unwrap_or(input.bytes))?;
        let login = Self::login(input.bytes, input.ghost_login)?;
        Ok(ResolvedIdentity {
            track_id,
            login,
            raw_identity_token: Some(input.ghost_login.to_owned()),
        })
    }
}

/// First `<header` … `</header>` range, shortest match.
fn header_block(bytes: &[u8]) -> Option<&[u8]> {
    let start = find(bytes, HEADER_OPEN)?;
    let len = find(&bytes[start..], HEADER_CLOSE)? + HEADER_CLOSE.len();
    bytes.get(start..start + len)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn trim_name_prefix(segment: &[u8]) -> &[u8] {
    let start = segment
        .iter()
        .position(|byte| *byte != NAME_PREFIX)
        .unwrap_or(segment.len());
    let end = segment
        .iter()
        .rposition(|byte| *byte != NAME_PREFIX)
        .map_or(start, |index| index + 1);
    &segment[start..end.max(start)]
}
