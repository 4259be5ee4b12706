//! Domain-level error types.
//!
//! These errors are transport agnostic. The command-line adapter prints them;
//! a web adapter would map [`ErrorCode`] to response statuses.

use serde::{Deserialize, Serialize};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Wrong extension, truncated container, or no ghost block.
    InputFormat,
    /// Legacy filename does not follow `<login>_<track>.Replay.<ext>`.
    MalformedFilename,
    /// File content contradicts the submission metadata.
    Validation,
    /// Track or login could not be resolved from the file.
    Resolution,
    /// The exact same file content was already stored.
    DuplicateReplay,
    /// A rank query was outside the supported range.
    RankQuery,
    /// A collaborator is temporarily unreachable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Reasons a replay fails content validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    /// The filename names a track that the file content never mentions.
    #[error("track `{track_token}` named by the filename does not occur in the file")]
    MapMismatch {
        /// Track token derived from the filename.
        track_token: String,
    },
}

/// Reasons identity resolution fails for modern replays.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionFailure {
    /// No `<header>` block exists in the raw bytes.
    #[error("no header block found")]
    HeaderNotFound,
    /// The header block exists but is not well-formed markup.
    #[error("header block is malformed: {message}")]
    HeaderMalformed {
        /// Parser diagnostic.
        message: String,
    },
    /// The header block carries no map name.
    #[error("header block carries no map name")]
    TrackNameMissing,
    /// The anonymised login token has no readable predecessor.
    #[error("no readable login precedes token `{token}`")]
    LoginNotFound {
        /// Raw token taken from the ghost block.
        token: String,
    },
}

/// Domain error returned by ingestion and leaderboard services.
///
/// # Examples
/// ```
/// use replayboard::domain::{Error, ErrorCode};
///
/// let err = Error::rank_query(11);
/// assert_eq!(err.code(), ErrorCode::RankQuery);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The submitted bytes are not a decodable replay.
    #[error("invalid replay input: {message}")]
    InputFormat {
        /// Description of the format problem.
        message: String,
    },
    /// The submitted filename cannot be split into login and track.
    #[error("malformed replay filename `{filename}`: {message}")]
    MalformedFilename {
        /// Offending filename.
        filename: String,
        /// Description of the problem.
        message: String,
    },
    /// The replay contradicts its own metadata.
    #[error("replay validation failed: {0}")]
    Validation(#[from] ValidationFailure),
    /// Identity data could not be resolved from the replay.
    #[error("replay identity resolution failed: {0}")]
    Resolution(#[from] ResolutionFailure),
    /// A replay with identical content has already been stored.
    #[error("replay {content_hash} has already been submitted")]
    DuplicateReplay {
        /// Hex digest of the duplicated content.
        content_hash: String,
    },
    /// A rank-distribution query used a rank outside `1..=10`.
    #[error("rank {rank} is outside the supported range 1..=10")]
    RankQuery {
        /// Requested rank.
        rank: usize,
    },
    /// A collaborator could not be reached.
    #[error("service unavailable: {message}")]
    ServiceUnavailable {
        /// Description of the outage.
        message: String,
    },
    /// Unexpected internal failure.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InputFormat { .. } => ErrorCode::InputFormat,
            Self::MalformedFilename { .. } => ErrorCode::MalformedFilename,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Resolution(_) => ErrorCode::Resolution,
            Self::DuplicateReplay { .. } => ErrorCode::DuplicateReplay,
            Self::RankQuery { .. } => ErrorCode::RankQuery,
            Self::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            Self::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Convenience constructor for [`ErrorCode::InputFormat`].
    pub fn input_format(message: impl Into<String>) -> Self {
        Self::InputFormat {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`ErrorCode::MalformedFilename`].
    pub fn malformed_filename(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedFilename {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`ErrorCode::DuplicateReplay`].
    pub fn duplicate_replay(content_hash: impl Into<String>) -> Self {
        Self::DuplicateReplay {
            content_hash: content_hash.into(),
        }
    }

    /// Convenience constructor for [`ErrorCode::RankQuery`].
    pub fn rank_query(rank: usize) -> Self {
        Self::RankQuery { rank }
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
