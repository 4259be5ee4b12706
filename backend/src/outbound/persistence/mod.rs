//! In-process persistence adapters.
//!
//! Records and tracks live behind a mutex for the lifetime of the process.
//! Each adapter enforces the invariants its port documents: content-hash
//! uniqueness, write-once records, and time-then-arrival ordering.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use replayboard::outbound::persistence::{
//!     InMemoryReplayRepository, InMemoryUserSettingsRepository,
//! };
//!
//! let replays = Arc::new(InMemoryReplayRepository::new());
//! let settings = Arc::new(InMemoryUserSettingsRepository::new());
//! # let _ = (replays, settings);
//! ```

mod in_memory_replay_repository;
mod in_memory_user_settings_repository;

pub use in_memory_replay_repository::InMemoryReplayRepository;
pub use in_memory_user_settings_repository::InMemoryUserSettingsRepository;
