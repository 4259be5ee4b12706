//! Inbound adapters translating external input into domain calls.
//!
//! Replay files are read from the local filesystem by [`files`]; the
//! `ingest-replays` binary drives the domain services with the result.

pub mod files;
