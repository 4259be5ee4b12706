//! Outbound adapters implementing domain ports.
//!
//! - **persistence**: in-process repositories for records, tracks, and user
//!   settings
//! - **dispatch**: reqwest-backed delivery of record-broken notifications
//!
//! Adapters translate between domain types and their storage or wire
//! representation. They contain no ranking or trigger logic.

pub mod dispatch;
pub mod persistence;
