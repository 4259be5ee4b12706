//! Replay leaderboard library.
//!
//! Decodes uploaded racing-game replay files into immutable time records,
//! ranks them per track, and notifies players whose record was broken.

pub mod domain;
pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
