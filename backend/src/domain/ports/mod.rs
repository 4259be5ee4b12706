//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (replay storage, settings storage, notification transport). Each trait
//! exposes strongly typed errors so adapters map their failures into
//! predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod notification_dispatcher;
mod replay_repository;
mod user_settings_repository;

#[cfg(test)]
pub use notification_dispatcher::MockNotificationDispatcher;
pub use notification_dispatcher::{
    NoOpNotificationDispatcher, Notification, NotificationDispatchError, NotificationDispatcher,
};
#[cfg(test)]
pub use replay_repository::MockReplayRepository;
pub use replay_repository::{ReplayRepository, ReplayRepositoryError};
#[cfg(test)]
pub use user_settings_repository::MockUserSettingsRepository;
pub use user_settings_repository::{UserSettingsRepository, UserSettingsRepositoryError};
