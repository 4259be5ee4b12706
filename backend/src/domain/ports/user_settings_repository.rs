//! Port for per-user notification settings.

use async_trait::async_trait;

use crate::domain::UserSettings;

use super::define_port_error;

define_port_error! {
    /// Errors raised by user settings repository adapters.
    pub enum UserSettingsRepositoryError {
        /// Storage could not be reached.
        Connection { message: String } =>
            "settings repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "settings repository query failed: {message}",
    }
}

/// Port for settings storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserSettingsRepository: Send + Sync {
    /// Fetch settings for a user.
    ///
    /// Returns `None` if the user never saved settings; callers fall back to
    /// [`UserSettings::default`].
    async fn find_by_user(
        &self,
        user: &str,
    ) -> Result<Option<UserSettings>, UserSettingsRepositoryError>;

    /// Store settings for a user, replacing any previous value.
    async fn save(
        &self,
        user: &str,
        settings: &UserSettings,
    ) -> Result<(), UserSettingsRepositoryError>;
}
