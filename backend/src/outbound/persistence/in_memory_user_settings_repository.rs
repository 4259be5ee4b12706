//! Mutex-guarded `UserSettingsRepository` implementation.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::UserSettings;
use crate::domain::ports::{UserSettingsRepository, UserSettingsRepositoryError};

/// Settings store keyed by user name.
#[derive(Default)]
pub struct InMemoryUserSettingsRepository {
    settings: Mutex<HashMap<String, UserSettings>>,
}

impl InMemoryUserSettingsRepository {
    /// Create an empty repository; every user reads as defaults.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserSettingsRepository for InMemoryUserSettingsRepository {
    async fn find_by_user(
        &self,
        user: &str,
    ) -> Result<Option<UserSettings>, UserSettingsRepositoryError> {
        let settings = self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(settings.get(user).copied())
    }

    async fn save(
        &self,
        user: &str,
        settings: &UserSettings,
    ) -> Result<(), UserSettingsRepositoryError> {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.to_owned(), *settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SettingKey, SettingUpdate};

    #[tokio::test]
    async fn unknown_user_has_no_settings() {
        let repo = InMemoryUserSettingsRepository::new();
        assert_eq!(repo.find_by_user("bob").await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn saved_settings_replace_previous_value() {
        let repo = InMemoryUserSettingsRepository::new();
        let opted_out = UserSettings::default().with_updates([SettingUpdate {
            key: SettingKey::NotifyOnDisplacement,
            value: false,
        }]);
        repo.save("bob", &UserSettings::default())
            .await
            .expect("save");
        repo.save("bob", &opted_out).await.expect("save");

        let found = repo.find_by_user("bob").await.expect("lookup");
        assert_eq!(found, Some(opted_out));
        assert_eq!(repo.find_by_user("carol").await.expect("lookup"), None);
    }
}
