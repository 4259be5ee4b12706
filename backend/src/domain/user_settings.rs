//! Per-user notification settings.
//!
//! Settings are a closed set of typed fields. Unknown keys are rejected when
//! parsed, so no update can touch anything outside [`SettingKey`].

use serde::{Deserialize, Serialize};

/// Name of a user-adjustable setting.
///
/// # Examples
///
/// ```
/// # use replayboard::domain::SettingKey;
/// let key: SettingKey = "notify_on_displacement".parse().expect("known key");
/// assert_eq!(key, SettingKey::NotifyOnDisplacement);
/// assert!("is_admin".parse::<SettingKey>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    /// Whether to send a message when someone takes the user's record.
    NotifyOnDisplacement,
}

impl SettingKey {
    /// Every known key.
    pub const ALL: [Self; 1] = [Self::NotifyOnDisplacement];

    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotifyOnDisplacement => "notify_on_displacement",
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a setting key that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown setting key: {input}")]
pub struct UnknownSettingKey {
    /// The unrecognised input value.
    pub input: String,
}

impl std::str::FromStr for SettingKey {
    type Err = UnknownSettingKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownSettingKey {
                input: s.to_owned(),
            })
    }
}

/// A typed change to one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingUpdate {
    /// Setting being changed.
    pub key: SettingKey,
    /// New value.
    pub value: bool,
}

impl SettingUpdate {
    /// Parse a raw key and pair it with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSettingKey`] for keys outside [`SettingKey`].
    pub fn parse(key: &str, value: bool) -> Result<Self, UnknownSettingKey> {
        Ok(Self {
            key: key.parse()?,
            value,
        })
    }
}

/// Notification settings of one user.
///
/// New users are notified by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Send a message when another player takes this user's record.
    pub notify_on_displacement: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notify_on_displacement: true,
        }
    }
}

impl UserSettings {
    /// Current value of `key`.
    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::NotifyOnDisplacement => self.notify_on_displacement,
        }
    }

    /// Apply one update.
    pub fn apply(&mut self, update: SettingUpdate) {
        match update.key {
            SettingKey::NotifyOnDisplacement => self.notify_on_displacement = update.value,
        }
    }

    /// Apply updates in order; later updates to the same key win.
    pub fn with_updates(mut self, updates: impl IntoIterator<Item = SettingUpdate>) -> Self {
        for update in updates {
            self.apply(update);
        }
        self
    }
}
