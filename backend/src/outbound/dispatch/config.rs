//! Notification endpoint configuration loaded via OrthoConfig.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

/// Credentials attached to every dispatch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAuth {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// HTTP basic authentication.
    Basic {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
}

/// Configuration values for the notification endpoint.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DISPATCH")]
pub struct DispatchSettings {
    /// Base URL of the messaging service. Dispatch is disabled when unset.
    pub server: Option<String>,
    /// Bearer token; takes precedence over username and password.
    pub token: Option<String>,
    /// Basic-auth user name.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Request timeout in seconds.
    #[ortho_config(default = 10)]
    pub timeout_secs: u64,
}

impl DispatchSettings {
    /// Configured server with surrounding whitespace removed, if any.
    pub fn server(&self) -> Option<&str> {
        self.server
            .as_deref()
            .map(str::trim)
            .filter(|server| !server.is_empty())
    }

    /// Credentials to send, preferring the bearer token.
    pub fn auth(&self) -> Option<DispatchAuth> {
        if let Some(token) = self.token.as_deref().filter(|token| !token.is_empty()) {
            return Some(DispatchAuth::Bearer(token.to_owned()));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(DispatchAuth::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Request timeout; never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
