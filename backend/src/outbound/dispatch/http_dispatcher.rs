//! Reqwest-backed notification dispatcher.
//!
//! The adapter owns transport details only: endpoint resolution, auth
//! headers, timeout, and HTTP error mapping. Retry and logging policy
//! belong to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request, StatusCode, Url};
use serde::Serialize;
use tracing::debug;

use super::config::{DispatchAuth, DispatchSettings};
use crate::domain::ports::{
    NoOpNotificationDispatcher, Notification, NotificationDispatchError, NotificationDispatcher,
};

const SEND_PATH: &str = "smart-send";

/// Errors raised while building a dispatcher from configuration.
#[derive(Debug, thiserror::Error)]
pub enum DispatchConfigError {
    /// The configured server is not a valid base URL.
    #[error("invalid dispatch server `{server}`: {source}")]
    InvalidServer {
        /// Offending value.
        server: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client could not be built.
    #[error("failed to build dispatch client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct SendRequest<'a> {
    users: [&'a str; 1],
    msg: &'a str,
}

/// Dispatcher posting messages to a `smart-send` endpoint.
pub struct HttpNotificationDispatcher {
    client: Client,
    endpoint: Url,
    auth: Option<DispatchAuth>,
}

impl HttpNotificationDispatcher {
    /// Build a dispatcher for the messaging service at `server`.
    ///
    /// # Errors
    ///
    /// Returns an error when `server` is not a URL or the reqwest client
    /// cannot be constructed.
    pub fn new(
        server: &str,
        auth: Option<DispatchAuth>,
        timeout: Duration,
    ) -> Result<Self, DispatchConfigError> {
        let raw = format!("{}/{SEND_PATH}", server.trim_end_matches('/'));
        let endpoint = Url::parse(&raw).map_err(|source| DispatchConfigError::InvalidServer {
            server: server.to_owned(),
            source,
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            auth,
        })
    }

    /// Endpoint every notification is posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request(&self, notification: &Notification) -> reqwest::Result<Request> {
        let body = SendRequest {
            users: [notification.target_user.as_str()],
            msg: notification.message.as_str(),
        };
        let builder = self.client.post(self.endpoint.clone()).json(&body);
        let builder = match &self.auth {
            Some(DispatchAuth::Bearer(token)) => builder.bearer_auth(token),
            Some(DispatchAuth::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            None => builder,
        };
        builder.build()
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationDispatchError> {
        let request = self.request(notification).map_err(map_transport_error)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            debug!(target_user = %notification.target_user, status = status.as_u16(), "notification delivered");
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

/// Dispatcher selected from [`DispatchSettings`].
pub enum ConfiguredDispatcher {
    /// A server is configured.
    Http(HttpNotificationDispatcher),
    /// No server; messages are dropped.
    Disabled(NoOpNotificationDispatcher),
}

impl ConfiguredDispatcher {
    /// Choose the dispatcher described by `settings`.
    ///
    /// # Errors
    ///
    /// See [`HttpNotificationDispatcher::new`].
    pub fn from_settings(settings: &DispatchSettings) -> Result<Self, DispatchConfigError> {
        match settings.server() {
            Some(server) => Ok(Self::Http(HttpNotificationDispatcher::new(
                server,
                settings.auth(),
                settings.timeout(),
            )?)),
            None => Ok(Self::Disabled(NoOpNotificationDispatcher)),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for ConfiguredDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationDispatchError> {
        match self {
            Self::Http(dispatcher) => dispatcher.dispatch(notification).await,
            Self::Disabled(dispatcher) => dispatcher.dispatch(notification).await,
        }
    }
}

fn map_transport_error(error: reqwest::Error) -> NotificationDispatchError {
    if error.is_timeout() {
        NotificationDispatchError::timeout(error.to_string())
    } else {
        NotificationDispatchError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> NotificationDispatchError {
    NotificationDispatchError::rejected(status.as_u16(), body_preview(body))
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
        format!("{preview}...")
    } else {
        compact
    }
}
