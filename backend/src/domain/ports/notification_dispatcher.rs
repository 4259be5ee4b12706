//! Port for delivering record-broken notifications.

use async_trait::async_trait;
use serde::Serialize;

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification dispatch adapters.
    pub enum NotificationDispatchError {
        /// The request did not complete within the configured timeout.
        Timeout { message: String } =>
            "notification dispatch timed out: {message}",
        /// The request could not be sent or its response not read.
        Transport { message: String } =>
            "notification dispatch failed: {message}",
        /// The endpoint answered with a non-success status.
        Rejected { status: u16, body: String } =>
            "notification endpoint rejected the message with status {status}: {body}",
    }
}

/// A message addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Recipient account.
    pub target_user: String,
    /// Message text.
    pub message: String,
}

/// Outbound notification transport.
///
/// Failures are reported to the caller, which logs and discards them; they
/// never undo the replay acceptance that triggered the message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one notification.
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationDispatchError>;
}

/// Dispatcher used when no endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for NoOpNotificationDispatcher {
    async fn dispatch(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationDispatchError> {
        tracing::debug!(
            target_user = %notification.target_user,
            "no dispatch endpoint configured; dropping notification"
        );
        Ok(())
    }
}
