//! Delivery of record-broken notifications to a messaging service.

mod config;
mod http_dispatcher;

pub use config::{DispatchAuth, DispatchSettings};
pub use http_dispatcher::{ConfiguredDispatcher, DispatchConfigError, HttpNotificationDispatcher};
