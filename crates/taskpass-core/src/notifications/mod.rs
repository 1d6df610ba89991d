//! Local notification handling and push sending.
//!
//! This module provides:
//! - `NotificationHub`: delivers notifications to subscribed listeners and
//!   schedules delayed local notifications
//! - `Subscription`: listener handle, released when dropped
//! - `PushClient`: sends a push message through a push gateway over HTTP
//!
//! Device registration for push tokens is handled by the platform and is not
//! part of this crate; a token is just a string handed to `PushMessage`.

pub mod hub;
pub mod push;

pub use hub::{
    Notification, NotificationHub, ReceivedNotification, ScheduledNotification, Subscription,
};
pub use push::{PushClient, PushError, PushMessage, DEFAULT_PUSH_URL};
