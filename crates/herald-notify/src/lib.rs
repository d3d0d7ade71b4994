//! # herald-notify
//!
//! The notification dispatcher for the herald mediator observer.
//!
//! [`NotificationObserver`] subscribes to the framework's processed-message
//! events and routes each one to at most one handling branch:
//!
//! - **Forward message** → resolve mediation + connection, push a
//!   "new message" notification to the stored device registration.
//! - **FCM / APNs set-device-info** → write or delete the connection's
//!   device registration.
//!
//! Branches are stateless and reentrant; every failure mode is isolated per
//! branch (see [`errors::NotifyError`] and the dispatch rules on
//! [`NotificationObserver::handle`]).

#![deny(unsafe_code)]

pub mod errors;
pub mod observer;

pub use errors::NotifyError;
pub use observer::{NotificationObserver, NOTIFICATION_TITLE};
