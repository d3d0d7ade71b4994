//! # herald-push
//!
//! Push-notification transport for the herald mediator observer.
//!
//! The [`PushGateway`] trait is the seam the dispatcher is written against;
//! [`FcmGateway`] is the production implementation speaking the FCM HTTP v1
//! API with a service-account credential:
//!
//! - **Credential**: base64 service-account JSON from the `SERVICE_ACCOUNT`
//!   environment variable ([`config::FcmConfig::from_env`]); missing or
//!   undecodable credentials are a fatal startup error.
//! - **Auth**: RS256 JWT bearer grant exchanged for an access token, cached
//!   and refreshed ahead of expiry ([`token`]).
//! - **Lifecycle**: a process-wide shared handle ([`FcmGateway::shared`])
//!   and an explicit [`FcmGateway::shutdown`] that drains in-flight
//!   deliveries within a bounded grace period.

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod gateway;
pub mod token;

pub use config::{FcmConfig, ServiceAccountKey, SERVICE_ACCOUNT_ENV};
pub use errors::{ConfigError, PushError};
pub use gateway::{FcmGateway, PushGateway, PushNotification};
