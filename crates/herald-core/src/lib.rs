//! # herald-core
//!
//! Foundation types for the herald mediator observer.
//!
//! This crate provides the shared vocabulary the other herald crates depend on:
//!
//! - **Branded IDs**: [`ids::ConnectionId`], [`ids::RecipientKey`],
//!   [`ids::MessageId`] as newtypes
//! - **Messages**: [`messages::ProcessedMessage`] with the three recognized
//!   DIDComm message-type URIs and their typed body payloads
//! - **Events**: [`events::MessageProcessedEvent`] and the broadcast-based
//!   [`events::EventEmitter`] the agent framework integration feeds
//! - **Registrations**: [`registration::DeviceRegistration`] stored under the
//!   connection-metadata key [`registration::PUSH_NOTIFICATION_METADATA_KEY`]
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other herald crates.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod registration;
