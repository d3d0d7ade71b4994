//! The notification observer: event subscription and three-way dispatch.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use herald_core::events::MessageProcessedEvent;
use herald_core::ids::ConnectionId;
use herald_core::messages::{
    ApnsDeviceInfoPayload, FcmDeviceInfoPayload, ForwardPayload, ProcessedMessage,
    APNS_SET_DEVICE_INFO_TYPE, FCM_SET_DEVICE_INFO_TYPE, FORWARD_MESSAGE_TYPE,
    is_recognized_type,
};
use herald_core::registration::{DevicePlatform, DeviceRegistration};
use herald_push::{PushGateway, PushNotification};
use herald_store::{ConnectionStore, MediationStore};

use crate::errors::NotifyError;

/// Title of every forward notification.
pub const NOTIFICATION_TITLE: &str = "New Message Notification";

/// Body text for a forward notification.
fn new_message_body(label: Option<&str>) -> String {
    match label {
        Some(label) => format!("You have a new message from {label}"),
        None => "You have a new message".to_string(),
    }
}

/// Deserialize a recognized message's body into its typed payload.
fn parse_body<T: DeserializeOwned>(message: &ProcessedMessage) -> Result<T, NotifyError> {
    serde_json::from_value(message.body.clone()).map_err(|e| NotifyError::Payload {
        message_type: message.message_type.clone(),
        reason: e.to_string(),
    })
}

/// Routes processed-message events to registrations and push delivery.
///
/// Stateless: all state lives in the injected stores, so concurrent handler
/// invocations are safe. Collaborators arrive by injection to keep the
/// dispatcher testable against fakes.
pub struct NotificationObserver {
    connections: Arc<dyn ConnectionStore>,
    mediation: Arc<dyn MediationStore>,
    push: Arc<dyn PushGateway>,
}

impl NotificationObserver {
    /// Create an observer over the given collaborators.
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        mediation: Arc<dyn MediationStore>,
        push: Arc<dyn PushGateway>,
    ) -> Self {
        Self {
            connections,
            mediation,
            push,
        }
    }

    /// Consume an event subscription on a background task.
    ///
    /// Runs until `shutdown` is cancelled or the emitter is dropped. Lagged
    /// events and handler errors are logged and never stop the loop.
    pub fn spawn(
        self: Arc<Self>,
        mut events: broadcast::Receiver<MessageProcessedEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!("notification observer started");
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    received = events.recv() => match received {
                        Ok(event) => {
                            if !is_recognized_type(&event.message.message_type) {
                                continue;
                            }
                            if let Err(e) = self.handle(&event).await {
                                error!(
                                    message_id = %event.message.id,
                                    message_type = %event.message.message_type,
                                    error = %e,
                                    "failed to handle processed message"
                                );
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "observer lagged behind the event stream");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            debug!("notification observer stopped");
        })
    }

    /// Handle one processed-message event.
    ///
    /// Exactly one branch runs per event; unrecognized message types are a
    /// no-op. Errors escaping here are inconsistencies worth surfacing
    /// (missing mediation record, malformed body, store failure) — delivery
    /// failures are handled inside the forward branch and never escape.
    pub async fn handle(&self, event: &MessageProcessedEvent) -> Result<(), NotifyError> {
        let message = &event.message;
        match message.message_type.as_str() {
            FORWARD_MESSAGE_TYPE => {
                metrics::counter!("notify_events_total", "kind" => "forward").increment(1);
                self.process_forward(message).await?;
                debug!(message_id = %message.id, "processed forward message");
            }
            FCM_SET_DEVICE_INFO_TYPE => {
                metrics::counter!("notify_events_total", "kind" => "fcm_device_info").increment(1);
                self.process_fcm_device_info(message, event.connection_id.as_ref())
                    .await?;
                debug!(message_id = %message.id, "processed device info message");
            }
            APNS_SET_DEVICE_INFO_TYPE => {
                metrics::counter!("notify_events_total", "kind" => "apns_device_info").increment(1);
                self.process_apns_device_info(message, event.connection_id.as_ref())
                    .await?;
                debug!(message_id = %message.id, "processed device info message");
            }
            _ => {}
        }
        Ok(())
    }

    /// Forward branch: look up the mediated connection and push to its
    /// registered device, if any.
    async fn process_forward(&self, message: &ProcessedMessage) -> Result<(), NotifyError> {
        let payload: ForwardPayload = parse_body(message)?;

        // A missing mediation record for an in-flight forward implies a
        // deeper inconsistency; unlike the not-ready guard below it
        // propagates instead of soft-failing.
        let mediation = self
            .mediation
            .find_single_by_recipient_key(&payload.to)
            .await?;
        let connection = self.connections.find_by_id(&mediation.connection_id).await?;

        let connection = match connection {
            Some(c) if c.is_ready && mediation.is_ready => c,
            _ => {
                warn!(
                    connection_id = %mediation.connection_id,
                    "connection or mediation record not ready, dropping forward notification"
                );
                return Ok(());
            }
        };

        debug!(connection_id = %connection.id, "delivering message notification");
        let Some(registration) = connection.device_registration() else {
            debug!(connection_id = %connection.id, "no device registration, nothing to push");
            return Ok(());
        };

        let notification = PushNotification::new(
            NOTIFICATION_TITLE,
            new_message_body(connection.their_label.as_deref()),
        );

        // Best-effort: a failed delivery must not disrupt protocol-level
        // message processing.
        match self
            .push
            .send(
                &registration.device_token,
                &notification,
                registration.device_platform,
            )
            .await
        {
            Ok(()) => {
                metrics::counter!("notify_push_total", "status" => "sent").increment(1);
                debug!(connection_id = %connection.id, "push notification sent");
            }
            Err(e) => {
                metrics::counter!("notify_push_total", "status" => "failed").increment(1);
                error!(
                    connection_id = %connection.id,
                    error = %e,
                    "failed to send push notification"
                );
            }
        }
        Ok(())
    }

    /// FCM registration branch: a usable token and platform overwrite the
    /// registration, anything else deletes it.
    async fn process_fcm_device_info(
        &self,
        message: &ProcessedMessage,
        connection_id: Option<&ConnectionId>,
    ) -> Result<(), NotifyError> {
        let Some(connection_id) = connection_id else {
            return Ok(());
        };
        let payload: FcmDeviceInfoPayload = parse_body(message)?;

        let Some(mut connection) = self.connections.find_by_id(connection_id).await? else {
            error!(connection_id = %connection_id, "no connection found for device info message");
            return Ok(());
        };

        match (payload.token(), payload.device_platform) {
            (Some(token), Some(platform)) => {
                connection.set_device_registration(&DeviceRegistration::new(token, platform));
                metrics::counter!("notify_registrations_total", "op" => "set").increment(1);
                debug!(connection_id = %connection.id, platform = %platform, "device registration stored");
            }
            _ => {
                let existed = connection.clear_device_registration();
                metrics::counter!("notify_registrations_total", "op" => "clear").increment(1);
                debug!(connection_id = %connection.id, existed, "device registration cleared");
            }
        }

        self.connections.update(&connection).await?;
        Ok(())
    }

    /// APNs registration branch: same shape as FCM, platform fixed to iOS.
    async fn process_apns_device_info(
        &self,
        message: &ProcessedMessage,
        connection_id: Option<&ConnectionId>,
    ) -> Result<(), NotifyError> {
        let Some(connection_id) = connection_id else {
            return Ok(());
        };
        let payload: ApnsDeviceInfoPayload = parse_body(message)?;

        let Some(mut connection) = self.connections.find_by_id(connection_id).await? else {
            error!(connection_id = %connection_id, "no connection found for device info message");
            return Ok(());
        };

        match payload.token() {
            Some(token) => {
                connection
                    .set_device_registration(&DeviceRegistration::new(token, DevicePlatform::Ios));
                metrics::counter!("notify_registrations_total", "op" => "set").increment(1);
                debug!(connection_id = %connection.id, "device registration stored");
            }
            None => {
                let existed = connection.clear_device_registration();
                metrics::counter!("notify_registrations_total", "op" => "clear").increment(1);
                debug!(connection_id = %connection.id, existed, "device registration cleared");
            }
        }

        self.connections.update(&connection).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
