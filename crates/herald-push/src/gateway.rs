//! Push gateway trait and the FCM HTTP v1 implementation.
//!
//! [`FcmGateway`] owns one HTTP client and one token service for the life of
//! the process. [`FcmGateway::shared`] gives process-wide singleton
//! semantics (framework re-initialization reuses the existing handle);
//! [`FcmGateway::shutdown`] drains in-flight deliveries within a bounded
//! grace period and refuses new sends afterwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use herald_core::registration::DevicePlatform;

use crate::config::FcmConfig;
use crate::errors::PushError;
use crate::token::TokenService;

/// HTTP timeout for a single delivery attempt.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// A notification to deliver to one device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub body: String,
    /// Custom data fields forwarded to the device.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl PushNotification {
    /// Create a notification with no custom data.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: HashMap::new(),
        }
    }

    /// Attach a custom data field.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.data.insert(key.into(), value.into());
        self
    }
}

/// Delivery seam the dispatcher is written against.
///
/// Failures surface as error values; the caller decides whether they are
/// fatal (the notification dispatcher treats them as best-effort).
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver `notification` to `device_token`, formatted for `platform`.
    async fn send(
        &self,
        device_token: &str,
        notification: &PushNotification,
        platform: DevicePlatform,
    ) -> Result<(), PushError>;
}

/// Process-wide shared gateway handle.
static SHARED: RwLock<Option<Arc<FcmGateway>>> = RwLock::new(None);

/// FCM HTTP v1 push gateway.
pub struct FcmGateway {
    config: FcmConfig,
    tokens: TokenService,
    client: reqwest::Client,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    drained: Notify,
}

impl std::fmt::Debug for FcmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmGateway")
            .field("project_id", &self.config.service_account.project_id)
            .field("endpoint", &self.config.endpoint)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl FcmGateway {
    /// Create a new gateway from config.
    ///
    /// Parses the credential's private key and builds the HTTP client, so a
    /// broken credential fails here rather than on the first delivery.
    pub fn new(config: FcmConfig) -> Result<Self, PushError> {
        let tokens = TokenService::new(&config.service_account)?;
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| PushError::ClientBuild {
                reason: e.to_string(),
            })?;

        info!(
            project_id = %config.service_account.project_id,
            endpoint = %config.endpoint,
            "FCM gateway initialized"
        );

        Ok(Self {
            config,
            tokens,
            client,
            closed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
        })
    }

    /// Create a gateway from the process environment (`SERVICE_ACCOUNT`).
    pub fn from_env() -> Result<Self, PushError> {
        Self::new(FcmConfig::from_env()?)
    }

    /// Get the process-wide shared gateway, creating it on first call.
    ///
    /// If a handle already exists — e.g. the embedding framework
    /// re-initializes — it is reused and `config` is ignored.
    pub fn shared(config: FcmConfig) -> Result<Arc<Self>, PushError> {
        // Fast path: read lock
        {
            let guard = SHARED.read().expect("gateway lock poisoned");
            if let Some(ref gateway) = *guard {
                return Ok(Arc::clone(gateway));
            }
        }

        // Slow path: first access, take write lock
        let mut guard = SHARED.write().expect("gateway lock poisoned");
        // Double-check after acquiring write lock
        if let Some(ref gateway) = *guard {
            return Ok(Arc::clone(gateway));
        }

        let gateway = Arc::new(Self::new(config)?);
        *guard = Some(Arc::clone(&gateway));
        Ok(gateway)
    }

    /// Shut down the process-wide shared gateway, releasing the handle.
    ///
    /// Invoked once during orderly process termination. A missing handle and
    /// a drain timeout are both logged, never escalated.
    pub async fn shutdown_shared(grace: Duration) {
        let taken = {
            let mut guard = SHARED.write().expect("gateway lock poisoned");
            guard.take()
        };
        match taken {
            Some(gateway) => gateway.shutdown(grace).await,
            None => warn!("no shared push gateway to shut down"),
        }
    }

    /// Stop accepting sends and wait up to `grace` for in-flight
    /// deliveries to drain.
    pub async fn shutdown(&self, grace: Duration) {
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!("push gateway shutdown requested more than once");
            return;
        }

        info!(
            in_flight = self.in_flight.load(Ordering::SeqCst),
            grace_secs = grace.as_secs(),
            "shutting down push gateway"
        );

        let drain = async {
            loop {
                let notified = self.drained.notified();
                if self.in_flight.load(Ordering::SeqCst) == 0 {
                    break;
                }
                notified.await;
            }
        };

        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!(
                in_flight = self.in_flight.load(Ordering::SeqCst),
                "shutdown grace period elapsed with deliveries still in flight"
            );
        } else {
            info!("push gateway shut down");
        }
    }

    /// Whether shutdown has been initiated.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Build the FCM v1 message object.
    #[allow(clippy::unused_self)]
    fn build_message(
        &self,
        device_token: &str,
        notification: &PushNotification,
        platform: DevicePlatform,
    ) -> serde_json::Value {
        let mut message = serde_json::json!({
            "token": device_token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
        });

        if !notification.data.is_empty() {
            message["data"] = serde_json::json!(notification.data);
        }

        // iOS delivery goes through APNs; attach the default sound there.
        if platform == DevicePlatform::Ios {
            message["apns"] = serde_json::json!({
                "payload": { "aps": { "sound": "default" } }
            });
        }

        message
    }

    async fn send_inner(
        &self,
        device_token: &str,
        notification: &PushNotification,
        platform: DevicePlatform,
    ) -> Result<(), PushError> {
        let access_token = self.tokens.access_token(&self.client).await?;
        let url = self.config.send_url();
        let message = self.build_message(device_token, notification, platform);

        debug!(
            url = %url,
            token_len = device_token.len(),
            platform = %platform,
            "FCM request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "FCM send OK");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error")?.get("status")?.as_str().map(String::from));

        warn!(
            status = status.as_u16(),
            reason = ?reason,
            body = %body,
            "FCM send FAILED"
        );

        Err(PushError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(
        &self,
        device_token: &str,
        notification: &PushNotification,
        platform: DevicePlatform,
    ) -> Result<(), PushError> {
        let _guard = InFlightGuard::begin(self)?;

        let result = self.send_inner(device_token, notification, platform).await;
        let status = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("push_send_total", "status" => status).increment(1);
        result
    }
}

/// Tracks one in-flight delivery; wakes the drain loop when the last one
/// completes after shutdown started.
struct InFlightGuard<'a> {
    gateway: &'a FcmGateway,
}

impl<'a> InFlightGuard<'a> {
    fn begin(gateway: &'a FcmGateway) -> Result<Self, PushError> {
        let _ = gateway.in_flight.fetch_add(1, Ordering::SeqCst);
        // Re-check after registering so a concurrent shutdown either sees
        // this delivery or this delivery sees the closed flag.
        if gateway.closed.load(Ordering::SeqCst) {
            drop(Self { gateway });
            return Err(PushError::ShuttingDown);
        }
        Ok(Self { gateway })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.gateway.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.gateway.drained.notify_waiters();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
