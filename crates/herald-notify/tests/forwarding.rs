//! End-to-end flow: emitter → observer task → stores → push gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use herald_core::events::{EventEmitter, MessageProcessedEvent};
use herald_core::ids::{ConnectionId, RecipientKey};
use herald_core::messages::ProcessedMessage;
use herald_core::registration::DevicePlatform;
use herald_notify::NotificationObserver;
use herald_push::{PushError, PushGateway, PushNotification};
use herald_store::{ConnectionRecord, ConnectionStore, MediationRecord, MediationStore, MemoryStore};

/// Records every delivery instead of talking to a push service.
#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<(String, PushNotification, DevicePlatform)>>,
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send(
        &self,
        device_token: &str,
        notification: &PushNotification,
        platform: DevicePlatform,
    ) -> Result<(), PushError> {
        let mut sent = self.sent.lock().await;
        sent.push((device_token.to_string(), notification.clone(), platform));
        Ok(())
    }
}

struct TestRig {
    emitter: EventEmitter,
    store: Arc<MemoryStore>,
    gateway: Arc<RecordingGateway>,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

fn start_rig() -> TestRig {
    let emitter = EventEmitter::new();
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(RecordingGateway::default());
    let shutdown = CancellationToken::new();

    let observer = Arc::new(NotificationObserver::new(
        Arc::clone(&store) as Arc<dyn ConnectionStore>,
        Arc::clone(&store) as Arc<dyn MediationStore>,
        Arc::clone(&gateway) as Arc<dyn PushGateway>,
    ));
    let task = observer.spawn(emitter.subscribe(), shutdown.clone());

    TestRig {
        emitter,
        store,
        gateway,
        shutdown,
        task,
    }
}

/// Emit and give the observer task a chance to drain the channel.
async fn emit_and_settle(rig: &TestRig, event: MessageProcessedEvent) {
    assert_eq!(rig.emitter.emit(event), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn registration_then_forward_delivers_push() {
    let rig = start_rig();

    rig.store
        .insert_connection(ConnectionRecord::new(ConnectionId::from("C1")).with_label("Alice"))
        .await;
    rig.store
        .insert_mediation(MediationRecord::new(
            RecipientKey::from("verkey-1"),
            ConnectionId::from("C1"),
        ))
        .await;

    // Device registers over the mediated connection...
    emit_and_settle(
        &rig,
        MessageProcessedEvent::with_connection(
            ProcessedMessage::apns_device_info(Some("abc")),
            ConnectionId::from("C1"),
        ),
    )
    .await;

    // ...and a forward for its recipient key triggers exactly one push.
    emit_and_settle(
        &rig,
        MessageProcessedEvent::new(ProcessedMessage::forward(&RecipientKey::from("verkey-1"))),
    )
    .await;

    let sent = rig.gateway.sent.lock().await;
    assert_eq!(sent.len(), 1);
    let (token, notification, platform) = &sent[0];
    assert_eq!(token, "abc");
    assert_eq!(notification.title, "New Message Notification");
    assert_eq!(notification.body, "You have a new message from Alice");
    assert_eq!(*platform, DevicePlatform::Ios);

    rig.shutdown.cancel();
    rig.task.await.unwrap();
}

#[tokio::test]
async fn unregistration_stops_deliveries() {
    let rig = start_rig();

    rig.store
        .insert_connection(ConnectionRecord::new(ConnectionId::from("C2")).with_label("Bob"))
        .await;
    rig.store
        .insert_mediation(MediationRecord::new(
            RecipientKey::from("verkey-2"),
            ConnectionId::from("C2"),
        ))
        .await;

    emit_and_settle(
        &rig,
        MessageProcessedEvent::with_connection(
            ProcessedMessage::fcm_device_info(Some("tok"), Some(DevicePlatform::Android)),
            ConnectionId::from("C2"),
        ),
    )
    .await;

    // Empty token unregisters the device.
    emit_and_settle(
        &rig,
        MessageProcessedEvent::with_connection(
            ProcessedMessage::fcm_device_info(Some(""), None),
            ConnectionId::from("C2"),
        ),
    )
    .await;

    emit_and_settle(
        &rig,
        MessageProcessedEvent::new(ProcessedMessage::forward(&RecipientKey::from("verkey-2"))),
    )
    .await;

    assert!(rig.gateway.sent.lock().await.is_empty());
    let conn = rig
        .store
        .find_by_id(&ConnectionId::from("C2"))
        .await
        .unwrap()
        .unwrap();
    assert!(conn.device_registration().is_none());

    rig.shutdown.cancel();
    rig.task.await.unwrap();
}

#[tokio::test]
async fn observer_survives_unrecognized_and_failing_events() {
    let rig = start_rig();

    // Unrecognized type: skipped before dispatch.
    emit_and_settle(
        &rig,
        MessageProcessedEvent::new(ProcessedMessage::new(
            "https://didcomm.org/basicmessage/1.0/message",
            serde_json::json!({"content": "hi"}),
        )),
    )
    .await;

    // Forward with no mediation record: handler errors, loop keeps running.
    emit_and_settle(
        &rig,
        MessageProcessedEvent::new(ProcessedMessage::forward(&RecipientKey::from("unknown"))),
    )
    .await;

    // Loop is still alive and processing.
    rig.store
        .insert_connection(ConnectionRecord::new(ConnectionId::from("C3")))
        .await;
    emit_and_settle(
        &rig,
        MessageProcessedEvent::with_connection(
            ProcessedMessage::apns_device_info(Some("tok-3")),
            ConnectionId::from("C3"),
        ),
    )
    .await;

    let conn = rig
        .store
        .find_by_id(&ConnectionId::from("C3"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conn.device_registration().unwrap().device_token, "tok-3");

    rig.shutdown.cancel();
    rig.task.await.unwrap();
}

#[tokio::test]
async fn cancellation_stops_the_observer_task() {
    let rig = start_rig();
    rig.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), rig.task)
        .await
        .expect("observer task should stop on cancellation")
        .unwrap();
}

#[tokio::test]
async fn dropping_the_emitter_stops_the_observer_task() {
    let rig = start_rig();
    drop(rig.emitter);
    tokio::time::timeout(Duration::from_secs(1), rig.task)
        .await
        .expect("observer task should stop when the event source closes")
        .unwrap();
}
