/*!
 * Lifecycle notifications around machine translation calls.
 *
 * Publishing is fire-and-forget: subscribers run synchronously, and a
 * subscriber that fails or panics is logged and skipped without affecting
 * the publisher or the other subscribers.
 */

use chrono::Utc;
use log::{debug, error, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use uuid::Uuid;

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MtEvent {
    /// About to contact providers on behalf of an organization
    #[serde(rename_all = "camelCase")]
    BeforeTranslation { organization_id: i64 },
    /// Providers answered; `actual_price` is the total cost of the call
    #[serde(rename_all = "camelCase")]
    AfterTranslation { organization_id: i64, actual_price: u64 },
}

impl MtEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            MtEvent::BeforeTranslation { .. } => "mt.before_translation",
            MtEvent::AfterTranslation { .. } => "mt.after_translation",
        }
    }

    pub fn organization_id(&self) -> i64 {
        match self {
            MtEvent::BeforeTranslation { organization_id } => *organization_id,
            MtEvent::AfterTranslation { organization_id, .. } => *organization_id,
        }
    }
}

/// A published event with its identity and time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: Uuid,
    pub timestamp_ms: i64,
    pub event: MtEvent,
}

impl LifecycleEvent {
    pub fn new(event: MtEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp_ms: Utc::now().timestamp_millis(),
            event,
        }
    }
}

/// Receives lifecycle events
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent) -> anyhow::Result<()>;
}

/// Outbound side used by the orchestrator
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: MtEvent);
}

/// In-process event bus with isolated subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: MtEvent) {
        let event = LifecycleEvent::new(event);
        debug!("Publishing {} ({})", event.event.topic(), event.id);

        // Snapshot so subscribers may subscribe others while being notified
        let subscribers: Vec<_> = self.subscribers.read().clone();
        for subscriber in subscribers {
            match catch_unwind(AssertUnwindSafe(|| subscriber.on_event(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Subscriber failed on {}: {:#}", event.event.topic(), e),
                Err(_) => error!("Subscriber panicked on {}", event.event.topic()),
            }
        }
    }
}

/// Publisher that drops every event
#[derive(Debug, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: MtEvent) {}
}

/// Subscriber tallying spent credits per organization
#[derive(Debug, Default)]
pub struct UsageRecorder {
    spent: Mutex<HashMap<i64, u64>>,
    calls: Mutex<HashMap<i64, u64>>,
}

impl UsageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits spent by the organization so far
    pub fn spent(&self, organization_id: i64) -> u64 {
        self.spent.lock().get(&organization_id).copied().unwrap_or(0)
    }

    /// Translation calls started by the organization so far
    pub fn calls(&self, organization_id: i64) -> u64 {
        self.calls.lock().get(&organization_id).copied().unwrap_or(0)
    }
}

impl EventSubscriber for UsageRecorder {
    fn on_event(&self, event: &LifecycleEvent) -> anyhow::Result<()> {
        match event.event {
            MtEvent::BeforeTranslation { organization_id } => {
                *self.calls.lock().entry(organization_id).or_insert(0) += 1;
            }
            MtEvent::AfterTranslation {
                organization_id,
                actual_price,
            } => {
                *self.spent.lock().entry(organization_id).or_insert(0) += actual_price;
            }
        }
        Ok(())
    }
}
