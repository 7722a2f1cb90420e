//! In-process event hub
//!
//! Delivers events synchronously on the publishing thread. Each subscription
//! has its own table of enabled sources and minimum levels, so two recorders
//! on the same hub can watch the same source at different levels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{RecorderError, Result};
use crate::event::{EventLevel, RawEvent};

use super::{EventListener, EventStream, SourceKey, SubscriptionId};

struct Subscription {
    listener: Arc<dyn EventListener>,
    sources: HashMap<SourceKey, EventLevel>,
}

impl Subscription {
    fn wants(&self, event: &RawEvent) -> bool {
        self.sources
            .get(&SourceKey::new(&event.source))
            .map(|threshold| event.level.admits(*threshold))
            .unwrap_or(false)
    }
}

/// In-process event stream
pub struct EventHub {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
    published: AtomicU64,
}

impl EventHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
        }
    }

    /// Producer handle for a named source
    pub fn source(self: &Arc<Self>, name: impl Into<String>) -> EventSource {
        EventSource {
            name: name.into(),
            hub: Arc::clone(self),
        }
    }

    /// Deliver an event to every subscription that enabled its source at a
    /// level admitting it. Returns the number of listeners reached.
    ///
    /// Listeners run after the subscription lock is released, so a listener
    /// may call back into the hub.
    pub fn publish(&self, event: &RawEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);

        let listeners: Vec<Arc<dyn EventListener>> = self
            .subscriptions
            .read()
            .values()
            .filter(|sub| sub.wants(event))
            .map(|sub| Arc::clone(&sub.listener))
            .collect();

        for listener in &listeners {
            listener.on_event(event);
        }

        listeners.len()
    }

    /// Whether any subscription would receive `source` events at `level`
    pub fn is_enabled(&self, source: &str, level: EventLevel) -> bool {
        let key = SourceKey::new(source);
        self.subscriptions.read().values().any(|sub| {
            sub.sources
                .get(&key)
                .map(|threshold| level.admits(*threshold))
                .unwrap_or(false)
        })
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Total events published, delivered or not
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStream for EventHub {
    fn subscribe(&self, listener: Arc<dyn EventListener>) -> Result<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().insert(
            id,
            Subscription {
                listener,
                sources: HashMap::new(),
            },
        );
        tracing::debug!(subscription = %id, "listener subscribed");
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscriptions.write().remove(&id).is_some();
        if removed {
            tracing::debug!(subscription = %id, "listener unsubscribed");
        }
        removed
    }

    fn enable_source(&self, id: SubscriptionId, source: &str, level: EventLevel) -> Result<()> {
        let mut subscriptions = self.subscriptions.write();
        let sub = subscriptions
            .get_mut(&id)
            .ok_or_else(|| RecorderError::Subscription {
                reason: format!("{} is not subscribed to this hub", id),
            })?;
        sub.sources.insert(SourceKey::new(source), level);
        Ok(())
    }

    fn disable_source(&self, id: SubscriptionId, source: &str) -> Result<bool> {
        let mut subscriptions = self.subscriptions.write();
        let sub = subscriptions
            .get_mut(&id)
            .ok_or_else(|| RecorderError::Subscription {
                reason: format!("{} is not subscribed to this hub", id),
            })?;
        Ok(sub.sources.remove(&SourceKey::new(source)).is_some())
    }

    fn name(&self) -> &'static str {
        "hub"
    }
}

/// Producer handle bound to one source name on a hub
#[derive(Clone)]
pub struct EventSource {
    name: String,
    hub: Arc<EventHub>,
}

impl EventSource {
    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether anybody listens at `level`; lets producers skip building payloads
    pub fn is_enabled(&self, level: EventLevel) -> bool {
        self.hub.is_enabled(&self.name, level)
    }

    /// Emit a message with positional payload values named `arg0`, `arg1`, ...
    pub fn write(&self, level: EventLevel, message: &str, payload: Vec<Value>) -> usize {
        let mut event = RawEvent::new(self.name.clone(), level).with_message(message);
        for (index, value) in payload.into_iter().enumerate() {
            event = event.with_payload(format!("arg{}", index), value);
        }
        self.hub.publish(&event)
    }

    /// Emit a fully built event; its source name is overwritten with this source's
    pub fn write_event(&self, mut event: RawEvent) -> usize {
        event.source = self.name.clone();
        self.hub.publish(&event)
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource").field("name", &self.name).finish()
    }
}
