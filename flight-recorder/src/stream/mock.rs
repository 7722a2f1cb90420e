//! Mock event stream for testing
//!
//! Records every enable request and delivers pushed events to all
//! subscribers without any level filtering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{RecorderError, Result};
use crate::event::{EventLevel, RawEvent};

use super::{EventListener, EventStream, SourceKey, SubscriptionId};

/// Recorded `enable_source` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableCall {
    pub subscription: SubscriptionId,
    pub source: String,
    pub level: EventLevel,
}

/// Mock stream that records calls and forwards pushed events verbatim
pub struct MockEventStream {
    listeners: RwLock<HashMap<SubscriptionId, Arc<dyn EventListener>>>,
    enable_calls: RwLock<Vec<EnableCall>>,
    next_id: AtomicU64,
    refuse_subscriptions: AtomicBool,
    refuse_enables: AtomicBool,
}

impl MockEventStream {
    /// Create a new mock stream
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            enable_calls: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            refuse_subscriptions: AtomicBool::new(false),
            refuse_enables: AtomicBool::new(false),
        }
    }

    /// Make subsequent `subscribe` calls fail
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.refuse_subscriptions.store(refuse, Ordering::SeqCst);
    }

    /// Make subsequent `enable_source` calls fail without recording them
    pub fn refuse_enables(&self, refuse: bool) {
        self.refuse_enables.store(refuse, Ordering::SeqCst);
    }

    /// Push an event to every subscriber. Returns the number reached.
    pub fn deliver(&self, event: &RawEvent) -> usize {
        let listeners: Vec<Arc<dyn EventListener>> =
            self.listeners.read().values().cloned().collect();
        for listener in &listeners {
            listener.on_event(event);
        }
        listeners.len()
    }

    /// All recorded enable calls, in order
    pub fn enable_calls(&self) -> Vec<EnableCall> {
        self.enable_calls.read().clone()
    }

    /// Level most recently requested for `source` (case-insensitive)
    pub fn enabled_level(&self, source: &str) -> Option<EventLevel> {
        let key = SourceKey::new(source);
        self.enable_calls
            .read()
            .iter()
            .rev()
            .find(|call| SourceKey::new(&call.source) == key)
            .map(|call| call.level)
    }

    /// Whether `id` is currently subscribed
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.listeners.read().contains_key(&id)
    }

    /// Count of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Default for MockEventStream {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStream for MockEventStream {
    fn subscribe(&self, listener: Arc<dyn EventListener>) -> Result<SubscriptionId> {
        if self.refuse_subscriptions.load(Ordering::SeqCst) {
            return Err(RecorderError::Subscription {
                reason: "mock stream refuses subscriptions".to_string(),
            });
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(id, listener);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    fn enable_source(&self, id: SubscriptionId, source: &str, level: EventLevel) -> Result<()> {
        if self.refuse_enables.load(Ordering::SeqCst) {
            return Err(RecorderError::Subscription {
                reason: format!("mock stream refuses to enable {}", source),
            });
        }
        self.enable_calls.write().push(EnableCall {
            subscription: id,
            source: source.to_string(),
            level,
        });
        Ok(())
    }

    fn disable_source(&self, _id: SubscriptionId, source: &str) -> Result<bool> {
        let key = SourceKey::new(source);
        let mut calls = self.enable_calls.write();
        let before = calls.len();
        calls.retain(|call| SourceKey::new(&call.source) != key);
        Ok(calls.len() != before)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
