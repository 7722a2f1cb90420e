//! Event stream abstraction
//!
//! The recorder does not produce events and does not filter them by
//! severity. It subscribes a listener to an [`EventStream`] and asks the
//! stream to deliver events from chosen sources at or above a minimum level.
//!
//! ```text
//! ┌──────────────┐  write()   ┌─────────────────────┐  on_event()  ┌──────────────┐
//! │ EventSource  │──────────► │ EventStream (trait) │────────────► │ EventListener│
//! │ (producer)   │            ├──────────┬──────────┤              │ (pipeline)   │
//! └──────────────┘            │ EventHub │ Mock     │              └──────────────┘
//!                             └──────────┴──────────┘
//! ```
//!
//! - `EventHub`: in-process dispatcher with per-subscription level filtering
//! - `MockEventStream`: records enable calls and delivers events verbatim

mod hub;
mod mock;

pub use hub::{EventHub, EventSource};
pub use mock::{EnableCall, MockEventStream};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::{EventLevel, RawEvent};

/// Handle identifying one subscription on a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receives events delivered by a stream
///
/// Called on the producer's thread. Implementations must not block and
/// must not panic back into the producer.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &RawEvent);
}

/// Source of raw events a recorder can subscribe to
pub trait EventStream: Send + Sync {
    /// Register a listener; it receives nothing until sources are enabled
    fn subscribe(&self, listener: Arc<dyn EventListener>) -> Result<SubscriptionId>;

    /// Remove a listener. Returns false if it was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Deliver events from `source` at `level` or more severe to the subscription
    fn enable_source(&self, id: SubscriptionId, source: &str, level: EventLevel) -> Result<()>;

    /// Stop delivering events from `source`. Returns false if it was not enabled.
    fn disable_source(&self, id: SubscriptionId, source: &str) -> Result<bool>;

    /// Name of this stream implementation
    fn name(&self) -> &'static str;
}

/// Case-insensitive source identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey(String);

impl SourceKey {
    pub fn new(name: &str) -> Self {
        SourceKey(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceKey {
    fn from(name: &str) -> Self {
        SourceKey::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key_ignores_case() {
        assert_eq!(SourceKey::new("My-Source"), SourceKey::new("my-source"));
        assert_eq!(SourceKey::from("ECHO").as_str(), "echo");
        assert_ne!(SourceKey::new("echo"), SourceKey::new("echo2"));
    }

    #[test]
    fn test_subscription_id_display() {
        assert_eq!(SubscriptionId(7).to_string(), "sub-7");
    }
}
