//! Raw trace events as delivered by an event stream
//!
//! A `RawEvent` is what a producer emits and what every listener sees. The
//! recorder never stores raw events directly; each registered source turns
//! them into the caller's own representation through a transform.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Event severity
///
/// Ordered from most to least severe. A listener enabled at a given level
/// receives that level and every more severe one; `LogAlways` events are
/// delivered regardless of the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    LogAlways = 0,
    Critical = 1,
    Error = 2,
    Warning = 3,
    #[default]
    Informational = 4,
    Verbose = 5,
}

impl EventLevel {
    /// Does a listener enabled at `threshold` receive events of this level?
    ///
    /// A `LogAlways` threshold admits everything.
    pub fn admits(self, threshold: EventLevel) -> bool {
        threshold == EventLevel::LogAlways || self <= threshold
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventLevel::LogAlways => "LogAlways",
            EventLevel::Critical => "Critical",
            EventLevel::Error => "Error",
            EventLevel::Warning => "Warning",
            EventLevel::Informational => "Informational",
            EventLevel::Verbose => "Verbose",
        };
        write!(f, "{}", s)
    }
}

/// Operation tag attached to an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOpcode {
    #[default]
    Info,
    Start,
    Stop,
    DataCollectionStart,
    DataCollectionStop,
    Extension,
    Reply,
    Resume,
    Suspend,
    Send,
    Receive,
    /// Producer-defined opcode
    Custom(u8),
}

impl fmt::Display for EventOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventOpcode::Info => write!(f, "Info"),
            EventOpcode::Start => write!(f, "Start"),
            EventOpcode::Stop => write!(f, "Stop"),
            EventOpcode::DataCollectionStart => write!(f, "DataCollectionStart"),
            EventOpcode::DataCollectionStop => write!(f, "DataCollectionStop"),
            EventOpcode::Extension => write!(f, "Extension"),
            EventOpcode::Reply => write!(f, "Reply"),
            EventOpcode::Resume => write!(f, "Resume"),
            EventOpcode::Suspend => write!(f, "Suspend"),
            EventOpcode::Send => write!(f, "Send"),
            EventOpcode::Receive => write!(f, "Receive"),
            EventOpcode::Custom(code) => write!(f, "{}", code),
        }
    }
}

/// A named payload value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadField {
    pub name: String,
    pub value: Value,
}

/// Structured diagnostic event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Name of the emitting source
    pub source: String,

    /// Producer-assigned event id
    pub event_id: u32,

    /// Producer-assigned event name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,

    /// Severity
    pub level: EventLevel,

    /// Operation tag
    pub opcode: EventOpcode,

    /// Keyword bitmask
    pub keywords: u64,

    /// Message template with `{0}`, `{1}`, ... placeholders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Ordered payload values
    pub payload: Vec<PayloadField>,

    /// When the event was emitted
    pub timestamp: DateTime<Utc>,

    /// Activity the event belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<Uuid>,
}

impl RawEvent {
    /// Create a new event stamped with the current time
    pub fn new(source: impl Into<String>, level: EventLevel) -> Self {
        Self {
            source: source.into(),
            event_id: 0,
            event_name: None,
            level,
            opcode: EventOpcode::Info,
            keywords: 0,
            message: None,
            payload: Vec::new(),
            timestamp: Utc::now(),
            activity_id: None,
        }
    }

    /// Set the message template
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Append a named payload value
    pub fn with_payload(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.push(PayloadField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Set the event id and name
    pub fn with_event(mut self, event_id: u32, event_name: impl Into<String>) -> Self {
        self.event_id = event_id;
        self.event_name = Some(event_name.into());
        self
    }

    /// Set the opcode
    pub fn with_opcode(mut self, opcode: EventOpcode) -> Self {
        self.opcode = opcode;
        self
    }

    /// Set the keyword bitmask
    pub fn with_keywords(mut self, keywords: u64) -> Self {
        self.keywords = keywords;
        self
    }

    /// Attach the event to an activity
    pub fn with_activity(mut self, activity_id: Uuid) -> Self {
        self.activity_id = Some(activity_id);
        self
    }

    /// Override the timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Payload value at `index`
    pub fn payload_value(&self, index: usize) -> Option<&Value> {
        self.payload.get(index).map(|field| &field.value)
    }

    /// Payload value by name
    pub fn payload_named(&self, name: &str) -> Option<&Value> {
        self.payload
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    /// Event name, or the numeric id when the producer gave none
    pub fn display_name(&self) -> String {
        match &self.event_name {
            Some(name) => name.clone(),
            None => self.event_id.to_string(),
        }
    }
}
