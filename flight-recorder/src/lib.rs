//! Flight Recorder - the last N trace events, in memory
//!
//! A flight recorder watches a live stream of structured trace events,
//! captures a transformed representation of each accepted event and keeps
//! only the most recent N of them. When something goes wrong, a snapshot
//! shows the events leading up to it, oldest first.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐ raw event ┌────────────────────────────────────┐
//! │ EventStream│──────────►│ CapturePipeline                    │
//! │ (hub/mock) │           │  lookup ─► filter ─► transform     │
//! └────────────┘           └─────────────────┬──────────────────┘
//!       ▲                                    │ put
//!       │ subscribe / enable_source          ▼
//! ┌─────┴──────────────┐         ┌───────────────────────┐
//! │ FlightRecorder     │────────►│ RingBuffer (N slots)  │
//! │ enable / snapshot  │snapshot │ overwrite-on-full     │
//! └────────────────────┘         └───────────────────────┘
//! ```
//!
//! - **buffer**: fixed-capacity ring buffer with ordered snapshots
//! - **pipeline**: per-source settings, filtering, transform, failure policy
//! - **recorder**: the façade owning buffer, pipeline and subscription
//! - **stream**: the event stream seam plus an in-process hub and a mock
//! - **format**: message template formatting
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use flight_recorder::{EventHub, EventLevel, FlightRecorder, RecordingSettings};
//!
//! let hub = Arc::new(EventHub::new());
//! let recorder = FlightRecorder::new(100, hub.clone()).unwrap();
//!
//! recorder
//!     .enable_with(
//!         "Payments",
//!         RecordingSettings::new(EventLevel::Warning, |e| e.level)
//!             .with_filter(|e| e.keywords & 0x1 != 0),
//!     )
//!     .unwrap();
//!
//! hub.source("Payments").write_event(
//!     flight_recorder::RawEvent::new("Payments", EventLevel::Error).with_keywords(0x1),
//! );
//!
//! assert_eq!(recorder.snapshot(), vec![EventLevel::Error]);
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod pipeline;
pub mod recorder;
pub mod stream;

pub use buffer::{BufferStats, RingBuffer};
pub use config::{RecorderConfig, SourceConfig};
pub use error::{BoxError, CaptureFailure, ErrorCategory, RecorderError, Result};
pub use event::{EventLevel, EventOpcode, PayloadField, RawEvent};
pub use format::{format_message, format_message_with, FormatCulture, MISSING_VALUE};
pub use pipeline::{CapturePipeline, CaptureStats, FailurePolicy, RecordingSettings};
pub use recorder::{FlightRecorder, RecorderStats};
pub use stream::{EventHub, EventListener, EventSource, EventStream, MockEventStream, SourceKey, SubscriptionId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
