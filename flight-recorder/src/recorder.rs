//! Flight recorder façade
//!
//! Owns one ring buffer and one capture pipeline, subscribes the pipeline to
//! an event stream, and exposes registration and snapshot operations.
//!
//! ```rust
//! use std::sync::Arc;
//! use flight_recorder::{format_message, EventHub, EventLevel, FlightRecorder};
//!
//! let hub = Arc::new(EventHub::new());
//! let recorder = FlightRecorder::new(2, hub.clone()).unwrap();
//! recorder.enable("Echo", EventLevel::Informational, format_message).unwrap();
//!
//! let echo = hub.source("Echo");
//! for i in 0..3 {
//!     echo.write(EventLevel::Informational, "Testing {0}", vec![i.into()]);
//! }
//!
//! assert_eq!(recorder.snapshot(), vec!["Testing 1", "Testing 2"]);
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::buffer::{BufferStats, RingBuffer};
use crate::config::RecorderConfig;
use crate::error::{BoxError, RecorderError, Result};
use crate::event::{EventLevel, RawEvent};
use crate::pipeline::{CapturePipeline, CaptureStats, RecordingSettings};
use crate::stream::{EventStream, SubscriptionId};

/// Records events from selected sources into a bounded in-memory buffer.
///
/// Useful for inspecting the last events before an error occurred.
pub struct FlightRecorder<T> {
    pipeline: Arc<CapturePipeline<T>>,
    /// `None` once disposed
    stream: RwLock<Option<Arc<dyn EventStream>>>,
    subscription: SubscriptionId,
}

impl<T: Send + 'static> FlightRecorder<T> {
    /// Create a recorder retaining `capacity` events and subscribe it to `stream`
    pub fn new(capacity: usize, stream: Arc<dyn EventStream>) -> Result<Self> {
        let buffer = Arc::new(RingBuffer::new(capacity)?);
        let pipeline = Arc::new(CapturePipeline::new(buffer));

        let subscription = stream.subscribe(pipeline.clone())?;
        tracing::debug!(capacity, stream = stream.name(), %subscription, "flight recorder created");

        Ok(Self {
            pipeline,
            stream: RwLock::new(Some(stream)),
            subscription,
        })
    }

    /// Create a recorder from config, enabling every configured source with `transform`
    pub fn from_config<F>(config: &RecorderConfig, stream: Arc<dyn EventStream>, transform: F) -> Result<Self>
    where
        F: Fn(&RawEvent) -> T + Send + Sync + 'static,
    {
        config.validate()?;

        let recorder = Self::new(config.capacity, stream)?;
        let transform = Arc::new(transform);
        for source in &config.sources {
            let transform = Arc::clone(&transform);
            recorder.enable(&source.name, source.level, move |event| transform(event))?;
        }

        Ok(recorder)
    }

    /// Enable recording for a source
    pub fn enable<F>(&self, source: &str, level: EventLevel, transform: F) -> Result<()>
    where
        F: Fn(&RawEvent) -> T + Send + Sync + 'static,
    {
        self.enable_with(source, RecordingSettings::new(level, transform))
    }

    /// Enable recording for a source with a transform that may reject events
    pub fn try_enable<F, E>(&self, source: &str, level: EventLevel, transform: F) -> Result<()>
    where
        F: Fn(&RawEvent) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.enable_with(source, RecordingSettings::try_new(level, transform))
    }

    /// Enable recording for a source with full settings
    ///
    /// Replaces earlier settings for the same source (case-insensitive) and
    /// asks the stream to deliver events at the settings' level. If the
    /// stream refuses, the earlier settings are put back.
    pub fn enable_with(&self, source: &str, settings: RecordingSettings<T>) -> Result<()> {
        let guard = self.stream.read();
        let stream = guard.as_ref().ok_or(RecorderError::Disposed)?;

        let level = settings.level();
        let previous = self.pipeline.replace(source, settings)?;
        if let Err(err) = stream.enable_source(self.subscription, source, level) {
            self.pipeline.restore(source, previous);
            tracing::warn!(source, error = %err, "stream refused source, registration rolled back");
            return Err(err);
        }
        Ok(())
    }
}

impl<T> FlightRecorder<T> {
    /// Number of captured events currently retained
    pub fn len(&self) -> usize {
        self.pipeline.buffer().len()
    }

    /// Whether nothing was captured yet
    pub fn is_empty(&self) -> bool {
        self.pipeline.buffer().is_empty()
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.pipeline.buffer().capacity()
    }

    /// Registered source names
    pub fn sources(&self) -> Vec<String> {
        self.pipeline.registered_sources()
    }

    /// Subscription held on the event stream
    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Buffer and capture statistics
    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            buffer: self.pipeline.buffer().stats(),
            capture: self.pipeline.stats(),
            disposed: self.is_disposed(),
        }
    }

    /// Whether `dispose` has run
    pub fn is_disposed(&self) -> bool {
        self.stream.read().is_none()
    }

    /// Unsubscribe from the stream, then release it. Idempotent.
    ///
    /// Captured events stay available through `snapshot`.
    pub fn dispose(&self) {
        let Some(stream) = self.stream.write().take() else {
            return;
        };

        stream.unsubscribe(self.subscription);
        self.pipeline.clear();
        tracing::debug!(subscription = %self.subscription, "flight recorder disposed");
    }
}

impl<T: Clone> FlightRecorder<T> {
    /// Retained events, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.pipeline.buffer().snapshot()
    }
}

impl<T> Drop for FlightRecorder<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> std::fmt::Debug for FlightRecorder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightRecorder")
            .field("subscription", &self.subscription)
            .field("pipeline", &self.pipeline)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Combined recorder statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecorderStats {
    pub buffer: BufferStats,
    pub capture: CaptureStats,
    pub disposed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MockEventStream;

    fn message_of(event: &RawEvent) -> String {
        event.message.clone().unwrap_or_default()
    }

    fn emit(stream: &MockEventStream, source: &str, message: &str) {
        stream.deliver(&RawEvent::new(source, EventLevel::Informational).with_message(message));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let stream = Arc::new(MockEventStream::new());
        let result = FlightRecorder::<String>::new(0, stream.clone());
        assert!(matches!(result, Err(RecorderError::InvalidCapacity)));
        assert_eq!(stream.subscription_count(), 0);
    }

    #[test]
    fn test_new_subscribes() {
        let stream = Arc::new(MockEventStream::new());
        let recorder = FlightRecorder::<String>::new(4, stream.clone()).unwrap();
        assert!(stream.is_subscribed(recorder.subscription()));
        assert_eq!(recorder.capacity(), 4);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_subscription_failure_surfaces() {
        let stream = Arc::new(MockEventStream::new());
        stream.refuse_subscriptions(true);
        let result = FlightRecorder::<String>::new(4, stream);
        assert!(matches!(result, Err(RecorderError::Subscription { .. })));
    }

    #[test]
    fn test_enable_forwards_level() {
        let stream = Arc::new(MockEventStream::new());
        let recorder = FlightRecorder::new(4, stream.clone()).unwrap();

        recorder.enable("Echo", EventLevel::Warning, message_of).unwrap();

        let calls = stream.enable_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].subscription, recorder.subscription());
        assert_eq!(calls[0].source, "Echo");
        assert_eq!(calls[0].level, EventLevel::Warning);
    }

    #[test]
    fn test_enable_rejects_blank_source() {
        let stream = Arc::new(MockEventStream::new());
        let recorder = FlightRecorder::new(4, stream.clone()).unwrap();

        let result = recorder.enable("", EventLevel::Warning, message_of);
        assert!(matches!(result, Err(RecorderError::InvalidArgument { .. })));
        assert!(stream.enable_calls().is_empty());
    }

    #[test]
    fn test_refused_enable_leaves_no_registration() {
        let stream = Arc::new(MockEventStream::new());
        let recorder = FlightRecorder::new(4, stream.clone()).unwrap();
        stream.refuse_enables(true);

        let result = recorder.enable("Echo", EventLevel::Verbose, message_of);

        assert!(matches!(result, Err(RecorderError::Subscription { .. })));
        assert!(recorder.sources().is_empty());
        emit(&stream, "Echo", "unwanted");
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_refused_reenable_keeps_previous_settings() {
        let stream = Arc::new(MockEventStream::new());
        let recorder = FlightRecorder::new(4, stream.clone()).unwrap();
        recorder
            .enable("Echo", EventLevel::Warning, |_: &RawEvent| "original".to_string())
            .unwrap();

        stream.refuse_enables(true);
        let result = recorder.enable("ECHO", EventLevel::Verbose, |_: &RawEvent| "replacement".to_string());
        assert!(result.is_err());

        emit(&stream, "Echo", "x");
        assert_eq!(recorder.snapshot(), vec!["original"]);
        assert_eq!(recorder.sources(), vec!["Echo"]);
        assert_eq!(stream.enabled_level("echo"), Some(EventLevel::Warning));
    }

    #[test]
    fn test_snapshot_through_stream() {
        let stream = Arc::new(MockEventStream::new());
        let recorder = FlightRecorder::new(3, stream.clone()).unwrap();
        recorder.enable("Echo", EventLevel::Verbose, message_of).unwrap();

        for m in ["A", "B", "C", "D", "E"] {
            emit(&stream, "Echo", m);
        }
        emit(&stream, "Other", "ignored");

        assert_eq!(recorder.snapshot(), vec!["C", "D", "E"]);
        let stats = recorder.stats();
        assert_eq!(stats.capture.captured, 5);
        assert_eq!(stats.capture.unregistered, 1);
        assert_eq!(stats.buffer.overwritten, 2);
    }

    #[test]
    fn test_dispose_unsubscribes_and_rejects_enable() {
        let stream = Arc::new(MockEventStream::new());
        let recorder = FlightRecorder::new(3, stream.clone()).unwrap();
        recorder.enable("Echo", EventLevel::Verbose, message_of).unwrap();
        emit(&stream, "Echo", "before");

        recorder.dispose();
        recorder.dispose();

        assert!(recorder.is_disposed());
        assert!(!stream.is_subscribed(recorder.subscription()));
        emit(&stream, "Echo", "after");

        assert_eq!(recorder.snapshot(), vec!["before"]);
        assert!(recorder.sources().is_empty());
        let result = recorder.enable("Echo", EventLevel::Verbose, message_of);
        assert!(matches!(result, Err(RecorderError::Disposed)));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let stream = Arc::new(MockEventStream::new());
        {
            let _recorder = FlightRecorder::<String>::new(3, stream.clone()).unwrap();
            assert_eq!(stream.subscription_count(), 1);
        }
        assert_eq!(stream.subscription_count(), 0);
    }

    #[test]
    fn test_from_config_enables_sources() {
        let stream = Arc::new(MockEventStream::new());
        let config = RecorderConfig::with_capacity(8)
            .with_source("Echo", EventLevel::Warning)
            .with_source("Db", EventLevel::Verbose);

        let recorder = FlightRecorder::from_config(&config, stream.clone(), message_of).unwrap();

        assert_eq!(recorder.capacity(), 8);
        assert_eq!(recorder.sources(), vec!["Db", "Echo"]);
        assert_eq!(stream.enabled_level("echo"), Some(EventLevel::Warning));
        assert_eq!(stream.enabled_level("db"), Some(EventLevel::Verbose));
    }
}
