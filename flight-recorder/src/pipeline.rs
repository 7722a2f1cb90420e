//! Capture pipeline
//!
//! Decides per event whether it is recorded and turns accepted events into
//! the caller's representation:
//!
//! ```text
//! on_event(raw)
//!   │
//!   ├─ source registered? ── no ──► ignore (unregistered)
//!   ├─ filter accepts?     ── no ──► ignore (filtered)
//!   ├─ transform ok?       ── no ──► FailurePolicy (drop or substitute)
//!   └─ RingBuffer::put(item)
//! ```
//!
//! Severity filtering is not done here. The minimum level in the settings is
//! forwarded to the event stream, which only delivers admitted events.
//!
//! Transform and filter failures, including panics, stay inside `on_event`.
//! The delivering thread belongs to the producer and never sees them.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::buffer::RingBuffer;
use crate::error::{BoxError, CaptureFailure, RecorderError, Result};
use crate::event::{EventLevel, RawEvent};
use crate::stream::{EventListener, SourceKey};

/// Fallible transform from a raw event to the recorded form
pub type Transform<T> = Arc<dyn Fn(&RawEvent) -> std::result::Result<T, BoxError> + Send + Sync>;

/// Predicate deciding whether an event is recorded
pub type Filter = Arc<dyn Fn(&RawEvent) -> bool + Send + Sync>;

/// Builds a replacement item for an event whose transform failed
pub type Substitute<T> = Arc<dyn Fn(&RawEvent, &CaptureFailure) -> T + Send + Sync>;

/// What to do with an accepted event whose transform failed
pub enum FailurePolicy<T> {
    /// Skip the event
    Drop,
    /// Record the item built by the callback instead
    Substitute(Substitute<T>),
}

impl<T> Default for FailurePolicy<T> {
    fn default() -> Self {
        FailurePolicy::Drop
    }
}

impl<T> Clone for FailurePolicy<T> {
    fn clone(&self) -> Self {
        match self {
            FailurePolicy::Drop => FailurePolicy::Drop,
            FailurePolicy::Substitute(f) => FailurePolicy::Substitute(Arc::clone(f)),
        }
    }
}

impl<T> std::fmt::Debug for FailurePolicy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Drop => write!(f, "Drop"),
            FailurePolicy::Substitute(_) => write!(f, "Substitute(<callback>)"),
        }
    }
}

/// Recording settings for one source
///
/// Determines what events to record and how to capture them.
pub struct RecordingSettings<T> {
    level: EventLevel,
    filter: Option<Filter>,
    transform: Transform<T>,
    on_failure: FailurePolicy<T>,
}

impl<T> RecordingSettings<T> {
    /// Settings with an infallible transform
    ///
    /// A panic inside `transform` is still contained and handled by the
    /// failure policy.
    pub fn new<F>(level: EventLevel, transform: F) -> Self
    where
        F: Fn(&RawEvent) -> T + Send + Sync + 'static,
    {
        Self {
            level,
            filter: None,
            transform: Arc::new(move |event| Ok(transform(event))),
            on_failure: FailurePolicy::Drop,
        }
    }

    /// Settings with a transform that may reject an event
    pub fn try_new<F, E>(level: EventLevel, transform: F) -> Self
    where
        F: Fn(&RawEvent) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            level,
            filter: None,
            transform: Arc::new(move |event| transform(event).map_err(Into::into)),
            on_failure: FailurePolicy::Drop,
        }
    }

    /// Only record events the predicate accepts
    pub fn with_filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&RawEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(predicate));
        self
    }

    /// Set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy<T>) -> Self {
        self.on_failure = policy;
        self
    }

    /// Record `substitute(event, failure)` when the transform fails
    pub fn substitute_on_failure<S>(self, substitute: S) -> Self
    where
        S: Fn(&RawEvent, &CaptureFailure) -> T + Send + Sync + 'static,
    {
        self.with_failure_policy(FailurePolicy::Substitute(Arc::new(substitute)))
    }

    /// Minimum level to record
    pub fn level(&self) -> EventLevel {
        self.level
    }

    /// Whether a filter predicate is set
    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Failure policy
    pub fn failure_policy(&self) -> &FailurePolicy<T> {
        &self.on_failure
    }

    /// Does the filter accept the event? No filter accepts everything.
    pub fn accepts(&self, event: &RawEvent) -> std::result::Result<bool, CaptureFailure> {
        match &self.filter {
            None => Ok(true),
            Some(filter) => panic::catch_unwind(AssertUnwindSafe(|| filter(event)))
                .map_err(CaptureFailure::from_panic),
        }
    }

    /// Run the transform, containing errors and panics
    pub fn capture(&self, event: &RawEvent) -> std::result::Result<T, CaptureFailure> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.transform)(event))) {
            Ok(Ok(item)) => Ok(item),
            Ok(Err(err)) => Err(CaptureFailure::Error(err.to_string())),
            Err(payload) => Err(CaptureFailure::from_panic(payload)),
        }
    }
}

impl<T> Clone for RecordingSettings<T> {
    fn clone(&self) -> Self {
        Self {
            level: self.level,
            filter: self.filter.clone(),
            transform: Arc::clone(&self.transform),
            on_failure: self.on_failure.clone(),
        }
    }
}

impl<T> std::fmt::Debug for RecordingSettings<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSettings")
            .field("level", &self.level)
            .field("filter", &self.filter.as_ref().map(|_| "<predicate>"))
            .field("transform", &"<transform>")
            .field("on_failure", &self.on_failure)
            .finish()
    }
}

/// Settings stored for one source
pub(crate) struct Registration<T> {
    /// Name as most recently registered, for logs and `registered_sources`
    source: String,
    settings: Arc<RecordingSettings<T>>,
}

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    unregistered: AtomicU64,
    filtered: AtomicU64,
    captured: AtomicU64,
    failed: AtomicU64,
    substituted: AtomicU64,
}

/// Capture counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStats {
    /// Events delivered to the pipeline
    pub received: u64,
    /// Events from sources without a registration
    pub unregistered: u64,
    /// Events rejected by a filter
    pub filtered: u64,
    /// Events transformed and stored
    pub captured: u64,
    /// Events whose filter or transform failed
    pub failed: u64,
    /// Failed events replaced by a substitute item
    pub substituted: u64,
}

/// Per-source registration table feeding a ring buffer
pub struct CapturePipeline<T> {
    registrations: RwLock<HashMap<SourceKey, Registration<T>>>,
    buffer: Arc<RingBuffer<T>>,
    counters: Counters,
}

impl<T> CapturePipeline<T> {
    /// Create a pipeline writing into `buffer`
    pub fn new(buffer: Arc<RingBuffer<T>>) -> Self {
        Self {
            registrations: RwLock::new(HashMap::new()),
            buffer,
            counters: Counters::default(),
        }
    }

    /// Register (or replace) the settings for a source
    pub fn register(&self, source: &str, settings: RecordingSettings<T>) -> Result<()> {
        self.replace(source, settings).map(|_| ())
    }

    /// Register the settings for a source, returning the registration it replaced
    pub(crate) fn replace(
        &self,
        source: &str,
        settings: RecordingSettings<T>,
    ) -> Result<Option<Registration<T>>> {
        if source.trim().is_empty() {
            return Err(RecorderError::invalid_argument("source name must not be empty"));
        }

        let level = settings.level();
        let previous = self.registrations.write().insert(
            SourceKey::new(source),
            Registration {
                source: source.to_string(),
                settings: Arc::new(settings),
            },
        );

        tracing::debug!(source, %level, replaced = previous.is_some(), "source registered");
        Ok(previous)
    }

    /// Put back the registration `replace` displaced, or remove the source if there was none
    pub(crate) fn restore(&self, source: &str, previous: Option<Registration<T>>) {
        let key = SourceKey::new(source);
        let mut registrations = self.registrations.write();
        match previous {
            Some(registration) => {
                registrations.insert(key, registration);
            }
            None => {
                registrations.remove(&key);
            }
        }
        tracing::debug!(source, "source registration rolled back");
    }

    /// Whether `source` has settings (case-insensitive)
    pub fn is_registered(&self, source: &str) -> bool {
        self.registrations.read().contains_key(&SourceKey::new(source))
    }

    /// Minimum level registered for `source`
    pub fn registered_level(&self, source: &str) -> Option<EventLevel> {
        self.registrations
            .read()
            .get(&SourceKey::new(source))
            .map(|reg| reg.settings.level())
    }

    /// Names of all registered sources
    pub fn registered_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self
            .registrations
            .read()
            .values()
            .map(|reg| reg.source.clone())
            .collect();
        sources.sort();
        sources
    }

    /// Drop every registration
    pub(crate) fn clear(&self) {
        self.registrations.write().clear();
    }

    /// The buffer this pipeline writes into
    pub fn buffer(&self) -> &Arc<RingBuffer<T>> {
        &self.buffer
    }

    /// Capture counters
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            received: self.counters.received.load(Ordering::Relaxed),
            unregistered: self.counters.unregistered.load(Ordering::Relaxed),
            filtered: self.counters.filtered.load(Ordering::Relaxed),
            captured: self.counters.captured.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            substituted: self.counters.substituted.load(Ordering::Relaxed),
        }
    }

    /// Run one event through lookup, filter and transform
    pub fn process(&self, event: &RawEvent) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        // The read guard is released before user code runs.
        let settings = self
            .registrations
            .read()
            .get(&SourceKey::new(&event.source))
            .map(|reg| Arc::clone(&reg.settings));

        let Some(settings) = settings else {
            self.counters.unregistered.fetch_add(1, Ordering::Relaxed);
            return;
        };

        match settings.accepts(event) {
            Ok(true) => {}
            Ok(false) => {
                self.counters.filtered.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(failure) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(source = %event.source, %failure, "event filter failed, event dropped");
                return;
            }
        }

        match settings.capture(event) {
            Ok(item) => {
                self.buffer.put(item);
                self.counters.captured.fetch_add(1, Ordering::Relaxed);
            }
            Err(failure) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.handle_failure(&settings, event, failure);
            }
        }
    }

    fn handle_failure(&self, settings: &RecordingSettings<T>, event: &RawEvent, failure: CaptureFailure) {
        match settings.failure_policy() {
            FailurePolicy::Drop => {
                tracing::warn!(source = %event.source, %failure, "event dropped");
            }
            FailurePolicy::Substitute(substitute) => {
                match panic::catch_unwind(AssertUnwindSafe(|| substitute(event, &failure))) {
                    Ok(item) => {
                        self.buffer.put(item);
                        self.counters.substituted.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(source = %event.source, %failure, "event substituted");
                    }
                    Err(payload) => {
                        let substitute_failure = CaptureFailure::from_panic(payload);
                        tracing::warn!(
                            source = %event.source,
                            %failure,
                            substitute = %substitute_failure,
                            "substitute failed, event dropped"
                        );
                    }
                }
            }
        }
    }
}

impl<T: Send + 'static> EventListener for CapturePipeline<T> {
    fn on_event(&self, event: &RawEvent) {
        self.process(event);
    }
}

impl<T> std::fmt::Debug for CapturePipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("sources", &self.registered_sources())
            .field("buffer", &self.buffer)
            .field("stats", &self.stats())
            .finish()
    }
}
