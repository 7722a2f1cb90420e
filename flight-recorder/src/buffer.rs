//! Fixed-capacity overwrite-on-full ring buffer
//!
//! Holds the most recent `capacity` captured items. Every put lands one slot
//! past the previous one, wrapping at `capacity`, so once the buffer is full
//! each put overwrites the oldest retained item.
//!
//! ```text
//! capacity = 3, puts A B C D E
//!
//!  slot:   0   1   2
//!        ┌───┬───┬───┐
//!        │ D │ E │ C │    written = 5, next slot = 5 % 3 = 2
//!        └───┴───┴───┘
//!                  ▲ oldest
//!
//! snapshot() = [C, D, E]
//! ```
//!
//! A single mutex spans the counter read, the slot store and the counter
//! increment, and `snapshot()` copies out under the same mutex, so readers
//! always see one consistent instant.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};

struct Slots<T> {
    items: Box<[Option<T>]>,
    /// Total puts ever performed
    written: u64,
}

impl<T> Slots<T> {
    fn capacity(&self) -> usize {
        self.items.len()
    }

    fn next_index(&self) -> usize {
        (self.written % self.capacity() as u64) as usize
    }

    fn len(&self) -> usize {
        self.written.min(self.capacity() as u64) as usize
    }
}

/// Thread-safe circular store of captured items
pub struct RingBuffer<T> {
    slots: Mutex<Slots<T>>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a buffer with exactly `capacity` slots
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RecorderError::InvalidCapacity);
        }

        let items: Box<[Option<T>]> = std::iter::repeat_with(|| None).take(capacity).collect();

        Ok(Self {
            slots: Mutex::new(Slots { items, written: 0 }),
            capacity,
        })
    }

    /// Store an item, overwriting the oldest one when full
    pub fn put(&self, item: T) {
        let mut slots = self.slots.lock();
        let index = slots.next_index();
        slots.items[index] = Some(item);
        slots.written += 1;
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained items, `min(total_put, capacity)`
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether nothing was ever put
    pub fn is_empty(&self) -> bool {
        self.slots.lock().written == 0
    }

    /// Total puts ever performed
    pub fn total_put(&self) -> u64 {
        self.slots.lock().written
    }

    /// Buffer statistics
    pub fn stats(&self) -> BufferStats {
        let slots = self.slots.lock();
        let capacity = slots.capacity();

        BufferStats {
            capacity,
            len: slots.len(),
            total_put: slots.written,
            overwritten: slots.written.saturating_sub(capacity as u64),
        }
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Retained items, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        let slots = self.slots.lock();
        let capacity = slots.capacity();

        if slots.written <= capacity as u64 {
            return slots
                .items
                .iter()
                .take(slots.written as usize)
                .flatten()
                .cloned()
                .collect();
        }

        let start = slots.next_index();
        (0..capacity)
            .filter_map(|offset| slots.items[(start + offset) % capacity].clone())
            .collect()
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("RingBuffer")
            .field("capacity", &stats.capacity)
            .field("len", &stats.len)
            .field("total_put", &stats.total_put)
            .finish()
    }
}

/// Ring buffer statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    /// Number of slots
    pub capacity: usize,
    /// Items currently retained
    pub len: usize,
    /// Total puts ever performed
    pub total_put: u64,
    /// Items discarded to make room for newer ones
    pub overwritten: u64,
}

impl BufferStats {
    /// Fill ratio (0.0 - 1.0)
    pub fn pressure(&self) -> f32 {
        self.len as f32 / self.capacity as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, items: &[&'static str]) -> RingBuffer<&'static str> {
        let buffer = RingBuffer::new(capacity).unwrap();
        for item in items {
            buffer.put(*item);
        }
        buffer
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = RingBuffer::<u32>::new(0);
        assert!(matches!(result, Err(RecorderError::InvalidCapacity)));
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = RingBuffer::<u32>::new(4).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.capacity(), 4);
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn test_partial_fill_keeps_insertion_order() {
        let buffer = filled(5, &["a", "b", "c"]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_exactly_full() {
        let buffer = filled(3, &["a", "b", "c"]);
        assert_eq!(buffer.snapshot(), vec!["a", "b", "c"]);
        assert_eq!(buffer.stats().overwritten, 0);
    }

    #[test]
    fn test_wrap_around() {
        let buffer = filled(3, &["A", "B", "C", "D", "E"]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot(), vec!["C", "D", "E"]);
    }

    #[test]
    fn test_single_slot() {
        let buffer = filled(1, &["A", "B"]);
        assert_eq!(buffer.snapshot(), vec!["B"]);
    }

    #[test]
    fn test_wrap_many_times() {
        let buffer = RingBuffer::new(4).unwrap();
        for i in 0..103u32 {
            buffer.put(i);
        }
        assert_eq!(buffer.snapshot(), vec![99, 100, 101, 102]);
    }

    #[test]
    fn test_last_min_w_c_for_every_length() {
        for capacity in 1..=6usize {
            for writes in 0..=15u32 {
                let buffer = RingBuffer::new(capacity).unwrap();
                for i in 0..writes {
                    buffer.put(i);
                }

                let kept = (writes as usize).min(capacity) as u32;
                let expected: Vec<u32> = (writes - kept..writes).collect();
                assert_eq!(buffer.snapshot(), expected, "capacity {} writes {}", capacity, writes);
            }
        }
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let buffer = filled(3, &["A", "B", "C", "D"]);
        assert_eq!(buffer.snapshot(), buffer.snapshot());
    }

    #[test]
    fn test_stats() {
        let buffer = filled(2, &["a", "b", "c", "d", "e"]);
        let stats = buffer.stats();
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.len, 2);
        assert_eq!(stats.total_put, 5);
        assert_eq!(stats.overwritten, 3);
        assert_eq!(stats.pressure(), 1.0);
    }
}
