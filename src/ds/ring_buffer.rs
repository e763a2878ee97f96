#![allow(clippy::len_without_is_empty)]
use std::ops::Index;

/// A fixed-capacity ring buffer that evicts its oldest element once full
///
/// Indexing and iteration are chronological: index `0` is the oldest retained element.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    ix: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// **Panics** if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be non-zero.");
        Self {
            buffer: Vec::with_capacity(capacity),
            ix: 0,
            capacity,
        }
    }

    /// Returns the number of retained elements
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert an element, overwriting the oldest element when full
    ///
    /// **Returns** the evicted element, if any
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.buffer.len() < self.capacity {
            self.buffer.push(item);
            return None;
        }
        let evicted = std::mem::replace(&mut self.buffer[self.ix], item);
        self.ix = (self.ix + 1) % self.capacity;
        Some(evicted)
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let (newer, older) = self.buffer.split_at(self.ix);
        older.iter().chain(newer)
    }

    /// The most recently pushed element
    pub fn last(&self) -> Option<&T> {
        match self.ix {
            _ if self.buffer.is_empty() => None,
            0 => self.buffer.last(),
            ix => self.buffer.get(ix - 1),
        }
    }

    /// The newest `n` elements (or fewer), oldest first
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> + '_ {
        self.iter().skip(self.len().saturating_sub(n))
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ix = 0;
    }
}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        assert!(index < self.len(), "index {index} out of range");
        &self.buffer[(self.ix + index) % self.len()]
    }
}
