//! Limited buffer implementation.

use std::slice;

use crate::heap;

/// Buffer limited by elements count.
///
/// Accumulates items until the limit is reached, after which the owner sorts the buffer,
/// flushes its content and clears it for reuse.
pub struct LimitedBuffer<T> {
    limit: usize,
    inner: Vec<T>,
}

impl<T> LimitedBuffer<T> {
    pub fn new(limit: usize) -> Self {
        LimitedBuffer {
            limit,
            inner: Vec::new(),
        }
    }

    pub fn with_capacity(limit: usize) -> Self {
        LimitedBuffer {
            limit,
            inner: Vec::with_capacity(limit),
        }
    }

    /// Adds a new element to the buffer.
    pub fn push(&mut self, item: T) {
        self.inner.push(item);
    }

    /// Returns buffer length
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Checks if the buffer reached the limit.
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    /// Removes all elements keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.inner.iter()
    }
}

impl<T: Ord> LimitedBuffer<T> {
    /// Sorts buffered elements in place in ascending order.
    pub fn sort(&mut self) {
        heap::heap_sort(&mut self.inner);
    }
}

impl<T> IntoIterator for LimitedBuffer<T> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}
