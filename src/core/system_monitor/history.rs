use std::collections::VecDeque;

pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Fixed-capacity FIFO of samples for the utilization graph
///
/// Overflow drops the oldest element; iteration is oldest first.
#[derive(Debug, Clone)]
pub struct HistoryRingBuffer<T> {
    capacity: usize,
    values: VecDeque<T>,
}

impl<T: Copy> HistoryRingBuffer<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    /// A zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: T) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<T> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Owned copy for handing to the renderer
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().copied().collect()
    }
}

impl<T: Copy> Default for HistoryRingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
