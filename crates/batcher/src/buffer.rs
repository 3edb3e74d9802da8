//! Pending buffer and the running counters of the flush model.

use tokio::time::Instant;

/// Items awaiting flush plus scheduler accumulators
///
/// Always accessed through the batcher's buffer lock. Order of items is not
/// part of the contract.
#[derive(Debug)]
pub struct PendingBuffer<T> {
    items: Vec<T>,
    /// Wait time credited since the last flush (ms)
    lost_millis: f64,
    /// Items buffered since start, never decreases
    total_items_sent: f64,
    started_at: Instant,
    /// Set by the final drain; further appends are refused
    sealed: bool,
}

impl<T> PendingBuffer<T> {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(started_at: Instant) -> Self {
        Self {
            items: Vec::new(),
            lost_millis: 0.0,
            total_items_sent: 0.0,
            started_at,
            sealed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.total_items_sent += 1.0;
    }

    /// Append every item; returns how many were added
    pub fn extend(&mut self, items: Vec<T>) -> usize {
        let count = items.len();
        self.items.extend(items);
        self.total_items_sent += count as f64;
        count
    }

    /// Remove and return every buffered item
    pub fn take_all(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    pub fn lost_millis(&self) -> f64 {
        self.lost_millis
    }

    pub fn set_lost_millis(&mut self, lost_millis: f64) {
        self.lost_millis = lost_millis;
    }

    pub fn total_items_sent(&self) -> f64 {
        self.total_items_sent
    }

    /// Wall time since the buffer was created, in milliseconds
    pub fn elapsed_millis(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64() * 1000.0
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

impl<T> Default for PendingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
