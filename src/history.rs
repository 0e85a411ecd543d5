//! Rolling sample history for graphing and export
//!
//! Every received [`SensorSample`] is appended to two independent ring
//! buffers per [`Channel`]:
//!
//! - the **graph window**, a small buffer of `(index, value)` pairs feeding
//!   the live plot
//! - the **export log**, a larger buffer of values feeding the spreadsheet
//!   export
//!
//! Both evict their oldest entry once full. All four channels are appended
//! within one call, so their lengths never diverge.
//!
//! The backend thread is the only writer. The UI and the exporter read
//! through [`SharedHistory`], an `RwLock` that gives them a consistent view
//! of all four channels at once.

use crate::types::{Channel, SensorSample};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default number of samples kept for the live graph
pub const DEFAULT_GRAPH_CAPACITY: usize = 50;

/// Default number of samples kept for export
pub const DEFAULT_EXPORT_CAPACITY: usize = 500;

/// One exported row: temperature, humidity, pressure and AQI in column order.
///
/// Cells are `None` only if the channels were ever misaligned, which append
/// never allows.
pub type ExportRow = [Option<f64>; Channel::COUNT];

/// History buffer shared between the backend writer and UI readers
pub type SharedHistory = Arc<RwLock<HistoryBuffer>>;

/// Fixed-capacity FIFO ring
#[derive(Debug, Clone)]
struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    fn push(&mut self, item: T) {
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    #[inline]
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, i: usize) -> Option<&T> {
        self.items.get(i)
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// Rolling per-channel history of received samples
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    graph: [Ring<(u64, f64)>; Channel::COUNT],
    export: [Ring<f64>; Channel::COUNT],
    /// Index assigned to the next appended sample
    next_index: u64,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_CAPACITY, DEFAULT_EXPORT_CAPACITY)
    }
}

impl HistoryBuffer {
    /// Create a buffer with the given capacities (each clamped to at least 1)
    pub fn new(graph_capacity: usize, export_capacity: usize) -> Self {
        Self {
            graph: std::array::from_fn(|_| Ring::new(graph_capacity)),
            export: std::array::from_fn(|_| Ring::new(export_capacity)),
            next_index: 0,
        }
    }

    /// Wrap this buffer for sharing across threads
    pub fn into_shared(self) -> SharedHistory {
        Arc::new(RwLock::new(self))
    }

    /// Append one sample to every channel's graph window and export log
    pub fn append(&mut self, sample: &SensorSample) {
        let index = self.next_index;
        for channel in Channel::ALL {
            let value = sample.value(channel);
            self.graph[channel.index()].push((index, value));
            self.export[channel.index()].push(value);
        }
        self.next_index += 1;
    }

    /// Graph window of one channel as `(sample index, value)`, oldest first
    pub fn graph_series(&self, channel: Channel) -> Vec<(u64, f64)> {
        self.graph[channel.index()].iter().copied().collect()
    }

    /// Graph window of one channel as plot points
    pub fn plot_points(&self, channel: Channel) -> Vec<[f64; 2]> {
        self.graph[channel.index()]
            .iter()
            .map(|&(index, value)| [index as f64, value])
            .collect()
    }

    /// Export log as rows aligned by arrival order, oldest first
    pub fn export_rows(&self) -> Vec<ExportRow> {
        let len = self.export.iter().map(Ring::len).max().unwrap_or(0);
        (0..len)
            .map(|i| std::array::from_fn(|c| self.export[c].get(i).copied()))
            .collect()
    }

    /// Number of entries in one channel's graph window
    pub fn graph_len(&self, channel: Channel) -> usize {
        self.graph[channel.index()].len()
    }

    /// Number of entries in one channel's export log
    pub fn export_len(&self, channel: Channel) -> usize {
        self.export[channel.index()].len()
    }

    /// Graph window capacity
    pub fn graph_capacity(&self) -> usize {
        self.graph[0].capacity
    }

    /// Export log capacity
    pub fn export_capacity(&self) -> usize {
        self.export[0].capacity
    }

    /// Total number of samples ever appended
    pub fn total_appended(&self) -> u64 {
        self.next_index
    }

    /// Most recent value of a channel
    pub fn latest(&self, channel: Channel) -> Option<f64> {
        self.graph[channel.index()].items.back().map(|&(_, v)| v)
    }

    /// Drop all retained samples. Sample indices keep increasing.
    pub fn clear(&mut self) {
        for ring in &mut self.graph {
            ring.clear();
        }
        for ring in &mut self.export {
            ring.clear();
        }
    }
}

/// Lock the shared history for reading, recovering from a poisoned lock
pub fn read_history(history: &SharedHistory) -> RwLockReadGuard<'_, HistoryBuffer> {
    history.read().unwrap_or_else(PoisonError::into_inner)
}

/// Lock the shared history for writing, recovering from a poisoned lock
pub fn write_history(history: &SharedHistory) -> RwLockWriteGuard<'_, HistoryBuffer> {
    history.write().unwrap_or_else(PoisonError::into_inner)
}
