//! Lock-guarded handle to a stats container.

use crate::counter::{LongArrayMultiStateCounter, StateCounter};
use crate::error::Result;
use crate::stats::MultiStateStats;
use crate::tags::{TagDocument, TagReader, TagWriter};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable handle serializing every operation on one container.
///
/// All clones refer to the same container. The factory behind it is
/// immutable and needs no locking.
pub struct SharedMultiStateStats<C: StateCounter = LongArrayMultiStateCounter> {
    inner: Arc<Mutex<MultiStateStats<C>>>,
}

impl<C: StateCounter> Clone for SharedMultiStateStats<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: StateCounter> SharedMultiStateStats<C> {
    pub fn new(stats: MultiStateStats<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stats)),
        }
    }

    /// Lock the container for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, MultiStateStats<C>> {
        self.inner.lock()
    }

    pub fn set_state(&self, axis_index: usize, value: u32, timestamp_ms: i64) -> Result<()> {
        self.inner.lock().set_state(axis_index, value, timestamp_ms)
    }

    pub fn increment(&self, values: &[i64], timestamp_ms: i64) -> Result<()> {
        self.inner.lock().increment(values, timestamp_ms)
    }

    pub fn get_stats(&self, out: &mut [i64], axis_values: &[u32]) -> Result<()> {
        self.inner.lock().get_stats(out, axis_values)
    }

    pub fn stats(&self, axis_values: &[u32]) -> Result<Vec<i64>> {
        self.inner.lock().stats(axis_values)
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn write_snapshot<W: TagWriter + ?Sized>(&self, writer: &mut W) -> Result<usize> {
        self.inner.lock().write_snapshot(writer)
    }

    pub fn read_snapshot<R: TagReader + ?Sized>(&self, reader: &mut R) -> Result<usize> {
        self.inner.lock().read_snapshot(reader)
    }

    pub fn to_document(&self) -> Result<TagDocument> {
        self.inner.lock().to_document()
    }

    pub fn dump_to_string(&self) -> String {
        self.inner.lock().dump_to_string()
    }
}

impl<C: StateCounter> From<MultiStateStats<C>> for SharedMultiStateStats<C> {
    fn from(stats: MultiStateStats<C>) -> Self {
        Self::new(stats)
    }
}
