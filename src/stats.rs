//! Multi-state stats container.

use crate::codec;
use crate::counter::{LongArrayMultiStateCounter, StateCounter};
use crate::error::{Result, StatsError};
use crate::state::StateSpaceFactory;
use crate::tags::{TagDocument, TagReader, TagWriter};
use crate::types::CompositeState;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::{error, trace};

/// Element wrapping the `stats` records in a standalone snapshot document.
pub const SNAPSHOT_TAG: &str = "multi_state_stats";

/// Multi-dimensional stats broken down by the combination of states that
/// were active while they accumulated, e.g. CPU time and network bytes per
/// (on-battery, screen-on, process state).
///
/// Containers are created by a [`StateSpaceFactory`] and keep a reference to
/// it. They are not synchronized; see
/// [`SharedMultiStateStats`](crate::SharedMultiStateStats) for a locked
/// handle.
pub struct MultiStateStats<C: StateCounter = LongArrayMultiStateCounter> {
    factory: Arc<StateSpaceFactory>,
    counter: C,
    composite_state: CompositeState,
    tracking: bool,
}

impl<C: StateCounter> MultiStateStats<C> {
    pub(crate) fn new(factory: Arc<StateSpaceFactory>, counter: C) -> Self {
        Self {
            factory,
            counter,
            composite_state: CompositeState::default(),
            tracking: false,
        }
    }

    pub fn factory(&self) -> &Arc<StateSpaceFactory> {
        &self.factory
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    /// Whether accumulation has started since creation or the last reset.
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Current value of every axis, packed.
    pub fn composite_state(&self) -> CompositeState {
        self.composite_state
    }

    /// Change the value of one axis as of `timestamp_ms`.
    ///
    /// The first call after creation or reset records an all-zero baseline
    /// at `timestamp_ms` so that later deltas have a starting point.
    pub fn set_state(&mut self, axis_index: usize, value: u32, timestamp_ms: i64) -> Result<()> {
        let axis = self.factory.axes().get(axis_index).ok_or_else(|| {
            StatsError::InvalidArgument(format!(
                "State axis index {} out of range ({} axes)",
                axis_index,
                self.factory.axis_count()
            ))
        })?;
        if value as usize >= axis.cardinality() {
            return Err(StatsError::InvalidArgument(format!(
                "Value {} out of range for state axis '{}' ({} values)",
                value,
                axis.name(),
                axis.cardinality()
            )));
        }

        if !self.tracking {
            let baseline = vec![0; self.counter.array_length()];
            self.counter.update_values(&baseline, timestamp_ms);
            self.tracking = true;
        }

        let composite = self
            .factory
            .set_axis_value(self.composite_state, axis_index, value);
        let serial = self.factory.serial_state_of(composite).ok_or_else(|| {
            StatsError::InvalidArgument(format!("Invalid composite state: {:?}", composite))
        })?;
        self.composite_state = composite;
        trace!(axis = axis_index, value, serial = %serial, timestamp_ms, "Set state");
        self.counter.set_state(serial.index(), timestamp_ms);
        Ok(())
    }

    /// Add a delta to the metrics. `values` must have one entry per
    /// dimension.
    pub fn increment(&mut self, values: &[i64], timestamp_ms: i64) -> Result<()> {
        self.check_dimensions(values.len())?;
        self.counter.increment_values(values, timestamp_ms);
        self.tracking = true;
        Ok(())
    }

    /// Copy the stats accumulated for a combination of axis values into
    /// `out`.
    pub fn get_stats(&self, out: &mut [i64], axis_values: &[u32]) -> Result<()> {
        self.check_dimensions(out.len())?;
        let serial = self.factory.serial_state_for(axis_values)?;
        self.counter.get_counts(out, serial.index());
        Ok(())
    }

    /// Stats accumulated for a combination of axis values.
    pub fn stats(&self, axis_values: &[u32]) -> Result<Vec<i64>> {
        let mut out = vec![0; self.factory.dimension_count()];
        self.get_stats(&mut out, axis_values)?;
        Ok(out)
    }

    /// Clear all accumulated stats. The next state change or increment
    /// starts accumulation afresh.
    pub fn reset(&mut self) {
        self.counter.reset();
        self.tracking = false;
    }

    /// Write one record per non-zero tracked combination. Returns the number
    /// of records written.
    pub fn write_snapshot<W: TagWriter + ?Sized>(&self, writer: &mut W) -> Result<usize> {
        codec::write_states(&self.factory, &self.counter, writer)
    }

    /// Restore records written by [`write_snapshot`](Self::write_snapshot).
    ///
    /// The reader must be positioned on the start tag of the element
    /// enclosing the records. On error, records read before the failure
    /// stay applied.
    pub fn read_snapshot<R: TagReader + ?Sized>(&mut self, reader: &mut R) -> Result<usize> {
        codec::read_states(&self.factory, &mut self.counter, reader)
    }

    /// Like [`read_snapshot`](Self::read_snapshot), but reports failure as
    /// `false` after logging it.
    pub fn restore_snapshot<R: TagReader + ?Sized>(&mut self, reader: &mut R) -> bool {
        match self.read_snapshot(reader) {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "Could not restore multi-state stats");
                false
            }
        }
    }

    /// Standalone snapshot document: the records wrapped in a
    /// [`SNAPSHOT_TAG`] element.
    pub fn to_document(&self) -> Result<TagDocument> {
        let mut doc = TagDocument::new();
        doc.start_tag(SNAPSHOT_TAG)?;
        self.write_snapshot(&mut doc)?;
        doc.end_tag(SNAPSHOT_TAG)?;
        Ok(doc)
    }

    /// Restore from a document produced by [`to_document`](Self::to_document).
    pub fn read_document(&mut self, doc: &TagDocument) -> Result<usize> {
        let mut reader = doc.reader();
        if reader.name() != Some(SNAPSHOT_TAG) {
            return Err(StatsError::MalformedData(format!(
                "Expected <{}> as the first element",
                SNAPSHOT_TAG
            )));
        }
        self.read_snapshot(&mut reader)
    }

    /// Print one line per combination of tracked states that has data.
    pub fn dump<W: io::Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        codec::dump_states(&self.factory, &self.counter, out)?;
        Ok(())
    }

    pub fn dump_to_string(&self) -> String {
        let mut out = Vec::new();
        self.dump(&mut out).ok();
        String::from_utf8_lossy(&out).into_owned()
    }

    fn check_dimensions(&self, len: usize) -> Result<()> {
        if len != self.factory.dimension_count() {
            return Err(StatsError::InvalidArgument(format!(
                "Expected {} values, got {}",
                self.factory.dimension_count(),
                len
            )));
        }
        Ok(())
    }
}

impl<C: StateCounter + fmt::Display> fmt::Display for MultiStateStats<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.counter, f)
    }
}

impl<C: StateCounter + fmt::Debug> fmt::Debug for MultiStateStats<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiStateStats")
            .field("composite_state", &self.composite_state)
            .field("tracking", &self.tracking)
            .field("counter", &self.counter)
            .finish()
    }
}
