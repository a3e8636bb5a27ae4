//! Composite state layout and serial state table.

use crate::counter::{LongArrayMultiStateCounter, StateCounter};
use crate::error::{Result, StatsError};
use crate::state::StateCombinations;
use crate::stats::MultiStateStats;
use crate::types::{AxisConfig, CompositeState, FactoryConfig, SerialState, StateAxis};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Marks composite states with an out-of-range value for some axis.
const INVALID_SERIAL_STATE: u32 = u32::MAX;

/// Bits available for the composite state. The top bit is reserved.
const AVAILABLE_BITS: u32 = u32::BITS - 1;

/// Widest composite state mapped through a table indexed by composite state.
/// Wider state spaces map only their tracked combinations.
const DENSE_TABLE_MAX_BITS: u32 = 16;

#[derive(Debug)]
enum SerialTable {
    /// Indexed by composite state, `INVALID_SERIAL_STATE` for invalid ones.
    Dense(Vec<u32>),
    /// Keyed by composite state with every untracked field zeroed.
    Sparse(HashMap<u32, u32>),
}

/// Immutable description of a state space, shared by every container
/// created from it.
///
/// The counter behind a container thinks of "state" as a plain 0-based
/// index. The factory maps a combination of axis values to such an index in
/// two steps:
///
/// 1. Every axis gets a bit field in a *composite state*, which makes it cheap
///    to change a single axis at a time.
/// 2. Composite states are mapped to *serial states*. Composite states that
///    differ only in untracked axes share a serial state, so the counter only
///    grows with the cardinality of the tracked axes.
#[derive(Debug)]
pub struct StateSpaceFactory {
    dimension_count: usize,
    axes: Vec<StateAxis>,
    bit_masks: Vec<u32>,
    bit_shifts: Vec<u32>,
    composite_bits: u32,
    tracked_mask: u32,
    serial_table: SerialTable,
    serial_state_count: usize,
}

impl StateSpaceFactory {
    /// Compute the bit layout and the serial state table for `axes`.
    pub fn new(dimension_count: usize, axes: Vec<StateAxis>) -> Result<Self> {
        let mut bit_masks = Vec::with_capacity(axes.len());
        let mut bit_shifts = Vec::with_capacity(axes.len());

        let mut shift = 0u32;
        for axis in &axes {
            let max = u32::try_from(axis.cardinality() - 1).map_err(|_| {
                StatsError::InvalidConfiguration(format!(
                    "State axis '{}' has too many values",
                    axis.name()
                ))
            })?;
            let bit_count = u32::BITS - max.leading_zeros();
            if shift + bit_count >= AVAILABLE_BITS {
                return Err(StatsError::InvalidConfiguration(format!(
                    "Too many states: at least {} bits are required to represent the composite \
                     state, but only {} are available",
                    shift + bit_count,
                    AVAILABLE_BITS
                )));
            }
            bit_shifts.push(shift);
            bit_masks.push(((1u32 << bit_count) - 1) << shift);
            shift += bit_count;
        }

        // Zeroes out the fields of untracked axes
        let tracked_mask = axes
            .iter()
            .zip(&bit_masks)
            .filter(|(axis, _)| !axis.is_tracked())
            .fold(u32::MAX, |mask, (_, field)| mask & !field);

        let mut factory = Self {
            dimension_count,
            axes,
            bit_masks,
            bit_shifts,
            composite_bits: shift,
            tracked_mask,
            serial_table: SerialTable::Dense(Vec::new()),
            serial_state_count: 0,
        };
        let (serial_table, serial_state_count) = factory.build_serial_table();
        factory.serial_table = serial_table;
        factory.serial_state_count = serial_state_count;

        debug!(
            axes = factory.axes.len(),
            composite_bits = factory.composite_bits,
            serial_states = factory.serial_state_count,
            dimensions = factory.dimension_count,
            "Built state space"
        );

        Ok(factory)
    }

    /// Assign serial states in increasing order of their base composite
    /// state, so both table kinds agree on the numbering.
    fn build_serial_table(&self) -> (SerialTable, usize) {
        if self.composite_bits > DENSE_TABLE_MAX_BITS {
            let mut bases: Vec<u32> = self
                .combinations()
                .map(|values| {
                    values
                        .iter()
                        .enumerate()
                        .fold(CompositeState::default(), |composite, (i, &value)| {
                            self.set_axis_value(composite, i, value)
                        })
                        .0
                })
                .collect();
            bases.sort_unstable();
            let count = bases.len();
            let table = bases.into_iter().zip(0u32..).collect();
            return (SerialTable::Sparse(table), count);
        }

        let mut table = vec![INVALID_SERIAL_STATE; 1usize << self.composite_bits];
        let mut next_serial_state = 0u32;
        for composite in 0..table.len() as u32 {
            if !self.is_valid_composite(CompositeState(composite)) {
                continue;
            }

            // The base composite has 0 for every untracked axis. It is never
            // greater than `composite`, so it already has a serial state
            // unless it is `composite` itself.
            let base = (composite & self.tracked_mask) as usize;
            let serial = match table[base] {
                INVALID_SERIAL_STATE => {
                    next_serial_state += 1;
                    next_serial_state - 1
                }
                assigned => assigned,
            };
            table[composite as usize] = serial;
        }
        (SerialTable::Dense(table), next_serial_state as usize)
    }

    /// Build a factory from a declarative configuration.
    pub fn from_config(config: &FactoryConfig) -> Result<Self> {
        let axes = config
            .axes
            .iter()
            .cloned()
            .map(AxisConfig::into_axis)
            .collect::<Result<Vec<_>>>()?;
        Self::new(config.dimension_count, axes)
    }

    /// The configuration this factory was built from.
    pub fn config(&self) -> FactoryConfig {
        FactoryConfig {
            dimension_count: self.dimension_count,
            axes: self.axes.iter().map(AxisConfig::from).collect(),
        }
    }

    /// Allocate a new container backed by a [`LongArrayMultiStateCounter`].
    pub fn create(self: &Arc<Self>) -> MultiStateStats<LongArrayMultiStateCounter> {
        let counter = LongArrayMultiStateCounter::new(self.serial_state_count, self.dimension_count);
        MultiStateStats::new(Arc::clone(self), counter)
    }

    /// Allocate a new container around a caller-supplied counter.
    pub fn create_with_counter<C: StateCounter>(
        self: &Arc<Self>,
        counter: C,
    ) -> Result<MultiStateStats<C>> {
        if counter.state_count() != self.serial_state_count
            || counter.array_length() != self.dimension_count
        {
            return Err(StatsError::InvalidArgument(format!(
                "Counter shape {}x{} does not match state space {}x{}",
                counter.state_count(),
                counter.array_length(),
                self.serial_state_count,
                self.dimension_count
            )));
        }
        Ok(MultiStateStats::new(Arc::clone(self), counter))
    }

    /// Number of metrics accumulated per state.
    pub fn dimension_count(&self) -> usize {
        self.dimension_count
    }

    pub fn axes(&self) -> &[StateAxis] {
        &self.axes
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Position of the axis called `name`.
    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|axis| axis.name() == name)
    }

    /// Total number of serial states. For two tracked boolean axes this is
    /// 2 * 2 = 4; untracked axes contribute a factor of 1.
    pub fn serial_state_count(&self) -> usize {
        self.serial_state_count
    }

    /// Bits used by the composite state.
    pub fn composite_bits(&self) -> u32 {
        self.composite_bits
    }

    /// Every combination of tracked axis values, untracked axes fixed at 0.
    pub fn combinations(&self) -> StateCombinations<'_> {
        StateCombinations::new(&self.axes)
    }

    /// Value of one axis inside a composite state.
    ///
    /// # Panics
    ///
    /// Panics if `axis_index` is out of range.
    pub fn axis_value(&self, composite: CompositeState, axis_index: usize) -> u32 {
        (composite.0 & self.bit_masks[axis_index]) >> self.bit_shifts[axis_index]
    }

    /// Replace one axis field of a composite state. The value is not range
    /// checked; an out-of-range value yields a composite with no serial state.
    ///
    /// # Panics
    ///
    /// Panics if `axis_index` is out of range.
    pub fn set_axis_value(
        &self,
        composite: CompositeState,
        axis_index: usize,
        value: u32,
    ) -> CompositeState {
        CompositeState(
            (composite.0 & !self.bit_masks[axis_index]) | (value << self.bit_shifts[axis_index]),
        )
    }

    /// Replace one axis field, identifying the axis and its value by name.
    pub fn set_axis_value_by_label(
        &self,
        composite: CompositeState,
        axis_name: &str,
        label: &str,
    ) -> Result<CompositeState> {
        let Some(axis_index) = self.axis_index(axis_name) else {
            error!(axis = axis_name, "Unsupported state axis");
            return Err(StatsError::UnknownAxis(axis_name.to_string()));
        };
        let Some(value) = self.axes[axis_index].label_index(label) else {
            error!(axis = axis_name, label, "Unexpected label for state axis");
            return Err(StatsError::UnknownLabel {
                axis: axis_name.to_string(),
                label: label.to_string(),
            });
        };
        Ok(self.set_axis_value(composite, axis_index, value))
    }

    /// Pack per-axis values into a composite state, validating each value.
    pub fn composite_for(&self, axis_values: &[u32]) -> Result<CompositeState> {
        if axis_values.len() != self.axes.len() {
            return Err(StatsError::InvalidArgument(format!(
                "Expected {} state values, got {}",
                self.axes.len(),
                axis_values.len()
            )));
        }
        let mut composite = CompositeState::default();
        for (axis_index, (&value, axis)) in axis_values.iter().zip(&self.axes).enumerate() {
            if value as usize >= axis.cardinality() {
                return Err(StatsError::InvalidArgument(format!(
                    "State values out of bounds: {:?}",
                    axis_values
                )));
            }
            composite = self.set_axis_value(composite, axis_index, value);
        }
        Ok(composite)
    }

    /// Serial state for a full set of per-axis values.
    pub fn serial_state_for(&self, axis_values: &[u32]) -> Result<SerialState> {
        let composite = self.composite_for(axis_values)?;
        self.serial_state_of(composite).ok_or_else(|| {
            StatsError::InvalidArgument(format!("State values out of bounds: {:?}", axis_values))
        })
    }

    /// Serial state for a composite state, `None` if it is not valid.
    pub fn serial_state_of(&self, composite: CompositeState) -> Option<SerialState> {
        match &self.serial_table {
            SerialTable::Dense(table) => match table.get(composite.0 as usize) {
                Some(&serial) if serial != INVALID_SERIAL_STATE => Some(SerialState(serial)),
                _ => None,
            },
            SerialTable::Sparse(table) => {
                if !self.is_valid_composite(composite) {
                    return None;
                }
                table
                    .get(&(composite.0 & self.tracked_mask))
                    .map(|&serial| SerialState(serial))
            }
        }
    }

    /// Whether every axis field of `composite` is within its label range.
    pub fn is_valid_composite(&self, composite: CompositeState) -> bool {
        if u64::from(composite.0) >> self.composite_bits != 0 {
            return false;
        }
        self.axes
            .iter()
            .enumerate()
            .all(|(i, axis)| (self.axis_value(composite, i) as usize) < axis.cardinality())
    }
}
