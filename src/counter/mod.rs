//! Per-state counter accumulation.
//!
//! A counter keeps one vector of accumulated values per state index and
//! attributes incoming deltas to the states that were active while the
//! delta was produced. Containers only hand it state indexes and
//! timestamps.

mod long_array;

pub use long_array::LongArrayMultiStateCounter;

/// Accumulator of per-state value vectors.
///
/// Implementations may assume callers pass vectors of exactly
/// [`array_length`](StateCounter::array_length) elements and state indexes
/// below [`state_count`](StateCounter::state_count).
pub trait StateCounter {
    /// Number of states tracked.
    fn state_count(&self) -> usize;

    /// Number of values per state.
    fn array_length(&self) -> usize;

    /// Switch the active state as of `timestamp_ms`.
    fn set_state(&mut self, state: usize, timestamp_ms: i64);

    /// Report the cumulative values observed at `timestamp_ms`.
    fn update_values(&mut self, values: &[i64], timestamp_ms: i64);

    /// Report values gained since the previous update.
    fn increment_values(&mut self, delta: &[i64], timestamp_ms: i64);

    /// Overwrite the accumulated values of one state.
    fn set_values(&mut self, state: usize, values: &[i64]);

    /// Copy the accumulated values of one state into `out`.
    fn get_counts(&self, out: &mut [i64], state: usize);

    /// Clear all accumulated values and timing history.
    fn reset(&mut self);
}
