//! Time-proportional counter over `i64` value vectors.

use crate::counter::StateCounter;
use std::fmt;
use tracing::{trace, warn};

#[derive(Clone, Debug)]
struct StateSlot {
    /// Time spent in this state since the last value update.
    pending_time_ms: i64,
    counts: Vec<i64>,
}

/// Counter that splits every value delta across the states that were active
/// since the previous update, in proportion to the time spent in each.
///
/// Example: state 0 from t=0 to t=100, state 1 from t=100 to t=400, then an
/// update reporting a delta of 40 at t=400 credits 10 to state 0 and 30 to
/// state 1.
#[derive(Clone, Debug)]
pub struct LongArrayMultiStateCounter {
    slots: Vec<StateSlot>,
    array_length: usize,
    current_state: usize,
    last_state_change_ms: Option<i64>,
    last_update_ms: Option<i64>,
    last_values: Vec<i64>,
}

impl LongArrayMultiStateCounter {
    pub fn new(state_count: usize, array_length: usize) -> Self {
        Self {
            slots: vec![
                StateSlot {
                    pending_time_ms: 0,
                    counts: vec![0; array_length],
                };
                state_count
            ],
            array_length,
            current_state: 0,
            last_state_change_ms: None,
            last_update_ms: None,
            last_values: vec![0; array_length],
        }
    }

    /// Currently active state.
    pub fn current_state(&self) -> usize {
        self.current_state
    }

    /// Credit the time since the last state change to the current state.
    fn credit_current_state(&mut self, timestamp_ms: i64) {
        let Some(last_change) = self.last_state_change_ms else {
            return;
        };
        let slot = &mut self.slots[self.current_state];
        let pending = timestamp_ms
            .checked_sub(last_change)
            .filter(|&elapsed| elapsed >= 0)
            .and_then(|elapsed| slot.pending_time_ms.checked_add(elapsed));
        match pending {
            Some(pending) => slot.pending_time_ms = pending,
            None => {
                warn!(
                    timestamp_ms,
                    last_change, "Out-of-order state change timestamp, dropping pending time"
                );
                self.clear_pending_time();
            }
        }
    }

    fn clear_pending_time(&mut self) {
        for slot in &mut self.slots {
            slot.pending_time_ms = 0;
        }
    }

    fn distribute(&mut self, delta: &[i64], elapsed_ms: i64) {
        for slot in &mut self.slots {
            if slot.pending_time_ms <= 0 {
                continue;
            }
            for (count, &d) in slot.counts.iter_mut().zip(delta) {
                let share = i128::from(d) * i128::from(slot.pending_time_ms) / i128::from(elapsed_ms);
                *count = count.saturating_add(share as i64);
            }
            slot.pending_time_ms = 0;
        }
    }
}

impl StateCounter for LongArrayMultiStateCounter {
    fn state_count(&self) -> usize {
        self.slots.len()
    }

    fn array_length(&self) -> usize {
        self.array_length
    }

    fn set_state(&mut self, state: usize, timestamp_ms: i64) {
        debug_assert!(state < self.slots.len());
        self.credit_current_state(timestamp_ms);
        trace!(from = self.current_state, to = state, timestamp_ms, "State change");
        self.current_state = state;
        self.last_state_change_ms = Some(timestamp_ms);
    }

    fn update_values(&mut self, values: &[i64], timestamp_ms: i64) {
        debug_assert_eq!(values.len(), self.array_length);
        // The current state is confirmed as of this update
        self.credit_current_state(timestamp_ms);
        self.last_state_change_ms = Some(timestamp_ms);

        match self.last_update_ms {
            Some(last_update) if timestamp_ms > last_update => {
                let Some(elapsed_ms) = timestamp_ms.checked_sub(last_update) else {
                    warn!(timestamp_ms, last_update, "Update interval overflows, dropping delta");
                    self.clear_pending_time();
                    self.last_values.copy_from_slice(values);
                    self.last_update_ms = Some(timestamp_ms);
                    return;
                };
                let delta: Vec<i64> = values
                    .iter()
                    .zip(&self.last_values)
                    .map(|(&v, &last)| v.saturating_sub(last))
                    .collect();
                if delta.iter().any(|&d| d < 0) {
                    warn!(?values, last = ?self.last_values, "Values went backwards, dropping delta");
                    self.clear_pending_time();
                } else {
                    self.distribute(&delta, elapsed_ms);
                }
            }
            Some(last_update) if timestamp_ms < last_update => {
                warn!(timestamp_ms, last_update, "Out-of-order value update timestamp");
                self.clear_pending_time();
            }
            Some(_) => {}
            // Nothing to attribute before the first baseline
            None => self.clear_pending_time(),
        }

        self.last_values.copy_from_slice(values);
        self.last_update_ms = Some(timestamp_ms);
    }

    fn increment_values(&mut self, delta: &[i64], timestamp_ms: i64) {
        debug_assert_eq!(delta.len(), self.array_length);
        let values: Vec<i64> = self
            .last_values
            .iter()
            .zip(delta)
            .map(|(&last, &d)| last.saturating_add(d))
            .collect();
        self.update_values(&values, timestamp_ms);
    }

    fn set_values(&mut self, state: usize, values: &[i64]) {
        self.slots[state].counts.copy_from_slice(values);
    }

    fn get_counts(&self, out: &mut [i64], state: usize) {
        out.copy_from_slice(&self.slots[state].counts);
    }

    fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.pending_time_ms = 0;
            slot.counts.fill(0);
        }
        self.last_values.fill(0);
        self.last_state_change_ms = None;
        self.last_update_ms = None;
    }
}

impl fmt::Display for LongArrayMultiStateCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (state, slot) in self.slots.iter().enumerate() {
            if state != 0 {
                write!(f, " ")?;
            }
            let counts: Vec<String> = slot.counts.iter().map(i64::to_string).collect();
            write!(f, "{}: ({})", state, counts.join(", "))?;
        }
        write!(f, "]")?;
        match self.last_update_ms {
            Some(t) => write!(f, " updated: {}", t)?,
            None => write!(f, " updated: never")?,
        }
        write!(f, " currentState: {}", self.current_state)?;
        match self.last_state_change_ms {
            Some(t) => write!(f, " stateChanged: {}", t),
            None => write!(f, " stateChanged: never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(counter: &LongArrayMultiStateCounter, state: usize) -> Vec<i64> {
        let mut out = vec![0; counter.array_length()];
        counter.get_counts(&mut out, state);
        out
    }

    #[test]
    fn test_delta_split_by_time_in_state() {
        let mut counter = LongArrayMultiStateCounter::new(2, 1);
        counter.update_values(&[0], 0);
        counter.set_state(0, 0);
        counter.set_state(1, 100);
        counter.update_values(&[40], 400);

        assert_eq!(counts(&counter, 0), vec![10]);
        assert_eq!(counts(&counter, 1), vec![30]);
    }

    #[test]
    fn test_increment_is_relative() {
        let mut counter = LongArrayMultiStateCounter::new(2, 2);
        counter.update_values(&[0, 0], 0);
        counter.set_state(1, 0);
        counter.increment_values(&[5, 7], 10);
        counter.increment_values(&[5, 7], 20);

        assert_eq!(counts(&counter, 0), vec![0, 0]);
        assert_eq!(counts(&counter, 1), vec![10, 14]);
    }

    #[test]
    fn test_first_update_only_records_baseline() {
        let mut counter = LongArrayMultiStateCounter::new(1, 1);
        counter.set_state(0, 0);
        counter.update_values(&[100], 50);
        assert_eq!(counts(&counter, 0), vec![0]);

        counter.update_values(&[150], 100);
        assert_eq!(counts(&counter, 0), vec![50]);
    }

    #[test]
    fn test_negative_delta_dropped() {
        let mut counter = LongArrayMultiStateCounter::new(1, 1);
        counter.update_values(&[100], 0);
        counter.set_state(0, 0);
        counter.update_values(&[50], 100);
        assert_eq!(counts(&counter, 0), vec![0]);

        counter.update_values(&[80], 200);
        assert_eq!(counts(&counter, 0), vec![30]);
    }

    #[test]
    fn test_clock_going_back_drops_pending_time() {
        let mut counter = LongArrayMultiStateCounter::new(2, 1);
        counter.update_values(&[0], 0);
        counter.set_state(0, 100);
        counter.set_state(1, 50);
        counter.update_values(&[10], 150);

        assert_eq!(counts(&counter, 0), vec![0]);
        assert_eq!(counts(&counter, 1), vec![6]);
    }

    #[test]
    fn test_updates_without_state_change_credit_current_state() {
        let mut counter = LongArrayMultiStateCounter::new(2, 1);
        counter.increment_values(&[5], 10);
        counter.increment_values(&[5], 20);
        counter.increment_values(&[5], 30);
        assert_eq!(counts(&counter, 0), vec![10]);

        counter.set_state(1, 30);
        counter.reset();
        counter.increment_values(&[5], 40);
        counter.increment_values(&[5], 50);
        assert_eq!(counts(&counter, 0), vec![0]);
        assert_eq!(counts(&counter, 1), vec![5]);
    }

    #[test]
    fn test_extreme_timestamps_drop_pending_time() {
        let mut counter = LongArrayMultiStateCounter::new(2, 1);
        counter.update_values(&[0], i64::MIN);
        counter.set_state(1, i64::MIN);
        counter.set_state(0, i64::MAX);
        counter.update_values(&[10], i64::MAX);

        assert_eq!(counts(&counter, 0), vec![0]);
        assert_eq!(counts(&counter, 1), vec![0]);

        counter.update_values(&[10], 0);
        counter.update_values(&[20], 100);
        assert_eq!(counts(&counter, 0), vec![10]);
    }

    #[test]
    fn test_out_of_order_update_never_over_credits() {
        let mut counter = LongArrayMultiStateCounter::new(1, 1);
        counter.update_values(&[0], 0);
        counter.update_values(&[10], 100);
        counter.update_values(&[20], 50);
        counter.update_values(&[30], 150);

        // The out-of-order update only becomes the new baseline
        assert_eq!(counts(&counter, 0), vec![20]);
    }

    #[test]
    fn test_set_values_and_reset() {
        let mut counter = LongArrayMultiStateCounter::new(3, 2);
        counter.set_values(2, &[7, 8]);
        assert_eq!(counts(&counter, 2), vec![7, 8]);

        counter.reset();
        assert_eq!(counts(&counter, 2), vec![0, 0]);
    }

    #[test]
    fn test_display() {
        let mut counter = LongArrayMultiStateCounter::new(2, 2);
        counter.set_values(1, &[3, 4]);
        assert_eq!(
            counter.to_string(),
            "[0: (0, 0) 1: (3, 4)] updated: never currentState: 0 stateChanged: never"
        );
    }
}
