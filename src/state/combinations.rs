//! Enumeration of tracked axis value combinations.

use crate::types::StateAxis;

/// Iterator over the Cartesian product of tracked axes' values.
///
/// Untracked axes stay at 0 since their values share a serial state. The
/// first axis varies slowest. With no tracked axes a single all-zero
/// combination is produced.
#[derive(Clone, Debug)]
pub struct StateCombinations<'a> {
    axes: &'a [StateAxis],
    current: Vec<u32>,
    done: bool,
}

impl<'a> StateCombinations<'a> {
    pub(crate) fn new(axes: &'a [StateAxis]) -> Self {
        Self {
            axes,
            current: vec![0; axes.len()],
            done: false,
        }
    }
}

impl Iterator for StateCombinations<'_> {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.current.clone();

        // Odometer step over tracked axes, last axis fastest
        self.done = true;
        for (value, axis) in self.current.iter_mut().zip(self.axes).rev() {
            if !axis.is_tracked() {
                continue;
            }
            if (*value as usize) + 1 < axis.cardinality() {
                *value += 1;
                self.done = false;
                break;
            }
            *value = 0;
        }

        Some(item)
    }
}
