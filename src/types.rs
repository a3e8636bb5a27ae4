//! Core types for multi-state stats.

use crate::error::{Result, StatsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One orthogonal state dimension, e.g. on-battery (`false`, `true`) or
/// process state (`top`, `foreground`, `background`, ...).
///
/// Values of an axis are 0-based indexes into `labels`. Index 0 is the
/// default value and is omitted from persisted snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateAxis {
    name: String,
    tracked: bool,
    labels: Vec<String>,
}

impl StateAxis {
    /// Create an axis. Fails if fewer than two labels are supplied.
    pub fn new<I, S>(name: impl Into<String>, tracked: bool, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() < 2 {
            return Err(StatsError::InvalidArgument(format!(
                "Invalid state axis '{}': {:?}. Should have at least two values.",
                name, labels
            )));
        }
        Ok(Self {
            name,
            tracked,
            labels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether values of this axis are accounted for separately.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of distinct values.
    pub fn cardinality(&self) -> usize {
        self.labels.len()
    }

    /// Index of the value carrying `label`.
    pub fn label_index(&self, label: &str) -> Option<u32> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| i as u32)
    }
}

/// All axis values packed into one integer as bit fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompositeState(pub u32);

impl fmt::Debug for CompositeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Composite({:#b})", self.0)
    }
}

/// Dense 0-based index of an equivalence class of composite states, as seen
/// by the counter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerialState(pub u32);

impl SerialState {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SerialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Serial({})", self.0)
    }
}

impl fmt::Display for SerialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_tracked() -> bool {
    true
}

/// Declarative description of one axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub name: String,

    #[serde(default = "default_tracked")]
    pub tracked: bool,

    pub labels: Vec<String>,
}

impl AxisConfig {
    pub fn into_axis(self) -> Result<StateAxis> {
        StateAxis::new(self.name, self.tracked, self.labels)
    }
}

impl From<&StateAxis> for AxisConfig {
    fn from(axis: &StateAxis) -> Self {
        Self {
            name: axis.name.clone(),
            tracked: axis.tracked,
            labels: axis.labels.clone(),
        }
    }
}

/// Declarative description of a state space.
///
/// ```ignore
/// {
///   "dimension_count": 2,
///   "axes": [
///     { "name": "battery", "labels": ["off", "on"] },
///     { "name": "screen", "tracked": false, "labels": ["off", "on"] }
///   ]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Number of metrics accumulated per state.
    pub dimension_count: usize,

    pub axes: Vec<AxisConfig>,
}

impl FactoryConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| StatsError::InvalidConfiguration(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
