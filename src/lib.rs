//! # Multi-State Stats
//!
//! Multidimensional counters broken down by the combination of device or
//! process states that were active while they accumulated.
//!
//! ## Core Concepts
//!
//! - **Axes**: orthogonal states such as on-battery, screen-on or process
//!   state, each with a small set of labelled values
//! - **Dimensions**: the metrics themselves, e.g. CPU time or network bytes,
//!   all represented as `i64`
//! - **Composite state**: every axis value packed into one integer
//! - **Serial state**: dense index of a composite state once untracked axes
//!   are folded away
//!
//! ## Example
//!
//! ```ignore
//! use multistate_stats::{StateAxis, StateSpaceFactory};
//! use std::sync::Arc;
//!
//! let factory = Arc::new(StateSpaceFactory::new(1, vec![
//!     StateAxis::new("battery", true, ["off", "on"])?,
//!     StateAxis::new("screen", false, ["off", "on"])?,
//! ])?);
//!
//! let mut stats = factory.create();
//! stats.set_state(0, 1, 0)?;
//! stats.increment(&[50], 200)?;
//! assert_eq!(stats.stats(&[1, 0])?, vec![50]);
//!
//! // Persist and restore
//! let doc = stats.to_document()?;
//! let mut restored = factory.create();
//! restored.read_document(&doc)?;
//! ```

pub mod codec;
pub mod counter;
pub mod error;
pub mod shared;
pub mod snapshot_file;
pub mod state;
pub mod stats;
pub mod tags;
pub mod types;

// Re-exports
pub use counter::{LongArrayMultiStateCounter, StateCounter};
pub use error::{Result, StatsError};
pub use shared::SharedMultiStateStats;
pub use snapshot_file::SnapshotFile;
pub use state::{StateCombinations, StateSpaceFactory};
pub use stats::{MultiStateStats, SNAPSHOT_TAG};
pub use tags::{
    Attribute, AttributeValue, TagCursor, TagDocument, TagEvent, TagEventKind, TagReader,
    TagWriter,
};
pub use types::*;
