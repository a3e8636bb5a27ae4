//! State space: how combinations of axis values map to counter states.
//!
//! A [`StateSpaceFactory`] packs axis values into a composite state and
//! folds composite states into dense serial states. [`StateCombinations`]
//! walks every combination of tracked axis values.

mod combinations;
mod factory;

pub use combinations::StateCombinations;
pub use factory::StateSpaceFactory;
