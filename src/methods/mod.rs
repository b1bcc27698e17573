//! Particle filtering methods.
//!
//! The three stages of a filtering step are implemented by:
//! - [`MotionModel::predict_ensbl`](crate::models::MotionModel::predict_ensbl) Motion
//!   propagation of the population (predict).
//! - [`update_weights`] Observation-likelihood weighting and normalization (update).
//! - [`resample_ensbl`] Systematic resampling of a degenerate population.
//!
//! The [`ParticleFilter`] type orchestrates these stages and owns the particle population.

mod filters;
mod resample;
mod weighting;

pub use filters::{
    CollapseRecovery, FilterState, ParticleFilter, ParticleFilterSettings,
    ParticleFilterSettingsBuilder, StepReport,
};
pub use resample::{resample_ensbl, systematic_indices};
pub use weighting::update_weights;

use thiserror::Error;

/// Errors associated with particle filters.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParticleFilterError<T> {
    #[error("dimension mismatch, expected {expected} {name} but found {found}")]
    DimensionMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("control input contains non-finite values")]
    InvalidControl,
    #[error("observation {index} contains non-finite values")]
    InvalidObservation { index: usize },
    #[error("step model does not match the filter model")]
    ModelMismatch,
    #[error("particle filter is not initialized")]
    Uninitialized,
    #[error("weight collapse, total probability mass is {sum}")]
    WeightCollapse { sum: T },
}
