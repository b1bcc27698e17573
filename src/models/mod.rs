//! Motion and observation models.
//!
//! A filter is configured with a [`Model`], which combines the two noise models that are
//! applied during a filtering step:
//! - [`MotionModel`] Gaussian process noise that is added to each particle position during the
//!   prediction phase.
//! - [`ObservationModel`] Gaussian sensor noise kernel that scores each particle against each
//!   observation during the update phase.
//!
//! The read-only parameter block that describes a single filtering step is represented by
//! [`Uniforms`].

mod motion;
mod observation;

pub use motion::MotionModel;
pub use observation::ObservationModel;

use crate::fXX;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors associated with an invalid filter configuration.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError<T> {
    #[error("particle count must be larger than zero")]
    EmptyPopulation,
    #[error("invalid particle at index {index}")]
    InvalidParticle { index: usize },
    #[error("invalid range along axis {axis} [{minv} - {maxv}]")]
    InvalidRange { axis: usize, minv: T, maxv: T },
    #[error("invalid {name} standard deviation {value}")]
    InvalidStdDeviation { name: &'static str, value: T },
    #[error("invalid effective sample size factor {value}, must be within [0, 1]")]
    InvalidThreshold { value: T },
}

/// The combined motion and observation model of a particle filter.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct Model<T>
where
    T: fXX,
{
    /// Process noise model.
    pub motion: MotionModel<T>,

    /// Sensor noise model.
    pub observation: ObservationModel<T>,
}

impl<T> Model<T>
where
    T: fXX,
{
    /// Create a new [`Model`] from the motion and observation noise standard deviations.
    pub fn new(motion_std: T, observation_std: T) -> Result<Self, ConfigError<T>> {
        Ok(Self {
            motion: MotionModel::new(motion_std)?,
            observation: ObservationModel::new(observation_std)?,
        })
    }

    /// Check both models for invalid parameters.
    pub fn validate(&self) -> Result<(), ConfigError<T>> {
        self.motion.validate()?;
        self.observation.validate()?;

        Ok(())
    }
}

/// The read-only parameter block that describes a single filtering step.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct Uniforms<T>
where
    T: fXX,
{
    /// Number of particles in the population.
    pub particle_count: usize,

    /// Number of observations in the observation batch.
    pub observation_count: usize,

    /// Model used for this filtering step.
    pub model: Model<T>,
}

impl<T> Uniforms<T>
where
    T: fXX,
{
    /// Create a new [`Uniforms`] parameter block.
    pub fn new(particle_count: usize, observation_count: usize, model: Model<T>) -> Self {
        Self {
            particle_count,
            observation_count,
            model,
        }
    }
}
