//! # Statistics of a particle population.
//!
//! This module provides the [`ResampleScratch`] type that holds the statistics used to decide
//! whether a population must be resampled:
//! - `sum` The total probability mass of the population.
//! - `neff` The effective sample size (ESS), computed as `sum² / Σ wᵢ²` which is identical to
//!   `1 / Σ wᵢ²` for normalized weights.
//!
//! The ESS is bounded within `[1, N]`. A value of `N` corresponds to a uniformly weighted
//! population while a value close to one indicates that almost all probability mass is carried
//! by a single particle.
//!
//! Point estimates of the population are computed by [`mean`] and [`variance`].

mod estimate;

pub use estimate::{mean, variance};

use crate::{base::Particle, fXX};
use serde::{Deserialize, Serialize};

/// Transient population statistics that are recomputed during every filtering step.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct ResampleScratch<T>
where
    T: fXX,
{
    /// Total probability mass.
    pub sum: T,

    /// Effective sample size.
    pub neff: T,
}

impl<T> ResampleScratch<T>
where
    T: fXX,
{
    /// Compute the population statistics.
    ///
    /// A population without any probability mass has an effective sample size of zero.
    pub fn from_particles(particles: &[Particle<T>]) -> Self {
        let (sum, sum_sq) = particles
            .iter()
            .fold((T::zero(), T::zero()), |(sum, sum_sq), particle| {
                (sum + particle.weight, sum_sq + particle.weight * particle.weight)
            });

        let neff = if sum_sq > T::zero() {
            // Clamp to guard against rounding errors.
            num_traits::clamp(
                sum * sum / sum_sq,
                T::one(),
                T::from_usize(particles.len()).unwrap(),
            )
        } else {
            T::zero()
        };

        Self { sum, neff }
    }

    /// Returns `true` if the effective sample size has fallen below `ess_factor` times the
    /// number of particles.
    pub fn requires_resampling(&self, ess_factor: T, particle_count: usize) -> bool {
        self.neff < ess_factor * T::from_usize(particle_count).unwrap()
    }
}
