use crate::{
    base::{Particle, RCS, rng_streams},
    fXX,
    math::is_finite,
    models::ConfigError,
};
use log::debug;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Zero-mean Gaussian process noise that is applied independently along each axis.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct MotionModel<T>
where
    T: fXX,
{
    /// Standard deviation of the position noise per axis and prediction.
    pub std_deviation: T,
}

impl<T> MotionModel<T>
where
    T: fXX,
{
    /// Create a new [`MotionModel`].
    ///
    /// The standard deviation must be finite and non-negative, a value of zero describes a
    /// static motion model.
    pub fn new(std_deviation: T) -> Result<Self, ConfigError<T>> {
        let model = Self { std_deviation };

        model.validate()?;

        Ok(model)
    }

    /// Propagate a single particle by adding Gaussian noise and a deterministic control offset.
    ///
    /// The particle weight is not modified.
    pub fn predict(&self, particle: &mut Particle<T>, control: &Vector3<T>, rng: &mut impl Rng)
    where
        StandardNormal: Distribution<T>,
    {
        if self.std_deviation != T::zero() {
            particle.position +=
                Vector3::from_fn(|_, _| rng.sample::<T, _>(StandardNormal)) * self.std_deviation;
        }

        // Skipping a zero control keeps the positions bit-identical.
        if control.iter().any(|value| *value != T::zero()) {
            particle.position += control;
        }
    }

    /// Propagate an entire particle population.
    ///
    /// The population is split into chunks of [`RCS`] particles and each chunk draws from its
    /// own stream of [`rng_streams`], so that the outcome does not depend on the number of
    /// threads.
    pub fn predict_ensbl(&self, particles: &mut [Particle<T>], control: &Vector3<T>, rseed: u64)
    where
        StandardNormal: Distribution<T>,
    {
        let start = Instant::now();

        let streams = rng_streams(rseed, particles.len().div_ceil(RCS));

        particles
            .par_chunks_mut(RCS)
            .zip_eq(streams.into_par_iter())
            .for_each(|(chunk, mut rng)| {
                chunk
                    .iter_mut()
                    .for_each(|particle| self.predict(particle, control, &mut rng));
            });

        debug!(
            "pf_predict: {:2.2}M evaluations in {:.2} sec",
            particles.len() as f64 / 1e6,
            start.elapsed().as_millis() as f64 / 1e3
        );
    }

    /// Check for an invalid standard deviation.
    pub fn validate(&self) -> Result<(), ConfigError<T>> {
        if is_finite!(self.std_deviation) && (self.std_deviation >= T::zero()) {
            Ok(())
        } else {
            Err(ConfigError::InvalidStdDeviation {
                name: "motion",
                value: self.std_deviation,
            })
        }
    }
}
