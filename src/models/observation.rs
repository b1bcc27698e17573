use crate::{
    base::{Observation, Particle},
    fXX,
    math::{T, exp, is_finite, ln, max},
    models::ConfigError,
};
use serde::{Deserialize, Serialize};

/// Gaussian sensor noise kernel.
///
/// A particle is scored against an observation using the residual between the distance to the
/// observed position and the observed value, `r = |p - o| - v`, which results in the likelihood
/// `exp(-r² / 2σ²)`. The likelihood is floored at [`fXX::likelihood_floor`] so that it never
/// vanishes exactly.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct ObservationModel<T>
where
    T: fXX,
{
    /// Standard deviation of the sensor noise kernel.
    pub std_deviation: T,
}

impl<T> ObservationModel<T>
where
    T: fXX,
{
    /// Create a new [`ObservationModel`].
    ///
    /// The standard deviation must be finite and strictly positive.
    pub fn new(std_deviation: T) -> Result<Self, ConfigError<T>> {
        let model = Self { std_deviation };

        model.validate()?;

        Ok(model)
    }

    /// Returns `true` if a log-likelihood value has hit the likelihood floor.
    pub fn is_negligible(&self, log_likelihood: T) -> bool {
        log_likelihood <= ln!(T::likelihood_floor())
    }

    /// Computes the likelihood of a particle given a single observation, within `(0, 1]`.
    pub fn likelihood(&self, particle: &Particle<T>, observation: &Observation<T>) -> T {
        max!(
            exp!(self.exponent(particle, observation)),
            T::likelihood_floor()
        )
    }

    /// Computes the floored log-likelihood of a particle given a single observation.
    pub fn log_likelihood(&self, particle: &Particle<T>, observation: &Observation<T>) -> T {
        max!(
            self.exponent(particle, observation),
            ln!(T::likelihood_floor())
        )
    }

    /// Computes the residual between the particle-observation distance and the observed value.
    pub fn residual(&self, particle: &Particle<T>, observation: &Observation<T>) -> T {
        (particle.position - observation.position).norm() - observation.value
    }

    /// Check for an invalid standard deviation.
    pub fn validate(&self) -> Result<(), ConfigError<T>> {
        if is_finite!(self.std_deviation) && (self.std_deviation > T::zero()) {
            Ok(())
        } else {
            Err(ConfigError::InvalidStdDeviation {
                name: "observation",
                value: self.std_deviation,
            })
        }
    }

    /// Computes the (unfloored) kernel exponent `-r² / 2σ²`.
    fn exponent(&self, particle: &Particle<T>, observation: &Observation<T>) -> T {
        let residual = self.residual(particle, observation);

        -(residual * residual) / (T!(2.0) * self.std_deviation * self.std_deviation)
    }
}
