use crate::{fXX, math::is_finite};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A single particle, i.e. one weighted hypothesis of the 3D position.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct Particle<T>
where
    T: fXX,
{
    /// Hypothesized position.
    pub position: Vector3<T>,

    /// Probability mass assigned to this particle.
    pub weight: T,
}

impl<T> Particle<T>
where
    T: fXX,
{
    /// Returns `true` if the position is finite and the weight is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.position.iter().all(|value| is_finite!(*value))
            && is_finite!(self.weight)
            && (self.weight >= T::zero())
    }

    /// Create a new [`Particle`].
    pub fn new(position: [T; 3], weight: T) -> Self {
        Self {
            position: Vector3::from(position),
            weight,
        }
    }
}

impl<T> Display for Particle<T>
where
    T: fXX,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.3} | {:.3} | {:.3}] w={:.4}",
            self.position[0], self.position[1], self.position[2], self.weight
        )
    }
}

/// A single point observation.
///
/// The value is the measurement that a particle located exactly at the true position is expected
/// to produce, i.e. the measured range towards the observed position. A value of zero describes a
/// direct position fix.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct Observation<T>
where
    T: fXX,
{
    /// Observed (landmark) position.
    pub position: Vector3<T>,

    /// Measured value.
    pub value: T,
}

impl<T> Observation<T>
where
    T: fXX,
{
    /// Returns `true` if all entries are finite.
    pub fn is_valid(&self) -> bool {
        self.position.iter().all(|value| is_finite!(*value)) && is_finite!(self.value)
    }

    /// Create a new [`Observation`].
    pub fn new(position: [T; 3], value: T) -> Self {
        Self {
            position: Vector3::from(position),
            value,
        }
    }

    /// Create a new direct position fix, i.e. an [`Observation`] with a zero value.
    pub fn position_fix(position: [T; 3]) -> Self {
        Self::new(position, T::zero())
    }
}
