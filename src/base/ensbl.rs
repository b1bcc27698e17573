use crate::{
    base::{Particle, RCS, rng_streams},
    fXX,
    math::{is_finite, max},
    models::ConfigError,
};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A particle ensemble.
///
/// The ensemble owns the live particle population and a second buffer of the same size that
/// is not serialized.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct ParticleEnsbl<T>
where
    T: fXX,
{
    /// Live particle population.
    particles: Vec<Particle<T>>,

    /// Resampling gather target and rollback snapshot.
    #[serde(skip)]
    scratch: Vec<Particle<T>>,
}

impl<T> ParticleEnsbl<T>
where
    T: fXX,
{
    /// Returns the live population and the scratch buffer, resized to the population size.
    pub fn buffers_mut(&mut self) -> (&[Particle<T>], &mut [Particle<T>]) {
        self.scratch.resize(self.particles.len(), Particle::default());

        (&self.particles, &mut self.scratch)
    }

    /// Create a new [`ParticleEnsbl`] from an initial population.
    ///
    /// The weights are normalized, a population without any probability mass is assigned
    /// uniform weights instead.
    pub fn from_particles(mut particles: Vec<Particle<T>>) -> Result<Self, ConfigError<T>> {
        if particles.is_empty() {
            return Err(ConfigError::EmptyPopulation);
        }

        if let Some(index) = particles.iter().position(|particle| !particle.is_valid()) {
            return Err(ConfigError::InvalidParticle { index });
        }

        let weight_max = particles
            .iter()
            .fold(T::zero(), |acc, particle| max!(acc, particle.weight));

        let mut ensbl = if weight_max > T::zero() {
            // Scaling by the maximum first keeps the sum finite.
            particles
                .iter_mut()
                .for_each(|particle| particle.weight /= weight_max);

            let weight_total = particles.iter().map(|particle| particle.weight).sum::<T>();

            particles
                .iter_mut()
                .for_each(|particle| particle.weight /= weight_total);

            Self {
                particles,
                scratch: Vec::new(),
            }
        } else {
            let mut ensbl = Self {
                particles,
                scratch: Vec::new(),
            };

            ensbl.reset_weights();

            ensbl
        };

        ensbl.scratch.reserve_exact(ensbl.len());

        Ok(ensbl)
    }

    /// Returns true if the ensemble contains no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of members in the ensemble, also referred to as its 'length'.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Access the particle population.
    pub fn particles(&self) -> &[Particle<T>] {
        &self.particles
    }

    /// Mutably access the particle population.
    pub fn particles_mut(&mut self) -> &mut [Particle<T>] {
        &mut self.particles
    }

    /// Reset all weights to `1 / N`.
    pub fn reset_weights(&mut self) {
        let weight = T::one() / T::from_usize(self.len()).unwrap();

        self.particles
            .iter_mut()
            .for_each(|particle| particle.weight = weight);
    }

    /// Restore the population from the last [`ParticleEnsbl::snapshot`].
    pub fn restore(&mut self) {
        self.swap_buffers();
    }

    /// Copy the population into the scratch buffer.
    pub fn snapshot(&mut self) {
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.particles);
    }

    /// Swap the live population with the scratch buffer.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.particles, &mut self.scratch);
    }

    /// Create a new [`ParticleEnsbl`] with `size` uniformly weighted particles drawn uniformly
    /// from the axis-aligned box `[min, max]`.
    pub fn uniform(
        size: usize,
        range: ([T; 3], [T; 3]),
        rseed: u64,
    ) -> Result<Self, ConfigError<T>> {
        if size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }

        let (minv, maxv) = range;

        for axis in 0..3 {
            if !is_finite!(maxv[axis] - minv[axis]) || (minv[axis] > maxv[axis]) {
                return Err(ConfigError::InvalidRange {
                    axis,
                    minv: minv[axis],
                    maxv: maxv[axis],
                });
            }
        }

        let weight = T::one() / T::from_usize(size).unwrap();

        let mut particles = vec![Particle::default(); size];

        let streams = rng_streams(rseed, size.div_ceil(RCS));

        particles
            .par_chunks_mut(RCS)
            .zip_eq(streams.into_par_iter())
            .for_each(|(chunk, mut rng)| {
                chunk.iter_mut().for_each(|particle| {
                    particle.position = [0, 1, 2]
                        .map(|axis| rng.random_range(minv[axis]..=maxv[axis]))
                        .into();
                    particle.weight = weight;
                });
            });

        Ok(Self {
            particles,
            scratch: Vec::with_capacity(size),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_particles() {
        let ensbl = ParticleEnsbl::from_particles(vec![
            Particle::new([0.0, 0.0, 0.0], 3.0_f64),
            Particle::new([1.0, 0.0, 0.0], 1.0),
        ])
        .unwrap();

        assert!(ensbl.len() == 2);
        assert!((ensbl.particles()[0].weight - 0.75).abs() < 1e-12);
        assert!((ensbl.particles()[1].weight - 0.25).abs() < 1e-12);

        let ensbl =
            ParticleEnsbl::from_particles(vec![Particle::new([0.0, 0.0, 0.0], 0.0_f32); 4])
                .unwrap();

        assert!(ensbl.particles().iter().all(|p| p.weight == 0.25));

        let ensbl = ParticleEnsbl::from_particles(vec![
            Particle::new([0.0, 0.0, 0.0], f64::MAX),
            Particle::new([1.0, 0.0, 0.0], f64::MAX),
        ])
        .unwrap();

        assert!(ensbl.particles().iter().all(|p| p.weight == 0.5));
    }

    #[test]
    fn test_from_particles_invalid() {
        assert!(matches!(
            ParticleEnsbl::<f64>::from_particles(Vec::new()),
            Err(ConfigError::EmptyPopulation)
        ));

        assert!(matches!(
            ParticleEnsbl::from_particles(vec![
                Particle::new([0.0, 0.0, 0.0], 0.5_f64),
                Particle::new([0.0, 0.0, 0.0], -0.5),
            ]),
            Err(ConfigError::InvalidParticle { index: 1 })
        ));

        assert!(matches!(
            ParticleEnsbl::from_particles(vec![Particle::new([f32::NAN, 0.0, 0.0], 0.5)]),
            Err(ConfigError::InvalidParticle { index: 0 })
        ));
    }

    #[test]
    fn test_uniform() {
        let ensbl =
            ParticleEnsbl::uniform(1000, ([-1.0, 0.0, 5.0], [1.0, 2.0, 5.0]), 42).unwrap();

        assert!(ensbl.len() == 1000);
        assert!(ensbl.particles().iter().all(|p| {
            (-1.0..=1.0).contains(&p.position[0])
                && (0.0..=2.0).contains(&p.position[1])
                && (p.position[2] == 5.0)
                && (p.weight == 1.0 / 1000.0_f64)
        }));

        let other =
            ParticleEnsbl::uniform(1000, ([-1.0, 0.0, 5.0], [1.0, 2.0, 5.0]), 42).unwrap();

        assert!(ensbl.particles() == other.particles());

        assert!(matches!(
            ParticleEnsbl::uniform(10, ([0.0, 1.0, 0.0], [1.0, 0.0, 1.0]), 42),
            Err(ConfigError::InvalidRange { axis: 1, .. })
        ));
        assert!(matches!(
            ParticleEnsbl::uniform(10, ([-f64::MAX; 3], [f64::MAX; 3]), 42),
            Err(ConfigError::InvalidRange { axis: 0, .. })
        ));
        assert!(matches!(
            ParticleEnsbl::uniform(10, ([0.0, 0.0, f64::NEG_INFINITY], [1.0; 3]), 42),
            Err(ConfigError::InvalidRange { axis: 2, .. })
        ));
        assert!(matches!(
            ParticleEnsbl::<f32>::uniform(0, ([0.0; 3], [1.0; 3]), 42),
            Err(ConfigError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut ensbl = ParticleEnsbl::uniform(300, ([0.0; 3], [1.0; 3]), 3).unwrap();
        let expected = ensbl.particles().to_vec();

        ensbl.snapshot();

        ensbl.particles_mut().iter_mut().for_each(|p| {
            p.position *= 2.0_f64;
            p.weight = 0.0;
        });

        ensbl.restore();

        assert!(ensbl.particles() == expected.as_slice());

        let (source, target) = ensbl.buffers_mut();

        assert!(source.len() == target.len());
    }
}
