use crate::{
    base::{Observation, Particle},
    fXX,
    math::{exp, is_finite, ln, max},
    methods::ParticleFilterError,
    models::ObservationModel,
};
use log::debug;
use rayon::prelude::*;
use std::time::Instant;

/// Update and normalize the particle weights given a batch of observations.
///
/// The weight of each particle is multiplied by the product of its likelihoods over all
/// observations. The product is accumulated in log-space and shifted by the population maximum
/// before it is exponentiated, so that large observation batches do not underflow.
///
/// Returns the logarithm of the total probability mass of the population before normalization.
/// An empty observation batch leaves the weights untouched.
///
/// If every particle has a negligible likelihood with respect to every observation, or the
/// total probability mass is zero or non-finite, a [`ParticleFilterError::WeightCollapse`] is
/// returned and the weights are left untouched.
pub fn update_weights<T>(
    particles: &mut [Particle<T>],
    observations: &[Observation<T>],
    model: &ObservationModel<T>,
) -> Result<T, ParticleFilterError<T>>
where
    T: fXX,
{
    if observations.is_empty() {
        return Ok(T::zero());
    }

    let start = Instant::now();

    let (log_weights, flags): (Vec<T>, Vec<bool>) = particles
        .par_iter()
        .map(|particle| {
            observations.iter().fold(
                (ln!(particle.weight), false),
                |(log_weight, informative), observation| {
                    let llh = model.log_likelihood(particle, observation);

                    (log_weight + llh, informative | !model.is_negligible(llh))
                },
            )
        })
        .unzip();

    let lw_max = log_weights
        .iter()
        .fold(T::neg_infinity(), |acc, value| max!(acc, *value));

    let weights = log_weights
        .par_iter()
        .map(|log_weight| exp!(*log_weight - lw_max))
        .collect::<Vec<T>>();

    let weights_total = weights.iter().sum::<T>();

    if !flags.iter().any(|flag| *flag)
        || !is_finite!(lw_max)
        || !is_finite!(weights_total)
        || (weights_total <= T::zero())
    {
        return Err(ParticleFilterError::WeightCollapse {
            sum: exp!(lw_max) * weights_total,
        });
    }

    particles
        .par_iter_mut()
        .zip_eq(weights.par_iter())
        .for_each(|(particle, weight)| particle.weight = *weight / weights_total);

    debug!(
        "pf_update: {:2.2}M evaluations in {:.2} sec",
        (particles.len() * observations.len()) as f64 / 1e6,
        start.elapsed().as_millis() as f64 / 1e3
    );

    Ok(lw_max + ln!(weights_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_update_scenario() {
        let model = ObservationModel::new(1.0).unwrap();

        let mut particles = vec![
            Particle::new([0.0, 0.0, 0.0], 0.25_f64),
            Particle::new([1.0, 0.0, 0.0], 0.25),
            Particle::new([0.0, 1.0, 0.0], 0.25),
            Particle::new([0.0, 0.0, 1.0], 0.25),
        ];

        update_weights(
            &mut particles,
            &[Observation::position_fix([0.0, 0.0, 0.0])],
            &model,
        )
        .unwrap();

        let total = particles.iter().map(|p| p.weight).sum::<f64>();

        assert!((total - 1.0).abs() < 1e-5);
        assert!(particles[1..].iter().all(|p| p.weight < particles[0].weight));
        assert!(relative_eq!(
            particles[0].weight,
            1.0 / (1.0 + 3.0 * (-0.5_f64).exp()),
            max_relative = 1e-12
        ));
    }

    #[test]
    fn test_update_ranges() {
        let model = ObservationModel::new(0.5).unwrap();

        let mut particles = vec![
            Particle::new([0.0, 0.0, 0.0], 0.5_f64),
            Particle::new([1.0, 1.0, 1.0], 0.5),
        ];

        let observations = [
            Observation::new([0.0, 0.0, 0.0], 0.0),
            Observation::new([1.0, 0.0, 0.0], 1.0),
            Observation::new([0.0, 1.0, 0.0], 1.0),
            Observation::new([0.0, 0.0, 1.0], 1.0),
        ];

        update_weights(&mut particles, &observations, &model).unwrap();

        assert!((particles[0].weight - 1.0).abs() < 1e-3);
        assert!(particles[1].weight.abs() < 1e-3);
        assert!(particles[1].weight > 0.0);
    }

    #[test]
    fn test_update_normalization() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        let model = ObservationModel::new(1.0_f32).unwrap();

        let mut particles = (0..2000)
            .map(|_| {
                Particle::new(
                    [
                        rng.random_range(-3.0..3.0),
                        rng.random_range(-3.0..3.0),
                        rng.random_range(-3.0..3.0),
                    ],
                    rng.random_range(0.1..1.0),
                )
            })
            .collect::<Vec<Particle<f32>>>();

        // The product of these likelihoods underflows in linear space.
        let observations = (0..40)
            .map(|idx| Observation::new([0.0, 0.0, 0.0], 4.0 + (idx % 3) as f32))
            .collect::<Vec<_>>();

        update_weights(&mut particles, &observations, &model).unwrap();

        let total = particles.iter().map(|p| p.weight as f64).sum::<f64>();

        assert!((total - 1.0).abs() < 1e-3);
        assert!(particles.iter().all(|p| p.is_valid()));
        assert!(particles.iter().filter(|p| p.weight > 0.0).count() > 1);
    }

    #[test]
    fn test_update_empty_batch() {
        let model = ObservationModel::new(1.0).unwrap();

        let mut particles = vec![
            Particle::new([0.0, 0.0, 0.0], 0.9_f64),
            Particle::new([1.0, 0.0, 0.0], 0.3),
        ];
        let expected = particles.clone();

        assert!(update_weights(&mut particles, &[], &model).unwrap() == 0.0);
        assert!(particles == expected);
    }

    #[test]
    fn test_update_collapse() {
        let model = ObservationModel::new(1.0).unwrap();

        let mut particles = vec![
            Particle::new([0.0, 0.0, 0.0], 0.5_f64),
            Particle::new([1.0, 0.0, 0.0], 0.5),
        ];
        let expected = particles.clone();

        let result = update_weights(
            &mut particles,
            &[Observation::position_fix([1e6, 0.0, 0.0])],
            &model,
        );

        assert!(matches!(
            result,
            Err(ParticleFilterError::WeightCollapse { .. })
        ));
        assert!(particles == expected);

        let mut particles = vec![Particle::new([0.0, 0.0, 0.0], 0.0_f64); 3];

        let result = update_weights(
            &mut particles,
            &[Observation::position_fix([0.0, 0.0, 0.0])],
            &model,
        );

        assert!(matches!(
            result,
            Err(ParticleFilterError::WeightCollapse { .. })
        ));
    }
}
