use crate::{base::Particle, fXX};
use nalgebra::Vector3;

/// Computes the mean position of a particle population.
///
/// If `weighted` is false every particle contributes equally. Returns `None` for an empty
/// population or a population without any probability mass.
pub fn mean<T>(particles: &[Particle<T>], weighted: bool) -> Option<Vector3<T>>
where
    T: fXX,
{
    weighted_sum(particles, weighted, |particle| particle.position)
}

/// Computes the per-axis variance of a particle population around `mean`.
///
/// If `weighted` is false every particle contributes equally. Returns `None` for an empty
/// population or a population without any probability mass.
pub fn variance<T>(
    particles: &[Particle<T>],
    mean: &Vector3<T>,
    weighted: bool,
) -> Option<Vector3<T>>
where
    T: fXX,
{
    weighted_sum(particles, weighted, |particle| {
        let delta = particle.position - mean;

        delta.component_mul(&delta)
    })
}

fn weighted_sum<T, F>(particles: &[Particle<T>], weighted: bool, func: F) -> Option<Vector3<T>>
where
    T: fXX,
    F: Fn(&Particle<T>) -> Vector3<T>,
{
    if particles.is_empty() {
        return None;
    }

    let uniform_weight = T::one() / T::from_usize(particles.len()).unwrap();

    let (total, weight_total) = particles.iter().fold(
        (Vector3::zeros(), T::zero()),
        |(total, weight_total), particle| {
            let weight = if weighted {
                particle.weight
            } else {
                uniform_weight
            };

            (total + func(particle) * weight, weight_total + weight)
        },
    );

    if weight_total > T::zero() {
        Some(total / weight_total)
    } else {
        None
    }
}
