use crate::{
    base::{Particle, ParticleEnsbl},
    fXX,
    math::{cumulative_sum, par_cumulative_sum},
};
use itertools::Itertools;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use std::time::Instant;

/// Weight vectors above this length use the chunked parallel prefix sum.
const PREFIX_CHUNK_SIZE: usize = 4096;

/// Draw `count` indices from the distribution described by `weights` using systematic
/// resampling.
///
/// A single uniform offset `u0` within `[0, total / count)` is drawn and index `k` is the first
/// particle whose cumulative weight exceeds `u0 + k * total / count`. The returned indices are
/// therefore sorted in ascending order. Particles without any weight are never selected.
pub fn systematic_indices<T>(weights: &[T], count: usize, rng: &mut impl Rng) -> Vec<usize>
where
    T: fXX,
{
    if weights.is_empty() || (count == 0) {
        return Vec::new();
    }

    let cdf = if weights.len() > PREFIX_CHUNK_SIZE {
        par_cumulative_sum(weights, PREFIX_CHUNK_SIZE)
    } else {
        cumulative_sum(weights)
    };

    let total = cdf[cdf.len() - 1];

    // Index of the last particle that carries any weight.
    let last = cdf
        .partition_point(|value| *value < total)
        .min(cdf.len() - 1);

    let stride = total / T::from_usize(count).unwrap();
    let offset = stride * rng.random_range(T::zero()..T::one());

    (0..count)
        .into_par_iter()
        .map(|k| select(&cdf, offset + stride * T::from_usize(k).unwrap(), last))
        .collect()
}

/// Resample a particle ensemble in place using systematic resampling.
///
/// The selected particles are gathered into the scratch buffer of the ensemble, which then
/// becomes the live population. All weights are reset to exactly `1 / N`. Returns the number of
/// distinct particles that survived.
pub fn resample_ensbl<T>(ensbl: &mut ParticleEnsbl<T>, rseed: u64) -> usize
where
    T: fXX,
{
    let start = Instant::now();

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(rseed);

    // Disjoint from the prediction streams of the same seed.
    rng.long_jump();

    let size = ensbl.len();
    let weight = T::one() / T::from_usize(size).unwrap();

    let indices = systematic_indices(
        &ensbl
            .particles()
            .iter()
            .map(|particle| particle.weight)
            .collect::<Vec<T>>(),
        size,
        &mut rng,
    );

    let (source, target) = ensbl.buffers_mut();

    target
        .par_iter_mut()
        .zip_eq(indices.par_iter())
        .for_each(|(slot, idx)| {
            *slot = Particle {
                position: source[*idx].position,
                weight,
            }
        });

    ensbl.swap_buffers();

    let unique = indices.iter().dedup().count();

    debug!(
        "pf_resample: {} / {} unique particles in {:.2} sec",
        unique,
        size,
        start.elapsed().as_millis() as f64 / 1e3
    );

    unique
}

/// Find the first index whose cumulative weight exceeds `target`, clamped to `last`.
fn select<T>(cdf: &[T], target: T, last: usize) -> usize
where
    T: fXX,
{
    cdf.partition_point(|value| *value <= target).min(last)
}
