//! # Core building blocks of the **pfcore** crate.
//!
//! # Particles & Observations
//!
//! A single hypothesis of the filter is represented by a [`Particle`], i.e. a 3D position with an
//! associated (normalized or unnormalized) probability mass. Observations that are fed into the
//! filter are represented by [`Observation`], a 3D position with a scalar measurement value.
//!
//! # Particle Ensembles
//!
//! The particle population is stored within a [`ParticleEnsbl`], a fixed size buffer that is
//! allocated once and mutated in place during each filtering step. The ensemble carries a second
//! buffer of the same size, which is used as the gather target during resampling and as a
//! snapshot of the population whenever a filtering step needs to be rolled back.

mod ensbl;
mod particle;

pub use ensbl::ParticleEnsbl;
pub use particle::{Observation, Particle};

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// The base rayon chunk size that is used for any parallel iterators over a particle population.
///
/// Every chunk draws random numbers from its own seeded stream, the chunk size therefore also
/// determines the random number sequences that are used for a given seed.
pub const RCS: usize = 256;

/// Create `count` non-overlapping random number streams from a single seed.
///
/// Stream `k` starts `k` jumps (2^128 draws each) into the sequence seeded with `rseed`. Streams
/// created from different seeds start at unrelated states.
pub fn rng_streams(rseed: u64, count: usize) -> Vec<Xoshiro256PlusPlus> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(rseed);

    (0..count)
        .map(|_| {
            let stream = rng.clone();

            rng.jump();

            stream
        })
        .collect()
}
