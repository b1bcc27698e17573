use crate::fXX;
use rayon::prelude::*;

/// Computes the inclusive prefix sums of `values` with a single sequential scan.
pub fn cumulative_sum<T>(values: &[T]) -> Vec<T>
where
    T: fXX,
{
    values
        .iter()
        .scan(T::zero(), |acc, value| {
            *acc += *value;

            Some(*acc)
        })
        .collect()
}

/// Computes the inclusive prefix sums of `values` in parallel.
///
/// The input is split into chunks of `chunk_size` elements. Each chunk is scanned
/// independently, the chunk totals are accumulated sequentially and finally added as offsets
/// to all subsequent chunks.
pub fn par_cumulative_sum<T>(values: &[T], chunk_size: usize) -> Vec<T>
where
    T: fXX,
{
    let chunk_size = chunk_size.max(1);

    let mut sums = vec![T::zero(); values.len()];

    sums.par_chunks_mut(chunk_size)
        .zip(values.par_chunks(chunk_size))
        .for_each(|(target, source)| {
            let mut acc = T::zero();

            target.iter_mut().zip(source).for_each(|(sum, value)| {
                acc += *value;
                *sum = acc;
            });
        });

    // Running total of all chunks preceding each chunk.
    let offsets = sums
        .chunks(chunk_size)
        .scan(T::zero(), |acc, chunk| {
            let offset = *acc;
            *acc += chunk[chunk.len() - 1];

            Some(offset)
        })
        .collect::<Vec<T>>();

    sums.par_chunks_mut(chunk_size)
        .zip(offsets.par_iter())
        .skip(1)
        .for_each(|(chunk, offset)| chunk.iter_mut().for_each(|sum| *sum += *offset));

    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_cumulative_sum() {
        assert!(cumulative_sum::<f64>(&[]).is_empty());
        assert!(cumulative_sum(&[0.5_f64, 0.25, 0.0, 0.25]) == vec![0.5, 0.75, 0.75, 1.0]);
        assert!(par_cumulative_sum(&[0.5_f64, 0.25, 0.0, 0.25], 3) == vec![0.5, 0.75, 0.75, 1.0]);
        assert!(par_cumulative_sum::<f32>(&[], 16).is_empty());
    }

    #[test]
    fn test_par_cumulative_sum() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);

        let values = (0..10_007)
            .map(|_| rng.random_range(0.0..1.0))
            .collect::<Vec<f64>>();

        let sequential = cumulative_sum(&values);

        for chunk_size in [1, 7, 64, 4096, 20_000] {
            let parallel = par_cumulative_sum(&values, chunk_size);

            assert!(parallel.len() == values.len());
            assert!(
                sequential
                    .iter()
                    .zip(parallel.iter())
                    .all(|(a, b)| (a - b).abs() < 1e-9)
            );
        }
    }

    #[test]
    fn test_par_cumulative_sum_threads() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);

        let values = (0..50_000)
            .map(|_| rng.random_range(0.0..1.0))
            .collect::<Vec<f64>>();

        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| par_cumulative_sum(&values, 4096));

        let parallel = par_cumulative_sum(&values, 4096);

        assert!(
            single
                .iter()
                .zip(parallel.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
        );
    }
}
