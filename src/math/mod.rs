//! Mathematical helper functions and macros.
//!
//! # Prefix Sums
//!
//! The resampling step builds a cumulative weight distribution over the ordered particle
//! population. [`cumulative_sum`] computes it with a single sequential scan, while
//! [`par_cumulative_sum`] splits the input into fixed-size chunks that are scanned in parallel
//! and then shifted by the running totals of all preceding chunks.
//!
//! Because the chunk boundaries only depend on the chunk size, the parallel variant produces the
//! same result independent of the number of threads in use.

mod prefix;

pub use prefix::{cumulative_sum, par_cumulative_sum};

/// A shorthand for converting constants to type `T`.
macro_rules! T {
    ($value: expr) => {
        T::from_f64($value).unwrap()
    };
}

macro_rules! exp {
    ($value: expr) => {
        num_traits::Float::exp($value)
    };
}

macro_rules! is_finite {
    ($value: expr) => {
        num_traits::Float::is_finite($value)
    };
}

macro_rules! ln {
    ($value: expr) => {
        num_traits::Float::ln($value)
    };
}

macro_rules! max {
    ($value: expr, $other: expr) => {
        num_traits::Float::max($value, $other)
    };
}

pub(crate) use T;
pub(crate) use exp;
pub(crate) use is_finite;
pub(crate) use ln;
pub(crate) use max;
