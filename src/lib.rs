#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod base;
pub mod math;
pub mod methods;
pub mod models;
pub mod stats;

use methods::ParticleFilterError;
use models::ConfigError;
use nalgebra::{RealField, Scalar};
use num_traits::{Float, FromPrimitive};
use rand_distr::uniform::SampleUniform;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display},
    iter::Sum,
};
use thiserror::Error;

/// Generic container type for errors.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum PFError<T> {
    #[error("invalid configuration")]
    InvalidConfiguration(#[from] ConfigError<T>),
    #[error("particle filter error")]
    ParticleFilter(#[from] ParticleFilterError<T>),
}

/// A trait that describes a generic floating point numbers within the **pfcore** crate. In
/// practical terms this trait is only used for the f32/f64 types.
#[allow(non_camel_case_types)]
pub trait fXX:
    'static
    + Copy
    + Debug
    + Default
    + for<'x> Deserialize<'x>
    + Display
    + Float
    + FromPrimitive
    + RealField
    + SampleUniform
    + Scalar
    + Send
    + Serialize
    + Sum
    + for<'x> Sum<&'x Self>
    + Sync
{
    /// Returns the smallest value a likelihood kernel can take before it is considered to have
    /// underflowed.
    fn likelihood_floor() -> Self {
        <Self as Float>::min_positive_value()
    }
}

impl fXX for f32 {}
impl fXX for f64 {}
