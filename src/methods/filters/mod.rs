//! Particle filter controller.

use crate::{
    PFError,
    base::{Observation, Particle, ParticleEnsbl},
    fXX,
    math::{T, is_finite},
    methods::{ParticleFilterError, resample_ensbl, update_weights},
    models::{ConfigError, Model, Uniforms},
    stats::{ResampleScratch, mean, variance},
};
use derive_builder::Builder;
use log::{info, warn};
use nalgebra::Vector3;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::{io::Write, time::Instant};

/// Handling of a weight collapse during a filtering step.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum CollapseRecovery {
    /// Reset all weights to `1 / N` and continue the step.
    #[default]
    Uniform,

    /// Abort the step and restore the population to its state before the step.
    Reject,
}

/// The phases of a particle filter.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum FilterState {
    /// No particle population has been assigned.
    #[default]
    Uninitialized,

    /// Waiting for the next filtering step.
    Ready,

    /// Motion propagation.
    Predicting,

    /// Observation weighting.
    Weighting,

    /// Systematic resampling.
    Resampling,
}

/// A particle filter data structure.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct ParticleFilter<T>
where
    T: fXX,
{
    /// The particle ensemble.
    ensbl: Option<ParticleEnsbl<T>>,

    /// Iteration counter.
    iter: usize,

    /// Underlying model.
    model: Model<T>,

    /// Filter settings.
    settings: ParticleFilterSettings<T>,

    /// Current phase.
    state: FilterState,
}

/// Particle filter settings.
#[derive(Builder, Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(bound = "T: for<'x> Deserialize<'x> + Serialize")]
pub struct ParticleFilterSettings<T>
where
    T: fXX,
{
    /// Handling of a weight collapse.
    #[builder(default)]
    pub collapse_recovery: CollapseRecovery,

    /// Resampling is triggered once the effective sample size falls below `ess_factor` times
    /// the number of particles. Must be within `[0, 1]`.
    #[builder(default = T::from_f64(0.5).unwrap())]
    pub ess_factor: T,

    /// Random seed (initial & running).
    #[builder(default = 42)]
    pub rseed: u64,
}

impl<T> Default for ParticleFilterSettings<T>
where
    T: fXX,
{
    fn default() -> Self {
        Self {
            collapse_recovery: CollapseRecovery::default(),
            ess_factor: T!(0.5),
            rseed: 42,
        }
    }
}

impl<T> ParticleFilterSettings<T>
where
    T: fXX,
{
    /// Check for an invalid effective sample size factor.
    pub fn validate(&self) -> Result<(), ConfigError<T>> {
        if is_finite!(self.ess_factor)
            && (self.ess_factor >= T::zero())
            && (self.ess_factor <= T::one())
        {
            Ok(())
        } else {
            Err(ConfigError::InvalidThreshold {
                value: self.ess_factor,
            })
        }
    }
}

/// Summary of a single filtering step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport<T>
where
    T: fXX,
{
    /// Population statistics after the weight update.
    pub scratch: ResampleScratch<T>,

    /// Whether the population has been resampled.
    pub resampled: bool,

    /// Weighted mean position of the population.
    pub estimate: Option<Vector3<T>>,

    /// Weighted per-axis variance of the population.
    pub variance: Option<Vector3<T>>,

    /// Weight collapse that was recovered from during this step.
    pub recovered: Option<ParticleFilterError<T>>,

    /// Logarithm of the unnormalized probability mass of the weight update, `None` if the
    /// update collapsed.
    pub log_mass: Option<T>,
}

impl<T> ParticleFilter<T>
where
    T: fXX,
    StandardNormal: Distribution<T>,
{
    /// Access the particle ensemble.
    pub fn ensbl(&self) -> Option<&ParticleEnsbl<T>> {
        self.ensbl.as_ref()
    }

    /// Weighted mean position of the population.
    pub fn estimate(&self) -> Option<Vector3<T>> {
        mean(self.particles(), true)
    }

    /// Assign a new particle population.
    ///
    /// The weights are normalized, a population without any probability mass is assigned
    /// uniform weights.
    pub fn initialize(&mut self, particles: Vec<Particle<T>>) -> Result<(), PFError<T>> {
        self.ensbl = Some(ParticleEnsbl::from_particles(particles)?);
        self.state = FilterState::Ready;

        info!(
            "pf_initialize: {} particles",
            self.ensbl.as_ref().map_or(0, |ensbl| ensbl.len())
        );

        Ok(())
    }

    /// Number of completed filtering steps.
    pub fn iter(&self) -> usize {
        self.iter
    }

    /// Access the underlying model.
    pub fn model(&self) -> &Model<T> {
        &self.model
    }

    /// Create a new [`ParticleFilter`] without a particle population.
    pub fn new(model: Model<T>, settings: ParticleFilterSettings<T>) -> Result<Self, PFError<T>> {
        model.validate()?;
        settings.validate()?;

        Ok(Self {
            ensbl: None,
            iter: 0,
            model,
            settings,
            state: FilterState::Uninitialized,
        })
    }

    /// Access the particle population, empty if the filter is not initialized.
    pub fn particles(&self) -> &[Particle<T>] {
        self.ensbl
            .as_ref()
            .map(|ensbl| ensbl.particles())
            .unwrap_or_default()
    }

    /// Replace the underlying model.
    pub fn reconfigure(&mut self, model: Model<T>) -> Result<(), PFError<T>> {
        model.validate()?;

        self.model = model;

        Ok(())
    }

    /// Serialize the filter to a JSON file.
    pub fn save(&self, path: String) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;

        file.write_all(serde_json::to_string(&self)?.as_bytes())?;

        Ok(())
    }

    /// Access the filter settings.
    pub fn settings(&self) -> &ParticleFilterSettings<T> {
        &self.settings
    }

    /// Current phase of the filter.
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Perform a single filtering step without a control input.
    pub fn step(&mut self, observations: &[Observation<T>]) -> Result<StepReport<T>, PFError<T>> {
        self.step_with_control(observations, &Vector3::zeros())
    }

    /// Perform a single filtering step, every particle is additionally translated by `control`.
    pub fn step_with_control(
        &mut self,
        observations: &[Observation<T>],
        control: &Vector3<T>,
    ) -> Result<StepReport<T>, PFError<T>> {
        let particle_count = self
            .ensbl
            .as_ref()
            .ok_or(ParticleFilterError::Uninitialized)?
            .len();

        let uniforms = Uniforms::new(particle_count, observations.len(), self.model);

        self.step_with_uniforms(&uniforms, observations, control)
    }

    /// Perform a single filtering step with an explicit parameter block.
    ///
    /// The step runs the prediction, the weight update, and resamples the population if the
    /// effective sample size has fallen below the threshold. The parameter block and the
    /// observations are validated before the population is touched, so a rejected step leaves
    /// the population unchanged. The model of the parameter block must equal the model of the
    /// filter.
    pub fn step_with_uniforms(
        &mut self,
        uniforms: &Uniforms<T>,
        observations: &[Observation<T>],
        control: &Vector3<T>,
    ) -> Result<StepReport<T>, PFError<T>> {
        let start = Instant::now();

        let ensbl = self
            .ensbl
            .as_mut()
            .ok_or(ParticleFilterError::Uninitialized)?;

        if uniforms.particle_count != ensbl.len() {
            return Err(ParticleFilterError::DimensionMismatch {
                name: "particles",
                expected: ensbl.len(),
                found: uniforms.particle_count,
            }
            .into());
        }

        if uniforms.observation_count != observations.len() {
            return Err(ParticleFilterError::DimensionMismatch {
                name: "observations",
                expected: uniforms.observation_count,
                found: observations.len(),
            }
            .into());
        }

        if let Some(index) = observations
            .iter()
            .position(|observation| !observation.is_valid())
        {
            return Err(ParticleFilterError::InvalidObservation { index }.into());
        }

        if !control.iter().all(|value| is_finite!(*value)) {
            return Err(ParticleFilterError::InvalidControl.into());
        }

        if uniforms.model != self.model {
            return Err(ParticleFilterError::ModelMismatch.into());
        }

        let rseed = self.settings.rseed;

        if self.settings.collapse_recovery == CollapseRecovery::Reject {
            ensbl.snapshot();
        }

        self.state = FilterState::Predicting;

        uniforms
            .model
            .motion
            .predict_ensbl(ensbl.particles_mut(), control, rseed);

        self.state = FilterState::Weighting;

        let (log_mass, recovered) = match update_weights(
            ensbl.particles_mut(),
            observations,
            &uniforms.model.observation,
        ) {
            Ok(log_mass) => (Some(log_mass), None),
            Err(err) => match self.settings.collapse_recovery {
                CollapseRecovery::Uniform => {
                    warn!("pf_step {}: {}, resetting to uniform weights", self.iter, err);

                    ensbl.reset_weights();

                    (None, Some(err))
                }
                CollapseRecovery::Reject => {
                    warn!("pf_step {}: {}, rejecting step", self.iter, err);

                    ensbl.restore();
                    self.state = FilterState::Ready;

                    return Err(err.into());
                }
            },
        };

        let scratch = ResampleScratch::from_particles(ensbl.particles());
        let resampled = scratch.requires_resampling(self.settings.ess_factor, ensbl.len());

        if resampled {
            self.state = FilterState::Resampling;

            resample_ensbl(ensbl, rseed);
        }

        let estimate = mean(ensbl.particles(), true);
        let variance = estimate.and_then(|mean| variance(ensbl.particles(), &mean, true));

        info!(
            "pf_step {}: neff = {:.1} / {} | resampled = {} | {:.2} sec",
            self.iter,
            scratch.neff,
            ensbl.len(),
            resampled,
            start.elapsed().as_millis() as f64 / 1e3
        );

        self.iter += 1;
        self.settings.rseed = rseed.wrapping_add(1);
        self.state = FilterState::Ready;

        Ok(StepReport {
            scratch,
            resampled,
            estimate,
            variance,
            recovered,
            log_mass,
        })
    }

    /// Create a new [`ParticleFilter`] with `count` particles drawn uniformly from the
    /// axis-aligned box `[min, max]`.
    pub fn uniform(
        count: usize,
        range: ([T; 3], [T; 3]),
        model: Model<T>,
        settings: ParticleFilterSettings<T>,
    ) -> Result<Self, PFError<T>> {
        let mut filter = Self::new(model, settings)?;

        filter.ensbl = Some(ParticleEnsbl::uniform(
            count,
            range,
            filter.settings.rseed,
        )?);
        filter.state = FilterState::Ready;

        // Prevent the first prediction from reusing the initialization streams.
        filter.settings.rseed = filter.settings.rseed.wrapping_add(1);

        info!("pf_initialize: {} uniform particles", count);

        Ok(filter)
    }

    /// Weighted per-axis variance of the population.
    pub fn variance(&self) -> Option<Vector3<T>> {
        self.estimate()
            .and_then(|mean| variance(self.particles(), &mean, true))
    }
}
