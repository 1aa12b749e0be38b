//! Angular kinematics and the blade wobble model
//!
//! Blades are spread evenly around the hub. Each blade wobbles with a
//! deterministic sine term plus a small stochastic term drawn from the
//! context's seeded RNG.

use std::f64::consts::TAU;

use rand::Rng;

use crate::config::SimulationConfig;
use crate::consts::JITTER_NOISE_SCALE;
use crate::wrap_angle;

/// Angular offset of blade `blade` in a hub of `blade_count` blades
#[inline]
pub fn blade_offset(blade: usize, blade_count: usize) -> f64 {
    if blade_count == 0 {
        return 0.0;
    }
    TAU * blade as f64 / blade_count as f64
}

/// Nominal (wobble-free) blade angle in [0, 2π)
///
/// `hub_angle` is the unwrapped angle the hub has turned through since the
/// start. At constant ω it equals `ω·t`.
#[inline]
pub fn blade_angle(hub_angle: f64, blade: usize, blade_count: usize) -> f64 {
    wrap_angle(hub_angle + blade_offset(blade, blade_count))
}

/// Revolution index of the hub (shared across blades)
#[inline]
pub fn revolution_index(hub_angle: f64) -> i64 {
    (hub_angle / TAU).floor() as i64
}

/// Per-blade wobble phases
///
/// Phases are locked to `2π·b / blade_count` so the blades wobble out of
/// step with each other.
#[derive(Debug, Clone, Default)]
pub struct WobbleModel {
    phases: Vec<f64>,
}

impl WobbleModel {
    pub fn new(blade_count: usize) -> Self {
        let mut model = Self::default();
        model.lock_phases(blade_count);
        model
    }

    /// Re-derive the phase table for `blade_count` blades (idempotent)
    pub fn lock_phases(&mut self, blade_count: usize) {
        self.phases.clear();
        self.phases
            .extend((0..blade_count).map(|b| blade_offset(b, blade_count)));
    }

    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    /// Deterministic part of the wobble for `blade` at time `t`
    pub fn deterministic(&self, blade: usize, t: f64, config: &SimulationConfig) -> f64 {
        let phase = self.phases.get(blade).copied().unwrap_or(0.0);
        let amp = config.axis_jitter as f64;
        amp * (TAU * config.wobble_freq_hz as f64 * t + phase).sin()
    }

    /// Full wobble offset: the sine term plus a fresh U(-1, 1) draw
    pub fn offset<R: Rng>(
        &self,
        blade: usize,
        t: f64,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> f64 {
        let noise: f64 = rng.random_range(-1.0..=1.0);
        let amp = config.axis_jitter as f64;
        let jitter = amp * JITTER_NOISE_SCALE * config.timing_jitter_factor as f64 * noise;
        self.deterministic(blade, t, config) + jitter
    }
}
