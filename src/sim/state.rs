//! Simulation context
//!
//! Everything the detector mutates between steps lives here: time, the
//! jitter RNG, wobble phases and the per-pair zone state. Geometry changes
//! are tracked by version numbers; `advance` resynchronizes whenever the
//! cached version differs.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::{GeometryVersion, HitZoneState};
use super::gate::HitRateCounter;
use super::kinematics::{WobbleModel, blade_angle};
use super::obstacle::ObstacleRing;
use crate::config::SimulationConfig;

/// Explicit simulation context passed to `advance`
#[derive(Debug, Clone)]
pub struct SimContext {
    config: SimulationConfig,
    /// Simulation time (seconds)
    pub(crate) time: f64,
    /// Unwrapped angle the hub has turned through (radians)
    pub(crate) hub_angle: f64,
    /// Bumped whenever the blade count changes
    blade_version: u64,
    pub(crate) rng: Pcg32,
    pub(crate) wobble: WobbleModel,
    /// Blade count the wobble phases were locked for
    wobble_blades: Option<usize>,
    pub(crate) zones: HitZoneState,
    pub(crate) rate: HitRateCounter,
    /// Whole second of sim time the rate was last logged at
    pub(crate) last_rate_log: i64,
}

impl SimContext {
    pub fn new(config: SimulationConfig) -> Self {
        let config = config.sanitized();
        Self {
            rng: Pcg32::seed_from_u64(config.seed),
            wobble: WobbleModel::new(config.blade_count),
            wobble_blades: Some(config.blade_count),
            config,
            time: 0.0,
            hub_angle: 0.0,
            blade_version: 0,
            zones: HitZoneState::new(),
            rate: HitRateCounter::default(),
            last_rate_log: 0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replace the configuration (sanitized)
    ///
    /// A blade count change bumps the blade geometry version; the zone
    /// state and wobble phases resync before the next detection pass.
    pub fn set_config(&mut self, config: SimulationConfig) {
        let config = config.sanitized();
        if config.blade_count != self.config.blade_count {
            self.blade_version = self.blade_version.wrapping_add(1);
        }
        if config.seed != self.config.seed {
            self.rng = Pcg32::seed_from_u64(config.seed);
        }
        self.config = config;
    }

    pub fn set_blade_count(&mut self, blade_count: usize) {
        let config = SimulationConfig {
            blade_count,
            ..self.config.clone()
        };
        self.set_config(config);
    }

    pub fn set_hit_threshold(&mut self, threshold: f32) {
        let config = SimulationConfig {
            hit_threshold: threshold,
            ..self.config.clone()
        };
        self.set_config(config);
    }

    pub fn set_rpm(&mut self, rpm: f32) {
        let config = SimulationConfig {
            rpm,
            ..self.config.clone()
        };
        self.set_config(config);
    }

    /// Restart the jitter sequence from `seed`
    pub fn reseed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.rng = Pcg32::seed_from_u64(seed);
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn hub_angle(&self) -> f64 {
        self.hub_angle
    }

    /// Version the zone state must match for `obstacles`
    pub fn geometry_version(&self, obstacles: &ObstacleRing) -> GeometryVersion {
        GeometryVersion {
            blades: self.blade_version,
            obstacles: obstacles.version(),
        }
    }

    /// Clear the per-pair zone state for the current geometry (idempotent)
    pub fn reset_hit_zones(&mut self, obstacles: &ObstacleRing) {
        let version = self.geometry_version(obstacles);
        self.zones
            .reset(self.config.blade_count, obstacles.len(), version);
        log::info!(
            "Hit zones reset: {} blades x {} obstacles",
            self.config.blade_count,
            obstacles.len()
        );
    }

    /// Re-lock wobble phases to the current blade count (idempotent)
    pub fn reset_wobble_phases(&mut self) {
        self.wobble.lock_phases(self.config.blade_count);
        self.wobble_blades = Some(self.config.blade_count);
    }

    /// Resync zone state and wobble phases if the geometry moved on
    ///
    /// Ring versions are per-ring counters, so a different ring can carry
    /// the same version number. The zone dimensions are checked as well.
    pub(crate) fn sync_geometry(&mut self, obstacles: &ObstacleRing) {
        if self.wobble_blades != Some(self.config.blade_count) {
            self.reset_wobble_phases();
        }
        let stale = self.zones.version() != Some(self.geometry_version(obstacles))
            || self.zones.blade_count() != self.config.blade_count
            || self.zones.obstacle_count() != obstacles.len();
        if stale {
            self.reset_hit_zones(obstacles);
        }
    }

    /// Nominal (wobble-free) blade angles at the current time
    pub fn blade_angles(&self) -> Vec<f64> {
        let count = self.config.blade_count;
        (0..count)
            .map(|b| blade_angle(self.hub_angle, b, count))
            .collect()
    }

    pub fn hit_zones(&self) -> &HitZoneState {
        &self.zones
    }

    pub fn wobble(&self) -> &WobbleModel {
        &self.wobble
    }

    /// Accepted hits in the trailing second
    pub fn hit_rate(&self) -> usize {
        self.rate.count()
    }
}
