//! Stationary obstacles around the fan
//!
//! The ring tracks a geometry version: any change in obstacle count or
//! angle bumps it so the detector knows to resynchronize its zone state.
//! Volume and enable toggles leave the geometry untouched.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::wrap_angle;

/// Maximum per-obstacle volume multiplier
pub const MAX_OBSTACLE_VOLUME: f32 = 1.5;

/// A stationary obstacle the blades strike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Angle around the hub (radians, [0, 2π))
    pub angle: f64,
    /// Sample to play; negative means the noise fallback voice
    pub sample_index: i32,
    /// Volume multiplier (0-1.5)
    pub volume: f32,
    pub enabled: bool,
}

impl Obstacle {
    pub fn new(angle: f64) -> Self {
        Self {
            angle: wrap_angle(angle),
            sample_index: -1,
            volume: 1.0,
            enabled: true,
        }
    }

    pub fn with_sample(mut self, sample_index: i32) -> Self {
        self.sample_index = sample_index;
        self
    }
}

/// Ordered list of obstacles with a geometry version
#[derive(Debug, Clone, Default)]
pub struct ObstacleRing {
    obstacles: Vec<Obstacle>,
    version: u64,
}

impl ObstacleRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` noise obstacles spread evenly around the ring
    pub fn evenly_spaced(count: usize) -> Self {
        let mut ring = Self::new();
        ring.resize(count);
        ring.distribute_evenly();
        ring
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Obstacle> {
        self.obstacles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn as_slice(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Geometry version (bumped on count or angle changes)
    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn push(&mut self, mut obstacle: Obstacle) {
        obstacle.angle = wrap_angle(obstacle.angle);
        obstacle.volume = obstacle.volume.clamp(0.0, MAX_OBSTACLE_VOLUME);
        self.obstacles.push(obstacle);
        self.bump();
    }

    pub fn remove(&mut self, index: usize) -> Option<Obstacle> {
        if index >= self.obstacles.len() {
            return None;
        }
        let removed = self.obstacles.remove(index);
        self.bump();
        Some(removed)
    }

    /// Grow with default obstacles at angle 0 or truncate to `count`
    pub fn resize(&mut self, count: usize) {
        if count == self.obstacles.len() {
            return;
        }
        self.obstacles.resize(count, Obstacle::new(0.0));
        self.bump();
    }

    pub fn set_angle(&mut self, index: usize, angle: f64) {
        if let Some(obstacle) = self.obstacles.get_mut(index) {
            obstacle.angle = wrap_angle(angle);
            self.bump();
        }
    }

    /// Re-derive obstacle angles so they sit evenly around the ring
    pub fn distribute_evenly(&mut self) {
        let count = self.obstacles.len();
        if count == 0 {
            return;
        }
        for (i, obstacle) in self.obstacles.iter_mut().enumerate() {
            obstacle.angle = wrap_angle(TAU * i as f64 / count as f64);
        }
        self.bump();
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(obstacle) = self.obstacles.get_mut(index) {
            obstacle.enabled = enabled;
        }
    }

    pub fn set_volume(&mut self, index: usize, volume: f32) {
        if let Some(obstacle) = self.obstacles.get_mut(index) {
            obstacle.volume = if volume.is_finite() {
                volume.clamp(0.0, MAX_OBSTACLE_VOLUME)
            } else {
                1.0
            };
        }
    }

    pub fn set_sample(&mut self, index: usize, sample_index: i32) {
        if let Some(obstacle) = self.obstacles.get_mut(index) {
            obstacle.sample_index = sample_index;
        }
    }
}
