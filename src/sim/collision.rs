//! Blade/obstacle collision detection
//!
//! Purely geometric: a pass turns angular separation into a raw strength
//! and fires on zone entry, at most once per revolution per pair.
//! Thresholding lives in `gate`, never here.

use serde::{Deserialize, Serialize};

use super::obstacle::Obstacle;
use crate::angle_diff;
use crate::consts::HIT_TOLERANCE;

/// Geometric overlap score in [0, 1] for an angular separation
#[inline]
pub fn raw_strength(separation: f64, tolerance: f64) -> f32 {
    if tolerance <= 0.0 {
        return 0.0;
    }
    (1.0 - separation.abs() / tolerance).clamp(0.0, 1.0) as f32
}

/// A zone-entry edge for one (blade, obstacle) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub raw_strength: f32,
    pub blade_index: usize,
    pub obstacle_index: usize,
    /// Simulation time of the sub-step that detected the entry
    pub sim_time: f64,
}

/// Blade and obstacle geometry versions the zone state was sized for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryVersion {
    pub blades: u64,
    pub obstacles: u64,
}

/// Per-pair edge and revolution bookkeeping, indexed `blade * obstacles + obstacle`
#[derive(Debug, Clone, Default)]
pub struct HitZoneState {
    blade_count: usize,
    obstacle_count: usize,
    in_zone: Vec<bool>,
    /// Last revolution an event fired in (-1 = never)
    last_emitted_rev: Vec<i64>,
    synced: Option<GeometryVersion>,
}

impl HitZoneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version this state was last synchronized to
    pub fn version(&self) -> Option<GeometryVersion> {
        self.synced
    }

    pub fn blade_count(&self) -> usize {
        self.blade_count
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacle_count
    }

    /// Clear and resize for `blade_count × obstacle_count` pairs (idempotent)
    pub fn reset(&mut self, blade_count: usize, obstacle_count: usize, version: GeometryVersion) {
        let pairs = blade_count.saturating_mul(obstacle_count);
        self.blade_count = blade_count;
        self.obstacle_count = obstacle_count;
        self.in_zone.clear();
        self.in_zone.resize(pairs, false);
        self.last_emitted_rev.clear();
        self.last_emitted_rev.resize(pairs, -1);
        self.synced = Some(version);
    }

    /// Forget the synchronized version so the next pass resizes
    pub fn invalidate(&mut self) {
        self.synced = None;
    }

    #[inline]
    fn pair(&self, blade: usize, obstacle: usize) -> usize {
        blade * self.obstacle_count + obstacle
    }

    pub fn is_in_zone(&self, blade: usize, obstacle: usize) -> bool {
        if blade >= self.blade_count || obstacle >= self.obstacle_count {
            return false;
        }
        self.in_zone[self.pair(blade, obstacle)]
    }

    /// Run one sub-step pass over every (blade, obstacle) pair
    ///
    /// `blade_angles` are the wobble-adjusted angles for this sub-step.
    /// Disabled obstacles are tracked like any other so re-enabling one
    /// never produces a spurious edge.
    pub fn detect(
        &mut self,
        blade_angles: &[f64],
        obstacles: &[Obstacle],
        rev_index: i64,
        sim_time: f64,
        events: &mut Vec<CollisionEvent>,
    ) {
        if blade_angles.len() != self.blade_count || obstacles.len() != self.obstacle_count {
            log::warn!(
                "Skipping collision pass: zone state sized {}x{}, geometry is {}x{}",
                self.blade_count,
                self.obstacle_count,
                blade_angles.len(),
                obstacles.len()
            );
            return;
        }

        for (blade, &blade_angle) in blade_angles.iter().enumerate() {
            for (obstacle_index, obstacle) in obstacles.iter().enumerate() {
                let separation = angle_diff(blade_angle, obstacle.angle);
                let strength = raw_strength(separation, HIT_TOLERANCE);
                let in_zone = strength > 0.0;

                let pair = self.pair(blade, obstacle_index);
                let was_in_zone = self.in_zone[pair];
                self.in_zone[pair] = in_zone;

                if in_zone && !was_in_zone && rev_index > self.last_emitted_rev[pair] {
                    self.last_emitted_rev[pair] = rev_index;
                    events.push(CollisionEvent {
                        raw_strength: strength,
                        blade_index: blade,
                        obstacle_index,
                        sim_time,
                    });
                }
            }
        }
    }
}
