//! Fixed sub-step simulation advance
//!
//! Each outer tick is split into `SUBSTEPS` equal sub-steps, each with its
//! own kinematics update and full collision pass, so narrow hit zones are
//! not skipped at high RPM.

use serde::{Deserialize, Serialize};

use super::collision::CollisionEvent;
use super::gate::normalize_strength;
use super::kinematics::{blade_angle, revolution_index};
use super::mapping::{impact_strength, soft_low_cut_factor};
use super::obstacle::{Obstacle, ObstacleRing};
use super::state::SimContext;
use crate::consts::SUBSTEPS;
use crate::wrap_angle;

/// Fully resolved hit handed to the audio renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitPayload {
    pub raw_strength: f32,
    /// Gated and rescaled strength in [0, 1]
    pub strength: f32,
    pub impact_strength: f32,
    pub soft_low_cut_factor: f32,
    pub blade_index: usize,
    pub obstacle_index: usize,
    pub obstacle: Obstacle,
    pub sim_time: f64,
}

/// Receiver of accepted hits
pub trait HitSink {
    fn hit(&mut self, payload: HitPayload);
}

impl<F: FnMut(HitPayload)> HitSink for F {
    fn hit(&mut self, payload: HitPayload) {
        self(payload)
    }
}

/// Advance the simulation by `dt` seconds
///
/// Returns the number of accepted hits delivered to `sink`. Non-positive
/// `dt` or RPM is a silent no-op.
pub fn advance<S: HitSink + ?Sized>(
    ctx: &mut SimContext,
    obstacles: &ObstacleRing,
    dt: f64,
    sink: &mut S,
) -> usize {
    let config = ctx.config().clone();
    let omega = config.angular_velocity();
    if !(dt > 0.0) || !dt.is_finite() || !(omega > 0.0) {
        return 0;
    }

    ctx.sync_geometry(obstacles);

    let blade_count = config.blade_count;
    let sub_dt = dt / SUBSTEPS as f64;
    let mut angles = Vec::with_capacity(blade_count);
    let mut events: Vec<CollisionEvent> = Vec::new();
    let mut accepted = 0;

    for _ in 0..SUBSTEPS {
        ctx.time += sub_dt;
        ctx.hub_angle += omega * sub_dt;
        let t = ctx.time;
        let hub = ctx.hub_angle;
        let rev = revolution_index(hub);

        angles.clear();
        for b in 0..blade_count {
            let wobble = ctx.wobble.offset(b, t, &config, &mut ctx.rng);
            angles.push(wrap_angle(blade_angle(hub, b, blade_count) + wobble));
        }

        events.clear();
        ctx.zones
            .detect(&angles, obstacles.as_slice(), rev, t, &mut events);

        for event in &events {
            let Some(obstacle) = obstacles.get(event.obstacle_index) else {
                continue;
            };
            if !obstacle.enabled {
                continue;
            }
            let Some(strength) = normalize_strength(event.raw_strength, config.hit_threshold)
            else {
                log::trace!(
                    "Gated hit blade {} obstacle {} (raw {:.3})",
                    event.blade_index,
                    event.obstacle_index,
                    event.raw_strength
                );
                continue;
            };

            ctx.rate.record(event.sim_time);
            accepted += 1;
            sink.hit(HitPayload {
                raw_strength: event.raw_strength,
                strength,
                impact_strength: impact_strength(strength, config.impact_dynamics),
                soft_low_cut_factor: soft_low_cut_factor(strength, config.soft_hit_low_cut_bias),
                blade_index: event.blade_index,
                obstacle_index: event.obstacle_index,
                obstacle: obstacle.clone(),
                sim_time: event.sim_time,
            });
        }
    }

    ctx.rate.expire(ctx.time);
    let second = ctx.time.floor() as i64;
    if second > ctx.last_rate_log {
        ctx.last_rate_log = second;
        log::debug!("Accepted hits/sec: {}", ctx.rate.count());
    }

    accepted
}
