//! Rotary collision simulation
//!
//! All detection logic lives here. This module must stay pure:
//! - Fixed sub-steps only
//! - Seeded RNG only (owned by the context)
//! - Stable iteration order (blade index, then obstacle index)
//! - No audio or platform dependencies

pub mod collision;
pub mod gate;
pub mod kinematics;
pub mod mapping;
pub mod obstacle;
pub mod state;
pub mod tick;

pub use collision::{CollisionEvent, GeometryVersion, HitZoneState, raw_strength};
pub use gate::{HitRateCounter, normalize_strength};
pub use kinematics::{WobbleModel, blade_angle, revolution_index};
pub use mapping::{impact_strength, soft_low_cut_factor};
pub use obstacle::{Obstacle, ObstacleRing};
pub use state::SimContext;
pub use tick::{HitPayload, HitSink, advance};
