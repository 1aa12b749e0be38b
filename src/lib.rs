//! Vent Fan Beat - a rotating fan sweeping past a ring of obstacles
//!
//! Core modules:
//! - `sim`: Fixed-step rotary collision detection and impact mapping
//! - `voice`: Mono/poly voice arbitration per obstacle
//! - `audio`: Audio-rendering backend seam and one-shot setup
//! - `samples`: Sample bank manifest
//! - `config`: Simulation configuration
//! - `simulator`: Driving-loop facade wiring everything together

pub mod audio;
pub mod config;
pub mod samples;
pub mod sim;
pub mod simulator;
pub mod voice;

pub use config::{ConfigError, SimulationConfig, VoiceMode};
pub use simulator::Simulator;

use std::f64::consts::{PI, TAU};

/// Numeric policy constants
pub mod consts {
    /// Sub-steps per outer tick (bounds angular travel per collision pass)
    pub const SUBSTEPS: u32 = 4;
    /// Angular tolerance of a hit zone (radians)
    pub const HIT_TOLERANCE: f64 = 0.25;
    /// Raw strengths below this are numerical noise, not hits
    pub const MIN_RAW_STRENGTH: f32 = 0.01;
    /// Below this `1 - threshold`, every surviving hit normalizes to 1
    pub const NORMALIZE_EPSILON: f32 = 1e-5;
    /// Share of the axis jitter used by the stochastic wobble term
    pub const JITTER_NOISE_SCALE: f64 = 0.15;
    /// Trailing window for the accepted-hit rate counter (seconds)
    pub const RATE_WINDOW_SECS: f64 = 1.0;
    /// Fast-release tail used when a mono voice is stolen (ms)
    pub const DEFAULT_RELEASE_TAIL_MS: f32 = 30.0;
    /// Largest blade count a configuration may ask for
    pub const MAX_BLADES: usize = 64;
}

/// Wrap an angle into [0, 2π)
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Smallest signed difference `a - b`, reduced into (−π, π]
#[inline]
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let mut diff = (a - b).rem_euclid(TAU);
    if diff > PI {
        diff -= TAU;
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_angle_range() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert!((wrap_angle(TAU + 0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_angle(-0.5) - (TAU - 0.5)).abs() < 1e-12);
        assert!(wrap_angle(-1e-18) < TAU);
    }

    #[test]
    fn test_angle_diff_shortest_way() {
        assert!((angle_diff(0.1, TAU - 0.1) - 0.2).abs() < 1e-12);
        assert!((angle_diff(TAU - 0.1, 0.1) + 0.2).abs() < 1e-12);
        // Exactly opposite reduces to +π, never −π
        assert!((angle_diff(PI, 0.0) - PI).abs() < 1e-12);
        assert!((angle_diff(0.0, PI) - PI).abs() < 1e-12);
    }
}
