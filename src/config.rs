//! Simulation configuration
//!
//! Mutated by the outer control surface between frames; the core only ever
//! reads a sanitized copy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_RELEASE_TAIL_MS, MAX_BLADES};

/// Errors from parsing configuration or manifest JSON
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How overlapping hits on the same obstacle are voiced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VoiceMode {
    /// At most one audible voice per obstacle; a new hit cuts the old one
    #[default]
    Mono,
    /// Voices overlap freely
    Poly,
}

impl VoiceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceMode::Mono => "Mono",
            VoiceMode::Poly => "Poly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mono" => Some(VoiceMode::Mono),
            "poly" => Some(VoiceMode::Poly),
            _ => None,
        }
    }
}

/// Fan and hit-shaping parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Revolutions per minute (the fan only turns when > 0)
    pub rpm: f32,
    /// Number of blades
    pub blade_count: usize,
    /// Wobble amplitude (radians)
    pub axis_jitter: f32,
    /// Deterministic wobble frequency (Hz)
    pub wobble_freq_hz: f32,
    /// Scales the stochastic wobble term (0-1)
    pub timing_jitter_factor: f32,
    /// Raw strengths below this are gated out (0-1)
    pub hit_threshold: f32,
    /// 0 = every hit equally loud, 1 = full dynamic range
    pub impact_dynamics: f32,
    /// How much thinner soft hits sound (0-1)
    pub soft_hit_low_cut_bias: f32,

    // === Voicing ===
    pub voice_mode: VoiceMode,
    /// Fade length of a stolen mono voice
    pub release_tail_ms: f32,

    /// Seed for the wobble jitter RNG
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rpm: 200.0,
            blade_count: 3,
            axis_jitter: 0.0,
            wobble_freq_hz: 0.0,
            timing_jitter_factor: 0.0,
            hit_threshold: 0.12,
            impact_dynamics: 1.0,
            soft_hit_low_cut_bias: 0.0,

            voice_mode: VoiceMode::Mono,
            release_tail_ms: DEFAULT_RELEASE_TAIL_MS,

            seed: 0x5EED_F00D,
        }
    }
}

/// Replace non-finite values with `fallback`, then clamp
fn finite_clamped(value: f32, fallback: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

impl SimulationConfig {
    /// Copy with every field coerced into its documented range
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            rpm: finite_clamped(self.rpm, 0.0, f32::MIN, f32::MAX),
            blade_count: self.blade_count.min(MAX_BLADES),
            axis_jitter: finite_clamped(self.axis_jitter, d.axis_jitter, 0.0, f32::MAX),
            wobble_freq_hz: finite_clamped(self.wobble_freq_hz, d.wobble_freq_hz, 0.0, f32::MAX),
            timing_jitter_factor: finite_clamped(
                self.timing_jitter_factor,
                d.timing_jitter_factor,
                0.0,
                1.0,
            ),
            hit_threshold: finite_clamped(self.hit_threshold, d.hit_threshold, 0.0, 1.0),
            impact_dynamics: finite_clamped(self.impact_dynamics, d.impact_dynamics, 0.0, 1.0),
            soft_hit_low_cut_bias: finite_clamped(
                self.soft_hit_low_cut_bias,
                d.soft_hit_low_cut_bias,
                0.0,
                1.0,
            ),
            voice_mode: self.voice_mode,
            release_tail_ms: (self.release_tail_secs() * 1000.0) as f32,
            seed: self.seed,
        }
    }

    /// Angular velocity in radians/sec
    pub fn angular_velocity(&self) -> f64 {
        (self.rpm as f64 / 60.0) * std::f64::consts::TAU
    }

    /// Release tail in seconds, falling back to the default when unset
    pub fn release_tail_secs(&self) -> f64 {
        let ms = if self.release_tail_ms.is_finite() && self.release_tail_ms > 0.0 {
            self.release_tail_ms
        } else {
            DEFAULT_RELEASE_TAIL_MS
        };
        ms as f64 / 1000.0
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_ranges() {
        let cfg = SimulationConfig {
            hit_threshold: 3.0,
            impact_dynamics: -1.0,
            timing_jitter_factor: 7.0,
            axis_jitter: -0.2,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.hit_threshold, 1.0);
        assert_eq!(cfg.impact_dynamics, 0.0);
        assert_eq!(cfg.timing_jitter_factor, 1.0);
        assert_eq!(cfg.axis_jitter, 0.0);
    }

    #[test]
    fn test_sanitize_caps_blade_count() {
        let cfg = SimulationConfig::from_json(r#"{ "blade_count": 18446744073709551615 }"#)
            .unwrap()
            .sanitized();
        assert_eq!(cfg.blade_count, MAX_BLADES);
    }

    #[test]
    fn test_sanitize_non_finite_falls_back() {
        let cfg = SimulationConfig {
            rpm: f32::NAN,
            hit_threshold: f32::INFINITY,
            release_tail_ms: f32::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.rpm, 0.0);
        assert_eq!(cfg.hit_threshold, 0.12);
        assert_eq!(cfg.release_tail_ms, DEFAULT_RELEASE_TAIL_MS);
    }

    #[test]
    fn test_release_tail_default_when_missing() {
        let cfg = SimulationConfig::from_json(r#"{ "rpm": 120.0, "release_tail_ms": 0.0 }"#)
            .unwrap();
        assert_eq!(cfg.rpm, 120.0);
        assert_eq!(cfg.blade_count, 3);
        assert!((cfg.release_tail_secs() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_json_round_trip_and_bad_input() {
        let cfg = SimulationConfig {
            voice_mode: VoiceMode::Poly,
            ..Default::default()
        };
        let back = SimulationConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
        assert!(SimulationConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_voice_mode_from_str() {
        assert_eq!(VoiceMode::from_str("MONO"), Some(VoiceMode::Mono));
        assert_eq!(VoiceMode::from_str("poly"), Some(VoiceMode::Poly));
        assert_eq!(VoiceMode::from_str("stereo"), None);
        assert_eq!(VoiceMode::Poly.as_str(), "Poly");
    }
}
