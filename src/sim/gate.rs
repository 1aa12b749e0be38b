//! Hit gate and strength normalization
//!
//! The threshold is a hard gate: raw strengths under it are dropped, the
//! survivors are stretched back over the full [0, 1] range.

use std::collections::VecDeque;

use crate::consts::{MIN_RAW_STRENGTH, NORMALIZE_EPSILON, RATE_WINDOW_SECS};

/// Gate a raw strength against `threshold`
///
/// Returns the normalized strength, or `None` when the hit is noise or
/// falls under the threshold.
pub fn normalize_strength(raw_strength: f32, threshold: f32) -> Option<f32> {
    if !raw_strength.is_finite() || raw_strength < MIN_RAW_STRENGTH {
        return None;
    }
    let threshold = if threshold.is_finite() {
        threshold.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if raw_strength < threshold {
        return None;
    }

    let denom = 1.0 - threshold;
    if denom <= NORMALIZE_EPSILON {
        return Some(1.0);
    }
    Some(((raw_strength - threshold) / denom).clamp(0.0, 1.0))
}

/// Count of accepted hits in a trailing time window
///
/// Observability only; nothing in the detection path reads it.
#[derive(Debug, Clone)]
pub struct HitRateCounter {
    window: f64,
    stamps: VecDeque<f64>,
}

impl Default for HitRateCounter {
    fn default() -> Self {
        Self::new(RATE_WINDOW_SECS)
    }
}

impl HitRateCounter {
    pub fn new(window: f64) -> Self {
        Self {
            window: window.max(f64::EPSILON),
            stamps: VecDeque::new(),
        }
    }

    pub fn record(&mut self, time: f64) {
        self.stamps.push_back(time);
        self.expire(time);
    }

    /// Drop stamps older than the window ending at `now`
    pub fn expire(&mut self, now: f64) {
        while let Some(&oldest) = self.stamps.front() {
            if now - oldest > self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Accepted hits in the trailing window
    pub fn count(&self) -> usize {
        self.stamps.len()
    }

    /// Accepted hits per second over the window
    pub fn rate(&self) -> f64 {
        self.stamps.len() as f64 / self.window
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_noise_floor() {
        assert_eq!(normalize_strength(0.005, 0.0), None);
        assert_eq!(normalize_strength(0.01, 0.0), Some(0.01));
        assert_eq!(normalize_strength(f32::NAN, 0.0), None);
    }

    #[test]
    fn test_hard_gate_and_rescale() {
        assert_eq!(normalize_strength(0.3, 0.5), None);
        assert_eq!(normalize_strength(0.5, 0.5), Some(0.0));
        assert_eq!(normalize_strength(1.0, 0.5), Some(1.0));
        let s = normalize_strength(0.75, 0.5).unwrap();
        assert!((s - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_one_uses_convention() {
        assert_eq!(normalize_strength(1.0, 1.0), Some(1.0));
        assert_eq!(normalize_strength(0.9999, 1.0), None);
        // Out-of-range thresholds clamp
        assert_eq!(normalize_strength(1.0, 7.0), Some(1.0));
        assert_eq!(normalize_strength(0.4, -3.0), Some(0.4));
    }

    #[test]
    fn test_rate_counter_window() {
        let mut counter = HitRateCounter::new(1.0);
        for i in 0..10 {
            counter.record(i as f64 * 0.1);
        }
        assert_eq!(counter.count(), 10);
        counter.expire(1.45);
        assert_eq!(counter.count(), 5);
        assert!((counter.rate() - 5.0).abs() < 1e-9);
        counter.expire(10.0);
        assert_eq!(counter.count(), 0);
    }

    proptest! {
        #[test]
        fn prop_normalized_in_unit_range(raw in 0.0f32..=1.0, threshold in 0.0f32..=1.0) {
            if let Some(s) = normalize_strength(raw, threshold) {
                prop_assert!((0.0..=1.0).contains(&s));
            }
        }

        #[test]
        fn prop_gate_is_monotonic(raw in 0.0f32..=1.0, t1 in 0.0f32..=1.0, t2 in 0.0f32..=1.0) {
            let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            // Anything passing the higher threshold passes the lower one
            if normalize_strength(raw, hi).is_some() {
                prop_assert!(normalize_strength(raw, lo).is_some());
            }
        }

        #[test]
        fn prop_full_raw_normalizes_to_one(threshold in 0.0f32..1.0) {
            prop_assert_eq!(normalize_strength(1.0, threshold), Some(1.0));
        }
    }
}
