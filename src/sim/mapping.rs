//! Strength to render-control mapping
//!
//! Both mappers are total: inputs are clamped, never rejected.

#[inline]
fn unit(x: f32) -> f32 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}

/// Amplitude/decay shaping value for a hit
///
/// `dynamics = 0` flattens every hit to 1, `dynamics = 1` passes the
/// strength straight through.
pub fn impact_strength(strength: f32, dynamics: f32) -> f32 {
    let dyn_range = unit(dynamics);
    // 1 - d·(1 - s), expanded so both ends are exact
    (dyn_range * unit(strength) + (1.0 - dyn_range)).clamp(0.0, 1.0)
}

/// Tone low-cut bias: weak hits get a larger factor (thinner sound)
pub fn soft_low_cut_factor(strength: f32, bias: f32) -> f32 {
    unit(bias) * (1.0 - unit(strength))
}
