//! Six-stage RGB hue wheel.
//!
//! The wheel is 1530 units around: six stages of 255. Each stage pins two
//! channels at 0 or 255 and ramps the third, so the colour is continuous all
//! the way round, including across 1530 -> 0.

use std::f64::consts::TAU;

use crate::types::Rgba;

pub const STAGE_LEN: f64 = 255.0;
pub const HUE_WHEEL_PERIOD: f64 = 6.0 * STAGE_LEN;

/// Colour at `angle` on the wheel. Any finite angle is accepted and reduced
/// modulo 1530; non-finite angles map to 0.
pub fn angle_to_rgba(angle: f64, alpha: u8) -> Rgba {
    let angle = if angle.is_finite() { angle.rem_euclid(HUE_WHEEL_PERIOD) } else { 0.0 };
    let stage = ((angle / STAGE_LEN) as usize).min(5);
    let ramp = (angle - stage as f64 * STAGE_LEN).round().clamp(0.0, 255.0) as u8;
    let fall = 255 - ramp;

    match stage {
        0 => Rgba::new(255, ramp, 0, alpha), // red -> yellow
        1 => Rgba::new(fall, 255, 0, alpha), // yellow -> green
        2 => Rgba::new(0, 255, ramp, alpha), // green -> cyan
        3 => Rgba::new(0, fall, 255, alpha), // cyan -> blue
        4 => Rgba::new(ramp, 0, 255, alpha), // blue -> magenta
        _ => Rgba::new(255, 0, fall, alpha), // magenta -> red
    }
}

/// Map a phase in radians onto the wheel; one full turn is one full wheel.
pub fn phase_to_angle(phase: f64) -> f64 {
    phase / TAU * HUE_WHEEL_PERIOD
}
