//! Periodic brightness mask blended between the gradient and a backdrop colour.

use serde::{Deserialize, Serialize};

use crate::types::Rgb;

/// Smallest accepted number of mask periods across the 0..100 range.
pub const MIN_REVS: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    pub enabled: bool,
    /// Periods across the full 0..100 location range.
    pub num_revs: f64,
    /// Phase shift as a fraction of the 0..100 range, in `[0, 1)`.
    pub offset: f64,
    /// Fraction of each period that is on. Smoothing eats into the on and off
    /// spans in proportion.
    pub duty_cycle: f64,
    /// 0 gives hard edges; 1 gives half-period ramps and no flat top.
    pub smooth: f64,
    pub back_colour: Rgb,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            num_revs: 8.0,
            offset: 0.0,
            duty_cycle: 0.5,
            smooth: 0.5,
            back_colour: Rgb::BLACK,
        }
    }
}

impl MaskConfig {
    /// Copy with every field pulled into its valid range.
    pub fn sanitized(self) -> Self {
        let unit = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let num_revs = if self.num_revs.is_finite() { self.num_revs.max(MIN_REVS) } else { MIN_REVS };
        let offset = if self.offset.is_finite() { self.offset.rem_euclid(1.0) } else { 0.0 };
        Self {
            num_revs,
            // rem_euclid can round up to exactly 1.0 for tiny negative inputs.
            offset: if offset >= 1.0 { 0.0 } else { offset },
            duty_cycle: unit(self.duty_cycle),
            smooth: unit(self.smooth),
            ..self
        }
    }

    /// Period length in location units.
    pub fn period(&self) -> f64 {
        100.0 / self.sanitized().num_revs
    }

    /// Mask strength in `[0, 1]` at `location`.
    ///
    /// Each period is a trapezoid centred on phase 0.5. Both edges ramp
    /// linearly over `smooth / 2` of a period; what is left splits into a flat
    /// top of `duty * (1 - smooth)` and a flat bottom of
    /// `(1 - duty) * (1 - smooth)`. `smooth = 1` is a triangle whatever the
    /// duty cycle.
    ///
    /// `enabled` is not consulted here; callers decide whether to blend.
    pub fn mask_value(&self, location: f64) -> f64 {
        let cfg = self.sanitized();
        let phase = (cfg.num_revs * (location / 100.0 - cfg.offset)).rem_euclid(1.0);
        let from_centre = (phase - 0.5).abs();

        let half_top = cfg.duty_cycle * (1.0 - cfg.smooth) / 2.0;
        let ramp = cfg.smooth / 2.0;
        if ramp <= f64::EPSILON {
            return if from_centre < half_top || cfg.duty_cycle >= 1.0 { 1.0 } else { 0.0 };
        }
        (1.0 - (from_centre - half_top) / ramp).clamp(0.0, 1.0)
    }

    /// `lerp(back_colour, colour, mask_value(location))`.
    pub fn blend(&self, colour: Rgb, location: f64) -> Rgb {
        self.back_colour.lerp(colour, self.mask_value(location))
    }
}
