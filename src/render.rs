//! Turning a complex field into pixels.
//!
//! The simulator stays colour-agnostic; this module picks a scalar out of every
//! phasor and maps it through the gradient (optionally masked) or the hue wheel.

use std::f64::consts::PI;

use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::field::{EmitterArrangement, compute_field_into, far_field_peak};
use crate::gradient::GradientLut;
use crate::hue::{HUE_WHEEL_PERIOD, angle_to_rgba};
use crate::mask::MaskConfig;
use crate::types::{ComplexField, PixelBuffer};

/// Which scalar is read out of each phasor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarSource {
    /// Real part: the instantaneous wave height.
    #[default]
    Real,
    Magnitude,
    /// Squared magnitude.
    Intensity,
    /// Argument, `[-π, π)` spread over the full palette.
    Phase,
}

impl ScalarSource {
    pub fn next(self) -> Self {
        match self {
            ScalarSource::Real => ScalarSource::Magnitude,
            ScalarSource::Magnitude => ScalarSource::Intensity,
            ScalarSource::Intensity => ScalarSource::Phase,
            ScalarSource::Phase => ScalarSource::Real,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    #[default]
    Gradient,
    HueWheel,
}

impl Palette {
    pub fn next(self) -> Self {
        match self {
            Palette::Gradient => Palette::HueWheel,
            Palette::HueWheel => Palette::Gradient,
        }
    }
}

/// What non-phase scalars are divided by before colouring.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Largest finite magnitude in the field, skipping the near-field cells on
    /// top of a source when the emitter layout is known.
    #[default]
    Peak,
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColourPolicy {
    pub source: ScalarSource,
    pub palette: Palette,
    pub normalization: Normalization,
}

impl ColourPolicy {
    /// Unit scalar in `[0, 1]` for `z`, given the normalising magnitude `peak`.
    pub fn unit_scalar(&self, z: Complex64, peak: f64) -> f64 {
        let v = match self.source {
            ScalarSource::Real => 0.5 + 0.5 * z.re / peak,
            ScalarSource::Magnitude => z.norm() / peak,
            ScalarSource::Intensity => z.norm_sqr() / (peak * peak),
            ScalarSource::Phase => return ((z.arg() + PI) / (2.0 * PI)).rem_euclid(1.0),
        };
        if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
    }

    /// Magnitude that non-phase scalars are divided by. Never zero.
    ///
    /// Without `arrangement`, peak normalisation sees every finite cell,
    /// including the spike at an emitter sitting on a pixel centre.
    pub fn scale(&self, field: &ComplexField, arrangement: Option<&EmitterArrangement>) -> f64 {
        let peak = match (self.normalization, arrangement) {
            (Normalization::Fixed(v), _) => v.abs(),
            (Normalization::Peak, Some(arrangement)) => far_field_peak(field, arrangement),
            (Normalization::Peak, None) => field
                .as_slice()
                .par_iter()
                .map(|z| z.norm())
                .filter(|n| n.is_finite())
                .reduce(|| 0.0, f64::max),
        };
        if peak > 0.0 && peak.is_finite() { peak } else { 1.0 }
    }
}

/// Colour every phasor of `field`, normalising over the whole field. Mask
/// blending applies only with the gradient palette and an enabled mask.
pub fn to_pixel_buffer(
    field: &ComplexField,
    policy: &ColourPolicy,
    gradient: &GradientLut,
    mask: &MaskConfig,
) -> PixelBuffer {
    colour_field(field, policy, policy.scale(field, None), gradient, mask)
}

/// `to_pixel_buffer` with a caller-chosen normalising magnitude.
pub fn colour_field(
    field: &ComplexField,
    policy: &ColourPolicy,
    peak: f64,
    gradient: &GradientLut,
    mask: &MaskConfig,
) -> PixelBuffer {
    let mask = mask.sanitized();
    let mut out = PixelBuffer::with_origin(field.x_left(), field.y_top(), field.width(), field.height(), 0);

    out.as_mut_slice().par_iter_mut().zip(field.as_slice().par_iter()).for_each(|(px, z)| {
        let s = policy.unit_scalar(*z, peak);
        let colour = match policy.palette {
            Palette::Gradient => {
                let location = s * 100.0;
                let c = gradient.colour_at(location);
                if mask.enabled { mask.blend(c, location) } else { c }
            }
            Palette::HueWheel => angle_to_rgba(s * HUE_WHEEL_PERIOD, 255).rgb(),
        };
        *px = colour.to_u32();
    });
    out
}

/// Everything one frame needs, captured at request time.
#[derive(Debug, Clone)]
pub struct RenderInput<'a> {
    pub width: usize,
    pub height: usize,
    pub arrangement: &'a EmitterArrangement,
    pub policy: &'a ColourPolicy,
    pub gradient: &'a GradientLut,
    pub mask: &'a MaskConfig,
}

/// Simulate and colour one frame synchronously.
pub fn render(input: &RenderInput<'_>) -> Result<PixelBuffer, RenderError> {
    render_with_cancel(input, || false)
}

pub fn render_with_cancel<F>(input: &RenderInput<'_>, cancelled: F) -> Result<PixelBuffer, RenderError>
where
    F: Fn() -> bool + Sync,
{
    if input.width == 0 || input.height == 0 {
        return Err(RenderError::InvalidDimensions { width: input.width, height: input.height });
    }
    let mut field = ComplexField::new(input.width, input.height, Complex64::new(0.0, 0.0));
    compute_field_into(&mut field, input.arrangement, &cancelled)?;
    if cancelled() {
        return Err(RenderError::Cancelled { generation: 0 });
    }
    let peak = input.policy.scale(&field, Some(input.arrangement));
    Ok(colour_field(&field, input.policy, peak, input.gradient, input.mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Emitter, WaveParams};
    use crate::gradient::{ColourAnchor, ColourGradient};
    use crate::types::Rgb;

    fn grey_lut() -> std::sync::Arc<GradientLut> {
        ColourGradient::new(
            vec![ColourAnchor::new(Rgb::BLACK, 0.0), ColourAnchor::new(Rgb::WHITE, 100.0)],
            100,
        )
        .lut()
    }

    #[test]
    fn scalars_land_in_unit_range() {
        let policy = ColourPolicy::default();
        assert_eq!(policy.unit_scalar(Complex64::new(2.0, 0.0), 2.0), 1.0);
        assert_eq!(policy.unit_scalar(Complex64::new(-2.0, 0.0), 2.0), 0.0);
        assert_eq!(policy.unit_scalar(Complex64::new(0.0, 5.0), 2.0), 0.5);

        let phase = ColourPolicy { source: ScalarSource::Phase, ..policy };
        assert!((phase.unit_scalar(Complex64::new(1.0, 0.0), 1.0) - 0.5).abs() < 1e-12);
        assert!(phase.unit_scalar(Complex64::new(-1.0, -1e-12), 1.0) < 0.01);

        let magnitude = ColourPolicy { source: ScalarSource::Magnitude, ..policy };
        assert_eq!(magnitude.unit_scalar(Complex64::new(30.0, 40.0), 100.0), 0.5);
        let intensity = ColourPolicy { source: ScalarSource::Intensity, ..policy };
        assert_eq!(intensity.unit_scalar(Complex64::new(3.0, 4.0), 10.0), 0.25);
    }

    #[test]
    fn peak_normalisation_ignores_infinite_cells() {
        let mut field = ComplexField::new(3, 1, Complex64::new(0.0, 0.0));
        field.set(0, 0, Complex64::new(f64::INFINITY, 0.0));
        field.set(1, 0, Complex64::new(4.0, 0.0));
        let policy = ColourPolicy { source: ScalarSource::Magnitude, ..ColourPolicy::default() };
        assert_eq!(policy.scale(&field, None), 4.0);
        let fixed = ColourPolicy { normalization: Normalization::Fixed(0.0), ..policy };
        assert_eq!(fixed.scale(&field, None), 1.0, "zero fixed scale falls back to 1");
    }

    #[test]
    fn magnitude_through_grey_gradient() {
        let mut field = ComplexField::new(2, 1, Complex64::new(0.0, 0.0));
        field.set(0, 0, Complex64::new(0.0, 2.0));
        let policy = ColourPolicy { source: ScalarSource::Magnitude, ..ColourPolicy::default() };
        let buf = to_pixel_buffer(&field, &policy, &grey_lut(), &MaskConfig::default());
        assert_eq!(buf.pixel(0, 0), Some(Rgb::WHITE));
        assert_eq!(buf.pixel(1, 0), Some(Rgb::BLACK));
    }

    #[test]
    fn enabled_mask_pulls_towards_back_colour() {
        let field = ComplexField::new(1, 1, Complex64::new(0.0, 0.0));
        let policy = ColourPolicy { source: ScalarSource::Magnitude, ..ColourPolicy::default() };
        // Scalar 0 -> location 0 -> phase 0, which is off for a centred duty cycle.
        let mask = MaskConfig {
            enabled: true,
            duty_cycle: 0.5,
            smooth: 0.0,
            back_colour: Rgb::new(9, 8, 7),
            ..MaskConfig::default()
        };
        let buf = to_pixel_buffer(&field, &policy, &grey_lut(), &mask);
        assert_eq!(buf.pixel(0, 0), Some(Rgb::new(9, 8, 7)));

        let disabled = MaskConfig { enabled: false, ..mask };
        let buf = to_pixel_buffer(&field, &policy, &grey_lut(), &disabled);
        assert_eq!(buf.pixel(0, 0), Some(Rgb::BLACK));
    }

    #[test]
    fn hue_wheel_palette_colours_phase() {
        let mut field = ComplexField::new(1, 1, Complex64::new(0.0, 0.0));
        field.set(0, 0, Complex64::new(-1.0, 0.0));
        let policy = ColourPolicy {
            source: ScalarSource::Phase,
            palette: Palette::HueWheel,
            ..ColourPolicy::default()
        };
        // arg = π wraps to scalar 0, the red end of the wheel.
        let buf = to_pixel_buffer(&field, &policy, &grey_lut(), &MaskConfig::default());
        assert_eq!(buf.pixel(0, 0), Some(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn render_reports_degenerate_input() {
        let lut = grey_lut();
        let policy = ColourPolicy::default();
        let mask = MaskConfig::default();
        let empty = EmitterArrangement::explicit(Vec::new(), WaveParams::default());
        let input = RenderInput {
            width: 4,
            height: 4,
            arrangement: &empty,
            policy: &policy,
            gradient: &lut,
            mask: &mask,
        };
        assert_eq!(render(&input).err(), Some(RenderError::NoEmitters));
        let zero = RenderInput { width: 0, ..input.clone() };
        assert_eq!(
            render(&zero).err(),
            Some(RenderError::InvalidDimensions { width: 0, height: 4 })
        );
    }

    #[test]
    fn emitter_on_a_pixel_centre_does_not_flatten_the_frame() {
        let lut = grey_lut();
        let policy = ColourPolicy { source: ScalarSource::Magnitude, ..ColourPolicy::default() };
        let mask = MaskConfig::default();
        let params = WaveParams { wavelength: 5.0, attenuation: 2.0, ..WaveParams::default() };
        let one = EmitterArrangement::explicit(vec![Emitter::new(4.0, 4.0)], params);
        let input = RenderInput {
            width: 9,
            height: 9,
            arrangement: &one,
            policy: &policy,
            gradient: &lut,
            mask: &mask,
        };
        let frame = render(&input).unwrap();
        // Neighbours of the emitter carry the far-field peak, 1 / 1^2.
        assert_eq!(frame.pixel(5, 4), Some(Rgb::WHITE));
        assert_eq!(frame.pixel(4, 3), Some(Rgb::WHITE));
        assert_eq!(frame.pixel(4, 4), Some(Rgb::WHITE), "the spike itself saturates");
        // Two pixels out: 1 / 2^2 of the peak, a quarter of the way up the ramp.
        let quarter = frame.pixel(6, 4).unwrap();
        assert!((60..=68).contains(&quarter.r), "expected a dark grey, got {quarter}");
    }

    #[test]
    fn render_produces_a_full_frame() {
        let lut = grey_lut();
        let policy = ColourPolicy::default();
        let mask = MaskConfig::default();
        let one = EmitterArrangement::explicit(vec![Emitter::new(8.0, 8.0)], WaveParams::default());
        let input = RenderInput {
            width: 16,
            height: 12,
            arrangement: &one,
            policy: &policy,
            gradient: &lut,
            mask: &mask,
        };
        let frame = render(&input).unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 12));
        assert_eq!(frame.len(), 16 * 12);
    }
}
