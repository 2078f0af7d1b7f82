//! Phasor field simulation.
//!
//! Every emitter radiates a circular wave. At each pixel the contribution of an
//! emitter is `amplitude(d) * e^(i * theta)` with
//! `theta = -2π / wavelength * (d + distance_offset)`, and the field value is the
//! complex sum over all emitters and their mirror images.

use std::f64::consts::TAU;

use glam::DVec2;
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::RenderError;
use crate::types::ComplexField;

/// Guard for `1 / d^a` at the emitter itself.
pub const MIN_DISTANCE: f64 = f64::MIN_POSITIVE;
/// Ceiling on a single source's amplitude. Leaves room to sum thousands of
/// coincident sources without overflowing.
pub const MAX_AMPLITUDE: f64 = 1e300;
/// Cells closer than this (in pixels) to a source are near-field and left out
/// of peak normalisation.
pub const NEAR_FIELD_RADIUS: f64 = 1.0;
pub const MIN_WAVELENGTH: f64 = 1e-3;
pub const MIN_DISTANCE_SCALE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    pub position: DVec2,
}

impl Emitter {
    pub fn new(x: f64, y: f64) -> Self {
        Self { position: DVec2::new(x, y) }
    }
}

/// How emitter positions are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Layout {
    /// `count` emitters evenly spaced on a circle of `radius` around the centre.
    Ring { count: usize },
    /// `count` emitters spread along a horizontal segment of half-length `radius`.
    Line { count: usize },
    /// Positions are whatever the caller set.
    Explicit,
}

/// Wave parameters shared by every emitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveParams {
    /// Layout radius in pixels.
    pub radius: f64,
    pub wavelength: f64,
    pub distance_offset: f64,
    /// Exponent of the `1 / d^a` fall-off; 0 disables attenuation.
    pub attenuation: f64,
    /// Pixel distances are multiplied by this before anything else.
    pub distance_scale: f64,
    pub mirror_horizontal: bool,
    pub mirror_vertical: bool,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            radius: 80.0,
            wavelength: 24.0,
            distance_offset: 0.0,
            attenuation: 0.5,
            distance_scale: 1.0,
            mirror_horizontal: false,
            mirror_vertical: false,
        }
    }
}

impl WaveParams {
    pub fn sanitized(self) -> Self {
        let finite_or = |v: f64, d: f64| if v.is_finite() { v } else { d };
        Self {
            radius: finite_or(self.radius, 0.0).max(0.0),
            wavelength: finite_or(self.wavelength, MIN_WAVELENGTH).max(MIN_WAVELENGTH),
            distance_offset: finite_or(self.distance_offset, 0.0),
            attenuation: finite_or(self.attenuation, 0.0).max(0.0),
            distance_scale: finite_or(self.distance_scale, 1.0).max(MIN_DISTANCE_SCALE),
            ..self
        }
    }
}

/// Emitters plus the shared parameters; the engine reads a snapshot per render.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterArrangement {
    emitters: Vec<Emitter>,
    params: WaveParams,
    layout: Layout,
    centre: DVec2,
}

impl EmitterArrangement {
    /// Arrangement with caller-chosen positions.
    pub fn explicit(emitters: Vec<Emitter>, params: WaveParams) -> Self {
        Self { emitters, params: params.sanitized(), layout: Layout::Explicit, centre: DVec2::ZERO }
    }

    /// Arrangement whose positions follow `layout` around `centre`.
    pub fn with_layout(layout: Layout, centre: DVec2, params: WaveParams) -> Self {
        let mut arrangement =
            Self { emitters: Vec::new(), params: params.sanitized(), layout, centre };
        arrangement.relayout();
        arrangement
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn centre(&self) -> DVec2 {
        self.centre
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Replace the shared parameters wholesale; values are clamped.
    pub fn set_params(&mut self, params: WaveParams) {
        let radius_changed = params.radius != self.params.radius;
        self.params = params.sanitized();
        if radius_changed {
            self.relayout();
        }
    }

    /// Layout radius, clamped to be non-negative. Generated layouts follow it.
    pub fn set_radius(&mut self, radius: f64) {
        self.params = WaveParams { radius, ..self.params }.sanitized();
        self.relayout();
    }

    pub fn set_wavelength(&mut self, wavelength: f64) {
        self.params = WaveParams { wavelength, ..self.params }.sanitized();
    }

    pub fn set_attenuation(&mut self, attenuation: f64) {
        self.params = WaveParams { attenuation, ..self.params }.sanitized();
    }

    pub fn set_mirrors(&mut self, horizontal: bool, vertical: bool) {
        self.params.mirror_horizontal = horizontal;
        self.params.mirror_vertical = vertical;
    }

    pub fn set_centre(&mut self, centre: DVec2) {
        self.centre = centre;
        self.relayout();
    }

    /// Switch layout; an `Explicit` layout keeps the current positions.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        self.relayout();
    }

    /// Replace positions; the layout becomes `Explicit`.
    pub fn set_emitters(&mut self, emitters: Vec<Emitter>) {
        self.emitters = emitters;
        self.layout = Layout::Explicit;
    }

    fn relayout(&mut self) {
        let r = self.params.radius;
        self.emitters = match self.layout {
            Layout::Explicit => return,
            Layout::Ring { count } => (0..count)
                .map(|i| {
                    let a = TAU * i as f64 / count as f64;
                    Emitter { position: self.centre + r * DVec2::new(a.cos(), a.sin()) }
                })
                .collect(),
            Layout::Line { count } => (0..count)
                .map(|i| {
                    let t = if count > 1 { 2.0 * i as f64 / (count - 1) as f64 - 1.0 } else { 0.0 };
                    Emitter { position: self.centre + DVec2::new(t * r, 0.0) }
                })
                .collect(),
        };
    }
}

/// Amplitude after travelling `distance`. `attenuation == 0` is flat; otherwise
/// `1 / distance^attenuation` with zero distance treated as `MIN_DISTANCE`.
/// Always finite: `d^a` can underflow to zero for `a > 1`, so the result is
/// capped at `MAX_AMPLITUDE`.
#[inline]
pub fn amplitude(distance: f64, attenuation: f64) -> f64 {
    if attenuation == 0.0 {
        return 1.0;
    }
    let d = distance.max(MIN_DISTANCE);
    let denom = if attenuation == 1.0 { d } else { d.powf(attenuation) };
    (1.0 / denom).min(MAX_AMPLITUDE)
}

/// Phasor of one source at (already scaled) `distance`.
#[inline]
pub fn phasor(distance: f64, params: &WaveParams) -> Complex64 {
    let theta = -TAU / params.wavelength * (distance + params.distance_offset);
    Complex64::from_polar(amplitude(distance, params.attenuation), theta)
}

/// Emitter positions plus their mirror images across the grid's centre lines.
/// With both mirrors set each emitter contributes four sources.
pub fn sources(arrangement: &EmitterArrangement, field: &ComplexField) -> Vec<DVec2> {
    let params = arrangement.params();
    // Reflection across x = cx is x' = 2cx - x.
    let twice_cx = 2.0 * field.x_left() as f64 + field.width() as f64 - 1.0;
    let twice_cy = 2.0 * field.y_top() as f64 + field.height() as f64 - 1.0;

    let mut out = Vec::with_capacity(arrangement.emitters().len() * 4);
    for e in arrangement.emitters() {
        let p = e.position;
        out.push(p);
        if params.mirror_horizontal {
            out.push(DVec2::new(twice_cx - p.x, p.y));
        }
        if params.mirror_vertical {
            out.push(DVec2::new(p.x, twice_cy - p.y));
        }
        if params.mirror_horizontal && params.mirror_vertical {
            out.push(DVec2::new(twice_cx - p.x, twice_cy - p.y));
        }
    }
    out
}

/// Simulate into a fresh `width x height` field with its origin at (0, 0).
pub fn compute_field(
    width: usize,
    height: usize,
    arrangement: &EmitterArrangement,
) -> Result<ComplexField, RenderError> {
    let mut field = ComplexField::new(width, height, Complex64::new(0.0, 0.0));
    compute_field_into(&mut field, arrangement, || false)?;
    Ok(field)
}

/// Simulate into `field`, honouring its origin. The field is zeroed first, so a
/// degenerate input still leaves an all-zero field behind.
///
/// `cancelled` is polled once per row; when it returns true the remaining rows
/// are skipped and `RenderError::Cancelled` comes back with generation 0. The
/// engine replaces that generation with its own.
pub fn compute_field_into<F>(
    field: &mut ComplexField,
    arrangement: &EmitterArrangement,
    cancelled: F,
) -> Result<(), RenderError>
where
    F: Fn() -> bool + Sync,
{
    field.fill(Complex64::new(0.0, 0.0));
    if field.is_empty() {
        return Err(RenderError::InvalidDimensions { width: field.width(), height: field.height() });
    }
    if arrangement.is_empty() {
        return Err(RenderError::NoEmitters);
    }

    let params = *arrangement.params();
    let sources = sources(arrangement, field);
    trace!(sources = sources.len(), "computing phasor field");

    let (x_left, y_top, width) = (field.x_left(), field.y_top(), field.width());
    let aborted = field
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .map(|(row, cells)| {
            if cancelled() {
                return true;
            }
            let y = (y_top + row as i32) as f64;
            for (col, cell) in cells.iter_mut().enumerate() {
                let x = (x_left + col as i32) as f64;
                let here = DVec2::new(x, y);
                *cell = sources
                    .iter()
                    .map(|s| phasor(here.distance(*s) * params.distance_scale, &params))
                    .sum();
            }
            false
        })
        .reduce(|| false, |a, b| a || b);

    if aborted {
        return Err(RenderError::Cancelled { generation: 0 });
    }
    Ok(())
}

/// Largest finite magnitude among cells at least `NEAR_FIELD_RADIUS` pixels
/// from every source. Falls back to the largest finite magnitude overall when
/// the whole grid is near-field. Returns 0 for an all-zero field.
pub fn far_field_peak(field: &ComplexField, arrangement: &EmitterArrangement) -> f64 {
    let sources = sources(arrangement, field);
    let width = field.width().max(1);
    let (far, near) = field
        .as_slice()
        .par_chunks(width)
        .enumerate()
        .map(|(row, cells)| {
            let y = field.row_y(row) as f64;
            let (mut far, mut near) = (0.0_f64, 0.0_f64);
            for (col, z) in cells.iter().enumerate() {
                let n = z.norm();
                if !n.is_finite() {
                    continue;
                }
                let here = DVec2::new(field.col_x(col) as f64, y);
                if sources.iter().any(|s| here.distance(*s) < NEAR_FIELD_RADIUS) {
                    near = near.max(n);
                } else {
                    far = far.max(n);
                }
            }
            (far, near)
        })
        .reduce(|| (0.0, 0.0), |a, b| (a.0.max(b.0), a.1.max(b.1)));
    if far > 0.0 { far } else { near }
}
