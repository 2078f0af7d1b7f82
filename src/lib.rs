//! Wave interference renderer.
//!
//! Point emitters radiate circular waves; the complex sum of their phasors at
//! every pixel is turned into colour through an editable gradient (with an
//! optional periodic mask) or a six-stage hue wheel.
//!
//! The `engine` module ties it together: it owns the editable state, coalesces
//! gradient edits into single rebuilds and renders frames on a background
//! worker tagged with generation numbers so stale frames never win.

pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod gradient;
pub mod hue;
pub mod interaction;
pub mod mask;
pub mod render;
pub mod types;

pub use engine::{Engine, EngineEvent};
pub use error::{ConfigError, EditError, RenderError};
pub use field::{Emitter, EmitterArrangement, Layout, WaveParams};
pub use gradient::{ColourAnchor, ColourGradient, GradientLut};
pub use mask::MaskConfig;
pub use render::{ColourPolicy, Palette, ScalarSource};
pub use types::{ComplexField, Grid2D, PixelBuffer, Rgb, Rgba};
