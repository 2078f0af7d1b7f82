//! Settings file.
//!
//! Everything is optional; missing tables fall back to defaults and every value
//! goes through the same clamps as a runtime edit.

use std::fs;
use std::path::Path;

use glam::DVec2;
use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;
use crate::field::{Emitter, EmitterArrangement, Layout, WaveParams};
use crate::gradient::{ColourAnchor, ColourGradient, DEFAULT_RESOLUTION, MIN_ANCHORS};
use crate::mask::MaskConfig;
use crate::render::ColourPolicy;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub waves: WaveParams,
    pub emitters: EmitterSettings,
    pub gradient: GradientSettings,
    pub mask: MaskConfig,
    pub colour: ColourPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: usize,
    pub height: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self { width: 640, height: 480 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmitterSettings {
    pub layout: LayoutKind,
    pub count: usize,
    /// Only read by the explicit layout.
    pub positions: Vec<[f64; 2]>,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self { layout: LayoutKind::Ring, count: 3, positions: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Ring,
    Line,
    Explicit,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GradientSettings {
    pub resolution: usize,
    pub anchors: Vec<ColourAnchor>,
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self { resolution: DEFAULT_RESOLUTION, anchors: ColourGradient::default_anchors() }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Emitters centred on the window.
    pub fn arrangement(&self) -> EmitterArrangement {
        let centre = DVec2::new(self.window.width as f64 / 2.0, self.window.height as f64 / 2.0);
        let count = self.emitters.count;
        match self.emitters.layout {
            LayoutKind::Ring => EmitterArrangement::with_layout(Layout::Ring { count }, centre, self.waves),
            LayoutKind::Line => EmitterArrangement::with_layout(Layout::Line { count }, centre, self.waves),
            LayoutKind::Explicit => {
                let emitters =
                    self.emitters.positions.iter().map(|&[x, y]| Emitter::new(x, y)).collect();
                let mut arrangement = EmitterArrangement::explicit(emitters, self.waves);
                arrangement.set_centre(centre);
                arrangement
            }
        }
    }

    /// Gradient from the configured anchors; too few anchors or a zero
    /// resolution fall back to the defaults.
    pub fn gradient(&self) -> ColourGradient {
        let resolution = if self.gradient.resolution == 0 {
            warn!("gradient resolution 0 is invalid; using {DEFAULT_RESOLUTION}");
            DEFAULT_RESOLUTION
        } else {
            self.gradient.resolution
        };
        if self.gradient.anchors.len() < MIN_ANCHORS {
            warn!(
                anchors = self.gradient.anchors.len(),
                "gradient config needs at least {MIN_ANCHORS} anchors; using the default set"
            );
            return ColourGradient::new(ColourGradient::default_anchors(), resolution);
        }
        ColourGradient::new(self.gradient.anchors.clone(), resolution)
    }

    pub fn mask(&self) -> MaskConfig {
        self.mask.sanitized()
    }
}
