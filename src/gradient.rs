//! Colour gradient with a precomputed lookup table.
//!
//! Anchors are kept in the order the editor put them in; the table is built
//! from a location-sorted copy. Edits only mark the table dirty, and the next
//! read rebuilds it once, so a burst of edits costs a single rebuild.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::EditError;
use crate::types::Rgb;

/// Lowest and highest anchor location.
pub const LOCATION_MIN: f64 = 0.0;
pub const LOCATION_MAX: f64 = 100.0;

/// Table steps used by `ColourGradient::default()`; one slot per location unit.
pub const DEFAULT_RESOLUTION: usize = 100;

pub const MIN_ANCHORS: usize = 2;

/// Clamp a location into `[0, 100]`; NaN goes to 0.
pub fn clamp_location(location: f64) -> f64 {
    if location.is_nan() {
        return LOCATION_MIN;
    }
    location.clamp(LOCATION_MIN, LOCATION_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColourAnchor {
    pub colour: Rgb,
    pub location: f64,
}

impl ColourAnchor {
    pub fn new(colour: Rgb, location: f64) -> Self {
        Self { colour, location: clamp_location(location) }
    }
}

/// Immutable, fully built lookup table.
///
/// Slot `i` holds the colour at location `i * 100 / resolution`; there are
/// `resolution + 1` slots so both ends of the range are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientLut {
    resolution: usize,
    // Stored unrounded so interpolating between slots stays smooth.
    slots: Vec<[f32; 3]>,
}

impl GradientLut {
    fn build(anchors: &[ColourAnchor], resolution: usize) -> Self {
        // Stable sort keeps insertion order for equal locations.
        let mut sorted = anchors.to_vec();
        sorted.sort_by(|a, b| a.location.total_cmp(&b.location));

        let mut slots = Vec::with_capacity(resolution + 1);
        for i in 0..=resolution {
            let location = i as f64 * LOCATION_MAX / resolution as f64;
            // Upper bound: first anchor strictly past this slot.
            let after = sorted.partition_point(|a| a.location <= location);
            let rgb = if after == sorted.len() {
                channels(sorted[sorted.len() - 1].colour)
            } else if after == 0 {
                channels(sorted[0].colour)
            } else {
                let before = &sorted[after - 1];
                let next = &sorted[after];
                let t = ((location - before.location) / (next.location - before.location)) as f32;
                let (a, b) = (channels(before.colour), channels(next.colour));
                [
                    a[0] + (b[0] - a[0]) * t,
                    a[1] + (b[1] - a[1]) * t,
                    a[2] + (b[2] - a[2]) * t,
                ]
            };
            slots.push(rgb);
        }

        Self { resolution, slots }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn slots(&self) -> &[[f32; 3]] {
        &self.slots
    }

    /// Colour at `location` in `[0, 100]`, interpolated between the two
    /// bracketing slots. Out-of-range locations are clamped.
    pub fn colour_at(&self, location: f64) -> Rgb {
        let scaled = clamp_location(location) * self.resolution as f64 / LOCATION_MAX;
        let lower = (scaled.floor() as usize).min(self.resolution);
        let upper = (lower + 1).min(self.resolution);
        let t = (scaled - lower as f64) as f32;

        let (a, b) = (self.slots[lower], self.slots[upper]);
        let mix = |x: f32, y: f32| (x + (y - x) * t).round().clamp(0.0, 255.0) as u8;
        Rgb::new(mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]))
    }
}

#[inline]
fn channels(c: Rgb) -> [f32; 3] {
    [c.r as f32, c.g as f32, c.b as f32]
}

/// Editable gradient. Always holds at least two anchors.
#[derive(Debug, Clone)]
pub struct ColourGradient {
    anchors: Vec<ColourAnchor>,
    resolution: usize,
    lut: Arc<GradientLut>,
    dirty: bool,
    revision: u64,
}

impl ColourGradient {
    /// # Panics
    /// Panics when fewer than two anchors are supplied or `resolution` is 0.
    /// Runtime edits can never get there, so reaching it is a caller bug.
    pub fn new(anchors: Vec<ColourAnchor>, resolution: usize) -> Self {
        assert!(
            anchors.len() >= MIN_ANCHORS,
            "a colour gradient needs at least {MIN_ANCHORS} anchors, got {}",
            anchors.len()
        );
        assert!(resolution > 0, "gradient resolution must be positive");
        let anchors: Vec<_> =
            anchors.into_iter().map(|a| ColourAnchor::new(a.colour, a.location)).collect();
        let lut = Arc::new(GradientLut::build(&anchors, resolution));
        Self { anchors, resolution, lut, dirty: false, revision: 0 }
    }

    /// Seed anchors for a fresh gradient: deep blue troughs, white crests.
    pub fn default_anchors() -> Vec<ColourAnchor> {
        vec![
            ColourAnchor::new(Rgb::new(0x00, 0x00, 0x20), 0.0),
            ColourAnchor::new(Rgb::new(0x10, 0x40, 0xa0), 35.0),
            ColourAnchor::new(Rgb::new(0x60, 0xc0, 0xf0), 65.0),
            ColourAnchor::new(Rgb::WHITE, 100.0),
        ]
    }

    pub fn anchors(&self) -> &[ColourAnchor] {
        &self.anchors
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of rebuilds so far; bumps once per coalesced edit batch.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Insert an anchor at row `insert_at` (end when `None` or past the end).
    pub fn add_anchor(&mut self, colour: Rgb, location: f64, insert_at: Option<usize>) {
        let at = insert_at.map_or(self.anchors.len(), |i| i.min(self.anchors.len()));
        self.anchors.insert(at, ColourAnchor::new(colour, location));
        self.dirty = true;
    }

    pub fn remove_anchor(&mut self, index: usize) -> Result<ColourAnchor, EditError> {
        self.check_index(index)?;
        if self.anchors.len() <= MIN_ANCHORS {
            debug!(index, "refusing to remove anchor below the minimum");
            return Err(EditError::TooFewAnchors { min: MIN_ANCHORS });
        }
        self.dirty = true;
        Ok(self.anchors.remove(index))
    }

    /// Move the anchor at row `from` to row `to`. Row order is the editor's
    /// identity for anchors and is not re-sorted by location.
    pub fn move_anchor(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let anchor = self.anchors.remove(from);
            self.anchors.insert(to, anchor);
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_location(&mut self, index: usize, location: f64) -> Result<(), EditError> {
        self.check_index(index)?;
        let clamped = clamp_location(location);
        if clamped != location {
            trace!(index, location, clamped, "anchor location clamped");
        }
        self.anchors[index].location = clamped;
        self.dirty = true;
        Ok(())
    }

    pub fn set_colour(&mut self, index: usize, colour: Rgb) -> Result<(), EditError> {
        self.check_index(index)?;
        self.anchors[index].colour = colour;
        self.dirty = true;
        Ok(())
    }

    /// Rebuild the table if an edit is pending. Returns whether it rebuilt.
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.rebuild();
        true
    }

    /// Unconditionally rebuild the lookup table from the current anchors.
    pub fn rebuild(&mut self) {
        self.lut = Arc::new(GradientLut::build(&self.anchors, self.resolution));
        self.dirty = false;
        self.revision += 1;
        debug!(revision = self.revision, anchors = self.anchors.len(), "gradient table rebuilt");
    }

    /// Current table, rebuilt first if an edit is pending. The returned table
    /// never changes; later edits produce a new one.
    pub fn lut(&mut self) -> Arc<GradientLut> {
        self.flush();
        Arc::clone(&self.lut)
    }

    pub fn colour_at(&mut self, location: f64) -> Rgb {
        self.flush();
        self.lut.colour_at(location)
    }

    fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index >= self.anchors.len() {
            debug!(index, len = self.anchors.len(), "anchor index rejected");
            return Err(EditError::IndexOutOfRange { index, len: self.anchors.len() });
        }
        Ok(())
    }
}

impl Default for ColourGradient {
    fn default() -> Self {
        Self::new(Self::default_anchors(), DEFAULT_RESOLUTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Rgb = Rgb::new(0, 100, 200);
    const B: Rgb = Rgb::new(200, 0, 100);

    fn two_stop() -> ColourGradient {
        ColourGradient::new(vec![ColourAnchor::new(A, 0.0), ColourAnchor::new(B, 100.0)], 100)
    }

    #[test]
    fn two_anchor_gradient_hits_ends_and_midpoint() {
        let mut g = two_stop();
        assert_eq!(g.colour_at(0.0), A);
        assert_eq!(g.colour_at(100.0), B);
        assert_eq!(g.colour_at(50.0), Rgb::new(100, 50, 150));
    }

    #[test]
    fn fractional_locations_interpolate_between_slots() {
        let grey = Rgb::new(100, 100, 100);
        let mut g = ColourGradient::new(
            vec![ColourAnchor::new(Rgb::BLACK, 0.0), ColourAnchor::new(grey, 100.0)],
            100,
        );
        assert_eq!(g.colour_at(25.25), Rgb::new(25, 25, 25));
        assert_eq!(g.colour_at(25.75), Rgb::new(26, 26, 26));
    }

    #[test]
    fn locations_outside_anchors_clamp_to_nearest_anchor() {
        let mut g = ColourGradient::new(
            vec![ColourAnchor::new(A, 20.0), ColourAnchor::new(B, 80.0)],
            100,
        );
        assert_eq!(g.colour_at(0.0), A);
        assert_eq!(g.colour_at(10.0), A);
        assert_eq!(g.colour_at(90.0), B);
        assert_eq!(g.colour_at(100.0), B);
        assert_eq!(g.colour_at(-5.0), A, "below range clamps to location 0");
        assert_eq!(g.colour_at(250.0), B, "above range clamps to location 100");
    }

    #[test]
    fn anchors_are_sorted_for_the_table_but_rows_keep_their_order() {
        let mut g = ColourGradient::new(
            vec![ColourAnchor::new(B, 100.0), ColourAnchor::new(A, 0.0)],
            100,
        );
        assert_eq!(g.colour_at(0.0), A);
        assert_eq!(g.colour_at(100.0), B);
        assert_eq!(g.anchors()[0].colour, B);
    }

    #[test]
    fn rebuilds_are_idempotent() {
        let mut g = ColourGradient::default();
        g.rebuild();
        let first = g.lut();
        g.rebuild();
        let second = g.lut();
        assert_eq!(first.slots(), second.slots());
    }

    #[test]
    fn removing_below_two_anchors_is_rejected_without_change() {
        let mut g = two_stop();
        let before = g.anchors().to_vec();
        assert_eq!(g.remove_anchor(0), Err(EditError::TooFewAnchors { min: 2 }));
        assert_eq!(g.anchors(), before.as_slice());
        assert!(!g.is_dirty());
    }

    #[test]
    fn out_of_range_edits_are_rejected() {
        let mut g = two_stop();
        assert_eq!(g.remove_anchor(5), Err(EditError::IndexOutOfRange { index: 5, len: 2 }));
        assert!(g.set_colour(2, Rgb::WHITE).is_err());
        assert!(g.set_location(9, 1.0).is_err());
        assert!(g.move_anchor(0, 2).is_err());
        assert!(!g.is_dirty());
    }

    #[test]
    fn edits_mark_dirty_and_one_read_rebuilds_once() {
        let mut g = two_stop();
        let revision = g.revision();
        g.add_anchor(Rgb::WHITE, 50.0, Some(1));
        g.set_colour(1, Rgb::BLACK).unwrap();
        g.set_location(1, 40.0).unwrap();
        assert!(g.is_dirty());

        assert_eq!(g.colour_at(40.0), Rgb::BLACK);
        assert!(!g.is_dirty());
        assert_eq!(g.revision(), revision + 1, "three edits should collapse into one rebuild");
        assert!(!g.flush(), "nothing pending after the read");
    }

    #[test]
    fn add_clamps_location_and_insert_position() {
        let mut g = two_stop();
        g.add_anchor(Rgb::WHITE, 140.0, Some(99));
        assert_eq!(g.anchor_count(), 3);
        assert_eq!(g.anchors()[2].location, 100.0);
        g.set_location(2, f64::NAN).unwrap();
        assert_eq!(g.anchors()[2].location, 0.0);
    }

    #[test]
    fn move_reorders_rows() {
        let mut g = two_stop();
        g.add_anchor(Rgb::WHITE, 50.0, None);
        g.move_anchor(2, 0).unwrap();
        let colours: Vec<_> = g.anchors().iter().map(|a| a.colour).collect();
        assert_eq!(colours, vec![Rgb::WHITE, A, B]);
    }

    #[test]
    fn tied_locations_use_the_later_anchor_from_the_tie() {
        let mut g = ColourGradient::new(
            vec![
                ColourAnchor::new(A, 0.0),
                ColourAnchor::new(Rgb::BLACK, 50.0),
                ColourAnchor::new(Rgb::WHITE, 50.0),
                ColourAnchor::new(B, 100.0),
            ],
            100,
        );
        assert_eq!(g.colour_at(50.0), Rgb::WHITE);
        assert_eq!(g.colour_at(49.0), A.lerp(Rgb::BLACK, 49.0 / 50.0));
    }

    #[test]
    fn finer_resolution_covers_the_same_range() {
        let mut g = ColourGradient::new(
            vec![ColourAnchor::new(A, 0.0), ColourAnchor::new(B, 100.0)],
            200,
        );
        assert_eq!(g.lut().slots().len(), 201);
        assert_eq!(g.colour_at(50.0), Rgb::new(100, 50, 150));
        assert_eq!(g.colour_at(100.0), B);
    }

    #[test]
    #[should_panic(expected = "at least 2 anchors")]
    fn constructing_with_one_anchor_panics() {
        let _ = ColourGradient::new(vec![ColourAnchor::new(A, 0.0)], 100);
    }
}
