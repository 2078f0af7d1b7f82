//! Press / move / release editing with cancel-on-escape.
//!
//! A drag keeps a backup of the value it is editing so that cancelling can put
//! it back. The controller never touches the edited value directly; it hands
//! back what should be applied and the caller pushes that through the normal
//! validated setter.

use glam::DVec2;

use crate::field::EmitterArrangement;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState<T> {
    Idle,
    Dragging {
        /// Value when the press happened; restored on cancel.
        backup: T,
        /// Pointer position at the press.
        origin: DVec2,
    },
}

impl<T> Default for DragState<T> {
    fn default() -> Self {
        DragState::Idle
    }
}

impl<T: Copy> DragState<T> {
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }

    /// Idle -> Dragging. A press while already dragging keeps the first backup.
    pub fn press(&mut self, current: T, origin: DVec2) {
        if let DragState::Idle = self {
            *self = DragState::Dragging { backup: current, origin };
        }
    }

    /// Dragging -> Idle, keeping whatever was applied during the drag.
    pub fn release(&mut self) -> bool {
        let was = self.is_dragging();
        *self = DragState::Idle;
        was
    }

    /// Dragging -> Idle, returning the backup that should be restored.
    pub fn cancel(&mut self) -> Option<T> {
        match std::mem::take(self) {
            DragState::Dragging { backup, .. } => Some(backup),
            DragState::Idle => None,
        }
    }
}

/// Drag that resizes the layout radius by how far the pointer is from the
/// arrangement centre, scaled relative to where the press happened.
#[derive(Debug, Default)]
pub struct RadiusDrag {
    state: DragState<f64>,
}

impl RadiusDrag {
    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging()
    }

    pub fn press(&mut self, arrangement: &EmitterArrangement, pointer: DVec2) {
        self.state.press(arrangement.params().radius, pointer);
    }

    /// Apply the radius implied by `pointer`. Returns true when the arrangement
    /// changed.
    pub fn drag_to(&mut self, arrangement: &mut EmitterArrangement, pointer: DVec2) -> bool {
        let DragState::Dragging { backup, origin } = self.state else {
            return false;
        };
        let centre = arrangement.centre();
        let start = origin.distance(centre);
        let radius = if start > f64::EPSILON {
            backup * pointer.distance(centre) / start
        } else {
            // Press landed on the centre: follow the pointer distance directly.
            pointer.distance(centre)
        };
        if radius == arrangement.params().radius {
            return false;
        }
        arrangement.set_radius(radius);
        true
    }

    pub fn release(&mut self) -> bool {
        self.state.release()
    }

    /// Restore the radius from before the press. Returns true when a drag was
    /// active.
    pub fn cancel(&mut self, arrangement: &mut EmitterArrangement) -> bool {
        match self.state.cancel() {
            Some(radius) => {
                arrangement.set_radius(radius);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Layout, WaveParams};

    fn ring() -> EmitterArrangement {
        EmitterArrangement::with_layout(
            Layout::Ring { count: 3 },
            DVec2::new(100.0, 100.0),
            WaveParams { radius: 40.0, ..WaveParams::default() },
        )
    }

    #[test]
    fn drag_scales_radius_with_pointer_distance() {
        let mut arrangement = ring();
        let mut drag = RadiusDrag::default();
        drag.press(&arrangement, DVec2::new(120.0, 100.0));
        assert!(drag.is_dragging());

        assert!(drag.drag_to(&mut arrangement, DVec2::new(140.0, 100.0)));
        assert_eq!(arrangement.params().radius, 80.0);
        assert!(drag.release());
        assert!(!drag.is_dragging());
        assert_eq!(arrangement.params().radius, 80.0, "release keeps the new radius");
    }

    #[test]
    fn cancel_restores_the_backup() {
        let mut arrangement = ring();
        let before = arrangement.clone();
        let mut drag = RadiusDrag::default();
        drag.press(&arrangement, DVec2::new(110.0, 100.0));
        drag.drag_to(&mut arrangement, DVec2::new(150.0, 100.0));
        assert_ne!(arrangement, before);

        assert!(drag.cancel(&mut arrangement));
        assert_eq!(arrangement, before);
        assert!(!drag.cancel(&mut arrangement), "second cancel has nothing to undo");
    }

    #[test]
    fn moves_without_a_press_do_nothing() {
        let mut arrangement = ring();
        let mut drag = RadiusDrag::default();
        assert!(!drag.drag_to(&mut arrangement, DVec2::new(0.0, 0.0)));
        assert_eq!(arrangement.params().radius, 40.0);
        assert!(!drag.release());
    }

    #[test]
    fn second_press_keeps_first_backup() {
        let mut state = DragState::Idle;
        state.press(1.0, DVec2::ZERO);
        state.press(2.0, DVec2::ONE);
        assert_eq!(state.cancel(), Some(1.0));
        assert_eq!(state, DragState::Idle);
    }
}
