//! Pointer state machine for drawing strokes onto ink surfaces.
//!
//! A stroke begins with pointer-down over a slot, grows with each pointer-move
//! and ends on pointer-up. Only one slot can be active at a time.

use super::surface::InkSurface;

/// Tracks which slot is being drawn on and where the current stroke ends.
#[derive(Debug, Clone)]
pub struct InkCapture {
    /// Slot bound by the last pointer-down, until pointer-up
    active_slot: Option<usize>,
    /// Last point of the current stroke, in slot-local coordinates
    last_point: Option<(f32, f32)>,
    /// Width of every stroke segment
    stroke_width: f32,
}

impl InkCapture {
    pub fn new(stroke_width: f32) -> Self {
        Self {
            active_slot: None,
            last_point: None,
            stroke_width,
        }
    }

    /// Slot currently receiving ink, if a stroke is in progress.
    pub fn active_slot(&self) -> Option<usize> {
        self.active_slot
    }

    pub fn is_drawing(&self) -> bool {
        self.active_slot.is_some()
    }

    /// Begins a stroke on `slot` at (x, y).
    ///
    /// Nothing is drawn until the pointer moves, so a tap leaves no ink. An
    /// unknown slot index starts nothing.
    pub fn pointer_down(&mut self, surfaces: &[InkSurface], slot: usize, x: f32, y: f32) {
        if slot >= surfaces.len() {
            return;
        }
        self.active_slot = Some(slot);
        self.last_point = Some((x, y));
    }

    /// Extends the active stroke to (x, y). Does nothing when no stroke is active.
    pub fn pointer_move(&mut self, surfaces: &mut [InkSurface], x: f32, y: f32) {
        let Some(surface) = self.active_slot.and_then(|slot| surfaces.get_mut(slot)) else {
            return;
        };

        let from = self.last_point.unwrap_or((x, y));
        surface.draw_segment(from, (x, y), self.stroke_width);
        self.last_point = Some((x, y));
    }

    /// Ends the current stroke, wherever the pointer is.
    pub fn pointer_up(&mut self) {
        self.active_slot = None;
        self.last_point = None;
    }
}
