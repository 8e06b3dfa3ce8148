use serde::{Deserialize, Serialize};

use crate::constants::{CLICK_PULSE, POINTER_SENSITIVITY};
use crate::phase::{AiPhase, PhaseEvent};

/// Rotation pair in radians. `x` tilts around the horizontal axis (driven by
/// vertical pointer motion), `y` turns around the vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Angles {
    pub x: f64,
    pub y: f64,
}

impl Angles {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation toward `target` by `alpha`.
    pub fn lerp(self, target: Angles, alpha: f64) -> Angles {
        Angles {
            x: self.x + (target.x - self.x) * alpha,
            y: self.y + (target.y - self.y) * alpha,
        }
    }
}

/// Layout rectangle of the canvas in client coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Map a client point to [-1, 1]² relative to this rect.
    /// Points outside the rect are clamped to the edge. Degenerate rects yield `None`.
    pub fn normalize(&self, client_x: f64, client_y: f64) -> Option<(f64, f64)> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        let nx = (client_x - self.left) / self.width * 2.0 - 1.0;
        let ny = (client_y - self.top) / self.height * 2.0 - 1.0;
        if !(nx.is_finite() && ny.is_finite()) {
            return None;
        }
        Some((nx.clamp(-1.0, 1.0), ny.clamp(-1.0, 1.0)))
    }
}

/// Everything the orb reacts to. Event handlers write it, the render tick
/// reads and integrates it. One owner for the whole session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionState {
    pub pointer_target: Angles,
    pub current_angle: Angles,
    pub hover: bool,
    /// Click emphasis in [0, 1].
    pub pulse: f64,
    pub phase: AiPhase,
    /// In [0, 1].
    pub intensity: f64,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer moved to a client-space position. Returns whether the target changed.
    pub fn pointer_move(&mut self, rect: &CanvasRect, client_x: f64, client_y: f64) -> bool {
        match rect.normalize(client_x, client_y) {
            Some((nx, ny)) => {
                self.pointer_target =
                    Angles::new(ny * POINTER_SENSITIVITY, nx * POINTER_SENSITIVITY);
                true
            }
            None => false,
        }
    }

    pub fn pointer_enter(&mut self) {
        self.hover = true;
    }

    pub fn pointer_leave(&mut self) {
        self.hover = false;
    }

    /// Saturating click pulse.
    pub fn click(&mut self) {
        self.pulse = (self.pulse + CLICK_PULSE).min(1.0);
    }

    pub fn apply(&mut self, event: PhaseEvent) -> AiPhase {
        self.phase = self.phase.transition(event);
        self.phase
    }
}
