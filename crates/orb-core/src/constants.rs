/// Reference frame rate all per-frame rates are expressed against.
pub const REFERENCE_FPS: f64 = 60.0;

/// Upper bound on reference frames integrated by a single tick (stalls, tab switches).
pub const MAX_CATCHUP_FRAMES: f64 = 4.0;

/// Per-frame lerp coefficient of the current angle toward the pointer target.
pub const ANGLE_SMOOTHING: f64 = 0.07;

/// Radians of rotation per unit of normalized pointer offset.
pub const POINTER_SENSITIVITY: f64 = 0.6;

/// Pulse added by one click, saturating at 1.0.
pub const CLICK_PULSE: f64 = 0.75;

/// Geometric pulse decay per frame.
pub const PULSE_DECAY: f64 = 0.92;

/// Idle breathing: amplitude and angular frequency of the base scale.
pub const BREATH_AMPLITUDE: f64 = 0.02;
pub const BREATH_FREQUENCY: f64 = 1.2;

/// Scale bump while the pointer hovers the canvas.
pub const HOVER_SCALE: f64 = 1.04;

/// Scale bump per unit of pulse.
pub const PULSE_SCALE: f64 = 0.12;

/// Aura shell scale relative to the orb.
pub const SHELL_SCALE: f64 = 1.06;

/// aiIntensity rates per frame.
pub const INTENSITY_RISE: f64 = 0.05;
pub const INTENSITY_RESPONDING_DECAY: f64 = 0.02;
pub const INTENSITY_IDLE_DECAY: f64 = 0.01;

/// aiIntensity never drops below this while a response is displayed.
pub const RESPONDING_INTENSITY_FLOOR: f64 = 0.3;

/// How long the Responding phase holds before reverting to Idle.
pub const RESPONDING_HOLD_MS: u64 = 3_000;

/// Device pixel ratio ceiling for the drawing surface.
pub const MAX_PIXEL_RATIO: f64 = 2.0;
