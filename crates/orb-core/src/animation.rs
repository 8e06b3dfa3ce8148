//! Per-frame update of the orb.
//!
//! `tick` is the whole animation model: it blends idle breathing, hover,
//! click pulse and the AI phase into one scale factor, eases the rotation
//! toward the pointer, integrates the decaying signals and returns the
//! snapshot to draw. It never fails and never blocks.

use serde::Serialize;

use crate::camera::{Camera, RenderError, Viewport, model_matrix};
use crate::constants::{
    ANGLE_SMOOTHING, BREATH_AMPLITUDE, BREATH_FREQUENCY, HOVER_SCALE, MAX_CATCHUP_FRAMES,
    PULSE_DECAY, PULSE_SCALE, REFERENCE_FPS, SHELL_SCALE,
};
use crate::interaction::{Angles, InteractionState};
use crate::phase::AiPhase;
use crate::shader::SHELL_RADIUS;
use crate::uniforms::{ShaderUniforms, TransformUniforms};

/// Clock reading for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    /// Seconds since the loop started.
    pub elapsed: f64,
    /// Seconds since the previous tick.
    pub delta: f64,
}

impl FrameTime {
    /// Tick `index` of a loop running at exactly `fps`.
    pub fn at_frame(index: u64, fps: f64) -> Self {
        Self {
            elapsed: index as f64 / fps,
            delta: 1.0 / fps,
        }
    }

    /// Elapsed time expressed in reference frames, bounded so a stall cannot
    /// fast-forward the decays.
    pub fn reference_frames(&self) -> f64 {
        let frames = self.delta * REFERENCE_FPS;
        if frames.is_finite() {
            frames.clamp(0.0, MAX_CATCHUP_FRAMES)
        } else {
            0.0
        }
    }
}

/// Where and how big the orb and its aura are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MeshTransform {
    pub rotation: Angles,
    pub scale: f64,
    pub shell_scale: f64,
}

/// Everything one tick produced.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Frame {
    pub uniforms: ShaderUniforms,
    pub transform: MeshTransform,
    pub phase: AiPhase,
}

/// Breathing × hover × pulse × phase. Uses the pulse value before this tick's decay.
pub fn scale_factor(state: &InteractionState, t: f64) -> f64 {
    let breath = 1.0 + BREATH_AMPLITUDE * (t * BREATH_FREQUENCY).sin();
    let hover = if state.hover { HOVER_SCALE } else { 1.0 };
    let pulse = 1.0 + PULSE_SCALE * state.pulse;
    breath * hover * pulse * state.phase.scale(t)
}

/// Advance the interaction state by one tick and return the frame to draw.
pub fn tick(state: &mut InteractionState, time: FrameTime) -> Frame {
    let frames = time.reference_frames();
    let t = time.elapsed;

    let alpha = 1.0 - (1.0 - ANGLE_SMOOTHING).powf(frames);
    state.current_angle = state.current_angle.lerp(state.pointer_target, alpha);

    let scale = scale_factor(state, t);

    state.pulse = (state.pulse * PULSE_DECAY.powf(frames)).clamp(0.0, 1.0);
    state.intensity = state.phase.step_intensity(state.intensity, frames);

    Frame {
        uniforms: ShaderUniforms {
            time: t as f32,
            pulse: state.pulse.max(0.0) as f32,
            ai_glow: state.phase.profile().glow as f32,
            ai_intensity: state.intensity as f32,
        },
        transform: MeshTransform {
            rotation: state.current_angle,
            scale,
            shell_scale: scale * SHELL_SCALE,
        },
        phase: state.phase,
    }
}

/// One draw: uniforms plus the matrices for the orb and its shell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DrawCall {
    pub frame: Frame,
    pub orb: TransformUniforms,
    pub shell: TransformUniforms,
    pub viewport: Viewport,
}

/// Consumer of finished frames: a GPU surface, a recorder, a network publisher.
pub trait FrameSink {
    fn present(&mut self, draw: &DrawCall);
}

/// Keeps the most recent draw. Useful for polling consumers and tests.
#[derive(Debug, Default)]
pub struct LatestFrame {
    pub last: Option<DrawCall>,
    pub presented: u64,
}

impl FrameSink for LatestFrame {
    fn present(&mut self, draw: &DrawCall) {
        self.last = Some(*draw);
        self.presented += 1;
    }
}

/// Camera plus sink. One `frame` call per display refresh.
pub struct Renderer<S: FrameSink> {
    camera: Camera,
    sink: S,
}

impl<S: FrameSink> Renderer<S> {
    /// Fails when the surface has no usable size; that is a startup error, not a per-frame one.
    pub fn new(viewport: Viewport, sink: S) -> Result<Self, RenderError> {
        Ok(Self {
            camera: Camera::new(viewport)?,
            sink,
        })
    }

    pub fn frame(&mut self, state: &mut InteractionState, time: FrameTime) -> DrawCall {
        let frame = tick(state, time);
        let view_proj = self.camera.view_proj();
        let draw = DrawCall {
            frame,
            orb: TransformUniforms {
                model: model_matrix(frame.transform.rotation, frame.transform.scale),
                view_proj,
            },
            shell: TransformUniforms {
                model: model_matrix(
                    frame.transform.rotation,
                    frame.transform.shell_scale * SHELL_RADIUS,
                ),
                view_proj,
            },
            viewport: self.camera.viewport(),
        };
        self.sink.present(&draw);
        draw
    }

    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.camera.resize(width, height)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
