//! Oracle orb interaction engine.
//!
//! Blends pointer, click and AI-phase signals into per-frame shader uniforms
//! and mesh transforms, gates remote oracle payloads through a fixed JSON
//! contract, and renders the surviving text as display-safe HTML.
//!
//! Zero I/O. Transport, timing and presentation belong to the caller.

pub mod animation;
pub mod camera;
pub mod constants;
pub mod contract;
pub mod interaction;
pub mod markup;
pub mod phase;
pub mod session;
pub mod shader;
pub mod terminal;
pub mod uniforms;

pub use animation::{
    DrawCall, Frame, FrameSink, FrameTime, LatestFrame, MeshTransform, Renderer, tick,
};
pub use camera::{Camera, RenderError, Viewport};
pub use contract::{
    ChatRequest, ContractViolation, OracleResult, REFUSAL, Sampling, parse_contract,
    validate_payload,
};
pub use interaction::{Angles, CanvasRect, InteractionState};
pub use phase::{AiPhase, PhaseEvent};
pub use session::{BlockKind, ResponseBlock, Session, SessionSnapshot, Status, Submit, Ticket};
pub use terminal::{TerminalAction, TerminalEvent, TerminalFeed};
pub use uniforms::{ShaderUniforms, TransformUniforms};
