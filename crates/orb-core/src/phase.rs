use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    INTENSITY_IDLE_DECAY, INTENSITY_RESPONDING_DECAY, INTENSITY_RISE, RESPONDING_INTENSITY_FLOOR,
};

/// What the oracle is doing, as far as the orb is concerned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiPhase {
    #[default]
    Idle,
    Typing,
    Processing,
    Responding,
}

/// Triggers that move the phase machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Prompt input gained focus or became non-empty.
    TypingStarted,
    /// Prompt input lost focus or became empty.
    TypingStopped,
    /// A submission left for the oracle.
    RequestSent,
    /// The oracle call finished, whatever its outcome.
    ResponseArrived,
    /// The response has been on display long enough.
    HoldElapsed,
}

/// Per-phase animation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseProfile {
    /// Amplitude of the phase's scale oscillation.
    pub amplitude: f64,
    /// Angular frequency of that oscillation, in radians per second.
    pub frequency: f64,
    /// Constant glow pushed to the shader.
    pub glow: f64,
}

impl AiPhase {
    pub const ALL: [AiPhase; 4] = [
        AiPhase::Idle,
        AiPhase::Typing,
        AiPhase::Processing,
        AiPhase::Responding,
    ];

    /// Apply an event. Events that have no meaning in the current phase leave it unchanged.
    ///
    /// Processing only ever leaves through `ResponseArrived`, so the
    /// Idle → Processing → Responding → Idle sequence of a request cannot be
    /// interleaved with typing noise.
    pub fn transition(self, event: PhaseEvent) -> AiPhase {
        use AiPhase::*;
        use PhaseEvent::*;

        match (self, event) {
            (Processing, ResponseArrived) => Responding,
            (Processing, _) => Processing,
            (_, RequestSent) => Processing,
            (Idle | Responding, TypingStarted) => Typing,
            (Typing, TypingStopped) => Idle,
            (Responding, HoldElapsed) => Idle,
            (phase, _) => phase,
        }
    }

    pub fn profile(self) -> PhaseProfile {
        match self {
            AiPhase::Idle => PhaseProfile {
                amplitude: 0.0,
                frequency: 0.0,
                glow: 0.0,
            },
            AiPhase::Typing => PhaseProfile {
                amplitude: 0.03,
                frequency: 3.0,
                glow: 0.2,
            },
            AiPhase::Processing => PhaseProfile {
                amplitude: 0.08,
                frequency: 4.0,
                glow: 0.6,
            },
            AiPhase::Responding => PhaseProfile {
                amplitude: 0.05,
                frequency: 2.0,
                glow: 0.4,
            },
        }
    }

    /// Scale multiplier contributed by this phase at time `t`.
    pub fn scale(self, t: f64) -> f64 {
        let p = self.profile();
        1.0 + p.amplitude * (t * p.frequency).sin()
    }

    /// Integrate aiIntensity over `frames` reference frames. Result is always in [0, 1].
    pub fn step_intensity(self, intensity: f64, frames: f64) -> f64 {
        let next = match self {
            AiPhase::Idle => (intensity - INTENSITY_IDLE_DECAY * frames).max(0.0),
            AiPhase::Typing => intensity,
            AiPhase::Processing => (intensity + INTENSITY_RISE * frames).min(1.0),
            AiPhase::Responding => {
                (intensity - INTENSITY_RESPONDING_DECAY * frames).max(RESPONDING_INTENSITY_FLOOR)
            }
        };
        if next.is_finite() {
            next.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AiPhase::Idle => "idle",
            AiPhase::Typing => "typing",
            AiPhase::Processing => "processing",
            AiPhase::Responding => "responding",
        }
    }
}

impl fmt::Display for AiPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AiPhase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown phase '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_request_lifecycle_is_sequential() {
        let mut phase = AiPhase::Idle;
        phase = phase.transition(PhaseEvent::TypingStarted);
        assert_eq!(phase, AiPhase::Typing);
        phase = phase.transition(PhaseEvent::RequestSent);
        assert_eq!(phase, AiPhase::Processing);
        phase = phase.transition(PhaseEvent::ResponseArrived);
        assert_eq!(phase, AiPhase::Responding);
        phase = phase.transition(PhaseEvent::HoldElapsed);
        assert_eq!(phase, AiPhase::Idle);
    }

    #[test]
    fn test_processing_ignores_typing_and_hold() {
        for event in [
            PhaseEvent::TypingStarted,
            PhaseEvent::TypingStopped,
            PhaseEvent::HoldElapsed,
            PhaseEvent::RequestSent,
        ] {
            assert_eq!(AiPhase::Processing.transition(event), AiPhase::Processing);
        }
    }

    #[test]
    fn test_response_arrived_outside_processing_is_noop() {
        assert_eq!(
            AiPhase::Idle.transition(PhaseEvent::ResponseArrived),
            AiPhase::Idle
        );
        assert_eq!(
            AiPhase::Typing.transition(PhaseEvent::ResponseArrived),
            AiPhase::Typing
        );
    }

    #[test]
    fn test_typing_interrupts_responding() {
        assert_eq!(
            AiPhase::Responding.transition(PhaseEvent::TypingStarted),
            AiPhase::Typing
        );
        assert_eq!(
            AiPhase::Responding.transition(PhaseEvent::TypingStopped),
            AiPhase::Responding
        );
    }

    #[test]
    fn test_profile_table() {
        assert_eq!(AiPhase::Idle.profile().amplitude, 0.0);
        assert_eq!(AiPhase::Typing.profile().glow, 0.2);
        assert_eq!(AiPhase::Processing.profile().frequency, 4.0);
        assert_eq!(AiPhase::Responding.profile().amplitude, 0.05);
    }

    #[test]
    fn test_idle_scale_is_unity() {
        for t in [0.0, 0.5, 1.3, 100.0] {
            assert_eq!(AiPhase::Idle.scale(t), 1.0);
        }
    }

    #[test]
    fn test_processing_intensity_rises_to_one() {
        let mut i = 0.0;
        for _ in 0..30 {
            i = AiPhase::Processing.step_intensity(i, 1.0);
        }
        assert_eq!(i, 1.0);
    }

    #[test]
    fn test_responding_intensity_floor() {
        let mut i = 1.0;
        for _ in 0..100 {
            i = AiPhase::Responding.step_intensity(i, 1.0);
        }
        assert!((i - RESPONDING_INTENSITY_FLOOR).abs() < 1e-12);
    }

    #[test]
    fn test_idle_intensity_decays_to_zero() {
        let mut i = 0.5;
        for _ in 0..60 {
            i = AiPhase::Idle.step_intensity(i, 1.0);
        }
        assert_eq!(i, 0.0);
    }

    #[test]
    fn test_typing_holds_intensity() {
        assert_eq!(AiPhase::Typing.step_intensity(0.42, 1.0), 0.42);
    }

    #[test]
    fn test_phase_parse() {
        assert_eq!("Processing".parse::<AiPhase>().unwrap(), AiPhase::Processing);
        assert!("thinking".parse::<AiPhase>().is_err());
    }

    fn arb_phase() -> impl Strategy<Value = AiPhase> {
        prop::sample::select(AiPhase::ALL.to_vec())
    }

    fn arb_event() -> impl Strategy<Value = PhaseEvent> {
        prop::sample::select(vec![
            PhaseEvent::TypingStarted,
            PhaseEvent::TypingStopped,
            PhaseEvent::RequestSent,
            PhaseEvent::ResponseArrived,
            PhaseEvent::HoldElapsed,
        ])
    }

    proptest! {
        #[test]
        fn prop_intensity_clamped(
            start in 0.0f64..=1.0,
            steps in prop::collection::vec((arb_phase(), 0.0f64..4.0), 0..200),
        ) {
            let mut i = start;
            for (phase, frames) in steps {
                i = phase.step_intensity(i, frames);
                prop_assert!((0.0..=1.0).contains(&i));
            }
        }

        #[test]
        fn prop_processing_exits_only_by_response(events in prop::collection::vec(arb_event(), 0..50)) {
            let mut phase = AiPhase::Processing;
            for e in events {
                let next = phase.transition(e);
                if phase == AiPhase::Processing && next != AiPhase::Processing {
                    prop_assert_eq!(e, PhaseEvent::ResponseArrived);
                }
                phase = next;
            }
        }
    }
}
