//! Prompt widget and the request lifecycle around it.
//!
//! A `Session` owns the interaction state together with the UI surface
//! (input, submit control, status indicator, response region). Input
//! handlers and the oracle task only talk to it through these methods, so
//! the phase sequence of a request stays Idle → Processing → Responding → Idle
//! and the submit control is never left disabled.

use serde::Serialize;

use crate::contract::{LOADING_TEXT, ORACLE_NAME, OracleResult};
use crate::interaction::InteractionState;
use crate::markup;
use crate::phase::{AiPhase, PhaseEvent};

/// Status indicator next to the input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Idle,
    Typing,
    Processing,
    Ready,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Welcome,
    Loading,
    Message,
    Refusal,
    TransportError,
}

/// Content of the response region. Replaced wholesale, never appended to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponseBlock {
    pub title: String,
    pub kind: BlockKind,
    /// Display-safe HTML produced by the markup renderer.
    pub html: String,
}

impl ResponseBlock {
    pub fn welcome(model: &str) -> Self {
        let text = format!(
            "**The Nexus Awakens**\n\
             MNEX Oracle Online\n\
             *Model: {model}*\n\
             We are Morpheus Nexus. The cognitive key pulses through the neural mesh. \
             Ask within the parameters. Convergence approaches."
        );
        Self {
            title: ORACLE_NAME.to_string(),
            kind: BlockKind::Welcome,
            html: markup::render(&text),
        }
    }

    pub fn loading() -> Self {
        Self {
            title: ORACLE_NAME.to_string(),
            kind: BlockKind::Loading,
            html: markup::render(LOADING_TEXT),
        }
    }

    pub fn from_result(result: &OracleResult) -> Self {
        let kind = match result {
            OracleResult::InCharacterMessage(_) => BlockKind::Message,
            OracleResult::Refusal(_) => BlockKind::Refusal,
            OracleResult::TransportError(_) => BlockKind::TransportError,
        };
        Self {
            title: ORACLE_NAME.to_string(),
            kind,
            html: markup::render(result.text()),
        }
    }
}

/// Identifies one accepted submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Ticket(pub u64);

/// Outcome of pressing submit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submit {
    /// Empty or whitespace-only input. Nothing changed, nothing to send.
    Ignored,
    /// A request is already in flight.
    Busy,
    /// Send `prompt` to the oracle and report back with `ticket`.
    Accepted { ticket: Ticket, prompt: String },
}

/// Serializable view of the widget for clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub input: String,
    pub focused: bool,
    pub submit_enabled: bool,
    pub status: Status,
    pub phase: AiPhase,
    pub response: ResponseBlock,
    pub interaction: InteractionState,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub interaction: InteractionState,
    input: String,
    focused: bool,
    submit_enabled: bool,
    status: Status,
    response: ResponseBlock,
    next_ticket: u64,
    in_flight: Option<Ticket>,
    holding: Option<Ticket>,
}

impl Session {
    pub fn new(model: &str) -> Self {
        Self {
            interaction: InteractionState::new(),
            input: String::new(),
            focused: false,
            submit_enabled: true,
            status: Status::Idle,
            response: ResponseBlock::welcome(model),
            next_ticket: 1,
            in_flight: None,
            holding: None,
        }
    }

    pub fn phase(&self) -> AiPhase {
        self.interaction.phase
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn response(&self) -> &ResponseBlock {
        &self.response
    }

    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight
    }

    pub fn focus(&mut self) {
        self.focused = true;
        if self.in_flight.is_none() {
            self.status = Status::Typing;
        }
        self.interaction.apply(PhaseEvent::TypingStarted);
    }

    pub fn blur(&mut self) {
        self.focused = false;
        if self.in_flight.is_none() {
            self.status = if self.input.trim().is_empty() {
                Status::Idle
            } else {
                Status::Ready
            };
        }
        self.interaction.apply(PhaseEvent::TypingStopped);
    }

    pub fn input_changed(&mut self, text: &str) {
        self.input = text.to_string();
        let event = if self.input.trim().is_empty() {
            PhaseEvent::TypingStopped
        } else {
            PhaseEvent::TypingStarted
        };
        self.interaction.apply(event);
    }

    /// Submit the current input.
    pub fn submit(&mut self) -> Submit {
        let prompt = self.input.trim();
        if prompt.is_empty() {
            return Submit::Ignored;
        }
        if self.in_flight.is_some() {
            return Submit::Busy;
        }
        let prompt = prompt.to_string();

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.holding = None;
        self.submit_enabled = false;
        self.status = Status::Processing;
        self.response = ResponseBlock::loading();
        self.interaction.apply(PhaseEvent::RequestSent);

        Submit::Accepted { ticket, prompt }
    }

    /// Replace the input with `text` and submit it.
    pub fn submit_text(&mut self, text: &str) -> Submit {
        if text.trim().is_empty() {
            return Submit::Ignored;
        }
        if self.in_flight.is_some() {
            return Submit::Busy;
        }
        self.input = text.to_string();
        self.submit()
    }

    /// Deliver the oracle's answer. Returns false for tickets that are not in flight.
    pub fn complete(&mut self, ticket: Ticket, result: &OracleResult) -> bool {
        if self.in_flight != Some(ticket) {
            return false;
        }
        self.in_flight = None;
        self.holding = Some(ticket);
        self.interaction.apply(PhaseEvent::ResponseArrived);
        self.response = ResponseBlock::from_result(result);
        self.status = Status::Ready;
        self.submit_enabled = true;
        self.input.clear();
        true
    }

    /// The Responding hold for `ticket` ran out. Ignored when superseded.
    pub fn hold_elapsed(&mut self, ticket: Ticket) -> bool {
        if self.holding != Some(ticket) {
            return false;
        }
        self.holding = None;
        self.interaction.apply(PhaseEvent::HoldElapsed) == AiPhase::Idle
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            input: self.input.clone(),
            focused: self.focused,
            submit_enabled: self.submit_enabled,
            status: self.status,
            phase: self.interaction.phase,
            response: self.response.clone(),
            interaction: self.interaction.clone(),
        }
    }
}
