//! Async driver around the prompt widget.
//!
//! The `Session` lives behind one mutex shared with the render loop and the
//! HTTP handlers. A submission runs as its own task: consult the oracle,
//! deliver the result, hold the Responding phase, then release it. The lock
//! is never held across the network call.

use std::sync::Arc;
use std::time::Duration;

use orb_core::constants::RESPONDING_HOLD_MS;
use orb_core::{OracleResult, Session, Submit, Ticket};
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::oracle::Oracle;

pub type SharedSession = Arc<Mutex<Session>>;

pub struct SessionDriver<O> {
    session: SharedSession,
    oracle: Arc<O>,
    hold: Duration,
    tasks: TaskTracker,
}

impl<O> Clone for SessionDriver<O> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            oracle: Arc::clone(&self.oracle),
            hold: self.hold,
            tasks: self.tasks.clone(),
        }
    }
}

impl<O: Oracle> SessionDriver<O> {
    pub fn new(session: Session, oracle: O) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            oracle: Arc::new(oracle),
            hold: Duration::from_millis(RESPONDING_HOLD_MS),
            tasks: TaskTracker::new(),
        }
    }

    /// Override the Responding hold.
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Submit `text`, or the current input when `None`. An accepted
    /// submission is consulted in the background. Once shutdown has begun
    /// every submission is refused as busy.
    pub async fn submit(&self, text: Option<&str>) -> Submit {
        if self.tasks.is_closed() {
            tracing::debug!("submission rejected, shutting down");
            return Submit::Busy;
        }
        let outcome = {
            let mut session = self.session.lock().await;
            match text {
                Some(text) => session.submit_text(text),
                None => session.submit(),
            }
        };
        match &outcome {
            Submit::Accepted { ticket, prompt } => {
                tracing::debug!(ticket = ticket.0, "submission accepted");
                let this = self.clone();
                let (ticket, prompt) = (*ticket, prompt.clone());
                self.tasks.spawn(async move {
                    this.run(ticket, prompt).await;
                });
            }
            Submit::Busy => tracing::debug!("submission rejected, request in flight"),
            Submit::Ignored => {}
        }
        outcome
    }

    /// Consult, deliver, hold, release. The session leaves Processing on every
    /// path, including a panicking oracle.
    pub async fn run(&self, ticket: Ticket, prompt: String) -> OracleResult {
        let oracle = Arc::clone(&self.oracle);
        let task_prompt = prompt.clone();
        let result = match tokio::spawn(async move { oracle.consult(&task_prompt).await }).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(ticket = ticket.0, error = %e, "oracle task failed");
                OracleResult::transport_error(&prompt)
            }
        };

        let delivered = self.session.lock().await.complete(ticket, &result);
        if !delivered {
            tracing::debug!(ticket = ticket.0, "stale result dropped");
            return result;
        }
        tracing::debug!(ticket = ticket.0, phase = "responding", "response delivered");

        tokio::time::sleep(self.hold).await;
        if self.session.lock().await.hold_elapsed(ticket) {
            tracing::debug!(ticket = ticket.0, phase = "idle", "response hold elapsed");
        }
        result
    }

    /// Stop accepting background work and wait for what is running.
    pub async fn shutdown(&self, grace: Duration) {
        self.tasks.close();
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_err() {
            tracing::warn!(pending = self.tasks.len(), "oracle tasks still running at shutdown");
        }
    }
}
