//! Headless display-refresh loop.
//!
//! Ticks the shared interaction state at a fixed rate and publishes each draw
//! on a watch channel. It only ever waits on its own interval, the session
//! mutex (held briefly by input handlers) and shutdown; never on the oracle.

use std::time::Duration;

use orb_core::{DrawCall, FrameSink, FrameTime, RenderError, Renderer, Viewport};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::session::SharedSession;

/// Frame sink that replaces the published frame on every present.
pub struct FramePublisher {
    tx: watch::Sender<Option<DrawCall>>,
    presented: u64,
}

impl FramePublisher {
    pub fn new() -> (Self, watch::Receiver<Option<DrawCall>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx, presented: 0 }, rx)
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl FrameSink for FramePublisher {
    fn present(&mut self, draw: &DrawCall) {
        self.tx.send_replace(Some(*draw));
        self.presented += 1;
    }
}

/// Handle for requesting surface resizes from outside the loop.
#[derive(Clone)]
pub struct ResizeHandle(mpsc::Sender<(u32, u32)>);

impl ResizeHandle {
    /// Queue a resize. Zero-sized requests are refused here and never reach the camera.
    pub fn request(&self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.0.try_send((width, height)).is_ok()
    }
}

pub struct RenderLoop {
    renderer: Renderer<FramePublisher>,
    session: SharedSession,
    period: Duration,
    resizes: mpsc::Receiver<(u32, u32)>,
}

impl RenderLoop {
    /// A missing or empty surface is a startup error.
    pub fn new(
        session: SharedSession,
        viewport: Viewport,
        fps: u32,
    ) -> Result<(Self, ResizeHandle, watch::Receiver<Option<DrawCall>>), RenderError> {
        let (publisher, frames) = FramePublisher::new();
        let renderer = Renderer::new(viewport, publisher)?;
        let (tx, resizes) = mpsc::channel(8);
        let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
        Ok((
            Self {
                renderer,
                session,
                period,
                resizes,
            },
            ResizeHandle(tx),
            frames,
        ))
    }

    /// Run until `cancel` fires. Returns the number of frames presented.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let start = Instant::now();
        let mut last = start;
        tracing::info!(period_ms = self.period.as_secs_f64() * 1000.0, "render loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some((width, height)) = self.resizes.recv() => {
                    if self.renderer.resize(width, height) {
                        tracing::debug!(width, height, "viewport resized");
                    }
                }
                now = interval.tick() => {
                    let time = FrameTime {
                        elapsed: now.duration_since(start).as_secs_f64(),
                        delta: now.duration_since(last).as_secs_f64(),
                    };
                    last = now;
                    let mut session = self.session.lock().await;
                    self.renderer.frame(&mut session.interaction, time);
                }
            }
        }

        let presented = self.renderer.sink().presented();
        tracing::info!(presented, "render loop stopped");
        presented
    }
}
