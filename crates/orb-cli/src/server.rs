//! HTTP surface for `orb serve`.
//!
//! Input events come in as small POSTs and mutate the shared session; the
//! render loop's latest frame, the widget snapshot and the static shader
//! programs are read back with GETs. Terminal feeds stream as SSE.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::Stream;
use orb_core::terminal::TerminalEvent;
use orb_core::{CanvasRect, DrawCall, SessionSnapshot, Submit, TerminalFeed, shader};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::oracle::OracleClient;
use crate::render_loop::ResizeHandle;
use crate::session::SessionDriver;

const WGSL_CONTENT_TYPE: &str = "text/wgsl; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    driver: SessionDriver<OracleClient>,
    frames: watch::Receiver<Option<DrawCall>>,
    resize: ResizeHandle,
}

impl AppState {
    pub fn new(
        driver: SessionDriver<OracleClient>,
        frames: watch::Receiver<Option<DrawCall>>,
        resize: ResizeHandle,
    ) -> Self {
        Self {
            driver,
            frames,
            resize,
        }
    }

    async fn snapshot(&self) -> SessionSnapshot {
        self.driver.session().lock().await.snapshot()
    }
}

// --- Request bodies ---

#[derive(Debug, Deserialize)]
struct PointerMove {
    x: f64,
    y: f64,
    rect: CanvasRect,
}

#[derive(Debug, Deserialize)]
struct InputBody {
    text: String,
}

#[derive(Debug, Deserialize)]
struct PromptBody {
    /// Falls back to the current input when absent.
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResizeBody {
    width: u32,
    height: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/frame", get(get_frame))
        .route("/api/pointer/move", post(pointer_move))
        .route("/api/pointer/enter", post(pointer_enter))
        .route("/api/pointer/leave", post(pointer_leave))
        .route("/api/click", post(click))
        .route("/api/input", post(input))
        .route("/api/focus", post(focus))
        .route("/api/blur", post(blur))
        .route("/api/prompt", post(prompt))
        .route("/api/resize", post(resize))
        .route("/api/terminal/{index}", get(terminal))
        .route("/shader/{file}", get(shader_source))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "http surface listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
}

// --- Handlers ---

async fn get_state(State(app): State<AppState>) -> Json<SessionSnapshot> {
    Json(app.snapshot().await)
}

async fn get_frame(State(app): State<AppState>) -> Response {
    let latest = *app.frames.borrow();
    match latest {
        Some(draw) => Json(draw).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn pointer_move(
    State(app): State<AppState>,
    Json(body): Json<PointerMove>,
) -> Json<serde_json::Value> {
    let applied = app
        .driver
        .session()
        .lock()
        .await
        .interaction
        .pointer_move(&body.rect, body.x, body.y);
    Json(json!({ "applied": applied }))
}

async fn pointer_enter(State(app): State<AppState>) -> StatusCode {
    app.driver.session().lock().await.interaction.pointer_enter();
    StatusCode::NO_CONTENT
}

async fn pointer_leave(State(app): State<AppState>) -> StatusCode {
    app.driver.session().lock().await.interaction.pointer_leave();
    StatusCode::NO_CONTENT
}

async fn click(State(app): State<AppState>) -> StatusCode {
    app.driver.session().lock().await.interaction.click();
    StatusCode::NO_CONTENT
}

async fn input(State(app): State<AppState>, Json(body): Json<InputBody>) -> Json<SessionSnapshot> {
    let mut session = app.driver.session().lock().await;
    session.input_changed(&body.text);
    Json(session.snapshot())
}

async fn focus(State(app): State<AppState>) -> Json<SessionSnapshot> {
    let mut session = app.driver.session().lock().await;
    session.focus();
    Json(session.snapshot())
}

async fn blur(State(app): State<AppState>) -> Json<SessionSnapshot> {
    let mut session = app.driver.session().lock().await;
    session.blur();
    Json(session.snapshot())
}

async fn prompt(State(app): State<AppState>, Json(body): Json<PromptBody>) -> Response {
    match app.driver.submit(body.prompt.as_deref()).await {
        Submit::Accepted { ticket, .. } => {
            (StatusCode::ACCEPTED, Json(json!({ "ticket": ticket.0 }))).into_response()
        }
        Submit::Ignored => StatusCode::NO_CONTENT.into_response(),
        Submit::Busy => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "a request is already in flight" })),
        )
            .into_response(),
    }
}

async fn resize(State(app): State<AppState>, Json(body): Json<ResizeBody>) -> StatusCode {
    if app.resize.request(body.width, body.height) {
        StatusCode::ACCEPTED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

async fn shader_source(Path(file): Path<String>) -> Response {
    match shader::source(&file) {
        Some(src) => ([(header::CONTENT_TYPE, WGSL_CONTENT_TYPE)], src).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn terminal(Path(index): Path<usize>) -> Response {
    match TerminalFeed::new(index) {
        Some(feed) => {
            tracing::debug!(index, id = feed.id(), "terminal stream opened");
            Sse::new(terminal_stream(feed, SmallRng::from_os_rng()))
                .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Endless event stream for one terminal, paced by the feed's own schedule.
fn terminal_stream(
    mut feed: TerminalFeed,
    mut rng: SmallRng,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    async_stream::stream! {
        loop {
            let TerminalEvent { delay, action } = feed.next_event(&mut rng);
            tokio::time::sleep(delay).await;
            yield Event::default().event(feed.id()).json_data(&action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_loop::RenderLoop;
    use crate::test_support::{MockOracle, completion, oracle_config};
    use futures_util::StreamExt;
    use orb_core::{Session, Viewport};
    use serde_json::Value;
    use std::sync::Arc;

    struct Harness {
        base: String,
        http: reqwest::Client,
        cancel: CancellationToken,
    }

    impl Harness {
        async fn start(mock: MockOracle) -> Self {
            let endpoint = mock.spawn().await;
            let client = OracleClient::new(&oracle_config(&endpoint)).unwrap();
            let driver = SessionDriver::new(Session::new(client.model()), client)
                .with_hold(Duration::from_millis(150));
            let (render, resize, frames) = RenderLoop::new(
                Arc::clone(driver.session()),
                Viewport::new(800, 800, 1.0),
                60,
            )
            .unwrap();
            let cancel = CancellationToken::new();
            tokio::spawn(render.run(cancel.clone()));

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let state = AppState::new(driver, frames, resize);
            tokio::spawn(serve(listener, state, cancel.clone()));

            Self {
                base,
                http: reqwest::Client::new(),
                cancel,
            }
        }

        async fn get(&self, path: &str) -> reqwest::Response {
            self.http
                .get(format!("{}{path}", self.base))
                .send()
                .await
                .unwrap()
        }

        async fn post(&self, path: &str, body: Value) -> reqwest::Response {
            self.http
                .post(format!("{}{path}", self.base))
                .json(&body)
                .send()
                .await
                .unwrap()
        }

        async fn state(&self) -> Value {
            self.get("/api/state").await.json().await.unwrap()
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.cancel.cancel();
        }
    }

    fn in_character(message: &str) -> MockOracle {
        let payload = json!({ "stay_in_character": true, "message": message }).to_string();
        MockOracle::ok(completion(&payload))
    }

    #[tokio::test]
    async fn test_initial_state() {
        let h = Harness::start(in_character("x")).await;
        let state = h.state().await;
        assert_eq!(state["status"], "IDLE");
        assert_eq!(state["phase"], "idle");
        assert_eq!(state["submit_enabled"], true);
        assert_eq!(state["response"]["kind"], "welcome");
        assert!(state["response"]["html"].as_str().unwrap().contains("test-model"));
    }

    #[tokio::test]
    async fn test_prompt_lifecycle() {
        let h = Harness::start(
            in_character("I see the lattice.").with_delay(Duration::from_millis(300)),
        )
        .await;

        let r = h.post("/api/prompt", json!({ "prompt": "   " })).await;
        assert_eq!(r.status(), StatusCode::NO_CONTENT);

        let r = h.post("/api/prompt", json!({ "prompt": "what do you see?" })).await;
        assert_eq!(r.status(), StatusCode::ACCEPTED);
        let body: Value = r.json().await.unwrap();
        assert_eq!(body["ticket"], 1);

        let r = h.post("/api/prompt", json!({ "prompt": "again" })).await;
        assert_eq!(r.status(), StatusCode::CONFLICT);

        let state = h.state().await;
        assert_eq!(state["status"], "PROCESSING");
        assert_eq!(state["submit_enabled"], false);
        assert_eq!(state["response"]["kind"], "loading");

        let mut state = state;
        for _ in 0..60 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            state = h.state().await;
            if state["status"] == "READY" {
                break;
            }
        }
        assert_eq!(state["status"], "READY");
        assert_eq!(state["submit_enabled"], true);
        assert_eq!(state["response"]["kind"], "message");
        assert_eq!(state["response"]["html"], "We see the lattice.");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(h.state().await["phase"], "idle");
    }

    #[tokio::test]
    async fn test_prompt_uses_current_input() {
        let h = Harness::start(in_character("ok")).await;
        h.post("/api/input", json!({ "text": "from the box" })).await;
        let r = h.post("/api/prompt", json!({})).await;
        assert_eq!(r.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_focus_input_blur() {
        let h = Harness::start(in_character("x")).await;
        let s: Value = h.post("/api/focus", json!({})).await.json().await.unwrap();
        assert_eq!(s["status"], "TYPING");
        assert_eq!(s["phase"], "typing");

        let s: Value = h
            .post("/api/input", json!({ "text": "draft" }))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(s["input"], "draft");

        let s: Value = h.post("/api/blur", json!({})).await.json().await.unwrap();
        assert_eq!(s["status"], "READY");
        assert_eq!(s["phase"], "idle");
    }

    #[tokio::test]
    async fn test_pointer_and_click() {
        let h = Harness::start(in_character("x")).await;
        let rect = json!({ "left": 0.0, "top": 0.0, "width": 800.0, "height": 800.0 });

        let r: Value = h
            .post("/api/pointer/move", json!({ "x": 800.0, "y": 400.0, "rect": rect }))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(r["applied"], true);

        let flat = json!({ "left": 0.0, "top": 0.0, "width": 0.0, "height": 800.0 });
        let r: Value = h
            .post("/api/pointer/move", json!({ "x": 1.0, "y": 1.0, "rect": flat }))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(r["applied"], false);

        assert_eq!(
            h.post("/api/pointer/enter", json!({})).await.status(),
            StatusCode::NO_CONTENT
        );
        assert_eq!(h.post("/api/click", json!({})).await.status(), StatusCode::NO_CONTENT);

        let state = h.state().await;
        assert_eq!(state["interaction"]["hover"], true);
        assert!(state["interaction"]["pulse"].as_f64().unwrap() > 0.0);
        let target = state["interaction"]["pointer_target"]["y"].as_f64().unwrap();
        assert!((target - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_frame_and_resize() {
        let h = Harness::start(in_character("x")).await;
        assert_eq!(
            h.post("/api/resize", json!({ "width": 0, "height": 300 })).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            h.post("/api/resize", json!({ "width": 640, "height": 480 })).await.status(),
            StatusCode::ACCEPTED
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        let r = h.get("/api/frame").await;
        assert_eq!(r.status(), StatusCode::OK);
        let frame: Value = r.json().await.unwrap();
        assert_eq!(frame["viewport"]["width"], 640);
        assert_eq!(frame["frame"]["phase"], "idle");
        assert!(frame["frame"]["uniforms"]["time"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_shader_routes() {
        let h = Harness::start(in_character("x")).await;
        let r = h.get("/shader/orb.wgsl").await;
        assert_eq!(r.status(), StatusCode::OK);
        assert_eq!(r.headers()[header::CONTENT_TYPE], WGSL_CONTENT_TYPE);
        assert!(r.text().await.unwrap().contains("fs_main"));

        assert_eq!(h.get("/shader/aura.wgsl").await.status(), StatusCode::OK);
        assert_eq!(h.get("/shader/nope.wgsl").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_terminal_routes() {
        let h = Harness::start(in_character("x")).await;
        assert_eq!(h.get("/api/terminal/9").await.status(), StatusCode::NOT_FOUND);
        let r = h.get("/api/terminal/0").await;
        assert_eq!(r.status(), StatusCode::OK);
        assert!(
            r.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );
    }

    #[tokio::test]
    async fn test_terminal_stream_starts_with_clear() {
        let feed = TerminalFeed::new(0).unwrap();
        let stream = terminal_stream(feed, SmallRng::seed_from_u64(1));
        let first: Vec<_> = stream.take(2).collect().await;
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(Result::is_ok));
    }
}
