//! Shared helpers for relay integration tests: router construction, a
//! page-context WebSocket client and a scriptable backend.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::Path;
use axum::http::{Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get as route_get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use slidepilot_core::settings::{Settings, SettingsStore, BACKEND_URL_KEY, BACKEND_WS_KEY};
use slidepilot_relay::config::ServerConfig;
use slidepilot_relay::router::build_app_router;
use slidepilot_relay::state::AppState;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Build a test `ServerConfig` with short intervals.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        settings_path: PathBuf::from("relay-settings.json"),
        poll_interval: POLL_INTERVAL,
        push_reconnect_delay: Duration::from_millis(100),
    }
}

/// Settings pointing at `backend_url`, with the push channel aimed at a
/// port nothing listens on.
pub fn settings_without_push(backend_url: &str) -> Settings {
    BTreeMap::from([
        (BACKEND_URL_KEY.to_string(), backend_url.to_string()),
        (BACKEND_WS_KEY.to_string(), format!("ws://{}/ws", closed_addr())),
    ])
}

pub fn build_test_state(settings: Settings) -> AppState {
    AppState::new(test_config(), SettingsStore::with_values(settings))
}

/// Build the full application router, mirroring `main.rs`.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state, &test_config())
}

/// An address that refuses connections.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

// ---------------------------------------------------------------------------
// Route helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Relay server and page-context client
// ---------------------------------------------------------------------------

/// Serve the relay router on a loopback port.
pub async fn serve_relay(state: AppState) -> SocketAddr {
    serve(build_test_app(state)).await
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A page context talking to the relay over `/api/ws`.
pub struct PageContext {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PageContext {
    pub async fn connect(relay: SocketAddr) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{relay}/api/ws"))
            .await
            .expect("relay should accept page contexts");
        Self { ws }
    }

    pub async fn send(&mut self, frame: Value) {
        self.send_raw(&frame.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::text(text)).await.unwrap();
    }

    /// Next JSON frame, skipping control frames.
    pub async fn recv(&mut self) -> Value {
        self.try_recv(Duration::from_secs(3))
            .await
            .expect("timed out waiting for a relay frame")
    }

    pub async fn try_recv(&mut self, timeout: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next()).await.ok()??;
            match frame.ok()? {
                Message::Text(text) => return Some(serde_json::from_str(text.as_str()).unwrap()),
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Receive until a frame matches `pred`, returning everything received.
    pub async fn recv_until(&mut self, pred: impl Fn(&Value) -> bool) -> Vec<Value> {
        let mut frames = Vec::new();
        loop {
            let frame = self.recv().await;
            let done = pred(&frame);
            frames.push(frame);
            if done {
                return frames;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// One scripted answer of the job-status endpoint.
#[derive(Clone)]
pub enum StatusStep {
    /// 200 with this JSON body (`job_id` is filled in).
    Json(Value),
    /// An error status with a plain-text body.
    Fail(StatusCode),
    /// 200 with a body that is not JSON.
    Garbage,
}

/// Backend answering every generation request with a fixed body and
/// replaying a scripted sequence of job-status answers (the last repeats).
pub struct ScriptedBackend {
    pub base_url: String,
    pub polls: Arc<AtomicUsize>,
    pub generate_calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl ScriptedBackend {
    pub async fn start(generate_response: Value, statuses: Vec<Value>) -> Self {
        Self::start_with_steps(
            generate_response,
            statuses.into_iter().map(StatusStep::Json).collect(),
        )
        .await
    }

    pub async fn start_with_steps(generate_response: Value, steps: Vec<StatusStep>) -> Self {
        let polls = Arc::new(AtomicUsize::new(0));
        let generate_calls = Arc::new(Mutex::new(Vec::new()));

        let poll_counter = Arc::clone(&polls);
        let script = Arc::new(steps);
        let status_route = route_get(move |Path(id): Path<String>| {
            let poll_counter = Arc::clone(&poll_counter);
            let script = Arc::clone(&script);
            async move {
                let n = poll_counter.fetch_add(1, Ordering::SeqCst);
                let step = script
                    .get(n)
                    .or_else(|| script.last())
                    .cloned()
                    .unwrap_or_else(|| StatusStep::Json(json!({"status": "not_found"})));
                match step {
                    StatusStep::Json(mut body) => {
                        body["job_id"] = json!(id);
                        Json(body).into_response()
                    }
                    StatusStep::Fail(status) => (status, "backend overloaded").into_response(),
                    StatusStep::Garbage => "<html>maintenance</html>".into_response(),
                }
            }
        });

        let mut app = Router::new().route("/api/job-status/{id}", status_route);
        for endpoint in ["/api/generate-outline", "/api/generate-image", "/api/generate-ppt"] {
            let calls = Arc::clone(&generate_calls);
            let response = generate_response.clone();
            app = app.route(
                endpoint,
                post(move |Json(payload): Json<Value>| {
                    let calls = Arc::clone(&calls);
                    let response = response.clone();
                    async move {
                        calls.lock().unwrap().push((endpoint.to_string(), payload));
                        Json(response)
                    }
                }),
            );
        }

        let addr = serve(app).await;
        Self {
            base_url: format!("http://{addr}"),
            polls,
            generate_calls,
        }
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

/// Wait until the push channel reports connected.
pub async fn wait_for_push(state: &AppState) {
    let mut rx = state.push.watch_state();
    tokio::time::timeout(Duration::from_secs(3), async {
        while !state.push.is_connected() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await
    .expect("push channel did not connect");
}
