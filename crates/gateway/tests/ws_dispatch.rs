#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the dispatch pipeline over a live WebSocket.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt},
    serde_json::json,
    tokio::net::TcpListener,
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
};

use {
    patchbay_config::{PresenterSpec, RouteConfig},
    patchbay_gateway::{
        dispatch::{DispatchOutcome, MessageRouter, TableRouter},
        present::run_presenter,
        server::build_gateway_app,
        signal::DispatchSignal,
        state::GatewayState,
    },
    patchbay_protocol::{NO_MESSAGE_REPLY, Request},
    patchbay_routing::RouteTable,
    patchbay_workflow::{
        Run, RunOutcome, TaskEngine, TaskSpec, WorkflowEngine, WorkflowTemplate,
    },
};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// ── Test fixtures ────────────────────────────────────────────────────────────

fn task(kind: &str, params: serde_json::Value) -> TaskSpec {
    TaskSpec {
        kind: kind.into(),
        params: params.as_object().unwrap().clone(),
    }
}

fn route(
    pattern: &str,
    tasks: Vec<TaskSpec>,
    presenter: Option<PresenterSpec>,
) -> RouteConfig {
    RouteConfig {
        pattern: pattern.into(),
        workflow: WorkflowTemplate {
            name: pattern.into(),
            tasks,
        },
        presenter,
    }
}

fn presenter(header: &str, vars: serde_json::Value, broadcast: bool) -> PresenterSpec {
    PresenterSpec {
        header: header.into(),
        vars,
        broadcast,
    }
}

/// `chat/send` route from the happy path: copy `data.text` into the output
/// and reply with it.
fn chat_route() -> RouteConfig {
    route(
        "chat/send",
        vec![task("set", json!({"text": "{$data.text}"}))],
        Some(presenter("chat/send", json!("{$output.text}"), false)),
    )
}

/// Spin up a gateway with the given routes on an ephemeral port.
async fn start_test_server(
    routes: Vec<RouteConfig>,
    engine: Arc<dyn WorkflowEngine>,
) -> (SocketAddr, Arc<GatewayState>) {
    let (state, completions) = GatewayState::new();
    tokio::spawn(run_presenter(Arc::clone(&state), completions));

    let table = RouteTable::compile(&routes).unwrap();
    let router = Arc::new(TableRouter::new(table, engine));
    let app = build_gateway_app(Arc::clone(&state), router);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("ws connect failed");
    ws
}

async fn send_line(ws: &mut WsClient, line: &str) {
    ws.send(Message::Text(line.into())).await.unwrap();
}

async fn next_line(ws: &mut WsClient) -> String {
    match tokio::time::timeout(Duration::from_secs(2), ws.next()).await {
        Ok(Some(Ok(msg))) => msg.to_text().unwrap().to_string(),
        other => panic!("expected a text frame, got: {other:?}"),
    }
}

async fn assert_silent(ws: &mut WsClient) {
    let result = tokio::time::timeout(Duration::from_millis(250), ws.next()).await;
    assert!(result.is_err(), "expected silence, got: {result:?}");
}

/// Block until the registry reports `n` live connections.
async fn wait_for_connections(addr: SocketAddr, n: usize) {
    for _ in 0..50 {
        let health: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if health["connections"] == json!(n) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("never reached {n} connections");
}

// ── HTTP surface ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_endpoint_reports_status() {
    let (addr, _state) = start_test_server(vec![], Arc::new(TaskEngine::new())).await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let health: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert!(health["version"].is_string());
    assert_eq!(health["connections"], 0);
}

// ── Dispatch pipeline ────────────────────────────────────────────────────────

#[tokio::test]
async fn completed_run_replies_to_the_originator_only() {
    let (addr, _state) =
        start_test_server(vec![chat_route()], Arc::new(TaskEngine::new())).await;
    let mut origin = connect(addr).await;
    let mut bystander = connect(addr).await;
    wait_for_connections(addr, 2).await;

    send_line(&mut origin, r#"chat/send:{"text":"hi"}"#).await;
    assert_eq!(next_line(&mut origin).await, r#"chat/send:"hi""#);
    assert_silent(&mut bystander).await;
}

#[tokio::test]
async fn non_json_payload_arrives_as_raw() {
    let echo = route(
        "echo",
        vec![],
        Some(presenter("echo", json!("{$data}"), false)),
    );
    let (addr, _state) = start_test_server(vec![echo], Arc::new(TaskEngine::new())).await;
    let mut ws = connect(addr).await;

    send_line(&mut ws, "echo:not-json").await;
    assert_eq!(next_line(&mut ws).await, r#"echo:{"raw":"not-json"}"#);
}

#[tokio::test]
async fn bare_route_dispatches_with_empty_data() {
    let echo = route(
        "echo",
        vec![],
        Some(presenter("echo", json!("{$data}"), false)),
    );
    let (addr, _state) = start_test_server(vec![echo], Arc::new(TaskEngine::new())).await;
    let mut ws = connect(addr).await;

    send_line(&mut ws, "echo").await;
    assert_eq!(next_line(&mut ws).await, "echo:{}");
}

#[tokio::test]
async fn payload_colons_after_the_first_are_preserved() {
    let clock = route(
        "clock/set",
        vec![],
        Some(presenter("clock/set", json!("{$data.raw}"), false)),
    );
    let (addr, _state) = start_test_server(vec![clock], Arc::new(TaskEngine::new())).await;
    let mut ws = connect(addr).await;

    send_line(&mut ws, "clock/set:10:30:00").await;
    assert_eq!(next_line(&mut ws).await, r#"clock/set:"10:30:00""#);
}

#[tokio::test]
async fn unknown_route_signals_and_stays_silent() {
    let (addr, state) =
        start_test_server(vec![chat_route()], Arc::new(TaskEngine::new())).await;
    let mut signals = state.subscribe();
    let mut ws = connect(addr).await;

    send_line(&mut ws, "unknownroute").await;
    let signal = tokio::time::timeout(Duration::from_secs(2), signals.recv())
        .await
        .unwrap()
        .unwrap();
    match signal {
        DispatchSignal::Unknown { route, .. } => assert_eq!(route, "unknownroute"),
        other => panic!("unexpected signal: {other:?}"),
    }
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn failed_run_degrades_to_the_error_reply() {
    let boom = route(
        "boom",
        vec![task("fail", json!({"message": "kaboom"}))],
        Some(presenter("boom", json!({}), false)),
    );
    let (addr, _state) = start_test_server(vec![boom], Arc::new(TaskEngine::new())).await;
    let mut origin = connect(addr).await;
    let mut bystander = connect(addr).await;
    wait_for_connections(addr, 2).await;

    send_line(&mut origin, "boom").await;
    assert_eq!(next_line(&mut origin).await, NO_MESSAGE_REPLY);
    assert_eq!(NO_MESSAGE_REPLY, r#"error:{"error":"No message"}"#);
    assert_silent(&mut bystander).await;
}

#[tokio::test]
async fn render_failure_degrades_to_the_error_reply() {
    let bad = route(
        "bad",
        vec![],
        Some(presenter("bad", json!("{$output.nope}"), false)),
    );
    let (addr, _state) = start_test_server(vec![bad], Arc::new(TaskEngine::new())).await;
    let mut ws = connect(addr).await;

    send_line(&mut ws, "bad").await;
    assert_eq!(next_line(&mut ws).await, NO_MESSAGE_REPLY);
}

#[tokio::test]
async fn first_matching_route_shadows_later_ones() {
    let first = route(
        "chat/(send|edit)",
        vec![],
        Some(presenter("first", json!({}), false)),
    );
    let second = route("chat/send", vec![], Some(presenter("second", json!({}), false)));
    let (addr, _state) =
        start_test_server(vec![first, second], Arc::new(TaskEngine::new())).await;
    let mut ws = connect(addr).await;

    send_line(&mut ws, "chat/send").await;
    assert_eq!(next_line(&mut ws).await, "first:{}");
}

#[tokio::test]
async fn route_match_spans_the_full_string() {
    let chat = route("chat", vec![], Some(presenter("chat", json!({}), false)));
    let (addr, state) = start_test_server(vec![chat], Arc::new(TaskEngine::new())).await;
    let mut signals = state.subscribe();
    let mut ws = connect(addr).await;

    // A longer route must not match the `chat` prefix.
    send_line(&mut ws, "chat/send").await;
    let signal = tokio::time::timeout(Duration::from_secs(2), signals.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(signal, DispatchSignal::Unknown { .. }));
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn broadcast_reaches_every_live_connection() {
    let announce = route(
        "announce",
        vec![],
        Some(presenter("announce", json!({"msg": "all"}), true)),
    );
    let (addr, _state) = start_test_server(vec![announce], Arc::new(TaskEngine::new())).await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    let mut c = connect(addr).await;
    wait_for_connections(addr, 3).await;

    send_line(&mut a, "announce").await;
    for ws in [&mut a, &mut b, &mut c] {
        assert_eq!(next_line(ws).await, r#"announce:{"msg":"all"}"#);
    }
}

#[tokio::test]
async fn malformed_frames_do_not_kill_the_connection() {
    let (addr, _state) =
        start_test_server(vec![chat_route()], Arc::new(TaskEngine::new())).await;
    let mut ws = connect(addr).await;

    send_line(&mut ws, "not a route!").await;
    send_line(&mut ws, ":payload-without-route").await;
    assert_silent(&mut ws).await;

    // The connection still dispatches afterwards.
    send_line(&mut ws, r#"chat/send:{"text":"still here"}"#).await;
    assert_eq!(next_line(&mut ws).await, r#"chat/send:"still here""#);
}

// ── Readiness gate ───────────────────────────────────────────────────────────

struct NeverReady;

#[async_trait]
impl WorkflowEngine for NeverReady {
    fn ready(&self, _template: &WorkflowTemplate) -> bool {
        false
    }

    async fn execute(&self, _run: &mut Run) -> RunOutcome {
        RunOutcome::Failed(json!({"message": "unreachable"}))
    }
}

#[tokio::test]
async fn unready_workflow_never_replies() {
    let (addr, state) = start_test_server(vec![chat_route()], Arc::new(NeverReady)).await;
    let mut signals = state.subscribe();
    let mut ws = connect(addr).await;

    send_line(&mut ws, r#"chat/send:{"text":"hi"}"#).await;

    // The match is observable, but no terminal outcome ever follows.
    let signal = tokio::time::timeout(Duration::from_secs(2), signals.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(signal, DispatchSignal::Matched { .. }));
    assert_silent(&mut ws).await;
    assert!(signals.try_recv().is_err());
}

// ── Custom router injection ──────────────────────────────────────────────────

struct EchoRouter;

#[async_trait]
impl MessageRouter for EchoRouter {
    async fn dispatch(
        &self,
        request: Request,
        conn_id: &str,
        state: &Arc<GatewayState>,
    ) -> DispatchOutcome {
        state
            .send_to(conn_id, &format!("custom:{}", request.route))
            .await;
        DispatchOutcome::Launched
    }
}

#[tokio::test]
async fn injected_router_replaces_table_dispatch() {
    let (state, completions) = GatewayState::new();
    tokio::spawn(run_presenter(Arc::clone(&state), completions));
    let app = build_gateway_app(Arc::clone(&state), Arc::new(EchoRouter));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let mut ws = connect(addr).await;
    send_line(&mut ws, "ping:1").await;
    assert_eq!(next_line(&mut ws).await, "custom:ping");
}
