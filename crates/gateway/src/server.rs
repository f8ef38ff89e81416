use std::{net::SocketAddr, sync::Arc};

use {
    anyhow::Context,
    axum::{
        Router,
        extract::{ConnectInfo, State, WebSocketUpgrade},
        response::{IntoResponse, Json},
        routing::get,
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use {
    patchbay_config::PatchbayConfig, patchbay_routing::RouteTable,
    patchbay_workflow::WorkflowEngine,
};

use crate::{
    dispatch::{MessageRouter, TableRouter},
    present::run_presenter,
    signal::DispatchSignal,
    state::GatewayState,
    ws::handle_connection,
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
    pub router: Arc<dyn MessageRouter>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>, router: Arc<dyn MessageRouter>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_upgrade_handler))
        .layer(cors)
        .with_state(AppState {
            gateway: state,
            router,
        })
}

/// Start the gateway with the standard table-driven router.
///
/// Fails before binding when the configuration is unusable: a missing port,
/// or a route pattern that does not compile.
pub async fn start_gateway(
    config: PatchbayConfig,
    engine: Arc<dyn WorkflowEngine>,
) -> anyhow::Result<()> {
    let table = RouteTable::compile(&config.routes)?;
    info!(routes = table.len(), "route table compiled");
    let router: Arc<dyn MessageRouter> = Arc::new(TableRouter::new(table, engine));
    start_gateway_with_router(config, router).await
}

/// Start the gateway with a caller-supplied router, bypassing the route
/// table entirely.
pub async fn start_gateway_with_router(
    config: PatchbayConfig,
    router: Arc<dyn MessageRouter>,
) -> anyhow::Result<()> {
    let port = config
        .server
        .port
        .context("server.port is required; set it in the config file or pass --port")?;
    let addr: SocketAddr = format!("{}:{}", config.server.bind, port)
        .parse()
        .with_context(|| format!("invalid bind address {:?}", config.server.bind))?;

    let (state, completions) = GatewayState::new();
    tokio::spawn(run_presenter(Arc::clone(&state), completions));

    let app = build_gateway_app(Arc::clone(&state), router);

    // TLS termination, when cert and key are both configured.
    if let (Some(cert), Some(key)) = (&config.server.tls.cert_path, &config.server.tls.key_path) {
        let rustls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
            .await
            .with_context(|| format!("loading TLS material from {cert} and {key}"))?;

        banner(&state.version, "wss", addr);

        let handle = axum_server::Handle::new();
        let ready_handle = handle.clone();
        let ready_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Some(bound) = ready_handle.listening().await {
                info!(addr = %bound, "gateway listening (tls)");
                ready_state.emit(DispatchSignal::Ready { addr: bound });
            }
        });

        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let bound = listener.local_addr()?;
    banner(&state.version, "ws", bound);
    info!(addr = %bound, "gateway listening");
    state.emit(DispatchSignal::Ready { addr: bound });

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Startup banner.
fn banner(version: &str, scheme: &str, addr: SocketAddr) {
    let lines = [
        format!("patchbay gateway v{version}"),
        format!("listening on {scheme}://{addr}/ws"),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let count = state.gateway.client_count().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
        "connections": count,
    }))
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state.gateway, state.router, addr))
}
