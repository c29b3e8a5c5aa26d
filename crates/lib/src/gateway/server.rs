//! Gateway HTTP server (single port).

use crate::auth::{Credentials, REALM};
use crate::command;
use crate::config::Config;
use crate::exec::{self, ProcessRunner, ToolRunner};
use crate::gateway::protocol::{ErrorResponse, ExecuteRequest, ExecuteResponse};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Shared state for the gateway. Built once at startup and never mutated.
#[derive(Clone)]
pub struct GatewayState {
    /// The single identity allowed to call `/execute`.
    pub credentials: Credentials,
    /// Runs the media tool; a process runner in production, a double in tests.
    pub runner: Arc<dyn ToolRunner>,
}

impl GatewayState {
    pub fn new(credentials: Credentials, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            credentials,
            runner,
        }
    }
}

/// Routes: `GET /health` and `POST /execute`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health_http))
        .route("/execute", post(execute_http))
        .with_state(state)
}

/// Serve on an already-bound listener until `shutdown` completes; in-flight requests are drained.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server exited")
}

/// Run the gateway server; binds to config.gateway.bind and the configured port.
/// Fails before binding if the config is invalid.
///
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let (port, credentials) = config.validate()?;
    let timeout = config.tool_timeout();
    match timeout {
        Some(t) => log::info!("tool deadline: {}s", t.as_secs()),
        None => log::warn!("tool deadline disabled; a hung tool occupies its request indefinitely"),
    }
    let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner::media_tool(timeout));
    let state = GatewayState::new(credentials, runner);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    serve(listener, state, shutdown_signal()).await?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining in-flight requests");
}

/// GET /health — runs the version probe. 200 with the version text, 500 with the error text.
async fn health_http(State(state): State<GatewayState>) -> (StatusCode, String) {
    log::debug!("got health request");
    match exec::probe(state.runner.as_ref()).await {
        Ok(version) => {
            log::debug!("return health 200 OK");
            (StatusCode::OK, version)
        }
        Err(text) => (StatusCode::INTERNAL_SERVER_ERROR, text),
    }
}

/// POST /execute — auth, validate, run the tool, map the exit code to 200/500.
async fn execute_http(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();

    if state.credentials.authorize(&headers).is_err() {
        return unauthorized();
    }

    let req: ExecuteRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            log::error!("abort execution before starting: invalid request body: {}", e);
            return bad_request(format!("Invalid request body: {}", e));
        }
    };

    let args = match command::sanitize(&req.command) {
        Ok(args) => args,
        Err(e) => {
            log::error!("abort execution before starting: {}", e);
            return bad_request(e.to_string());
        }
    };

    let result = state.runner.run(&args).await;
    log::info!(
        "finished media processing by the tool, time spent: {}",
        exec::format_elapsed(started.elapsed())
    );

    match result {
        Ok(mut out) => {
            out.ensure_trailing_newline();
            exec::log_output(&out);
            let status = if out.success() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ExecuteResponse::from(out))).into_response()
        }
        Err(e) => {
            log::error!("tool invocation failed: {}", e);
            let body = ExecuteResponse {
                stdout: String::new(),
                stderr: e.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", REALM))],
        "Unauthorized Access",
    )
        .into_response()
}

fn bad_request(msg: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg))).into_response()
}
