//! Gateway HTTP server (single port).

use crate::channels::{RespondIoClient, TelegramClient, Update, WebhookEvent};
use crate::config::{Config, EnvSource, ServerConfig};
use crate::error::RelayError;
use crate::gateway::signature::{
    verify_respond_io_signature, verify_telegram_signature, TELEGRAM_SIGNATURE_HEADER,
};
use crate::translate::{classify, relay_event, TelegramRelay};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;

pub const TELEGRAM_WEBHOOK_PATH: &str = "/telegram/webhook";
pub const RESPOND_IO_WEBHOOK_PATH: &str = "/respond-io/webhook";

/// Shared by every request. Holds nothing mutable: configuration is re-read from `env` per
/// request.
#[derive(Clone)]
pub struct GatewayState {
    env: Arc<dyn EnvSource>,
    http: reqwest::Client,
    /// Base URL advertised on the health page.
    public_url: String,
}

impl GatewayState {
    pub fn new(env: Arc<dyn EnvSource>, public_url: impl Into<String>) -> Self {
        Self {
            env,
            http: reqwest::Client::new(),
            public_url: public_url.into(),
        }
    }

    fn config(&self) -> Config {
        Config::from_env(self.env.as_ref())
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/health", get(health_http))
        .route(
            TELEGRAM_WEBHOOK_PATH,
            post(telegram_webhook).fallback(method_not_allowed),
        )
        .route(
            RESPOND_IO_WEBHOOK_PATH,
            post(respond_io_webhook).fallback(method_not_allowed),
        )
        .with_state(state)
}

pub async fn run_gateway(server: ServerConfig, env: Arc<dyn EnvSource>) -> Result<()> {
    let state = GatewayState::new(env, server.public_base_url());
    let bind_addr = format!("{}:{}", server.bind.trim(), server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);
    log::info!(
        "telegram webhook: {}{}",
        server.public_base_url(),
        TELEGRAM_WEBHOOK_PATH
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
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
    log::info!("shutdown signal received");
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::Signature => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid signature" })),
            )
                .into_response(),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "message": other.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

fn success() -> Response {
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /telegram/webhook: one Telegram update, relayed to respond.io.
async fn telegram_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle_telegram_update(&state, &headers, &body).await {
        Ok(()) => success(),
        Err(e) => {
            log::error!("telegram webhook failed: {}", e);
            e.into_response()
        }
    }
}

async fn handle_telegram_update(
    state: &GatewayState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), RelayError> {
    let config = state.config();
    let telegram = config.telegram_credentials()?;
    let respond_io = config.respond_io_credentials()?;

    if !verify_telegram_signature(
        body,
        header(headers, TELEGRAM_SIGNATURE_HEADER),
        config.telegram.secret_token.as_deref(),
    ) {
        return Err(RelayError::Signature);
    }

    let update: Update = serde_json::from_slice(body)?;
    log::debug!("telegram update {:?}", update.update_id);
    let chat = TelegramClient::new(state.http.clone(), &telegram.api_base, &telegram.bot_token);
    let engagement = RespondIoClient::new(
        state.http.clone(),
        &respond_io.base_url,
        &respond_io.api_token,
        respond_io.channel_id,
    );
    TelegramRelay::new(&chat, &engagement, &config.telegram.welcome_message)
        .handle(classify(update))
        .await?;
    Ok(())
}

/// POST /respond-io/webhook: one agent event, delivered to Telegram.
async fn respond_io_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle_respond_io_event(&state, &headers, &body).await {
        Ok(()) => success(),
        Err(e) => {
            log::error!("respond.io webhook failed: {}", e);
            e.into_response()
        }
    }
}

async fn handle_respond_io_event(
    state: &GatewayState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), RelayError> {
    let config = state.config();
    let telegram = config.telegram_credentials()?;

    let provided = header(headers, "x-signature")
        .or_else(|| header(headers, "authorization"));
    if !verify_respond_io_signature(body, provided, config.respond_io.webhook_secret.as_deref()) {
        return Err(RelayError::Signature);
    }

    let event: WebhookEvent = serde_json::from_slice(body)?;
    let chat = TelegramClient::new(state.http.clone(), &telegram.api_base, &telegram.bot_token);
    let delivery = relay_event(event, &chat).await?;
    log::debug!("respond.io event handled: {:?}", delivery);
    Ok(())
}

/// GET /health (and GET /) reports where the webhooks live and which credentials are set.
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "message": "Telegram ⇄ respond.io relay is running",
        "endpoints": {
            "telegram-webhook": format!("{}{}", state.public_url, TELEGRAM_WEBHOOK_PATH),
            "respondio-webhook": format!("{}{}", state.public_url, RESPOND_IO_WEBHOOK_PATH),
        },
        "environment": {
            "telegram-bot-configured": config.telegram.bot_token.is_some(),
            "respondio-api-configured": config.respond_io.api_token.is_some(),
            "respondio-channel-configured": config.respond_io.channel_id.is_some(),
        },
    }))
}
