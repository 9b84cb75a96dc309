// Webhook HTTP surface
// GET/POST /api/odoo-command -> parse -> Odoo bill -> JSON response

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::bills::submit_bill;
use crate::command::CommandIntent;
use crate::config::Config;
use crate::error::{WebhookError, WebhookResult};

pub const COMMAND_PATH: &str = "/api/odoo-command";

/// Shared application state (read-only)
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
}

/// Secret + command text, from the query string or the JSON body
///
/// Each field is read on its own: a missing or mistyped `text` never
/// discards a valid `secret`.
#[derive(Default)]
pub struct CommandPayload {
    pub secret: Option<String>,
    pub text: Option<String>,
}

impl CommandPayload {
    /// From a JSON body. Anything that is not a JSON object reads as empty.
    pub fn from_json(body: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            secret: field("secret"),
            text: field("text"),
        }
    }

    /// From decoded query parameters.
    pub fn from_query(mut params: HashMap<String, String>) -> Self {
        Self {
            secret: params.remove("secret"),
            text: params.remove("text"),
        }
    }
}

/// JSON body of every command response
#[derive(Debug, Serialize)]
struct CommandResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    move_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parsed: Option<CommandIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CommandResponse {
    fn created(move_id: i64, parsed: CommandIntent) -> Self {
        Self {
            ok: true,
            move_id: Some(move_id),
            parsed: Some(parsed),
            error: None,
        }
    }

    fn failed(error: String, parsed: Option<CommandIntent>) -> Self {
        Self {
            ok: false,
            move_id: None,
            parsed,
            error: Some(error),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = self.to_string();
        let parsed = match self {
            WebhookError::UnsupportedCommand(intent) => Some(intent),
            _ => None,
        };
        (status, Json(CommandResponse::failed(message, parsed))).into_response()
    }
}

// ============================================================================
// REQUEST GATE
// ============================================================================

/// Constant-length comparison of the provided secret against the configured one.
///
/// No configured secret means nothing is authorized.
pub fn secret_matches(expected: Option<&str>, provided: &str) -> bool {
    match expected {
        Some(expected) => {
            Sha256::digest(expected.as_bytes()) == Sha256::digest(provided.as_bytes())
        }
        None => false,
    }
}

/// Secret check, parse, then the Odoo pipeline for bills.
pub async fn run_command(config: &Config, payload: CommandPayload) -> WebhookResult<(i64, CommandIntent)> {
    let provided = payload.secret.unwrap_or_default();
    if !secret_matches(config.webhook_secret.as_deref(), &provided) {
        return Err(WebhookError::Unauthorized);
    }

    let intent = CommandIntent::parse(&payload.text.unwrap_or_default());
    let bill = match &intent {
        CommandIntent::Bill(bill) => bill.clone(),
        CommandIntent::Unknown { .. } => return Err(WebhookError::UnsupportedCommand(intent)),
    };

    let credentials = config.odoo_credentials()?;
    let move_id = submit_bill(&credentials, &bill).await?;
    Ok((move_id, intent))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        version: crate::VERSION,
    })
}

/// GET /api/odoo-command?secret=..&text=..
async fn command_from_query(State(state): State<AppState>, uri: Uri) -> Response {
    let payload = Query::<HashMap<String, String>>::try_from_uri(&uri)
        .map(|Query(params)| CommandPayload::from_query(params))
        .unwrap_or_default();
    handle_command(&state, "GET", payload).await
}

/// POST /api/odoo-command {"secret": .., "text": ..}
async fn command_from_body(State(state): State<AppState>, body: Bytes) -> Response {
    let payload = CommandPayload::from_json(&body);
    handle_command(&state, "POST", payload).await
}

async fn handle_command(state: &AppState, verb: &'static str, payload: CommandPayload) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("command", %request_id, verb);

    async move {
        match run_command(&state.config, payload).await {
            Ok((move_id, parsed)) => {
                tracing::info!(move_id, "Command handled");
                (StatusCode::OK, Json(CommandResponse::created(move_id, parsed))).into_response()
            }
            Err(err) => {
                match err.status_code() {
                    500 => tracing::error!(error = %err, "Command failed"),
                    status => tracing::warn!(status, error = %err, "Command rejected"),
                }
                err.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

// ============================================================================
// Router
// ============================================================================

/// Span for every HTTP request. Path only: the query string carries the secret.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path()
    )
}

/// Build the webhook router.
pub fn router(config: Config) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/odoo-command",
            get(command_from_query).post(command_from_body),
        )
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(CorsLayer::permissive()),
    )
}
