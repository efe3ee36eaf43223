#[cfg(test)]
#[path = "server_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::Method;
use axum::http::StatusCode;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde_derive::Deserialize;
use serde_json::json;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ActionRequest;
use crate::domain::models::AppError;
use crate::domain::models::CodeAction;
use crate::domain::models::GatewayBox;
use crate::domain::models::GatewayRequest;
use crate::domain::models::Message;
use crate::domain::models::SnippetDraft;
use crate::domain::models::StatField;
use crate::domain::services::Snippets;
use crate::domain::services::Stats;

const BODY_LIMIT: usize = 2 * 1024 * 1024;

pub struct AppState {
    pub gateway: GatewayBox,
    pub snippets: Snippets,
    pub stats: Stats,
    /// Empty disables the bearer check.
    pub access_token: String,
    pub default_language: String,
}

type SharedState = Arc<AppState>;

pub fn status_code(err: &AppError) -> StatusCode {
    match err {
        AppError::InvalidInput(_) => return StatusCode::BAD_REQUEST,
        AppError::Unauthorized => return StatusCode::UNAUTHORIZED,
        AppError::UnknownAction(_) => return StatusCode::NOT_FOUND,
        AppError::UpstreamError { .. }
        | AppError::MalformedUpstreamResponse(_)
        | AppError::NetworkError(_) => return StatusCode::BAD_GATEWAY,
        AppError::ServiceUnavailable => return StatusCode::SERVICE_UNAVAILABLE,
        AppError::Timeout(_) => return StatusCode::GATEWAY_TIMEOUT,
        AppError::PersistenceError(_) => return StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = message, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = message, "Request rejected");
        }

        return (status, Json(json!({ "error": message }))).into_response();
    }
}

fn from_json_rejection(rejection: JsonRejection) -> AppError {
    return AppError::InvalidInput(rejection.body_text());
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct IncrementBody {
    field: StatField,
    value: f64,
}

async fn health() -> Json<Value> {
    return Json(json!({ "status": "ok" }));
}

async fn chat(
    State(state): State<SharedState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = body.map_err(from_json_rejection)?;
    let reply = state
        .gateway
        .execute(&GatewayRequest::Chat(body.messages))
        .await?;

    return Ok(Json(json!({ "message": reply.text })));
}

async fn code_action(
    State(state): State<SharedState>,
    Path(action_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let action = CodeAction::resolve(&action_id)?;
    let Json(body) = body.map_err(from_json_rejection)?;

    let input = body
        .get(action.input_field())
        .and_then(|input| return input.as_str())
        .unwrap_or_default();
    let language = body
        .get("language")
        .and_then(|language| return language.as_str())
        .filter(|language| return !language.trim().is_empty())
        .unwrap_or(&state.default_language);

    let request = ActionRequest::new(action, language, input);
    request.validate()?;

    let reply = state
        .gateway
        .execute(&GatewayRequest::Code(request))
        .await?;

    let mut res = serde_json::Map::new();
    res.insert(action.response_field().to_string(), Value::String(reply.text));
    return Ok(Json(Value::Object(res)));
}

async fn list_snippets(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    let snippets = state.snippets.list()?;
    return Ok(Json(json!({ "snippets": snippets })));
}

async fn save_snippet(
    State(state): State<SharedState>,
    body: Result<Json<SnippetDraft>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(draft) = body.map_err(from_json_rejection)?;
    let snippet = state.snippets.save(&draft)?;
    return Ok(Json(json!({ "success": true, "id": snippet.id })));
}

async fn delete_snippet(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.snippets.delete(&id)?;
    return Ok(Json(json!({ "success": true })));
}

async fn get_stats(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    let stats = state.stats.get()?;
    return Ok(Json(json!(stats)));
}

async fn increment_stat(
    State(state): State<SharedState>,
    body: Result<Json<IncrementBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = body.map_err(from_json_rejection)?;
    let stats = state.stats.increment(body.field, body.value)?;
    return Ok(Json(json!({ "success": true, "stats": stats })));
}

async fn require_access_token(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.access_token.is_empty() {
        return Ok(next.run(req).await);
    }

    let expected = format!("Bearer {}", state.access_token);
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| return value.to_str().ok())
        .map(|value| return value == expected)
        .unwrap_or(false);

    if !authorized {
        tracing::warn!(path = req.uri().path(), "Authentication failed");
        return Err(AppError::Unauthorized);
    }

    return Ok(next.run(req).await);
}

fn cors() -> CorsLayer {
    return CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(600));
}

pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);

    let api = Router::new()
        .route("/ai/chat", post(chat))
        .route("/code/{action}", post(code_action))
        .route("/snippets", get(list_snippets).post(save_snippet))
        .route("/snippets/{id}", delete(delete_snippet))
        .route("/stats", get(get_stats))
        .route("/stats/increment", post(increment_stat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_access_token,
        ));

    return Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors());
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?err, "Failed to listen for shutdown signal");
        return;
    }

    tracing::info!("Shutting down");
}

pub async fn serve(state: AppState) -> Result<()> {
    let listen_addr = Config::get(ConfigKey::ListenAddr);
    let listener = TcpListener::bind(&listen_addr).await?;
    let addr = listener.local_addr()?;

    if state.access_token.is_empty() {
        tracing::warn!("No access token configured, every route is open");
    }
    tracing::info!(%addr, "Serving code actions");
    println!("Listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    return Ok(());
}
