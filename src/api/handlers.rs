//! HTTP request handlers

use super::types::{
    AnswerRequest, AnswerResponse, ErrorResponse, FeedbackRequest, FeedbackResponse, GuessQuery,
    GuessResponse, HealthResponse, QuestionResponse, StartRequest,
};
use super::AppState;
use crate::engine::GameOptions;
use crate::game::GameError;
use crate::session::{SessionError, SessionId};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(get_version))
        .route("/api/start", post(start_game))
        .route("/api/answer", post(submit_answer))
        .route("/api/guess", get(get_guess))
        .route("/api/feedback", post(submit_feedback))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_version() -> &'static str {
    concat!("guessmind ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Game
// ============================================================

async fn start_game(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<QuestionResponse>, AppError> {
    let req = parse_start_request(&body)?;
    let options = GameOptions::new(req.language.as_deref(), req.child_mode);

    let started = state.games.start_game(options).await?;
    Ok(Json(started.into()))
}

/// An empty body means defaults; anything else must be a valid request
fn parse_start_request(body: &[u8]) -> Result<StartRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
}

async fn submit_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let session_id: SessionId = req.session_id.parse()?;
    let outcome = state.games.submit_answer(session_id, &req.answer).await?;
    Ok(Json(AnswerResponse::new(req.session_id, outcome)))
}

async fn get_guess(
    State(state): State<AppState>,
    Query(query): Query<GuessQuery>,
) -> Result<Json<GuessResponse>, AppError> {
    let session_id: SessionId = query.session_id.parse()?;
    let (guess, progression) = state.games.get_guess(session_id).await?;
    Ok(Json(GuessResponse {
        session_id: query.session_id,
        guess,
        progression,
    }))
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let session_id: SessionId = req.session_id.parse()?;
    let outcome = state
        .games
        .submit_feedback(session_id, req.correct)
        .await?;
    Ok(Json(FeedbackResponse::new(req.session_id, &outcome)))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        let message = err.to_string();
        match err {
            GameError::SessionNotFound => AppError::NotFound(message),
            GameError::InvalidAnswer(_) | GameError::GuessNotReady => {
                AppError::BadRequest(message)
            }
            GameError::EngineStart(_) | GameError::EngineOperation(_) => {
                AppError::Internal(message)
            }
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        GameError::from(err).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
