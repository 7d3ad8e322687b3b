//! API request and response types

use crate::game::{AnswerOutcome, FeedbackOutcome, Guess, StartedGame};
use serde::{Deserialize, Serialize};

/// Request to start a game
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub language: Option<String>,
    pub child_mode: Option<bool>,
}

/// Request to answer the current question
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub session_id: String,
    pub answer: String,
}

/// Query for reading the current guess
#[derive(Debug, Deserialize)]
pub struct GuessQuery {
    pub session_id: String,
}

/// Request to confirm or reject a guess
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub session_id: String,
    pub correct: bool,
}

/// Response carrying a question
#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub session_id: String,
    pub question: String,
    pub step: u32,
    pub progression: f64,
}

impl From<StartedGame> for QuestionResponse {
    fn from(game: StartedGame) -> Self {
        Self {
            session_id: game.session_id.to_string(),
            question: game.question,
            step: game.step,
            progression: game.progression,
        }
    }
}

/// Response carrying the engine's guess
#[derive(Debug, Serialize)]
pub struct GuessResponse {
    pub session_id: String,
    pub guess: Guess,
    pub progression: f64,
}

/// Either a next question or a guess
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnswerResponse {
    Question(QuestionResponse),
    Guess(GuessResponse),
}

impl AnswerResponse {
    pub fn new(session_id: String, outcome: AnswerOutcome) -> Self {
        match outcome {
            AnswerOutcome::Question {
                question,
                step,
                progression,
            } => AnswerResponse::Question(QuestionResponse {
                session_id,
                question,
                step,
                progression,
            }),
            AnswerOutcome::Guess { guess, progression } => AnswerResponse::Guess(GuessResponse {
                session_id,
                guess,
                progression,
            }),
        }
    }
}

/// Response to feedback on a guess
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub session_id: String,
    pub message: String,
    pub game_over: bool,
}

impl FeedbackResponse {
    pub fn new(session_id: String, outcome: &FeedbackOutcome) -> Self {
        Self {
            session_id,
            message: outcome.message(),
            game_over: outcome.game_over(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
