//! Game orchestration
//!
//! Sequences engine calls per session and shapes what the client sees:
//! either the next question or the engine's guess.

use crate::answer::{self, InvalidAnswer};
use crate::engine::{EngineError, EngineFactory, EngineState, GameOptions};
use crate::session::{Session, SessionError, SessionGuard, SessionId, SessionStore};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const UNKNOWN_CHARACTER: &str = "Unknown Character";

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Session not found. Please start a new game.")]
    SessionNotFound,
    #[error(transparent)]
    InvalidAnswer(#[from] InvalidAnswer),
    #[error("Guess not ready yet")]
    GuessNotReady,
    #[error("Failed to start game: {0}")]
    EngineStart(EngineError),
    #[error("Failed to submit answer: {0}")]
    EngineOperation(EngineError),
}

impl From<SessionError> for GameError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => GameError::SessionNotFound,
        }
    }
}

/// First question of a freshly started game
#[derive(Debug, Clone, PartialEq)]
pub struct StartedGame {
    pub session_id: SessionId,
    pub question: String,
    pub step: u32,
    pub progression: f64,
}

/// The engine's proposed character
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guess {
    pub name: String,
    pub description: String,
    pub image: String,
    pub id: String,
    pub proba: String,
    pub ranking: String,
}

impl Guess {
    /// Shape a guess from an engine in the win state, filling gaps with placeholders
    pub fn from_state(state: &EngineState) -> Self {
        Self {
            name: state
                .name_proposition
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_CHARACTER.to_string()),
            description: state.description_proposition.clone().unwrap_or_default(),
            image: state.photo.clone().unwrap_or_default(),
            id: state.id_proposition.clone().unwrap_or_default(),
            proba: format!("{:?}", state.progression),
            ranking: "1".to_string(),
        }
    }
}

/// Result of submitting an answer
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    Question {
        question: String,
        step: u32,
        progression: f64,
    },
    Guess {
        guess: Guess,
        progression: f64,
    },
}

/// Result of telling the engine whether its guess was right
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Guess confirmed, game over
    Won,
    /// Guess rejected, a new round is running
    Continue { question: String },
    /// Guess rejected and the engine has no further question
    Stumped,
    /// Guess rejected and the engine failed while continuing
    GaveUp,
}

impl FeedbackOutcome {
    pub fn message(&self) -> String {
        match self {
            FeedbackOutcome::Won => "🎉 Amazing! I guessed it right! Thanks for playing!".to_string(),
            FeedbackOutcome::Continue { question } => {
                format!("Hmm, let me try again! Next question: {question}")
            }
            FeedbackOutcome::Stumped => {
                "I'm stumped! You've thought of someone I don't know well enough. You win! 🏆"
                    .to_string()
            }
            FeedbackOutcome::GaveUp => "I couldn't figure it out this time! You win! 🏆".to_string(),
        }
    }

    pub fn game_over(&self) -> bool {
        !matches!(self, FeedbackOutcome::Continue { .. })
    }
}

/// Runs a single engine call under the configured bound
async fn bounded<F>(limit: Duration, call: F) -> Result<(), EngineError>
where
    F: Future<Output = Result<(), EngineError>>,
{
    tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
        Err(EngineError::timeout(format!(
            "Engine call exceeded {}ms",
            limit.as_millis()
        )))
    })
}

/// Session orchestrator
pub struct GameService {
    store: SessionStore,
    factory: Arc<dyn EngineFactory>,
    engine_timeout: Duration,
}

impl GameService {
    pub fn new(factory: Arc<dyn EngineFactory>, engine_timeout: Duration) -> Self {
        Self {
            store: SessionStore::new(),
            factory,
            engine_timeout,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Start a new game; the session is registered only once the engine has started
    pub async fn start_game(&self, options: GameOptions) -> Result<StartedGame, GameError> {
        let session_id = SessionId::new();
        let mut engine = self.factory.create(&options);

        bounded(self.engine_timeout, engine.start_game())
            .await
            .map_err(GameError::EngineStart)?;

        let state = engine.state().clone();
        self.store
            .insert(Session::new(session_id, options, engine))
            .await;

        tracing::info!(
            session_id = %session_id,
            backend = %self.factory.backend(),
            step = state.step,
            "Game started"
        );

        Ok(StartedGame {
            session_id,
            question: state.question,
            step: state.step,
            progression: state.progression,
        })
    }

    /// Feed an answer to the session's engine
    pub async fn submit_answer(
        &self,
        session_id: SessionId,
        answer_text: &str,
    ) -> Result<AnswerOutcome, GameError> {
        let mut session = self.store.lock(session_id).await?;
        let code = answer::normalize(answer_text)?;

        bounded(self.engine_timeout, session.engine_mut().answer(code))
            .await
            .map_err(GameError::EngineOperation)?;

        let state = session.state();
        tracing::debug!(
            session_id = %session_id,
            answer = %code,
            step = state.step,
            progression = state.progression,
            win = state.win,
            "Answer submitted"
        );

        if state.win {
            tracing::info!(session_id = %session_id, step = state.step, "Engine is guessing");
            Ok(AnswerOutcome::Guess {
                guess: Guess::from_state(state),
                progression: state.progression,
            })
        } else {
            Ok(AnswerOutcome::Question {
                question: state.question.clone(),
                step: state.step,
                progression: state.progression,
            })
        }
    }

    /// Read the current guess without touching the engine
    pub async fn get_guess(&self, session_id: SessionId) -> Result<(Guess, f64), GameError> {
        let session = self.store.lock(session_id).await?;
        let state = session.state();
        if !state.win {
            return Err(GameError::GuessNotReady);
        }
        Ok((Guess::from_state(state), state.progression))
    }

    /// Confirm or reject the engine's guess
    ///
    /// Any failure while continuing after a rejected guess ends the game in
    /// the player's favour instead of surfacing as an error.
    pub async fn submit_feedback(
        &self,
        session_id: SessionId,
        correct: bool,
    ) -> Result<FeedbackOutcome, GameError> {
        let mut session = self.store.lock(session_id).await?;
        if !session.state().win {
            return Err(GameError::GuessNotReady);
        }

        if correct {
            self.store.remove(&mut session).await;
            tracing::info!(session_id = %session_id, "Guess confirmed, game over");
            return Ok(FeedbackOutcome::Won);
        }

        let outcome = match self.next_round(&mut session).await {
            Ok(()) if session.state().has_question() => {
                return Ok(FeedbackOutcome::Continue {
                    question: session.state().question.clone(),
                });
            }
            Ok(()) => FeedbackOutcome::Stumped,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    kind = e.kind.as_str(),
                    "Could not continue after rejected guess, ending game"
                );
                FeedbackOutcome::GaveUp
            }
        };

        self.store.remove(&mut session).await;
        tracing::info!(session_id = %session_id, outcome = ?outcome, "Player wins");
        Ok(outcome)
    }

    async fn next_round(&self, session: &mut SessionGuard) -> Result<(), EngineError> {
        bounded(self.engine_timeout, session.engine_mut().defeat()).await?;
        bounded(self.engine_timeout, session.engine_mut().start_game()).await
    }
}
