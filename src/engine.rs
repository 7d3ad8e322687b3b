//! Game engine abstraction
//!
//! The guessing itself happens in a remote service. This module defines the
//! narrow contract the session layer drives, plus the production backend.

mod akinator;
mod error;
mod types;

#[cfg(test)]
pub mod testing;

pub use akinator::{AkinatorFactory, DEFAULT_URL_TEMPLATE};
pub use error::{EngineError, EngineErrorKind};
pub use types::*;

use crate::answer::AnswerCode;
use async_trait::async_trait;
use std::sync::Arc;

/// One game against the guessing backend
#[async_trait]
pub trait GameEngine: Send {
    /// Begin a new round; on success the state holds the first question
    async fn start_game(&mut self) -> Result<(), EngineError>;

    /// Feed an answer to the current question
    async fn answer(&mut self, code: AnswerCode) -> Result<(), EngineError>;

    /// Tell the engine its current proposition was wrong
    async fn defeat(&mut self) -> Result<(), EngineError>;

    /// State observed after the last call
    fn state(&self) -> &EngineState;
}

/// Builds fresh engines, one per session
pub trait EngineFactory: Send + Sync {
    fn create(&self, options: &GameOptions) -> Box<dyn GameEngine>;

    /// Backend name for logs
    fn backend(&self) -> &str;
}

impl<T: EngineFactory + ?Sized> EngineFactory for Arc<T> {
    fn create(&self, options: &GameOptions) -> Box<dyn GameEngine> {
        (**self).create(options)
    }

    fn backend(&self) -> &str {
        (**self).backend()
    }
}

/// Logging wrapper for engines
pub struct LoggingEngine {
    inner: Box<dyn GameEngine>,
    backend: String,
}

impl LoggingEngine {
    pub fn new(inner: Box<dyn GameEngine>, backend: impl Into<String>) -> Self {
        Self {
            inner,
            backend: backend.into(),
        }
    }

    fn record(&self, call: &'static str, started: std::time::Instant, result: &Result<(), EngineError>) {
        let duration = started.elapsed();
        let state = self.inner.state();
        match result {
            Ok(()) => {
                tracing::debug!(
                    backend = %self.backend,
                    call,
                    duration_ms = %duration.as_millis(),
                    step = state.step,
                    progression = state.progression,
                    win = state.win,
                    "Engine call completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    backend = %self.backend,
                    call,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    "Engine call failed"
                );
            }
        }
    }
}

#[async_trait]
impl GameEngine for LoggingEngine {
    async fn start_game(&mut self) -> Result<(), EngineError> {
        let started = std::time::Instant::now();
        let result = self.inner.start_game().await;
        self.record("start_game", started, &result);
        result
    }

    async fn answer(&mut self, code: AnswerCode) -> Result<(), EngineError> {
        let started = std::time::Instant::now();
        let result = self.inner.answer(code).await;
        self.record("answer", started, &result);
        result
    }

    async fn defeat(&mut self) -> Result<(), EngineError> {
        let started = std::time::Instant::now();
        let result = self.inner.defeat().await;
        self.record("defeat", started, &result);
        result
    }

    fn state(&self) -> &EngineState {
        self.inner.state()
    }
}

/// Factory decorator that wraps every engine it builds in [`LoggingEngine`]
pub struct LoggingFactory<F> {
    inner: F,
}

impl<F: EngineFactory> LoggingFactory<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: EngineFactory> EngineFactory for LoggingFactory<F> {
    fn create(&self, options: &GameOptions) -> Box<dyn GameEngine> {
        Box::new(LoggingEngine::new(
            self.inner.create(options),
            self.inner.backend(),
        ))
    }

    fn backend(&self) -> &str {
        self.inner.backend()
    }
}
