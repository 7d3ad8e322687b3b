//! Scripted engine for testing
//!
//! Engines built by [`ScriptedFactory`] replay queued states instead of
//! talking to the remote service.

use super::{EngineError, EngineFactory, EngineState, GameEngine, GameOptions};
use crate::answer::AnswerCode;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Engine call as recorded by the script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedCall {
    Start,
    Answer(AnswerCode),
    Defeat,
}

#[derive(Default)]
struct Script {
    outcomes: Mutex<VecDeque<Result<EngineState, EngineError>>>,
    calls: Mutex<Vec<ScriptedCall>>,
    options: Mutex<Vec<GameOptions>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Script {
    fn next(&self, call: ScriptedCall) -> Result<EngineState, EngineError> {
        self.calls.lock().unwrap().push(call);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::unknown("No scripted outcome queued")))
    }
}

/// Factory whose engines share one queue of outcomes
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    script: Arc<Script>,
    delay: Option<Duration>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every engine call take at least `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_state(&self, state: EngineState) -> &Self {
        self.script.outcomes.lock().unwrap().push_back(Ok(state));
        self
    }

    pub fn queue_question(&self, question: &str, step: u32, progression: f64) -> &Self {
        self.queue_state(question_state(question, step, progression))
    }

    pub fn queue_guess(&self, name: &str, step: u32, progression: f64) -> &Self {
        self.queue_state(guess_state(name, step, progression))
    }

    pub fn queue_error(&self, error: EngineError) -> &Self {
        self.script.outcomes.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.script.calls.lock().unwrap().clone()
    }

    pub fn created_with(&self) -> Vec<GameOptions> {
        self.script.options.lock().unwrap().clone()
    }

    /// Highest number of engine calls observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.script.max_in_flight.load(Ordering::SeqCst)
    }
}

impl EngineFactory for ScriptedFactory {
    fn create(&self, options: &GameOptions) -> Box<dyn GameEngine> {
        self.script.options.lock().unwrap().push(options.clone());
        Box::new(ScriptedEngine {
            script: self.script.clone(),
            delay: self.delay,
            state: EngineState::default(),
        })
    }

    fn backend(&self) -> &str {
        "scripted"
    }
}

pub struct ScriptedEngine {
    script: Arc<Script>,
    delay: Option<Duration>,
    state: EngineState,
}

impl ScriptedEngine {
    async fn step(&mut self, call: ScriptedCall) -> Result<(), EngineError> {
        let running = self.script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.script.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.script.next(call);
        self.script.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.state = outcome?;
        Ok(())
    }
}

#[async_trait]
impl GameEngine for ScriptedEngine {
    async fn start_game(&mut self) -> Result<(), EngineError> {
        self.step(ScriptedCall::Start).await
    }

    async fn answer(&mut self, code: AnswerCode) -> Result<(), EngineError> {
        self.step(ScriptedCall::Answer(code)).await
    }

    async fn defeat(&mut self) -> Result<(), EngineError> {
        self.step(ScriptedCall::Defeat).await
    }

    fn state(&self) -> &EngineState {
        &self.state
    }
}

pub fn question_state(question: &str, step: u32, progression: f64) -> EngineState {
    EngineState {
        question: question.to_string(),
        step,
        progression,
        ..Default::default()
    }
}

pub fn guess_state(name: &str, step: u32, progression: f64) -> EngineState {
    EngineState {
        question: String::new(),
        step,
        progression,
        win: true,
        name_proposition: Some(name.to_string()),
        description_proposition: Some(format!("{name} description")),
        photo: Some(format!("https://photos.example/{step}.jpg")),
        id_proposition: Some(step.to_string()),
    }
}
