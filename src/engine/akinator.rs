//! Remote guessing service backend
//!
//! Drives the public web game: the start page is scraped for the session
//! tokens and first question, every later step is a form POST answered in JSON.

use super::{EngineError, EngineFactory, EngineState, GameEngine, GameOptions};
use crate::answer::AnswerCode;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;

/// Default base URL; `{lang}` is replaced by the game language
pub const DEFAULT_URL_TEMPLATE: &str = "https://{lang}.akinator.com";

const USER_AGENT: &str = concat!("guessmind/", env!("CARGO_PKG_VERSION"));

static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<p class="question-text" id="question-label">\s*(.+?)\s*</p>"#)
        .expect("invalid question regex")
});

static SESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"#session'\)\.val\('([^']+)'\)|name="session"[^>]*value="([^"]+)""#)
        .expect("invalid session regex")
});

static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"#signature'\)\.val\('([^']+)'\)|name="signature"[^>]*value="([^"]+)""#)
        .expect("invalid signature regex")
});

/// Builds [`AkinatorEngine`]s sharing one HTTP client
pub struct AkinatorFactory {
    client: Client,
    url_template: String,
}

impl AkinatorFactory {
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EngineError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    /// Base URL for a language
    pub fn base_url(&self, language: &str) -> String {
        self.url_template
            .replace("{lang}", language)
            .trim_end_matches('/')
            .to_string()
    }
}

impl EngineFactory for AkinatorFactory {
    fn create(&self, options: &GameOptions) -> Box<dyn GameEngine> {
        Box::new(AkinatorEngine::new(
            self.client.clone(),
            self.base_url(&options.language),
            options.child_mode,
        ))
    }

    fn backend(&self) -> &str {
        "akinator"
    }
}

/// Tokens identifying one game on the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
struct GameTokens {
    session: String,
    signature: String,
}

/// One game on the remote service
pub struct AkinatorEngine {
    client: Client,
    base_url: String,
    child_mode: bool,
    tokens: Option<GameTokens>,
    /// Step at which the last proposition was rejected
    step_last_proposition: Option<u32>,
    state: EngineState,
}

impl AkinatorEngine {
    pub fn new(client: Client, base_url: String, child_mode: bool) -> Self {
        Self {
            client,
            base_url,
            child_mode,
            tokens: None,
            step_last_proposition: None,
            state: EngineState::default(),
        }
    }

    fn child_mode_flag(&self) -> &'static str {
        if self.child_mode {
            "true"
        } else {
            "false"
        }
    }

    fn tokens(&self) -> Result<&GameTokens, EngineError> {
        self.tokens
            .as_ref()
            .ok_or_else(|| EngineError::protocol("Game has not been started"))
    }

    async fn post(&self, path: &str, form: &[(&str, String)]) -> Result<String, EngineError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    EngineError::network(format!("Connection failed: {e}"))
                } else {
                    EngineError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        Ok(body)
    }

    fn apply_step(&mut self, step: StepResponse) -> Result<(), EngineError> {
        match step.into_outcome()? {
            StepOutcome::Question {
                question,
                step,
                progression,
            } => {
                self.state.clear_proposition();
                self.state.question = question;
                if let Some(step) = step {
                    self.state.step = step;
                }
                if let Some(progression) = progression {
                    self.state.progression = progression;
                }
            }
            StepOutcome::Proposition(proposition) => {
                self.state.win = true;
                self.state.name_proposition = proposition.name;
                self.state.description_proposition = proposition.description;
                self.state.photo = proposition.photo;
                self.state.id_proposition = proposition.id;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GameEngine for AkinatorEngine {
    async fn start_game(&mut self) -> Result<(), EngineError> {
        let form = [
            ("sid", "1".to_string()),
            ("cm", self.child_mode_flag().to_string()),
        ];
        let body = self.post("game", &form).await?;
        let page = parse_game_page(&body)?;

        self.tokens = Some(page.tokens);
        self.step_last_proposition = None;
        self.state = EngineState {
            question: page.question,
            ..EngineState::default()
        };
        Ok(())
    }

    async fn answer(&mut self, code: AnswerCode) -> Result<(), EngineError> {
        let tokens = self.tokens()?.clone();
        let form = [
            ("step", self.state.step.to_string()),
            ("progression", self.state.progression.to_string()),
            ("sid", "1".to_string()),
            ("cm", self.child_mode_flag().to_string()),
            ("answer", code.index().to_string()),
            (
                "step_last_proposition",
                self.step_last_proposition
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            ),
            ("session", tokens.session),
            ("signature", tokens.signature),
        ];
        let body = self.post("answer", &form).await?;
        let step = parse_step(&body)?;
        self.apply_step(step)
    }

    async fn defeat(&mut self) -> Result<(), EngineError> {
        let tokens = self.tokens()?.clone();
        let form = [
            ("step", self.state.step.to_string()),
            ("sid", "1".to_string()),
            ("cm", self.child_mode_flag().to_string()),
            ("progression", self.state.progression.to_string()),
            ("session", tokens.session),
            ("signature", tokens.signature),
            ("forward_answer", "1".to_string()),
        ];
        self.step_last_proposition = Some(self.state.step);
        let body = self.post("exclude", &form).await?;
        let step = parse_step(&body)?;
        self.state.clear_proposition();
        self.apply_step(step)
    }

    fn state(&self) -> &EngineState {
        &self.state
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> EngineError {
    match status.as_u16() {
        408 | 504 => EngineError::timeout(format!("Upstream timeout: HTTP {status}")),
        400..=499 => EngineError::protocol(format!("Request rejected: HTTP {status}: {body}")),
        500..=599 => EngineError::network(format!("Server error: HTTP {status}")),
        _ => EngineError::unknown(format!("HTTP {status}: {body}")),
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug)]
struct GamePage {
    tokens: GameTokens,
    question: String,
}

fn first_capture(re: &Regex, body: &str) -> Option<String> {
    re.captures(body).and_then(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().to_string())
    })
}

fn parse_game_page(body: &str) -> Result<GamePage, EngineError> {
    let session = first_capture(&SESSION_RE, body)
        .ok_or_else(|| EngineError::protocol("Game page has no session token"))?;
    let signature = first_capture(&SIGNATURE_RE, body)
        .ok_or_else(|| EngineError::protocol("Game page has no signature token"))?;
    let question = first_capture(&QUESTION_RE, body)
        .ok_or_else(|| EngineError::protocol("Game page has no question"))?;

    Ok(GamePage {
        tokens: GameTokens { session, signature },
        question,
    })
}

/// JSON body of `/answer` and `/exclude`
#[derive(Debug, Deserialize)]
struct StepResponse {
    completion: Option<String>,
    question: Option<String>,
    step: Option<Value>,
    progression: Option<Value>,
    id_proposition: Option<Value>,
    name_proposition: Option<String>,
    description_proposition: Option<String>,
    photo: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
struct Proposition {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    photo: Option<String>,
}

#[derive(Debug, PartialEq)]
enum StepOutcome {
    Question {
        question: String,
        step: Option<u32>,
        progression: Option<f64>,
    },
    Proposition(Proposition),
}

fn parse_step(body: &str) -> Result<StepResponse, EngineError> {
    serde_json::from_str(body)
        .map_err(|e| EngineError::protocol(format!("Failed to parse response: {e}")))
}

/// Numbers arrive either as JSON numbers or as strings
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl StepResponse {
    fn into_outcome(self) -> Result<StepOutcome, EngineError> {
        if let Some(completion) = self.completion.as_deref() {
            if completion.contains("TIMEOUT") {
                return Err(EngineError::timeout(format!("Game expired: {completion}")));
            }
            if completion == "SOUNDLIKE" {
                return Err(EngineError::exhausted("No more questions"));
            }
            if completion.starts_with("KO") {
                return Err(EngineError::protocol(format!("Rejected step: {completion}")));
            }
        }

        if self.id_proposition.is_some() || self.name_proposition.is_some() {
            return Ok(StepOutcome::Proposition(Proposition {
                id: text(self.id_proposition.as_ref()),
                name: self.name_proposition.filter(|s| !s.is_empty()),
                description: self.description_proposition,
                photo: self.photo.filter(|s| !s.is_empty()),
            }));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let step = number(self.step.as_ref()).map(|s| s.max(0.0) as u32);
        Ok(StepOutcome::Question {
            question: self.question.unwrap_or_default(),
            step,
            progression: number(self.progression.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineErrorKind;

    const GAME_PAGE: &str = r#"
        <form id="askSoundlike">
            <input type="hidden" name="session" id="session" value="3741">
            <input type="hidden" name="signature" id="signature" value="928374650">
        </form>
        <div class="bubble-body">
            <p class="question-text" id="question-label">Is your character real?</p>
        </div>
    "#;

    const SCRIPTED_PAGE: &str = r"
        <script>
            $('#session').val('51');
            $('#signature').val('A1b2C3');
        </script>
        <p class='x'></p>
    ";

    #[test]
    fn test_parse_game_page_hidden_inputs() {
        let page = parse_game_page(GAME_PAGE).unwrap();
        assert_eq!(page.tokens.session, "3741");
        assert_eq!(page.tokens.signature, "928374650");
        assert_eq!(page.question, "Is your character real?");
    }

    #[test]
    fn test_parse_game_page_script_tokens() {
        let body = format!(
            "{}<p class=\"question-text\" id=\"question-label\">Is your character a girl?</p>",
            SCRIPTED_PAGE
        );
        let page = parse_game_page(&body).unwrap();
        assert_eq!(page.tokens.session, "51");
        assert_eq!(page.tokens.signature, "A1b2C3");
        assert_eq!(page.question, "Is your character a girl?");
    }

    #[test]
    fn test_parse_game_page_missing_tokens() {
        let err = parse_game_page("<html>maintenance</html>").unwrap_err();
        assert_eq!(err.kind, EngineErrorKind::Protocol);
    }

    #[test]
    fn test_step_with_string_numbers() {
        let body = r#"{"completion":"OK","akitude":"defi.png","step":"4","progression":"37.52","question_id":"12","question":"Is your character a youtuber?"}"#;
        let outcome = parse_step(body).unwrap().into_outcome().unwrap();
        match outcome {
            StepOutcome::Question {
                question,
                step,
                progression,
            } => {
                assert_eq!(question, "Is your character a youtuber?");
                assert_eq!(step, Some(4));
                assert!((progression.unwrap() - 37.52).abs() < 1e-9);
            }
            StepOutcome::Proposition(_) => panic!("expected question"),
        }
    }

    #[test]
    fn test_step_with_numeric_fields() {
        let body = r#"{"completion":"OK","step":7,"progression":55.0,"question":"Does your character wear glasses?"}"#;
        let outcome = parse_step(body).unwrap().into_outcome().unwrap();
        assert!(matches!(outcome, StepOutcome::Question { step: Some(7), .. }));
    }

    #[test]
    fn test_step_proposition() {
        let body = r#"{"completion":"OK","id_proposition":"84312","id_base_proposition":"1","name_proposition":"Ada Lovelace","description_proposition":"Mathematician","photo":"https://photos.example/ada.jpg","pseudo":"x"}"#;
        let outcome = parse_step(body).unwrap().into_outcome().unwrap();
        assert_eq!(
            outcome,
            StepOutcome::Proposition(Proposition {
                id: Some("84312".to_string()),
                name: Some("Ada Lovelace".to_string()),
                description: Some("Mathematician".to_string()),
                photo: Some("https://photos.example/ada.jpg".to_string()),
            })
        );
    }

    #[test]
    fn test_step_proposition_numeric_id_and_empty_photo() {
        let body = r#"{"id_proposition":42,"name_proposition":"Mario","photo":""}"#;
        let outcome = parse_step(body).unwrap().into_outcome().unwrap();
        let StepOutcome::Proposition(proposition) = outcome else {
            panic!("expected proposition");
        };
        assert_eq!(proposition.id.as_deref(), Some("42"));
        assert!(proposition.photo.is_none());
        assert!(proposition.description.is_none());
    }

    #[test]
    fn test_step_completion_errors() {
        let timeout = parse_step(r#"{"completion":"KO - TIMEOUT"}"#)
            .unwrap()
            .into_outcome()
            .unwrap_err();
        assert_eq!(timeout.kind, EngineErrorKind::Timeout);

        let exhausted = parse_step(r#"{"completion":"SOUNDLIKE"}"#)
            .unwrap()
            .into_outcome()
            .unwrap_err();
        assert_eq!(exhausted.kind, EngineErrorKind::Exhausted);

        let rejected = parse_step(r#"{"completion":"KO - ELEM LIST IS EMPTY"}"#)
            .unwrap()
            .into_outcome()
            .unwrap_err();
        assert_eq!(rejected.kind, EngineErrorKind::Protocol);
    }

    #[test]
    fn test_step_not_json() {
        assert!(parse_step("<html>").is_err());
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(reqwest::StatusCode::GATEWAY_TIMEOUT, "").kind,
            EngineErrorKind::Timeout
        );
        assert_eq!(
            classify_status(reqwest::StatusCode::FORBIDDEN, "blocked").kind,
            EngineErrorKind::Protocol
        );
        assert_eq!(
            classify_status(reqwest::StatusCode::BAD_GATEWAY, "").kind,
            EngineErrorKind::Network
        );
    }

    #[test]
    fn test_factory_base_url() {
        let factory = AkinatorFactory::new(DEFAULT_URL_TEMPLATE, Duration::from_secs(5)).unwrap();
        assert_eq!(factory.base_url("fr"), "https://fr.akinator.com");

        let fixed = AkinatorFactory::new("http://127.0.0.1:9000/", Duration::from_secs(5)).unwrap();
        assert_eq!(fixed.base_url("en"), "http://127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_answer_before_start_fails() {
        let factory = AkinatorFactory::new(DEFAULT_URL_TEMPLATE, Duration::from_secs(5)).unwrap();
        let mut engine = factory.create(&GameOptions::default());
        let err = engine.answer(AnswerCode::Yes).await.unwrap_err();
        assert_eq!(err.kind, EngineErrorKind::Protocol);
    }
}
