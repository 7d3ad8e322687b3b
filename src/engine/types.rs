//! Engine-facing value types

/// Languages the remote game service is published in
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "ar", "cn", "de", "es", "fr", "id", "il", "it", "jp", "kr", "nl", "pl", "pt", "ru",
    "tr",
];

pub const DEFAULT_LANGUAGE: &str = "en";

/// Per-game settings chosen by the client at start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOptions {
    pub language: String,
    pub child_mode: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            child_mode: false,
        }
    }
}

impl GameOptions {
    /// Build options, falling back to the default language for unknown tags
    pub fn new(language: Option<&str>, child_mode: Option<bool>) -> Self {
        let requested = language.map(|l| l.trim().to_lowercase());
        let language = match requested {
            Some(tag) if SUPPORTED_LANGUAGES.contains(&tag.as_str()) => tag,
            Some(tag) => {
                tracing::warn!(language = %tag, "Unsupported language, using default");
                DEFAULT_LANGUAGE.to_string()
            }
            None => DEFAULT_LANGUAGE.to_string(),
        };
        Self {
            language,
            child_mode: child_mode.unwrap_or(false),
        }
    }
}

/// Observable engine state after the last call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    /// Current question text, empty when none is available
    pub question: String,
    pub step: u32,
    /// Engine confidence, 0..100 on the remote service
    pub progression: f64,
    /// True when the engine is proposing a character
    pub win: bool,
    pub name_proposition: Option<String>,
    pub description_proposition: Option<String>,
    pub photo: Option<String>,
    pub id_proposition: Option<String>,
}

impl EngineState {
    pub fn has_question(&self) -> bool {
        !self.question.trim().is_empty()
    }

    pub fn clear_proposition(&mut self) {
        self.win = false;
        self.name_proposition = None;
        self.description_proposition = None;
        self.photo = None;
        self.id_proposition = None;
    }
}
