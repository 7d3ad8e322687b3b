//! Answer normalization
//!
//! Maps free-form answer text onto the five answer codes the game engine
//! understands. Pure, no I/O.

use std::fmt;
use thiserror::Error;

/// Recognized answers to an engine question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerCode {
    Yes,
    No,
    DontKnow,
    Probably,
    ProbablyNot,
}

/// Accepted spellings, compared after trimming and lower-casing
const SYNONYMS: &[(&str, AnswerCode)] = &[
    ("y", AnswerCode::Yes),
    ("yes", AnswerCode::Yes),
    ("n", AnswerCode::No),
    ("no", AnswerCode::No),
    ("idk", AnswerCode::DontKnow),
    ("i don't know", AnswerCode::DontKnow),
    ("i dont know", AnswerCode::DontKnow),
    ("dont know", AnswerCode::DontKnow),
    ("don't know", AnswerCode::DontKnow),
    ("p", AnswerCode::Probably),
    ("probably", AnswerCode::Probably),
    ("pn", AnswerCode::ProbablyNot),
    ("probably not", AnswerCode::ProbablyNot),
];

impl AnswerCode {
    /// Short code used in logs and by the upstream service
    pub fn code(self) -> &'static str {
        match self {
            AnswerCode::Yes => "y",
            AnswerCode::No => "n",
            AnswerCode::DontKnow => "idk",
            AnswerCode::Probably => "p",
            AnswerCode::ProbablyNot => "pn",
        }
    }

    /// Numeric answer index sent on the wire (0 = yes .. 4 = probably not)
    pub fn index(self) -> u8 {
        match self {
            AnswerCode::Yes => 0,
            AnswerCode::No => 1,
            AnswerCode::DontKnow => 2,
            AnswerCode::Probably => 3,
            AnswerCode::ProbablyNot => 4,
        }
    }
}

impl fmt::Display for AnswerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The text did not match any known answer spelling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid answer. Use one of: yes, no, idk, probably, probably not")]
pub struct InvalidAnswer {
    pub input: String,
}

/// Normalize user text into an [`AnswerCode`]
pub fn normalize(text: &str) -> Result<AnswerCode, InvalidAnswer> {
    let normalized = text.trim().to_lowercase();
    SYNONYMS
        .iter()
        .find(|(spelling, _)| *spelling == normalized)
        .map(|(_, code)| *code)
        .ok_or_else(|| InvalidAnswer {
            input: text.to_string(),
        })
}
