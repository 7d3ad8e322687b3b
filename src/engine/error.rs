//! Engine error types

use thiserror::Error;

/// Engine error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Timeout, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Protocol, message)
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Exhausted, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Unknown, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Connection failures and 5xx from the remote service
    Network,
    /// The call did not finish within the configured bound
    Timeout,
    /// The remote service answered with something we could not interpret
    Protocol,
    /// The engine has nothing left to ask or propose
    Exhausted,
    Unknown,
}

impl EngineErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
            Self::Exhausted => "exhausted",
            Self::Unknown => "unknown",
        }
    }
}
