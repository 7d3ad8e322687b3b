//! Server configuration from the environment

use crate::engine::DEFAULT_URL_TEMPLATE;
use std::time::Duration;

/// Origins the browser client is served from during development
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:5173", "http://127.0.0.1:5173"];

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// CORS allow-list, defaults first
    pub allowed_origins: Vec<String>,
    /// Base URL of the remote game service, `{lang}` expands to the game language
    pub engine_url: String,
    /// Upper bound on each engine call
    pub engine_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(ToString::to_string)
                .collect(),
            engine_url: DEFAULT_URL_TEMPLATE.to_string(),
            engine_timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = lookup("GUESSMIND_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(defaults.port);

        let mut allowed_origins = defaults.allowed_origins;
        if let Some(extra) = lookup("ALLOWED_ORIGINS") {
            allowed_origins.extend(parse_origins(&extra));
        }

        let engine_url = lookup("GUESSMIND_ENGINE_URL")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or(defaults.engine_url);

        let engine_timeout = lookup("GUESSMIND_ENGINE_TIMEOUT_SECS")
            .and_then(|t| t.trim().parse::<u64>().ok())
            .filter(|t| *t > 0)
            .map_or(defaults.engine_timeout, Duration::from_secs);

        Self {
            port,
            allowed_origins,
            engine_url,
            engine_timeout,
        }
    }
}

/// Split a comma-separated origin list, dropping blanks and duplicates
fn parse_origins(raw: &str) -> Vec<String> {
    let mut origins: Vec<String> = Vec::new();
    for origin in raw.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        if !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }
    origins
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 8000);
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.engine_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_extra_origins_appended() {
        let config = config(&[(
            "ALLOWED_ORIGINS",
            " https://guessmind.example , ,https://preview.example,https://guessmind.example",
        )]);
        assert_eq!(
            config.allowed_origins,
            vec![
                "http://localhost:5173",
                "http://127.0.0.1:5173",
                "https://guessmind.example",
                "https://preview.example",
            ]
        );
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("GUESSMIND_PORT", "9090"),
            ("GUESSMIND_ENGINE_URL", "http://127.0.0.1:7000"),
            ("GUESSMIND_ENGINE_TIMEOUT_SECS", "3"),
        ]);
        assert_eq!(config.port, 9090);
        assert_eq!(config.engine_url, "http://127.0.0.1:7000");
        assert_eq!(config.engine_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("GUESSMIND_PORT", "eighty"),
            ("GUESSMIND_ENGINE_URL", "  "),
            ("GUESSMIND_ENGINE_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(config, ServerConfig::default());
    }
}
