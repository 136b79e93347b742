//! Coordinator configuration
//!
//! Defaults reproduce presence-based internet play: a four-player
//! `GameSession`, an internet search for up to 10000 presence sessions, and
//! fire-and-forget teardown of a stale session before re-creating it.
//!
//! Every field can be overridden from the environment via
//! [`CoordinatorConfig::from_env`]; missing or unparseable values fall back to
//! the default.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use steamsesh_domain::{
    DomainError, SessionName, SessionSearch, SessionSettings, DEFAULT_MAX_SEARCH_RESULTS,
    DEFAULT_PUBLIC_CONNECTIONS,
};

/// Default request timeout in milliseconds (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// What to do when a create targets a name that already exists locally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DestroyPolicy {
    /// Issue the destroy and submit the create immediately, without waiting
    /// for the destroy to complete.
    #[default]
    FireAndForget,
    /// Park the create until the provider confirms the destroy.
    AwaitCompletion,
}

impl std::fmt::Display for DestroyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestroyPolicy::FireAndForget => write!(f, "fire_and_forget"),
            DestroyPolicy::AwaitCompletion => write!(f, "await_completion"),
        }
    }
}

impl std::str::FromStr for DestroyPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fire_and_forget" | "fireandforget" | "fire" => Ok(DestroyPolicy::FireAndForget),
            "await_completion" | "awaitcompletion" | "await" => Ok(DestroyPolicy::AwaitCompletion),
            other => Err(DomainError::parse(format!("unknown destroy policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Local name every created session is registered under
    pub session_name: SessionName,
    pub public_connections: u32,
    pub is_lan: bool,
    pub max_search_results: u32,
    /// Zero disables request timeouts
    pub request_timeout_ms: u64,
    pub destroy_policy: DestroyPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session_name: SessionName::game_session(),
            public_connections: DEFAULT_PUBLIC_CONNECTIONS,
            is_lan: false,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            destroy_policy: DestroyPolicy::FireAndForget,
        }
    }
}

impl CoordinatorConfig {
    /// Load overrides from `STEAMSESH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let session_name = lookup("STEAMSESH_SESSION_NAME")
            .and_then(|s| match SessionName::new(s) {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring STEAMSESH_SESSION_NAME");
                    None
                }
            })
            .unwrap_or(defaults.session_name);

        Self {
            session_name,
            public_connections: parse_or(
                lookup("STEAMSESH_MAX_PLAYERS"),
                defaults.public_connections,
            ),
            is_lan: parse_or(lookup("STEAMSESH_LAN"), defaults.is_lan),
            max_search_results: parse_or(
                lookup("STEAMSESH_MAX_SEARCH_RESULTS"),
                defaults.max_search_results,
            ),
            request_timeout_ms: parse_or(
                lookup("STEAMSESH_REQUEST_TIMEOUT_MS"),
                defaults.request_timeout_ms,
            ),
            destroy_policy: parse_or(
                lookup("STEAMSESH_DESTROY_POLICY"),
                defaults.destroy_policy,
            ),
        }
    }

    /// Settings for a new session.
    ///
    /// # Errors
    /// Returns `DomainError::Validation` for a zero player count.
    pub fn session_settings(&self) -> Result<SessionSettings, DomainError> {
        Ok(SessionSettings::new(
            self.public_connections,
            SessionSettings::presence_defaults().flags(),
        )?
        .with_lan(self.is_lan))
    }

    /// Presence search used by find requests.
    pub fn session_search(&self) -> Result<SessionSearch, DomainError> {
        Ok(SessionSearch::presence(self.max_search_results)?.with_lan(self.is_lan))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

fn parse_or<T: std::str::FromStr + Copy>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_describe_presence_internet_play() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.session_name.as_str(), "GameSession");
        assert_eq!(config.public_connections, 4);
        assert!(!config.is_lan);
        assert_eq!(config.max_search_results, 10_000);
        assert_eq!(config.destroy_policy, DestroyPolicy::FireAndForget);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = CoordinatorConfig::from_lookup(lookup_from(&[
            ("STEAMSESH_SESSION_NAME", "Arena"),
            ("STEAMSESH_MAX_PLAYERS", "8"),
            ("STEAMSESH_LAN", "true"),
            ("STEAMSESH_MAX_SEARCH_RESULTS", "50"),
            ("STEAMSESH_REQUEST_TIMEOUT_MS", "0"),
            ("STEAMSESH_DESTROY_POLICY", "await"),
        ]));
        assert_eq!(config.session_name.as_str(), "Arena");
        assert_eq!(config.public_connections, 8);
        assert!(config.is_lan);
        assert_eq!(config.max_search_results, 50);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.destroy_policy, DestroyPolicy::AwaitCompletion);
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let config = CoordinatorConfig::from_lookup(lookup_from(&[
            ("STEAMSESH_SESSION_NAME", "   "),
            ("STEAMSESH_MAX_PLAYERS", "lots"),
            ("STEAMSESH_DESTROY_POLICY", "sometimes"),
        ]));
        assert_eq!(config, CoordinatorConfig::default());
    }

    #[test]
    fn zero_players_cannot_produce_settings() {
        let config = CoordinatorConfig {
            public_connections: 0,
            ..CoordinatorConfig::default()
        };
        assert!(config.session_settings().is_err());
    }

    #[test]
    fn lan_flag_reaches_settings_and_search() {
        let config = CoordinatorConfig {
            is_lan: true,
            ..CoordinatorConfig::default()
        };
        assert!(config.session_settings().unwrap().flags().is_lan_match);
        assert!(config.session_search().unwrap().is_lan_query);
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{"destroy_policy":"await_completion"}"#).unwrap();
        assert_eq!(config.destroy_policy, DestroyPolicy::AwaitCompletion);
        assert_eq!(config.public_connections, 4);
    }
}
