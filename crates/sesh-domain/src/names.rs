//! Validated session name.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Name every coordinator uses unless configured otherwise.
pub const GAME_SESSION_NAME: &str = "GameSession";

const MAX_SESSION_NAME_LENGTH: usize = 64;

/// A validated session name (non-empty, <=64 chars, trimmed)
///
/// Names are unique per coordinator: creating a session under a name that
/// already exists locally tears the old one down first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionName(String);

impl SessionName {
    /// Create a new validated session name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is empty after trimming
    /// or longer than 64 characters.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Session name cannot be empty"));
        }
        if trimmed.chars().count() > MAX_SESSION_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Session name cannot exceed {} characters",
                MAX_SESSION_NAME_LENGTH
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The fixed `GameSession` name.
    pub fn game_session() -> Self {
        Self(GAME_SESSION_NAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionName {
    fn default() -> Self {
        Self::game_session()
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SessionName> for String {
    fn from(name: SessionName) -> String {
        name.0
    }
}
