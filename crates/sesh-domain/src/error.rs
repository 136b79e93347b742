//! Error type for the domain layer.
//!
//! Domain values validate on construction; anything that would let an invalid
//! name or settings block reach a provider is rejected here.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g. empty name, zero capacity)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown textual value for an enum-like field
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Creates a validation error for a violated value invariant.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
