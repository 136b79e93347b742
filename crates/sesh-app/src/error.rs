//! Coordinator error types
//!
//! Synchronous rejections (`ProviderUnavailable`, `Busy` and the like) are returned
//! from the request methods. Provider-reported failures are never returned;
//! they are recorded as the coordinator's `last_error` and published as
//! events.

use steamsesh_domain::{DomainError, JoinOutcome, RequestKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No platform session provider is available")]
    ProviderUnavailable,

    #[error("A {0} request is already in flight")]
    Busy(RequestKind),

    #[error("Local player has no preferred network identity")]
    NoLocalIdentity,

    #[error("Invalid session settings: {0}")]
    InvalidSettings(#[from] DomainError),

    #[error("No sessions have been found yet")]
    NotSearched,

    #[error("No search result at index {0}")]
    NoSearchResult(usize),

    #[error("Provider failed to create the session")]
    CreateFailed,

    #[error("Provider failed to find sessions")]
    FindFailed,

    #[error("Provider failed to join the session: {0}")]
    JoinFailed(JoinOutcome),

    #[error("Provider failed to destroy the session")]
    DestroyFailed,

    #[error("Session {0} request timed out")]
    TimedOut(RequestKind),
}
