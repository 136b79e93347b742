//! Request states and outcomes.
//!
//! Create and search each own a slot holding a `SessionRequestState`; the
//! join flow has its own smaller `JoinRequestState`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a create or search request.
///
/// `Idle -> Creating -> {Created, Failed}` and
/// `Idle -> Searching -> {SearchComplete, Failed}`. Terminal states are
/// observation points; a new request re-enters the transient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRequestState {
    Idle,
    Creating,
    Searching,
    Created,
    SearchComplete,
    Failed,
}

impl fmt::Display for SessionRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Creating => "creating",
            Self::Searching => "searching",
            Self::Created => "created",
            Self::SearchComplete => "search_complete",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestState {
    Idle,
    Joining,
    Joined,
    Failed,
}

impl fmt::Display for JoinRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Joining => "joining",
            Self::Joined => "joined",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result code a provider reports for a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    Success,
    SessionIsFull,
    SessionDoesNotExist,
    CouldNotRetrieveAddress,
    AlreadyInSession,
    UnknownError,
}

impl fmt::Display for JoinOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::SessionIsFull => "session is full",
            Self::SessionDoesNotExist => "session does not exist",
            Self::CouldNotRetrieveAddress => "could not retrieve address",
            Self::AlreadyInSession => "already in session",
            Self::UnknownError => "unknown error",
        };
        f.write_str(s)
    }
}

/// The kinds of provider request the coordinator issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Create,
    Find,
    Join,
    Destroy,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Find => "find",
            Self::Join => "join",
            Self::Destroy => "destroy",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_serialize_in_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionRequestState::SearchComplete).unwrap(),
            "\"search_complete\""
        );
        assert_eq!(
            SessionRequestState::SearchComplete.to_string(),
            "search_complete"
        );
    }

    #[test]
    fn join_outcome_reads_as_a_sentence() {
        assert_eq!(JoinOutcome::SessionIsFull.to_string(), "session is full");
        assert_eq!(
            JoinOutcome::CouldNotRetrieveAddress.to_string(),
            "could not retrieve address"
        );
    }
}
