//! Observable session events.
//!
//! Every state transition the coordinator makes is published as a
//! `SessionEvent`. Hosts decide how to present them; `notices()` renders the
//! short player-facing lines a HUD would flash.

use serde::Serialize;
use steamsesh_domain::{
    JoinOutcome, JoinRequestState, RequestKind, SessionName, SessionRequestState,
    SessionSearchResult,
};

/// How prominent a notice should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Neutral status (subsystem found, session created)
    Info,
    /// One line per listed search result
    Listing,
    /// A request failed
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A provider was attached to the coordinator.
    ProviderFound { subsystem: String },
    /// The create or find slot changed state.
    StateChanged {
        kind: RequestKind,
        state: SessionRequestState,
    },
    /// The join slot changed state.
    JoinStateChanged { state: JoinRequestState },
    SessionCreated { name: SessionName },
    CreateFailed { name: SessionName },
    /// Full replacement of the observable result list.
    SearchCompleted { results: Vec<SessionSearchResult> },
    FindFailed,
    SessionJoined {
        name: SessionName,
        connect_address: Option<String>,
    },
    JoinFailed {
        name: SessionName,
        outcome: JoinOutcome,
    },
    SessionDestroyed { name: SessionName, success: bool },
    RequestTimedOut { kind: RequestKind },
}

impl SessionEvent {
    /// Player-facing lines for this event. State changes produce none.
    pub fn notices(&self) -> Vec<Notice> {
        match self {
            SessionEvent::ProviderFound { subsystem } => {
                vec![Notice::new(
                    NoticeLevel::Info,
                    format!("Found subsystem {subsystem}"),
                )]
            }
            SessionEvent::StateChanged { .. } | SessionEvent::JoinStateChanged { .. } => {
                Vec::new()
            }
            SessionEvent::SessionCreated { name } => {
                vec![Notice::new(
                    NoticeLevel::Info,
                    format!("Created session: {name}"),
                )]
            }
            SessionEvent::CreateFailed { .. } => {
                vec![Notice::new(NoticeLevel::Error, "Failed to create session!")]
            }
            SessionEvent::SearchCompleted { results } if results.is_empty() => {
                vec![Notice::new(NoticeLevel::Listing, "No sessions found")]
            }
            SessionEvent::SearchCompleted { results } => results
                .iter()
                .map(|r| {
                    Notice::new(
                        NoticeLevel::Listing,
                        format!("Id: {}, User: {}", r.session_id(), r.owning_user_name()),
                    )
                })
                .collect(),
            SessionEvent::FindFailed => {
                vec![Notice::new(NoticeLevel::Error, "Failed to find sessions!")]
            }
            SessionEvent::SessionJoined {
                name,
                connect_address,
            } => {
                let text = match connect_address {
                    Some(addr) => format!("Joined session: {name} at {addr}"),
                    None => format!("Joined session: {name}"),
                };
                vec![Notice::new(NoticeLevel::Info, text)]
            }
            SessionEvent::JoinFailed { outcome, .. } => {
                vec![Notice::new(
                    NoticeLevel::Error,
                    format!("Failed to join session: {outcome}"),
                )]
            }
            SessionEvent::SessionDestroyed { name, success: true } => {
                vec![Notice::new(
                    NoticeLevel::Info,
                    format!("Destroyed session: {name}"),
                )]
            }
            SessionEvent::SessionDestroyed { name, success: false } => {
                vec![Notice::new(
                    NoticeLevel::Error,
                    format!("Failed to destroy session: {name}"),
                )]
            }
            SessionEvent::RequestTimedOut { kind } => {
                vec![Notice::new(
                    NoticeLevel::Error,
                    format!("Session {kind} request timed out"),
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use steamsesh_domain::SessionId;

    #[test]
    fn search_results_render_one_line_each_in_order() {
        let event = SessionEvent::SearchCompleted {
            results: vec![
                SessionSearchResult::new(SessionId::new("A"), "alice", BTreeMap::new()),
                SessionSearchResult::new(SessionId::new("B"), "bob", BTreeMap::new()),
            ],
        };
        let lines: Vec<String> = event.notices().into_iter().map(|n| n.text).collect();
        assert_eq!(lines, vec!["Id: A, User: alice", "Id: B, User: bob"]);
    }

    #[test]
    fn create_failure_is_an_error_notice() {
        let notices = SessionEvent::CreateFailed {
            name: SessionName::game_session(),
        }
        .notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].text, "Failed to create session!");
    }

    #[test]
    fn state_changes_are_silent() {
        let event = SessionEvent::StateChanged {
            kind: RequestKind::Create,
            state: SessionRequestState::Creating,
        };
        assert!(event.notices().is_empty());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SessionEvent::SessionCreated {
            name: SessionName::game_session(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session_created");
        assert_eq!(json["name"], "GameSession");
    }
}
