//! Mutable coordinator state and its read-only snapshot.

use serde::Serialize;
use steamsesh_domain::{
    JoinRequestState, RequestKind, SessionDescriptor, SessionId, SessionName,
    SessionRequestState, SessionSearchResult,
};
use steamsesh_ports::SessionEvent;

use super::pending::{ParkedCreate, PendingOps};
use crate::error::SessionError;

/// A session this player has joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinedSession {
    pub name: SessionName,
    pub session_id: SessionId,
    pub owning_user_name: String,
    pub connect_address: String,
}

/// Point-in-time view of everything the coordinator exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    pub create_state: SessionRequestState,
    pub search_state: SessionRequestState,
    pub join_state: JoinRequestState,
    /// Name and settings of the most recent create, until it fails or the
    /// session is destroyed
    pub descriptor: Option<SessionDescriptor>,
    /// Only set while the create slot is `Created`
    pub current_session: Option<SessionName>,
    pub search_results: Vec<SessionSearchResult>,
    pub joined_session: Option<JoinedSession>,
    pub last_error: Option<SessionError>,
}

pub(crate) struct CoordinatorState {
    pub create: SessionRequestState,
    pub search: SessionRequestState,
    pub join: JoinRequestState,
    /// Slot that transitioned most recently
    pub last_slot: RequestKind,
    pub descriptor: Option<SessionDescriptor>,
    pub current_session: Option<SessionName>,
    pub search_results: Vec<SessionSearchResult>,
    /// Result being joined while the join slot is `Joining`
    pub joining: Option<SessionSearchResult>,
    pub joined: Option<JoinedSession>,
    pub last_error: Option<SessionError>,
    pub pending: PendingOps,
    pub parked_create: Option<ParkedCreate>,
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self {
            create: SessionRequestState::Idle,
            search: SessionRequestState::Idle,
            join: JoinRequestState::Idle,
            last_slot: RequestKind::Create,
            descriptor: None,
            current_session: None,
            search_results: Vec::new(),
            joining: None,
            joined: None,
            last_error: None,
            pending: PendingOps::default(),
            parked_create: None,
        }
    }
}

impl CoordinatorState {
    /// Move the create or find slot to `next`, returning the change event.
    pub fn transition(
        &mut self,
        kind: RequestKind,
        next: SessionRequestState,
    ) -> Option<SessionEvent> {
        let slot = match kind {
            RequestKind::Create => &mut self.create,
            RequestKind::Find => &mut self.search,
            RequestKind::Join | RequestKind::Destroy => {
                tracing::error!(kind = %kind, "Request kind has no SessionRequestState slot");
                return None;
            }
        };
        let previous = *slot;
        *slot = next;
        self.last_slot = kind;
        if previous == next {
            return None;
        }
        tracing::info!(kind = %kind, from = %previous, to = %next, "Session request state changed");
        Some(SessionEvent::StateChanged { kind, state: next })
    }

    pub fn transition_join(&mut self, next: JoinRequestState) -> Option<SessionEvent> {
        let previous = self.join;
        self.join = next;
        if previous == next {
            return None;
        }
        tracing::info!(from = %previous, to = %next, "Join request state changed");
        Some(SessionEvent::JoinStateChanged { state: next })
    }

    /// State of whichever of create/find transitioned last.
    pub fn current(&self) -> SessionRequestState {
        match self.last_slot {
            RequestKind::Find => self.search,
            _ => self.create,
        }
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            create_state: self.create,
            search_state: self.search,
            join_state: self.join,
            descriptor: self.descriptor.clone(),
            current_session: self.current_session.clone(),
            search_results: self.search_results.clone(),
            joined_session: self.joined.clone(),
            last_error: self.last_error.clone(),
        }
    }
}
