//! Process-wide table of advertised loopback sessions.
//!
//! Shared by every `LoopbackSessionProvider` in the process; one provider per
//! local player. Sessions are keyed by their generated `SessionId`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use steamsesh_domain::{
    JoinOutcome, LocalIdentity, SessionId, SessionName, SessionSearch, SessionSettings,
    SEARCH_PRESENCE,
};
use steamsesh_ports::ProviderSessionRecord;
use thiserror::Error;

/// Attribute advertised for sessions created with `uses_presence`.
const ATTR_PRESENCE: &str = SEARCH_PRESENCE;
const ATTR_OPEN_SLOTS: &str = "OPENSLOTS";
const ATTR_LAN: &str = "LAN";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoopbackError {
    #[error("{owner} already hosts a session named {name}")]
    NameTaken { owner: LocalIdentity, name: SessionName },

    #[error("Session {0} does not exist")]
    UnknownSession(SessionId),

    #[error("No tokio runtime available for loopback completions")]
    NoRuntime,
}

/// One hosted session as other players see it.
#[derive(Debug, Clone)]
pub struct AdvertisedSession {
    pub session_id: SessionId,
    pub owner: LocalIdentity,
    pub owning_user_name: String,
    pub local_name: SessionName,
    pub settings: SessionSettings,
    pub members: Vec<LocalIdentity>,
    pub in_progress: bool,
    /// Creation order; searches list older sessions first
    sequence: u64,
}

impl AdvertisedSession {
    pub fn open_slots(&self) -> u32 {
        let occupied = u32::try_from(self.members.len() + 1).unwrap_or(u32::MAX);
        self.settings.public_connections().saturating_sub(occupied)
    }

    pub fn connect_address(&self) -> String {
        format!("loopback://{}", self.session_id)
    }

    fn attributes(&self) -> BTreeMap<String, String> {
        let flags = self.settings.flags();
        let mut attributes = BTreeMap::new();
        if flags.uses_presence {
            attributes.insert(ATTR_PRESENCE.to_string(), "true".to_string());
        }
        attributes.insert(ATTR_LAN.to_string(), flags.is_lan_match.to_string());
        attributes.insert(ATTR_OPEN_SLOTS.to_string(), self.open_slots().to_string());
        attributes
    }

    fn record(&self) -> ProviderSessionRecord {
        ProviderSessionRecord {
            session_id: self.session_id.to_string(),
            owning_user_name: self.owning_user_name.clone(),
            attributes: self.attributes(),
        }
    }

    fn matches(&self, search: &SessionSearch) -> bool {
        let flags = self.settings.flags();
        if !flags.should_advertise || flags.is_lan_match != search.is_lan_query {
            return false;
        }
        let attributes = self.attributes();
        search
            .query_settings
            .iter()
            .all(|q| q.accepts(attributes.get(&q.key).map(String::as_str)))
    }
}

#[derive(Default)]
pub struct LoopbackRegistry {
    sessions: DashMap<SessionId, AdvertisedSession>,
    /// Owner and local name to session id. The entry lock is held while the
    /// session is inserted.
    hosted: DashMap<(LocalIdentity, SessionName), SessionId>,
    next_sequence: AtomicU64,
}

impl LoopbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a new session.
    ///
    /// # Errors
    /// `NameTaken` when `owner` already hosts a session under `name`.
    pub fn register(
        &self,
        owner: &LocalIdentity,
        owning_user_name: &str,
        name: &SessionName,
        settings: SessionSettings,
    ) -> Result<SessionId, LoopbackError> {
        let Entry::Vacant(slot) = self.hosted.entry((owner.clone(), name.clone())) else {
            return Err(LoopbackError::NameTaken {
                owner: owner.clone(),
                name: name.clone(),
            });
        };
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let session_id = SessionId::new(format!("{owner}#{sequence}"));
        self.sessions.insert(
            session_id.clone(),
            AdvertisedSession {
                session_id: session_id.clone(),
                owner: owner.clone(),
                owning_user_name: owning_user_name.to_string(),
                local_name: name.clone(),
                settings,
                members: Vec::new(),
                in_progress: false,
                sequence,
            },
        );
        slot.insert(session_id.clone());
        tracing::debug!(
            session_id = %session_id,
            owner = %owner,
            session = %name,
            "Registered loopback session"
        );
        Ok(session_id)
    }

    /// Register a session for a remote player that exists only in this
    /// process, with presence defaults. Returns its id.
    pub fn seed_peer(&self, owning_user_name: &str) -> Result<SessionId, LoopbackError> {
        let owner = LocalIdentity::new(format!("peer:{owning_user_name}"));
        self.register(
            &owner,
            owning_user_name,
            &SessionName::game_session(),
            SessionSettings::presence_defaults(),
        )
    }

    /// Remove the session `owner` hosts under `name`.
    pub fn unregister(&self, owner: &LocalIdentity, name: &SessionName) -> bool {
        match self.hosted.remove(&(owner.clone(), name.clone())) {
            Some((_, session_id)) => {
                self.sessions.remove(&session_id);
                tracing::debug!(session_id = %session_id, "Unregistered loopback session");
                true
            }
            None => false,
        }
    }

    pub fn hosted_by(&self, owner: &LocalIdentity, name: &SessionName) -> Option<SessionId> {
        self.hosted
            .get(&(owner.clone(), name.clone()))
            .map(|entry| entry.value().clone())
    }

    pub fn get(&self, session_id: &SessionId) -> Option<AdvertisedSession> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    /// Sessions visible to `requester`: hosted by someone else, advertised,
    /// matching the search's LAN flag and query settings. Oldest first,
    /// capped at `max_results`.
    pub fn find(
        &self,
        requester: &LocalIdentity,
        search: &SessionSearch,
    ) -> Vec<ProviderSessionRecord> {
        let mut matches: Vec<AdvertisedSession> = self
            .sessions
            .iter()
            .filter(|entry| &entry.owner != requester && entry.matches(search))
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|session| session.sequence);
        matches
            .iter()
            .take(usize::try_from(search.max_results).unwrap_or(usize::MAX))
            .map(AdvertisedSession::record)
            .collect()
    }

    /// Add `player` to a session.
    ///
    /// # Errors
    /// The `JoinOutcome` the provider should report.
    pub fn join(
        &self,
        player: &LocalIdentity,
        session_id: &SessionId,
    ) -> Result<AdvertisedSession, JoinOutcome> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(JoinOutcome::SessionDoesNotExist)?;
        if &entry.owner == player || entry.members.contains(player) {
            return Err(JoinOutcome::AlreadyInSession);
        }
        if entry.in_progress && !entry.settings.flags().allow_join_in_progress {
            return Err(JoinOutcome::UnknownError);
        }
        if entry.open_slots() == 0 {
            return Err(JoinOutcome::SessionIsFull);
        }
        entry.members.push(player.clone());
        Ok(entry.value().clone())
    }

    /// Remove `player` from a session they joined.
    pub fn leave(&self, player: &LocalIdentity, session_id: &SessionId) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                let before = entry.members.len();
                entry.members.retain(|m| m != player);
                entry.members.len() != before
            }
            None => false,
        }
    }

    /// Mark a hosted session as started (or back in the lobby).
    ///
    /// # Errors
    /// `UnknownSession` when the id is not registered.
    pub fn set_in_progress(
        &self,
        session_id: &SessionId,
        in_progress: bool,
    ) -> Result<(), LoopbackError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| LoopbackError::UnknownSession(session_id.clone()))?;
        entry.in_progress = in_progress;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
