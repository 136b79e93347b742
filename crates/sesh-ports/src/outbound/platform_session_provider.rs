//! Platform Session Provider - Outbound port for a platform's online sessions
//!
//! This port abstracts the online-services layer that actually creates,
//! advertises, searches and joins sessions (NAT traversal, presence, lobbies).
//! The coordinator only submits requests and listens for completions.
//!
//! # Completion delegates
//!
//! Completions are delivered through delegates registered with the
//! `add_on_*_complete` methods. Registration returns a `DelegateHandle`; the
//! delegate stays registered until cleared with the matching `clear_on_*`
//! call. Every registered delegate of a kind is invoked for each completion
//! of that kind, possibly from a provider-owned thread.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use steamsesh_domain::{
    DelegateHandle, JoinOutcome, LocalIdentity, SessionId, SessionName, SessionSearch,
    SessionSearchResult, SessionSettings,
};

/// Invoked with `(session name, success)` when a create finishes.
pub type CreateSessionCompleteFn = Box<dyn Fn(&SessionName, bool) + Send + Sync + 'static>;

/// Invoked with `(success, results)` when a search finishes. Results keep the
/// provider's order.
pub type FindSessionsCompleteFn =
    Box<dyn Fn(bool, &[ProviderSessionRecord]) + Send + Sync + 'static>;

/// Invoked with `(session name, outcome)` when a join finishes.
pub type JoinSessionCompleteFn = Box<dyn Fn(&SessionName, JoinOutcome) + Send + Sync + 'static>;

/// Invoked with `(session name, success)` when a destroy finishes.
pub type DestroySessionCompleteFn = Box<dyn Fn(&SessionName, bool) + Send + Sync + 'static>;

/// A session the provider knows under a local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSession {
    pub name: SessionName,
    /// Assigned once the provider has registered the session.
    pub session_id: Option<SessionId>,
    pub owning_user_name: String,
    pub settings: SessionSettings,
}

/// A provider-native search record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSessionRecord {
    pub session_id: String,
    pub owning_user_name: String,
    /// Advertised attributes (map name, presence flag, open slots...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ProviderSessionRecord {
    pub fn new(session_id: impl Into<String>, owning_user_name: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            owning_user_name: owning_user_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl From<&ProviderSessionRecord> for SessionSearchResult {
    fn from(record: &ProviderSessionRecord) -> Self {
        SessionSearchResult::new(
            SessionId::new(record.session_id.clone()),
            record.owning_user_name.clone(),
            record.attributes.clone(),
        )
    }
}

/// Platform Session Provider trait
///
/// NOTE: This trait is intentionally **object-safe** so the coordinator can
/// hold an `Arc<dyn PlatformSessionProvider>` and tests can substitute a
/// fake or a mock.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PlatformSessionProvider: Send + Sync {
    /// Name of the backing online subsystem (e.g. "STEAM", "NULL")
    fn subsystem_name(&self) -> String;

    /// Look up a session this player holds under `name`.
    fn named_session(&self, name: &SessionName) -> Option<NamedSession>;

    fn add_on_create_session_complete(&self, callback: CreateSessionCompleteFn) -> DelegateHandle;
    fn clear_on_create_session_complete(&self, handle: DelegateHandle);

    fn add_on_find_sessions_complete(&self, callback: FindSessionsCompleteFn) -> DelegateHandle;
    fn clear_on_find_sessions_complete(&self, handle: DelegateHandle);

    fn add_on_join_session_complete(&self, callback: JoinSessionCompleteFn) -> DelegateHandle;
    fn clear_on_join_session_complete(&self, handle: DelegateHandle);

    fn add_on_destroy_session_complete(&self, callback: DestroySessionCompleteFn)
        -> DelegateHandle;
    fn clear_on_destroy_session_complete(&self, handle: DelegateHandle);

    /// Start creating a session. Completion arrives via the create delegates.
    ///
    /// # Errors
    /// Returns an error when the request could not be submitted at all; no
    /// completion will follow in that case.
    fn create_session(
        &self,
        identity: &LocalIdentity,
        name: &SessionName,
        settings: &SessionSettings,
    ) -> anyhow::Result<()>;

    /// Start a search. Completion arrives via the find delegates.
    fn find_sessions(&self, identity: &LocalIdentity, search: &SessionSearch)
        -> anyhow::Result<()>;

    /// Start joining a search result under the local `name`.
    fn join_session(
        &self,
        identity: &LocalIdentity,
        name: &SessionName,
        result: &SessionSearchResult,
    ) -> anyhow::Result<()>;

    /// Start tearing down the named session.
    fn destroy_session(&self, name: &SessionName) -> anyhow::Result<()>;

    /// Platform connect address for a joined session.
    fn resolved_connect_string(&self, name: &SessionName) -> Option<String>;
}
