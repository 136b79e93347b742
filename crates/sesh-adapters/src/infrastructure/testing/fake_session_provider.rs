//! Fake implementation of PlatformSessionProvider for testing
//!
//! Records every submitted request and lets the test fire completions at a
//! time of its choosing, from whichever thread it likes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use steamsesh_domain::{
    DelegateHandle, JoinOutcome, LocalIdentity, RequestKind, SessionId, SessionName,
    SessionSearch, SessionSearchResult, SessionSettings,
};
use steamsesh_ports::{
    CreateSessionCompleteFn, DestroySessionCompleteFn, FindSessionsCompleteFn,
    JoinSessionCompleteFn, NamedSession, PlatformSessionProvider, ProviderSessionRecord,
};

use crate::infrastructure::delegates::DelegateList;

/// A request the fake received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create {
        identity: LocalIdentity,
        name: SessionName,
        settings: SessionSettings,
    },
    Find {
        identity: LocalIdentity,
        search: SessionSearch,
    },
    Join {
        identity: LocalIdentity,
        name: SessionName,
        session_id: SessionId,
    },
    Destroy {
        name: SessionName,
    },
}

impl ProviderCall {
    pub fn kind(&self) -> RequestKind {
        match self {
            ProviderCall::Create { .. } => RequestKind::Create,
            ProviderCall::Find { .. } => RequestKind::Find,
            ProviderCall::Join { .. } => RequestKind::Join,
            ProviderCall::Destroy { .. } => RequestKind::Destroy,
        }
    }
}

type CreateDelegate = dyn Fn(&SessionName, bool) + Send + Sync + 'static;
type FindDelegate = dyn Fn(bool, &[ProviderSessionRecord]) + Send + Sync + 'static;
type JoinDelegate = dyn Fn(&SessionName, JoinOutcome) + Send + Sync + 'static;
type DestroyDelegate = dyn Fn(&SessionName, bool) + Send + Sync + 'static;

#[derive(Default)]
struct State {
    calls: Vec<ProviderCall>,
    named: HashMap<SessionName, NamedSession>,
    connect_strings: HashMap<SessionName, String>,
    reject_submits: Vec<RequestKind>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    on_create: DelegateList<CreateDelegate>,
    on_find: DelegateList<FindDelegate>,
    on_join: DelegateList<JoinDelegate>,
    on_destroy: DelegateList<DestroyDelegate>,
}

/// Fake `PlatformSessionProvider` for tests.
///
/// Completions are never fired on their own; call the `complete_*` methods.
#[derive(Clone, Default)]
pub struct FakeSessionProvider {
    inner: Arc<Inner>,
}

impl FakeSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state().calls.clone()
    }

    pub fn calls_of(&self, kind: RequestKind) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    /// Pretend the provider already holds a session under `name`.
    pub fn set_named_session(&self, name: &SessionName) {
        self.state().named.insert(
            name.clone(),
            NamedSession {
                name: name.clone(),
                session_id: Some(SessionId::new(format!("fake-{name}"))),
                owning_user_name: "fake".to_string(),
                settings: SessionSettings::default(),
            },
        );
    }

    pub fn clear_named_session(&self, name: &SessionName) {
        self.state().named.remove(name);
    }

    /// Connect string returned for `name` once joined.
    pub fn set_connect_string(&self, name: &SessionName, address: impl Into<String>) {
        self.state()
            .connect_strings
            .insert(name.clone(), address.into());
    }

    /// Make the next submission of `kind` fail synchronously.
    pub fn reject_next(&self, kind: RequestKind) {
        self.state().reject_submits.push(kind);
    }

    pub fn delegate_count(&self, kind: RequestKind) -> usize {
        match kind {
            RequestKind::Create => self.inner.on_create.len(),
            RequestKind::Find => self.inner.on_find.len(),
            RequestKind::Join => self.inner.on_join.len(),
            RequestKind::Destroy => self.inner.on_destroy.len(),
        }
    }

    pub fn total_delegates(&self) -> usize {
        self.inner.on_create.len()
            + self.inner.on_find.len()
            + self.inner.on_join.len()
            + self.inner.on_destroy.len()
    }

    /// Fire the create delegates. A successful create leaves `name` held.
    pub fn complete_create(&self, name: &SessionName, success: bool) {
        if success {
            self.set_named_session(name);
        }
        for callback in self.inner.on_create.snapshot() {
            callback(name, success);
        }
    }

    pub fn complete_find(&self, success: bool, records: &[ProviderSessionRecord]) {
        for callback in self.inner.on_find.snapshot() {
            callback(success, records);
        }
    }

    pub fn complete_join(&self, name: &SessionName, outcome: JoinOutcome) {
        for callback in self.inner.on_join.snapshot() {
            callback(name, outcome);
        }
    }

    /// Fire the destroy delegates. A successful destroy releases `name`.
    pub fn complete_destroy(&self, name: &SessionName, success: bool) {
        if success {
            self.clear_named_session(name);
        }
        for callback in self.inner.on_destroy.snapshot() {
            callback(name, success);
        }
    }

    fn record(&self, call: ProviderCall) -> anyhow::Result<()> {
        let mut state = self.state();
        let kind = call.kind();
        state.calls.push(call);
        if let Some(pos) = state.reject_submits.iter().position(|k| *k == kind) {
            state.reject_submits.remove(pos);
            anyhow::bail!("fake provider rejected {kind} request");
        }
        Ok(())
    }
}

impl PlatformSessionProvider for FakeSessionProvider {
    fn subsystem_name(&self) -> String {
        "FAKE".to_string()
    }

    fn named_session(&self, name: &SessionName) -> Option<NamedSession> {
        self.state().named.get(name).cloned()
    }

    fn add_on_create_session_complete(&self, callback: CreateSessionCompleteFn) -> DelegateHandle {
        self.inner.on_create.add(callback)
    }

    fn clear_on_create_session_complete(&self, handle: DelegateHandle) {
        self.inner.on_create.remove(handle);
    }

    fn add_on_find_sessions_complete(&self, callback: FindSessionsCompleteFn) -> DelegateHandle {
        self.inner.on_find.add(callback)
    }

    fn clear_on_find_sessions_complete(&self, handle: DelegateHandle) {
        self.inner.on_find.remove(handle);
    }

    fn add_on_join_session_complete(&self, callback: JoinSessionCompleteFn) -> DelegateHandle {
        self.inner.on_join.add(callback)
    }

    fn clear_on_join_session_complete(&self, handle: DelegateHandle) {
        self.inner.on_join.remove(handle);
    }

    fn add_on_destroy_session_complete(
        &self,
        callback: DestroySessionCompleteFn,
    ) -> DelegateHandle {
        self.inner.on_destroy.add(callback)
    }

    fn clear_on_destroy_session_complete(&self, handle: DelegateHandle) {
        self.inner.on_destroy.remove(handle);
    }

    fn create_session(
        &self,
        identity: &LocalIdentity,
        name: &SessionName,
        settings: &SessionSettings,
    ) -> anyhow::Result<()> {
        self.record(ProviderCall::Create {
            identity: identity.clone(),
            name: name.clone(),
            settings: *settings,
        })
    }

    fn find_sessions(
        &self,
        identity: &LocalIdentity,
        search: &SessionSearch,
    ) -> anyhow::Result<()> {
        self.record(ProviderCall::Find {
            identity: identity.clone(),
            search: search.clone(),
        })
    }

    fn join_session(
        &self,
        identity: &LocalIdentity,
        name: &SessionName,
        result: &SessionSearchResult,
    ) -> anyhow::Result<()> {
        self.record(ProviderCall::Join {
            identity: identity.clone(),
            name: name.clone(),
            session_id: result.session_id().clone(),
        })
    }

    fn destroy_session(&self, name: &SessionName) -> anyhow::Result<()> {
        self.record(ProviderCall::Destroy { name: name.clone() })
    }

    fn resolved_connect_string(&self, name: &SessionName) -> Option<String> {
        self.state().connect_strings.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_submission_is_still_recorded() {
        let fake = FakeSessionProvider::new();
        fake.reject_next(RequestKind::Destroy);

        assert!(fake.destroy_session(&SessionName::game_session()).is_err());
        assert!(fake.destroy_session(&SessionName::game_session()).is_ok());
        assert_eq!(fake.calls_of(RequestKind::Destroy), 2);
    }

    #[test]
    fn completions_reach_every_registered_delegate() {
        let fake = FakeSessionProvider::new();
        let hits = Arc::new(Mutex::new(0));
        for _ in 0..2 {
            let hits = Arc::clone(&hits);
            fake.add_on_create_session_complete(Box::new(move |_: &SessionName, _: bool| {
                *hits.lock().unwrap() += 1;
            }));
        }

        fake.complete_create(&SessionName::game_session(), true);

        assert_eq!(*hits.lock().unwrap(), 2);
        assert!(fake.named_session(&SessionName::game_session()).is_some());
    }
}
