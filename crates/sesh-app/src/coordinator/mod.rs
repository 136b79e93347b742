//! Session coordinator
//!
//! This service handles:
//! - Creating the local player's named session (tearing down a stale one first)
//! - Searching for presence sessions and retaining the result list
//! - Joining a search result and resolving its connect address
//! - Destroying the named session
//!
//! # Threading
//!
//! Request methods return as soon as the provider has accepted the request.
//! Completions arrive through provider delegates, possibly on a provider
//! thread. All state lives behind one mutex; delegates hold only a weak
//! reference to the coordinator and are correlated to their request by
//! `RequestId`, so a completion for a request that already timed out or was
//! superseded is dropped.
//!
//! Events are published while the state lock is held, so subscribers observe
//! them in transition order.

mod events;
mod pending;
mod state;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures_channel::mpsc;
use steamsesh_domain::{
    DelegateHandle, JoinOutcome, JoinRequestState, LocalIdentity, RequestId, RequestKind,
    SessionDescriptor, SessionName, SessionRequestState, SessionSearch, SessionSearchResult,
    SessionSettings,
};
use steamsesh_ports::{
    ClockPort, LocalPlayerPort, PlatformSessionProvider, ProviderSessionRecord, SessionEvent,
};

use crate::config::{CoordinatorConfig, DestroyPolicy};
use crate::error::SessionError;

use events::EventHub;
use pending::{ParkedCreate, PendingCallback};
use state::CoordinatorState;

pub use state::{CoordinatorSnapshot, JoinedSession};

/// Session lifecycle coordinator for one local player.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: CoordinatorConfig,
    local_player: Arc<dyn LocalPlayerPort>,
    clock: Arc<dyn ClockPort>,
    provider: RwLock<Option<Arc<dyn PlatformSessionProvider>>>,
    state: Mutex<CoordinatorState>,
    events: EventHub,
}

impl SessionCoordinator {
    /// Create a coordinator with no provider attached.
    pub fn new(
        config: CoordinatorConfig,
        local_player: Arc<dyn LocalPlayerPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                local_player,
                clock,
                provider: RwLock::new(None),
                state: Mutex::new(CoordinatorState::default()),
                events: EventHub::default(),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Attach (or replace) the platform session provider.
    pub fn attach_provider(&self, provider: Arc<dyn PlatformSessionProvider>) {
        let subsystem = provider.subsystem_name();
        let previous = self
            .inner
            .provider
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(provider);
        if previous.is_some() {
            tracing::info!(subsystem = %subsystem, "Replaced platform session provider");
        } else {
            tracing::info!(subsystem = %subsystem, "Found online subsystem");
        }
        self.inner
            .events
            .publish([SessionEvent::ProviderFound { subsystem }]);
    }

    /// Detach the provider. Requests already in flight keep the provider they
    /// were submitted to and still complete or time out normally.
    pub fn detach_provider(&self) -> Option<Arc<dyn PlatformSessionProvider>> {
        let previous = self
            .inner
            .provider
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::info!("Detached platform session provider");
        }
        previous
    }

    pub fn has_provider(&self) -> bool {
        self.inner.provider().is_some()
    }

    /// Subscribe to every event published from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.events.subscriber_count()
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Create the configured named session.
    ///
    /// If the provider already holds a session under that name it is
    /// destroyed first, according to the configured `DestroyPolicy`.
    ///
    /// # Errors
    /// `ProviderUnavailable`, `NoLocalIdentity`, `InvalidSettings` or
    /// `Busy(Create)`; none of them changes state. Provider failures are
    /// reported through state and events instead.
    pub fn request_create_session(&self) -> Result<(), SessionError> {
        let inner = &self.inner;
        let provider = inner.provider().ok_or(SessionError::ProviderUnavailable)?;
        let settings = inner.config.session_settings()?;
        let identity = inner.identity()?;
        let name = inner.config.session_name.clone();
        let request_id = RequestId::new();
        let now = inner.clock.now();

        {
            let mut state = inner.lock_state();
            if state.pending.is_pending(RequestKind::Create) {
                return Err(SessionError::Busy(RequestKind::Create));
            }
            state.pending.insert(PendingCallback::new(
                request_id,
                RequestKind::Create,
                Arc::clone(&provider),
                now,
            ));
            state.descriptor = Some(SessionDescriptor::new(name.clone(), settings, now));
            state.current_session = None;
            state.last_error = None;
            let event = state.transition(RequestKind::Create, SessionRequestState::Creating);
            inner.events.publish(event);
        }

        tracing::info!(
            session = %name,
            request_id = %request_id,
            public_connections = settings.public_connections(),
            "Requesting session creation"
        );

        if provider.named_session(&name).is_some() {
            match inner.config.destroy_policy {
                DestroyPolicy::FireAndForget => {
                    tracing::info!(session = %name, "Destroying existing session before re-creating it");
                    inner.forget_joined_session(&name);
                    if let Err(e) = provider.destroy_session(&name) {
                        tracing::warn!(session = %name, error = %e, "Destroy of existing session was rejected");
                    }
                }
                DestroyPolicy::AwaitCompletion => {
                    inner.park_create_behind_destroy(ParkedCreate {
                        request_id,
                        provider,
                        identity,
                        settings,
                    });
                    return Ok(());
                }
            }
        }

        inner.submit_create(&provider, request_id, &identity, &name, &settings);
        Ok(())
    }

    /// Search for presence sessions.
    ///
    /// # Errors
    /// `ProviderUnavailable`, `NoLocalIdentity`, `InvalidSettings` or
    /// `Busy(Find)` while a search is already running; the running search
    /// keeps its single delegate registration and its results replace the
    /// list when they arrive.
    pub fn request_find_sessions(&self) -> Result<(), SessionError> {
        let inner = &self.inner;
        let provider = inner.provider().ok_or(SessionError::ProviderUnavailable)?;
        let search = inner.config.session_search()?;
        let identity = inner.identity()?;
        let request_id = RequestId::new();
        let now = inner.clock.now();

        {
            let mut state = inner.lock_state();
            if state.pending.is_pending(RequestKind::Find) {
                return Err(SessionError::Busy(RequestKind::Find));
            }
            state.pending.insert(PendingCallback::new(
                request_id,
                RequestKind::Find,
                Arc::clone(&provider),
                now,
            ));
            state.last_error = None;
            let event = state.transition(RequestKind::Find, SessionRequestState::Searching);
            inner.events.publish(event);
        }

        tracing::info!(
            request_id = %request_id,
            max_results = search.max_results,
            lan = search.is_lan_query,
            "Searching for sessions"
        );

        inner.submit_find(&provider, request_id, &identity, &search);
        Ok(())
    }

    /// Join the search result at `index` of the current result list.
    ///
    /// # Errors
    /// `ProviderUnavailable`, `NoLocalIdentity`, `NotSearched` when no search
    /// has completed, `NoSearchResult` for an out-of-range index, or
    /// `Busy(Join)`.
    pub fn request_join_session(&self, index: usize) -> Result<(), SessionError> {
        let inner = &self.inner;
        let provider = inner.provider().ok_or(SessionError::ProviderUnavailable)?;
        let identity = inner.identity()?;
        let name = inner.config.session_name.clone();
        let request_id = RequestId::new();
        let now = inner.clock.now();

        let result = {
            let mut state = inner.lock_state();
            if state.search != SessionRequestState::SearchComplete {
                return Err(SessionError::NotSearched);
            }
            let result = state
                .search_results
                .get(index)
                .cloned()
                .ok_or(SessionError::NoSearchResult(index))?;
            if state.pending.is_pending(RequestKind::Join) {
                return Err(SessionError::Busy(RequestKind::Join));
            }
            state.pending.insert(PendingCallback::new(
                request_id,
                RequestKind::Join,
                Arc::clone(&provider),
                now,
            ));
            state.joining = Some(result.clone());
            state.joined = None;
            state.last_error = None;
            let event = state.transition_join(JoinRequestState::Joining);
            inner.events.publish(event);
            result
        };

        tracing::info!(
            session = %name,
            session_id = %result.session_id(),
            owner = %result.owning_user_name(),
            "Joining session"
        );

        inner.submit_join(&provider, request_id, &identity, &name, &result);
        Ok(())
    }

    /// Destroy the configured named session, if one exists.
    ///
    /// # Errors
    /// `ProviderUnavailable` or `Busy(Destroy)`.
    pub fn request_destroy_session(&self) -> Result<(), SessionError> {
        let inner = &self.inner;
        let provider = inner.provider().ok_or(SessionError::ProviderUnavailable)?;
        let name = inner.config.session_name.clone();
        let request_id = RequestId::new();
        let now = inner.clock.now();

        let known_locally = {
            let state = inner.lock_state();
            if state.pending.is_pending(RequestKind::Destroy) {
                return Err(SessionError::Busy(RequestKind::Destroy));
            }
            state.current_session.is_some() || state.joined.is_some()
        };
        if !known_locally && provider.named_session(&name).is_none() {
            tracing::debug!(session = %name, "No session to destroy");
            return Ok(());
        }

        {
            let mut state = inner.lock_state();
            if state.pending.is_pending(RequestKind::Destroy) {
                return Err(SessionError::Busy(RequestKind::Destroy));
            }
            state.pending.insert(PendingCallback::new(
                request_id,
                RequestKind::Destroy,
                Arc::clone(&provider),
                now,
            ));
        }

        tracing::info!(session = %name, request_id = %request_id, "Destroying session");
        inner.submit_destroy(&provider, request_id, &name);
        Ok(())
    }

    /// Fail every request that has been in flight longer than the configured
    /// timeout. Returns the kinds that expired.
    pub fn expire_stale_requests(&self) -> Vec<RequestKind> {
        self.inner.expire_stale_requests()
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// State of the create or find slot that transitioned most recently.
    pub fn state(&self) -> SessionRequestState {
        self.inner.lock_state().current()
    }

    pub fn create_state(&self) -> SessionRequestState {
        self.inner.lock_state().create
    }

    pub fn search_state(&self) -> SessionRequestState {
        self.inner.lock_state().search
    }

    pub fn join_state(&self) -> JoinRequestState {
        self.inner.lock_state().join
    }

    /// Name of the created session; `None` unless the create slot is `Created`.
    pub fn current_session_name(&self) -> Option<SessionName> {
        self.inner.lock_state().current_session.clone()
    }

    pub fn search_results(&self) -> Vec<SessionSearchResult> {
        self.inner.lock_state().search_results.clone()
    }

    pub fn joined_session(&self) -> Option<JoinedSession> {
        self.inner.lock_state().joined.clone()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.lock_state().last_error.clone()
    }

    pub fn in_flight(&self) -> Vec<RequestKind> {
        self.inner.lock_state().pending.in_flight()
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        self.inner.lock_state().snapshot()
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn provider(&self) -> Option<Arc<dyn PlatformSessionProvider>> {
        self.provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn identity(&self) -> Result<LocalIdentity, SessionError> {
        self.local_player
            .preferred_unique_net_id()
            .ok_or(SessionError::NoLocalIdentity)
    }

    /// Store the delegate handle for a pending request, or clear the delegate
    /// straight away if the request is already gone.
    fn attach_handle(
        &self,
        provider: &Arc<dyn PlatformSessionProvider>,
        kind: RequestKind,
        request_id: RequestId,
        handle: DelegateHandle,
    ) -> bool {
        let attached = self
            .lock_state()
            .pending
            .attach_handle(kind, request_id, handle);
        if !attached {
            tracing::debug!(kind = %kind, request_id = %request_id, "Request resolved before delegate registration");
            PendingCallback {
                request_id,
                kind,
                provider: Arc::clone(provider),
                handle: Some(handle),
                started_at: self.clock.now(),
            }
            .release();
        }
        attached
    }

    /// Drop the record of a joined session the provider is about to leave.
    fn forget_joined_session(&self, name: &SessionName) {
        let mut state = self.lock_state();
        if state.joined.as_ref().is_some_and(|j| &j.name == name) {
            tracing::info!(session = %name, "Leaving joined session");
            state.joined = None;
            let event = state.transition_join(JoinRequestState::Idle);
            self.events.publish(event);
        }
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    fn submit_create(
        self: &Arc<Self>,
        provider: &Arc<dyn PlatformSessionProvider>,
        request_id: RequestId,
        identity: &LocalIdentity,
        name: &SessionName,
        settings: &SessionSettings,
    ) {
        let weak = Arc::downgrade(self);
        let handle = provider.add_on_create_session_complete(Box::new(
            move |name: &SessionName, success: bool| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_create_complete(request_id, name, success);
                }
            },
        ));
        if !self.attach_handle(provider, RequestKind::Create, request_id, handle) {
            return;
        }
        if let Err(e) = provider.create_session(identity, name, settings) {
            tracing::warn!(session = %name, error = %e, "Provider rejected create request");
            self.on_create_complete(request_id, name, false);
        }
    }

    fn submit_find(
        self: &Arc<Self>,
        provider: &Arc<dyn PlatformSessionProvider>,
        request_id: RequestId,
        identity: &LocalIdentity,
        search: &SessionSearch,
    ) {
        let weak = Arc::downgrade(self);
        let handle = provider.add_on_find_sessions_complete(Box::new(
            move |success: bool, records: &[ProviderSessionRecord]| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_find_complete(request_id, success, records);
                }
            },
        ));
        if !self.attach_handle(provider, RequestKind::Find, request_id, handle) {
            return;
        }
        if let Err(e) = provider.find_sessions(identity, search) {
            tracing::warn!(error = %e, "Provider rejected find request");
            self.on_find_complete(request_id, false, &[]);
        }
    }

    fn submit_join(
        self: &Arc<Self>,
        provider: &Arc<dyn PlatformSessionProvider>,
        request_id: RequestId,
        identity: &LocalIdentity,
        name: &SessionName,
        result: &SessionSearchResult,
    ) {
        let weak = Arc::downgrade(self);
        let handle = provider.add_on_join_session_complete(Box::new(
            move |name: &SessionName, outcome: JoinOutcome| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_join_complete(request_id, name, outcome);
                }
            },
        ));
        if !self.attach_handle(provider, RequestKind::Join, request_id, handle) {
            return;
        }
        if let Err(e) = provider.join_session(identity, name, result) {
            tracing::warn!(session = %name, error = %e, "Provider rejected join request");
            self.on_join_complete(request_id, name, JoinOutcome::UnknownError);
        }
    }

    fn submit_destroy(
        self: &Arc<Self>,
        provider: &Arc<dyn PlatformSessionProvider>,
        request_id: RequestId,
        name: &SessionName,
    ) {
        let weak = Arc::downgrade(self);
        let handle = provider.add_on_destroy_session_complete(Box::new(
            move |name: &SessionName, success: bool| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_destroy_complete(request_id, name, success);
                }
            },
        ));
        if !self.attach_handle(provider, RequestKind::Destroy, request_id, handle) {
            return;
        }
        if let Err(e) = provider.destroy_session(name) {
            tracing::warn!(session = %name, error = %e, "Provider rejected destroy request");
            self.on_destroy_complete(request_id, name, false);
        }
    }

    /// Hold the create until the stale session is gone. Piggybacks on a
    /// destroy that is already in flight.
    fn park_create_behind_destroy(self: &Arc<Self>, parked: ParkedCreate) {
        let name = self.config.session_name.clone();
        let provider = Arc::clone(&parked.provider);
        let destroy_id = RequestId::new();
        let now = self.clock.now();

        let needs_destroy = {
            let mut state = self.lock_state();
            let needs_destroy = !state.pending.is_pending(RequestKind::Destroy);
            if needs_destroy {
                state.pending.insert(PendingCallback::new(
                    destroy_id,
                    RequestKind::Destroy,
                    Arc::clone(&provider),
                    now,
                ));
            }
            state.parked_create = Some(parked);
            needs_destroy
        };

        tracing::info!(session = %name, "Waiting for existing session to be destroyed before re-creating it");
        if needs_destroy {
            self.submit_destroy(&provider, destroy_id, &name);
        }
    }

    // -------------------------------------------------------------------------
    // Completions
    // -------------------------------------------------------------------------

    fn on_create_complete(&self, request_id: RequestId, name: &SessionName, success: bool) {
        if name != &self.config.session_name {
            tracing::debug!(session = %name, "Ignoring create completion for another session");
            return;
        }

        let pending = {
            let mut state = self.lock_state();
            let Some(pending) = state.pending.take_matching(RequestKind::Create, request_id) else {
                tracing::debug!(request_id = %request_id, session = %name, "Ignoring stale create completion");
                return;
            };

            let mut events = Vec::with_capacity(2);
            if success {
                tracing::info!(session = %name, "Created session");
                state.current_session = Some(name.clone());
                events.extend(state.transition(RequestKind::Create, SessionRequestState::Created));
                events.push(SessionEvent::SessionCreated { name: name.clone() });
            } else {
                tracing::warn!(session = %name, "Failed to create session");
                state.current_session = None;
                state.descriptor = None;
                state.last_error = Some(SessionError::CreateFailed);
                events.extend(state.transition(RequestKind::Create, SessionRequestState::Failed));
                events.push(SessionEvent::CreateFailed { name: name.clone() });
            }
            self.events.publish(events);
            pending
        };

        pending.release();
    }

    fn on_find_complete(
        &self,
        request_id: RequestId,
        success: bool,
        records: &[ProviderSessionRecord],
    ) {
        let pending = {
            let mut state = self.lock_state();
            let Some(pending) = state.pending.take_matching(RequestKind::Find, request_id) else {
                tracing::debug!(request_id = %request_id, "Ignoring stale find completion");
                return;
            };

            let mut events = Vec::with_capacity(2);
            if success {
                let results: Vec<SessionSearchResult> =
                    records.iter().map(SessionSearchResult::from).collect();
                for result in &results {
                    tracing::info!(
                        session_id = %result.session_id(),
                        owner = %result.owning_user_name(),
                        "Found session"
                    );
                }
                state.search_results = results.clone();
                events.extend(state.transition(
                    RequestKind::Find,
                    SessionRequestState::SearchComplete,
                ));
                events.push(SessionEvent::SearchCompleted { results });
            } else {
                tracing::warn!("Failed to find sessions");
                state.search_results.clear();
                state.last_error = Some(SessionError::FindFailed);
                events.extend(state.transition(RequestKind::Find, SessionRequestState::Failed));
                events.push(SessionEvent::FindFailed);
            }
            self.events.publish(events);
            pending
        };

        pending.release();
    }

    fn on_join_complete(&self, request_id: RequestId, name: &SessionName, outcome: JoinOutcome) {
        if name != &self.config.session_name {
            tracing::debug!(session = %name, "Ignoring join completion for another session");
            return;
        }

        // Resolve the address before taking the lock; the provider may lock
        // internally.
        let provider = self
            .lock_state()
            .pending
            .provider_for(RequestKind::Join, request_id);
        let Some(provider) = provider else {
            tracing::debug!(request_id = %request_id, "Ignoring stale join completion");
            return;
        };
        let outcome_and_address = match outcome {
            JoinOutcome::Success => match provider.resolved_connect_string(name) {
                Some(address) => Ok(address),
                None => Err(JoinOutcome::CouldNotRetrieveAddress),
            },
            failure => Err(failure),
        };

        let pending = {
            let mut state = self.lock_state();
            let Some(pending) = state.pending.take_matching(RequestKind::Join, request_id) else {
                tracing::debug!(request_id = %request_id, "Join request expired while resolving address");
                return;
            };
            let joining = state.joining.take();

            let mut events = Vec::with_capacity(2);
            match (outcome_and_address, joining) {
                (Ok(address), Some(result)) => {
                    tracing::info!(session = %name, address = %address, "Joined session");
                    state.joined = Some(JoinedSession {
                        name: name.clone(),
                        session_id: result.session_id().clone(),
                        owning_user_name: result.owning_user_name().to_string(),
                        connect_address: address.clone(),
                    });
                    events.extend(state.transition_join(JoinRequestState::Joined));
                    events.push(SessionEvent::SessionJoined {
                        name: name.clone(),
                        connect_address: Some(address),
                    });
                }
                (result, _) => {
                    let outcome = result.err().unwrap_or(JoinOutcome::UnknownError);
                    tracing::warn!(session = %name, outcome = %outcome, "Failed to join session");
                    state.joined = None;
                    state.last_error = Some(SessionError::JoinFailed(outcome));
                    events.extend(state.transition_join(JoinRequestState::Failed));
                    events.push(SessionEvent::JoinFailed {
                        name: name.clone(),
                        outcome,
                    });
                }
            }
            self.events.publish(events);
            pending
        };

        pending.release();
    }

    fn on_destroy_complete(
        self: &Arc<Self>,
        request_id: RequestId,
        name: &SessionName,
        success: bool,
    ) {
        if name != &self.config.session_name {
            tracing::debug!(session = %name, "Ignoring destroy completion for another session");
            return;
        }

        let (pending, parked) = {
            let mut state = self.lock_state();
            let Some(pending) = state.pending.take_matching(RequestKind::Destroy, request_id)
            else {
                tracing::debug!(request_id = %request_id, "Ignoring stale destroy completion");
                return;
            };
            let parked = state.parked_create.take();

            let mut events = Vec::with_capacity(3);
            if success {
                tracing::info!(session = %name, "Destroyed session");
                if state.current_session.as_ref() == Some(name) {
                    state.current_session = None;
                }
                if state.create == SessionRequestState::Created {
                    state.descriptor = None;
                    events.extend(state.transition(RequestKind::Create, SessionRequestState::Idle));
                }
                if state.joined.as_ref().is_some_and(|j| &j.name == name) {
                    state.joined = None;
                    events.extend(state.transition_join(JoinRequestState::Idle));
                }
            } else {
                tracing::warn!(session = %name, "Failed to destroy session");
                if parked.is_none() {
                    state.last_error = Some(SessionError::DestroyFailed);
                }
            }
            events.push(SessionEvent::SessionDestroyed {
                name: name.clone(),
                success,
            });
            self.events.publish(events);
            (pending, parked)
        };

        pending.release();

        if let Some(parked) = parked {
            if success {
                self.submit_create(
                    &parked.provider,
                    parked.request_id,
                    &parked.identity,
                    name,
                    &parked.settings,
                );
            } else {
                self.on_create_complete(parked.request_id, name, false);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------

    fn expire_stale_requests(&self) -> Vec<RequestKind> {
        let Some(timeout) = self.config.request_timeout() else {
            return Vec::new();
        };
        let now = self.clock.now();

        let mut expired = Vec::new();
        let mut released = Vec::new();
        {
            let mut state = self.lock_state();
            let mut events = Vec::new();

            if let Some(pending) = state.pending.take_expired(RequestKind::Find, now, timeout) {
                state.search_results.clear();
                state.last_error = Some(SessionError::TimedOut(RequestKind::Find));
                events.extend(state.transition(RequestKind::Find, SessionRequestState::Failed));
                events.push(SessionEvent::RequestTimedOut {
                    kind: RequestKind::Find,
                });
                expired.push(RequestKind::Find);
                released.push(pending);
            }

            if let Some(pending) = state.pending.take_expired(RequestKind::Join, now, timeout) {
                state.joining = None;
                state.last_error = Some(SessionError::TimedOut(RequestKind::Join));
                events.extend(state.transition_join(JoinRequestState::Failed));
                events.push(SessionEvent::RequestTimedOut {
                    kind: RequestKind::Join,
                });
                expired.push(RequestKind::Join);
                released.push(pending);
            }

            let destroy_expired = state.pending.take_expired(RequestKind::Destroy, now, timeout);
            // A parked create cannot outlive the destroy it waits on.
            let create_expired = match state.pending.take_expired(RequestKind::Create, now, timeout)
            {
                Some(pending) => Some(pending),
                None if destroy_expired.is_some() && state.parked_create.is_some() => {
                    state.pending.take(RequestKind::Create)
                }
                None => None,
            };

            if let Some(pending) = destroy_expired {
                state.last_error = Some(SessionError::TimedOut(RequestKind::Destroy));
                events.push(SessionEvent::RequestTimedOut {
                    kind: RequestKind::Destroy,
                });
                expired.push(RequestKind::Destroy);
                released.push(pending);
            }

            if let Some(pending) = create_expired {
                state.parked_create = None;
                state.current_session = None;
                state.descriptor = None;
                state.last_error = Some(SessionError::TimedOut(RequestKind::Create));
                events.extend(state.transition(RequestKind::Create, SessionRequestState::Failed));
                events.push(SessionEvent::RequestTimedOut {
                    kind: RequestKind::Create,
                });
                expired.push(RequestKind::Create);
                released.push(pending);
            }

            for kind in &expired {
                tracing::warn!(kind = %kind, timeout_ms = self.config.request_timeout_ms, "Session request timed out");
            }
            self.events.publish(events);
        }

        for pending in released {
            pending.release();
        }
        expired
    }
}
