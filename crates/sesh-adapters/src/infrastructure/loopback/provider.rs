//! In-process `PlatformSessionProvider`.
//!
//! Each instance stands for one local player talking to a shared
//! `LoopbackRegistry`. Requests are accepted synchronously; the work and the
//! completion delegates run on a spawned tokio task after a simulated network
//! latency, so completions never arrive on the requesting thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use steamsesh_domain::{
    DelegateHandle, JoinOutcome, LocalIdentity, SessionId, SessionName, SessionSearch,
    SessionSearchResult, SessionSettings,
};
use steamsesh_ports::{
    CreateSessionCompleteFn, DestroySessionCompleteFn, FindSessionsCompleteFn,
    JoinSessionCompleteFn, NamedSession, PlatformSessionProvider, ProviderSessionRecord,
};

use super::registry::{LoopbackError, LoopbackRegistry};
use crate::infrastructure::delegates::DelegateList;

pub const LOOPBACK_SUBSYSTEM: &str = "LOOPBACK";

/// Simulated network timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackConfig {
    pub latency: Duration,
    /// Upper bound of the random delay added to `latency`
    pub jitter: Duration,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(50),
            jitter: Duration::from_millis(25),
        }
    }
}

impl LoopbackConfig {
    /// Fixed latency with no jitter.
    pub fn fixed(latency: Duration) -> Self {
        Self {
            latency,
            jitter: Duration::ZERO,
        }
    }

    fn next_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.latency;
        }
        self.latency + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// A session this player holds under a local name.
#[derive(Debug, Clone)]
struct LocalSession {
    /// Hosting player for hosted sessions, the joining player otherwise
    player: LocalIdentity,
    owning_user_name: String,
    settings: SessionSettings,
    /// None until the create has been registered
    session_id: Option<SessionId>,
    hosted: bool,
    connect_address: Option<String>,
}

type CreateDelegate = dyn Fn(&SessionName, bool) + Send + Sync + 'static;
type FindDelegate = dyn Fn(bool, &[ProviderSessionRecord]) + Send + Sync + 'static;
type JoinDelegate = dyn Fn(&SessionName, JoinOutcome) + Send + Sync + 'static;
type DestroyDelegate = dyn Fn(&SessionName, bool) + Send + Sync + 'static;

struct Shared {
    registry: Arc<LoopbackRegistry>,
    player_name: String,
    named: Mutex<HashMap<SessionName, LocalSession>>,
    on_create: DelegateList<CreateDelegate>,
    on_find: DelegateList<FindDelegate>,
    on_join: DelegateList<JoinDelegate>,
    on_destroy: DelegateList<DestroyDelegate>,
}

impl Shared {
    fn named(&self) -> MutexGuard<'_, HashMap<SessionName, LocalSession>> {
        self.named.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire_create(&self, name: &SessionName, success: bool) {
        for callback in self.on_create.snapshot() {
            callback(name, success);
        }
    }

    fn fire_find(&self, success: bool, records: &[ProviderSessionRecord]) {
        for callback in self.on_find.snapshot() {
            callback(success, records);
        }
    }

    fn fire_join(&self, name: &SessionName, outcome: JoinOutcome) {
        for callback in self.on_join.snapshot() {
            callback(name, outcome);
        }
    }

    fn fire_destroy(&self, name: &SessionName, success: bool) {
        for callback in self.on_destroy.snapshot() {
            callback(name, success);
        }
    }

    fn complete_create(&self, name: &SessionName) {
        let pending = self
            .named()
            .get(name)
            .filter(|s| s.hosted && s.session_id.is_none())
            .cloned();
        let Some(local) = pending else {
            tracing::debug!(session = %name, "Create was torn down before registration");
            self.fire_create(name, false);
            return;
        };

        match self
            .registry
            .register(&local.player, &local.owning_user_name, name, local.settings)
        {
            Ok(session_id) => {
                if let Some(entry) = self.named().get_mut(name) {
                    entry.session_id = Some(session_id.clone());
                }
                tracing::info!(session = %name, session_id = %session_id, "Loopback session created");
                self.fire_create(name, true);
            }
            Err(e) => {
                tracing::warn!(session = %name, error = %e, "Loopback create failed");
                self.named().remove(name);
                self.fire_create(name, false);
            }
        }
    }

    fn complete_join(&self, player: &LocalIdentity, name: &SessionName, session_id: &SessionId) {
        match self.registry.join(player, session_id) {
            Ok(session) => {
                self.named().insert(
                    name.clone(),
                    LocalSession {
                        player: player.clone(),
                        owning_user_name: session.owning_user_name.clone(),
                        settings: session.settings,
                        session_id: Some(session.session_id.clone()),
                        hosted: false,
                        connect_address: Some(session.connect_address()),
                    },
                );
                tracing::info!(session = %name, session_id = %session_id, "Loopback session joined");
                self.fire_join(name, JoinOutcome::Success);
            }
            Err(outcome) => {
                tracing::warn!(session = %name, outcome = %outcome, "Loopback join failed");
                self.fire_join(name, outcome);
            }
        }
    }

    /// Drop the local entry and its registry footprint. Returns false when
    /// nothing was held under `name`.
    fn tear_down(&self, name: &SessionName) -> bool {
        let Some(local) = self.named().remove(name) else {
            return false;
        };
        if local.hosted {
            self.registry.unregister(&local.player, name);
        } else if let Some(session_id) = &local.session_id {
            self.registry.leave(&local.player, session_id);
        }
        true
    }
}

/// Loopback provider for one local player.
#[derive(Clone)]
pub struct LoopbackSessionProvider {
    shared: Arc<Shared>,
    config: LoopbackConfig,
}

impl LoopbackSessionProvider {
    pub fn new(
        registry: Arc<LoopbackRegistry>,
        player_name: impl Into<String>,
        config: LoopbackConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                player_name: player_name.into(),
                named: Mutex::new(HashMap::new()),
                on_create: DelegateList::default(),
                on_find: DelegateList::default(),
                on_join: DelegateList::default(),
                on_destroy: DelegateList::default(),
            }),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<LoopbackRegistry> {
        &self.shared.registry
    }

    /// Registered delegates across all kinds.
    pub fn delegate_count(&self) -> usize {
        self.shared.on_create.len()
            + self.shared.on_find.len()
            + self.shared.on_join.len()
            + self.shared.on_destroy.len()
    }

    /// Run `work` on a tokio task after the simulated latency.
    fn schedule(&self, work: impl FnOnce(&Shared) + Send + 'static) -> anyhow::Result<()> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| LoopbackError::NoRuntime)?;
        let delay = self.config.next_delay();
        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            work(&shared);
        });
        Ok(())
    }
}

impl PlatformSessionProvider for LoopbackSessionProvider {
    fn subsystem_name(&self) -> String {
        LOOPBACK_SUBSYSTEM.to_string()
    }

    fn named_session(&self, name: &SessionName) -> Option<NamedSession> {
        self.shared.named().get(name).map(|local| NamedSession {
            name: name.clone(),
            session_id: local.session_id.clone(),
            owning_user_name: local.owning_user_name.clone(),
            settings: local.settings,
        })
    }

    fn add_on_create_session_complete(&self, callback: CreateSessionCompleteFn) -> DelegateHandle {
        self.shared.on_create.add(callback)
    }

    fn clear_on_create_session_complete(&self, handle: DelegateHandle) {
        self.shared.on_create.remove(handle);
    }

    fn add_on_find_sessions_complete(&self, callback: FindSessionsCompleteFn) -> DelegateHandle {
        self.shared.on_find.add(callback)
    }

    fn clear_on_find_sessions_complete(&self, handle: DelegateHandle) {
        self.shared.on_find.remove(handle);
    }

    fn add_on_join_session_complete(&self, callback: JoinSessionCompleteFn) -> DelegateHandle {
        self.shared.on_join.add(callback)
    }

    fn clear_on_join_session_complete(&self, handle: DelegateHandle) {
        self.shared.on_join.remove(handle);
    }

    fn add_on_destroy_session_complete(
        &self,
        callback: DestroySessionCompleteFn,
    ) -> DelegateHandle {
        self.shared.on_destroy.add(callback)
    }

    fn clear_on_destroy_session_complete(&self, handle: DelegateHandle) {
        self.shared.on_destroy.remove(handle);
    }

    fn create_session(
        &self,
        identity: &LocalIdentity,
        name: &SessionName,
        settings: &SessionSettings,
    ) -> anyhow::Result<()> {
        let already_held = {
            let mut named = self.shared.named();
            let held = named.contains_key(name);
            if !held {
                named.insert(
                    name.clone(),
                    LocalSession {
                        player: identity.clone(),
                        owning_user_name: self.shared.player_name.clone(),
                        settings: *settings,
                        session_id: None,
                        hosted: true,
                        connect_address: None,
                    },
                );
            }
            held
        };

        let owned = name.clone();
        if already_held {
            tracing::warn!(session = %name, "Loopback create for a name that is already held");
            return self.schedule(move |shared| shared.fire_create(&owned, false));
        }
        let scheduled = self.schedule(move |shared| shared.complete_create(&owned));
        if scheduled.is_err() {
            self.shared.named().remove(name);
        }
        scheduled
    }

    fn find_sessions(
        &self,
        identity: &LocalIdentity,
        search: &SessionSearch,
    ) -> anyhow::Result<()> {
        let identity = identity.clone();
        let search = search.clone();
        self.schedule(move |shared| {
            let records = shared.registry.find(&identity, &search);
            tracing::debug!(count = records.len(), "Loopback search finished");
            shared.fire_find(true, &records);
        })
    }

    fn join_session(
        &self,
        identity: &LocalIdentity,
        name: &SessionName,
        result: &SessionSearchResult,
    ) -> anyhow::Result<()> {
        let name = name.clone();
        if self.shared.named().contains_key(&name) {
            return self.schedule(move |shared| {
                shared.fire_join(&name, JoinOutcome::AlreadyInSession);
            });
        }
        let identity = identity.clone();
        let session_id = result.session_id().clone();
        self.schedule(move |shared| shared.complete_join(&identity, &name, &session_id))
    }

    /// Teardown is immediate; only the completion is delayed.
    fn destroy_session(&self, name: &SessionName) -> anyhow::Result<()> {
        let destroyed = self.shared.tear_down(name);
        if !destroyed {
            tracing::debug!(session = %name, "Loopback destroy for a name that is not held");
        }
        let name = name.clone();
        self.schedule(move |shared| shared.fire_destroy(&name, destroyed))
    }

    fn resolved_connect_string(&self, name: &SessionName) -> Option<String> {
        self.shared
            .named()
            .get(name)
            .and_then(|local| local.connect_address.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_for(registry: &Arc<LoopbackRegistry>, name: &str) -> LoopbackSessionProvider {
        LoopbackSessionProvider::new(
            Arc::clone(registry),
            name,
            LoopbackConfig::fixed(Duration::from_millis(20)),
        )
    }

    fn record_creates(provider: &LoopbackSessionProvider) -> Arc<Mutex<Vec<(SessionName, bool)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        provider.add_on_create_session_complete(Box::new(move |name: &SessionName, success: bool| {
            sink.lock().unwrap().push((name.clone(), success));
        }));
        seen
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[test]
    fn submitting_without_a_runtime_is_an_error() {
        let registry = Arc::new(LoopbackRegistry::new());
        let provider = provider_for(&registry, "alice");

        let result = provider.create_session(
            &LocalIdentity::from("alice"),
            &SessionName::game_session(),
            &SessionSettings::default(),
        );

        assert!(result.is_err());
        assert!(provider.named_session(&SessionName::game_session()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn create_completes_after_latency_and_is_visible_to_peers() {
        let registry = Arc::new(LoopbackRegistry::new());
        let alice = provider_for(&registry, "alice");
        let creates = record_creates(&alice);

        alice
            .create_session(
                &LocalIdentity::from("alice"),
                &SessionName::game_session(),
                &SessionSettings::default(),
            )
            .unwrap();
        assert!(creates.lock().unwrap().is_empty());

        settle().await;
        assert_eq!(
            *creates.lock().unwrap(),
            vec![(SessionName::game_session(), true)]
        );
        let named = alice.named_session(&SessionName::game_session()).unwrap();
        assert!(named.session_id.is_some());

        let found = registry.find(
            &LocalIdentity::from("bob"),
            &SessionSearch::presence(10).unwrap(),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].owning_user_name, "alice");
    }

    #[tokio::test(start_paused = true)]
    async fn second_create_under_held_name_fails() {
        let registry = Arc::new(LoopbackRegistry::new());
        let alice = provider_for(&registry, "alice");
        let creates = record_creates(&alice);
        let identity = LocalIdentity::from("alice");
        let name = SessionName::game_session();

        alice
            .create_session(&identity, &name, &SessionSettings::default())
            .unwrap();
        alice
            .create_session(&identity, &name, &SessionSettings::default())
            .unwrap();
        settle().await;

        let mut outcomes: Vec<bool> = creates.lock().unwrap().iter().map(|(_, s)| *s).collect();
        outcomes.sort();
        assert_eq!(outcomes, vec![false, true]);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn join_resolves_connect_string_and_destroy_leaves() {
        let registry = Arc::new(LoopbackRegistry::new());
        let session_id = registry.seed_peer("carol").unwrap();
        let bob = provider_for(&registry, "bob");
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        bob.add_on_join_session_complete(Box::new(move |_: &SessionName, outcome: JoinOutcome| {
            sink.lock().unwrap().push(outcome);
        }));

        let result = SessionSearchResult::new(session_id.clone(), "carol", Default::default());
        bob.join_session(&LocalIdentity::from("bob"), &SessionName::game_session(), &result)
            .unwrap();
        settle().await;

        assert_eq!(*outcomes.lock().unwrap(), vec![JoinOutcome::Success]);
        assert_eq!(
            bob.resolved_connect_string(&SessionName::game_session()),
            Some(format!("loopback://{session_id}"))
        );
        assert_eq!(registry.get(&session_id).unwrap().members.len(), 1);

        bob.destroy_session(&SessionName::game_session()).unwrap();
        assert!(registry.get(&session_id).unwrap().members.is_empty());
        assert!(bob.resolved_connect_string(&SessionName::game_session()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_of_unknown_name_reports_failure() {
        let registry = Arc::new(LoopbackRegistry::new());
        let alice = provider_for(&registry, "alice");
        let destroys = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&destroys);
        alice.add_on_destroy_session_complete(Box::new(move |_: &SessionName, success: bool| {
            sink.lock().unwrap().push(success);
        }));

        alice.destroy_session(&SessionName::game_session()).unwrap();
        settle().await;

        assert_eq!(*destroys.lock().unwrap(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_delegates_are_not_invoked() {
        let registry = Arc::new(LoopbackRegistry::new());
        let alice = provider_for(&registry, "alice");
        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        let handle = alice.add_on_find_sessions_complete(Box::new(
            move |_: bool, _: &[ProviderSessionRecord]| {
                *sink.lock().unwrap() += 1;
            },
        ));
        alice.clear_on_find_sessions_complete(handle);
        assert_eq!(alice.delegate_count(), 0);

        alice
            .find_sessions(&LocalIdentity::from("alice"), &SessionSearch::default())
            .unwrap();
        settle().await;

        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
