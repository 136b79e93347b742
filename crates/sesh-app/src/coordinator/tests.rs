use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use mockall::{predicate::eq, Sequence};
use steamsesh_domain::{
    DelegateHandle, JoinRequestState, LocalIdentity, RequestKind, SessionName,
    SessionRequestState, SessionSettings,
};
use steamsesh_ports::{
    CreateSessionCompleteFn, MockClockPort, MockLocalPlayerPort, MockPlatformSessionProvider,
    NamedSession, SessionEvent,
};

use super::SessionCoordinator;
use crate::config::CoordinatorConfig;
use crate::error::SessionError;

fn fixed_clock() -> Arc<MockClockPort> {
    let mut clock = MockClockPort::new();
    clock
        .expect_now()
        .returning(|| Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
    Arc::new(clock)
}

fn signed_in_player() -> Arc<MockLocalPlayerPort> {
    let mut player = MockLocalPlayerPort::new();
    player
        .expect_preferred_unique_net_id()
        .returning(|| Some(LocalIdentity::from("player-1")));
    player
        .expect_display_name()
        .returning(|| "Player One".to_string());
    Arc::new(player)
}

fn coordinator_with(player: Arc<MockLocalPlayerPort>) -> SessionCoordinator {
    SessionCoordinator::new(CoordinatorConfig::default(), player, fixed_clock())
}

fn provider_base() -> MockPlatformSessionProvider {
    let mut provider = MockPlatformSessionProvider::new();
    provider
        .expect_subsystem_name()
        .returning(|| "NULL".to_string());
    provider
}

fn existing_session() -> NamedSession {
    NamedSession {
        name: SessionName::game_session(),
        session_id: None,
        owning_user_name: "Player One".to_string(),
        settings: SessionSettings::presence_defaults(),
    }
}

#[test]
fn create_without_provider_is_rejected_and_state_stays_idle() {
    let coordinator = coordinator_with(signed_in_player());

    let result = coordinator.request_create_session();

    assert_eq!(result, Err(SessionError::ProviderUnavailable));
    assert_eq!(coordinator.state(), SessionRequestState::Idle);
    assert!(coordinator.in_flight().is_empty());
}

#[test]
fn find_without_provider_is_rejected() {
    let coordinator = coordinator_with(signed_in_player());

    assert_eq!(
        coordinator.request_find_sessions(),
        Err(SessionError::ProviderUnavailable)
    );
    assert_eq!(coordinator.search_state(), SessionRequestState::Idle);
}

#[test]
fn create_without_identity_is_rejected_before_touching_provider() {
    let mut player = MockLocalPlayerPort::new();
    player.expect_preferred_unique_net_id().returning(|| None);
    let coordinator = coordinator_with(Arc::new(player));

    let mut provider = provider_base();
    provider.expect_named_session().never();
    provider.expect_create_session().never();
    coordinator.attach_provider(Arc::new(provider));

    assert_eq!(
        coordinator.request_create_session(),
        Err(SessionError::NoLocalIdentity)
    );
    assert_eq!(coordinator.state(), SessionRequestState::Idle);
}

#[test]
fn existing_session_is_destroyed_once_before_create() {
    let coordinator = coordinator_with(signed_in_player());
    let mut seq = Sequence::new();
    let mut provider = provider_base();

    provider
        .expect_named_session()
        .times(1)
        .returning(|_| Some(existing_session()));
    provider
        .expect_destroy_session()
        .with(eq(SessionName::game_session()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    provider
        .expect_add_on_create_session_complete()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| DelegateHandle::new());
    provider
        .expect_create_session()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));
    coordinator.attach_provider(Arc::new(provider));

    coordinator.request_create_session().unwrap();

    assert_eq!(coordinator.state(), SessionRequestState::Creating);
    assert_eq!(coordinator.in_flight(), vec![RequestKind::Create]);
}

#[test]
fn second_create_while_pending_is_busy() {
    let coordinator = coordinator_with(signed_in_player());
    let mut provider = provider_base();
    provider.expect_named_session().returning(|_| None);
    provider
        .expect_add_on_create_session_complete()
        .times(1)
        .returning(|_| DelegateHandle::new());
    provider
        .expect_create_session()
        .times(1)
        .returning(|_, _, _| Ok(()));
    coordinator.attach_provider(Arc::new(provider));

    coordinator.request_create_session().unwrap();
    let second = coordinator.request_create_session();

    assert_eq!(second, Err(SessionError::Busy(RequestKind::Create)));
    assert_eq!(coordinator.state(), SessionRequestState::Creating);
}

#[test]
fn rejected_submit_fails_the_request_and_clears_its_delegate() {
    let coordinator = coordinator_with(signed_in_player());
    let handle = DelegateHandle::new();
    let mut provider = provider_base();
    provider.expect_named_session().returning(|_| None);
    provider
        .expect_add_on_create_session_complete()
        .returning(move |_| handle);
    provider
        .expect_create_session()
        .returning(|_, _, _| Err(anyhow::anyhow!("offline")));
    provider
        .expect_clear_on_create_session_complete()
        .with(eq(handle))
        .times(1)
        .return_const(());
    coordinator.attach_provider(Arc::new(provider));

    let result = coordinator.request_create_session();

    assert!(result.is_ok());
    assert_eq!(coordinator.state(), SessionRequestState::Failed);
    assert_eq!(coordinator.current_session_name(), None);
    assert_eq!(coordinator.last_error(), Some(SessionError::CreateFailed));
    assert!(coordinator.in_flight().is_empty());
}

#[test]
fn create_completion_exposes_name_and_releases_delegate_once() {
    let coordinator = coordinator_with(signed_in_player());
    let captured: Arc<Mutex<Option<CreateSessionCompleteFn>>> = Arc::new(Mutex::new(None));
    let handle = DelegateHandle::new();

    let mut provider = provider_base();
    provider.expect_named_session().returning(|_| None);
    let slot = Arc::clone(&captured);
    provider
        .expect_add_on_create_session_complete()
        .returning(move |callback| {
            *slot.lock().unwrap() = Some(callback);
            handle
        });
    provider
        .expect_create_session()
        .returning(|_, _, _| Ok(()));
    provider
        .expect_clear_on_create_session_complete()
        .with(eq(handle))
        .times(1)
        .return_const(());
    coordinator.attach_provider(Arc::new(provider));

    let mut events = coordinator.subscribe();
    coordinator.request_create_session().unwrap();

    let callback = captured.lock().unwrap().take().unwrap();
    callback(&SessionName::game_session(), true);
    // A duplicate completion must not resurrect or re-release anything.
    callback(&SessionName::game_session(), true);

    assert_eq!(coordinator.state(), SessionRequestState::Created);
    assert_eq!(
        coordinator.current_session_name(),
        Some(SessionName::game_session())
    );

    let mut received = Vec::new();
    while let Ok(Some(event)) = events.try_next() {
        received.push(event);
    }
    assert_eq!(
        received,
        vec![
            SessionEvent::StateChanged {
                kind: RequestKind::Create,
                state: SessionRequestState::Creating,
            },
            SessionEvent::StateChanged {
                kind: RequestKind::Create,
                state: SessionRequestState::Created,
            },
            SessionEvent::SessionCreated {
                name: SessionName::game_session(),
            },
        ]
    );
}

#[test]
fn completion_for_another_session_name_is_ignored() {
    let coordinator = coordinator_with(signed_in_player());
    let captured: Arc<Mutex<Option<CreateSessionCompleteFn>>> = Arc::new(Mutex::new(None));

    let mut provider = provider_base();
    provider.expect_named_session().returning(|_| None);
    let slot = Arc::clone(&captured);
    provider
        .expect_add_on_create_session_complete()
        .returning(move |callback| {
            *slot.lock().unwrap() = Some(callback);
            DelegateHandle::new()
        });
    provider
        .expect_create_session()
        .returning(|_, _, _| Ok(()));
    provider.expect_clear_on_create_session_complete().never();
    coordinator.attach_provider(Arc::new(provider));

    coordinator.request_create_session().unwrap();
    let callback = captured.lock().unwrap().take().unwrap();
    callback(&SessionName::new("SomeoneElse").unwrap(), true);

    assert_eq!(coordinator.state(), SessionRequestState::Creating);
    assert_eq!(coordinator.current_session_name(), None);
}

#[test]
fn join_before_any_search_is_rejected() {
    let coordinator = coordinator_with(signed_in_player());
    let mut provider = provider_base();
    provider.expect_join_session().never();
    coordinator.attach_provider(Arc::new(provider));

    assert_eq!(
        coordinator.request_join_session(0),
        Err(SessionError::NotSearched)
    );
    assert_eq!(coordinator.join_state(), JoinRequestState::Idle);
}

#[test]
fn destroy_with_nothing_to_destroy_is_a_no_op() {
    let coordinator = coordinator_with(signed_in_player());
    let mut provider = provider_base();
    provider.expect_named_session().returning(|_| None);
    provider.expect_destroy_session().never();
    provider.expect_add_on_destroy_session_complete().never();
    coordinator.attach_provider(Arc::new(provider));

    assert_eq!(coordinator.request_destroy_session(), Ok(()));
    assert!(coordinator.in_flight().is_empty());
}

#[test]
fn attach_provider_announces_subsystem() {
    let coordinator = coordinator_with(signed_in_player());
    let mut events = coordinator.subscribe();

    coordinator.attach_provider(Arc::new(provider_base()));

    assert!(coordinator.has_provider());
    assert_eq!(
        events.try_next().unwrap(),
        Some(SessionEvent::ProviderFound {
            subsystem: "NULL".to_string()
        })
    );
}
