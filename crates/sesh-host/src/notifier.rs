//! On-screen notices.
//!
//! Stands in for the HUD: every coordinator event is rendered to one or more
//! console lines.

use futures_channel::mpsc::UnboundedReceiver;
use futures_util::StreamExt;
use steamsesh_app::CoordinatorSnapshot;
use steamsesh_ports::{Notice, NoticeLevel, SessionEvent};
use tokio_util::sync::CancellationToken;

pub fn render(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => format!("[session] {}", notice.text),
        NoticeLevel::Listing => format!("    {}", notice.text),
        NoticeLevel::Error => format!("[session!] {}", notice.text),
    }
}

pub fn render_snapshot(snapshot: &CoordinatorSnapshot) -> Vec<String> {
    let mut lines = vec![
        format!("create: {}", snapshot.create_state),
        format!("search: {}", snapshot.search_state),
        format!("join:   {}", snapshot.join_state),
    ];
    if let Some(descriptor) = &snapshot.descriptor {
        let settings = descriptor.settings;
        lines.push(format!(
            "session: {} ({} slots{}) requested {}",
            descriptor.name,
            settings.public_connections(),
            if settings.flags().is_lan_match { ", LAN" } else { "" },
            descriptor.requested_at.format("%H:%M:%S"),
        ));
    }
    if let Some(name) = &snapshot.current_session {
        lines.push(format!("hosting: {name}"));
    }
    if let Some(joined) = &snapshot.joined_session {
        lines.push(format!(
            "joined: {} ({}) at {}",
            joined.name, joined.owning_user_name, joined.connect_address
        ));
    }
    for (index, result) in snapshot.search_results.iter().enumerate() {
        lines.push(format!(
            "  [{index}] Id: {}, User: {}",
            result.session_id(),
            result.owning_user_name()
        ));
    }
    if let Some(error) = &snapshot.last_error {
        lines.push(format!("last error: {error}"));
    }
    lines
}

/// Print notices until the event stream closes or `cancel` fires.
pub async fn run(mut events: UnboundedReceiver<SessionEvent>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.next() => {
                let Some(event) = event else { break };
                for notice in event.notices() {
                    println!("{}", render(&notice));
                }
            }
        }
    }
    tracing::debug!("Notifier stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use steamsesh_domain::{
        JoinRequestState, SessionDescriptor, SessionName, SessionRequestState,
        SessionSearchResult, SessionSettings,
    };

    #[test]
    fn levels_get_distinct_prefixes() {
        let event = SessionEvent::CreateFailed {
            name: SessionName::game_session(),
        };
        let lines: Vec<String> = event.notices().iter().map(render).collect();
        assert_eq!(lines, vec!["[session!] Failed to create session!"]);
    }

    #[test]
    fn snapshot_lists_results_with_indices() {
        let snapshot = CoordinatorSnapshot {
            create_state: SessionRequestState::Idle,
            search_state: SessionRequestState::SearchComplete,
            join_state: JoinRequestState::Idle,
            descriptor: None,
            current_session: None,
            search_results: vec![SessionSearchResult::new(
                "A".into(),
                "alice",
                Default::default(),
            )],
            joined_session: None,
            last_error: None,
        };
        let lines = render_snapshot(&snapshot);
        assert!(lines.contains(&"  [0] Id: A, User: alice".to_string()));
        assert!(lines.contains(&"search: search_complete".to_string()));
    }

    #[test]
    fn snapshot_describes_the_requested_session() {
        let snapshot = CoordinatorSnapshot {
            create_state: SessionRequestState::Created,
            search_state: SessionRequestState::Idle,
            join_state: JoinRequestState::Idle,
            descriptor: Some(SessionDescriptor::new(
                SessionName::game_session(),
                SessionSettings::presence_defaults().with_lan(true),
                Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 5).unwrap(),
            )),
            current_session: Some(SessionName::game_session()),
            search_results: Vec::new(),
            joined_session: None,
            last_error: None,
        };
        let lines = render_snapshot(&snapshot);
        assert!(lines.contains(&"session: GameSession (4 slots, LAN) requested 12:30:05".to_string()));
        assert!(lines.contains(&"hosting: GameSession".to_string()));
    }
}
