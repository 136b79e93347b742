//! Inbound types - what the coordinator reports to the gameplay host.

pub mod session_events;

pub use session_events::{Notice, NoticeLevel, SessionEvent};
