//! Port definitions for the session coordinator.
//!
//! Outbound ports are what the coordinator consumes: the platform session
//! provider, the local player, and a clock. Inbound types are what it hands
//! back to the gameplay host.

pub mod inbound;
pub mod outbound;

pub use inbound::{Notice, NoticeLevel, SessionEvent};
pub use outbound::{
    ClockPort, CreateSessionCompleteFn, DestroySessionCompleteFn, FindSessionsCompleteFn,
    JoinSessionCompleteFn, LocalPlayerPort, NamedSession, PlatformSessionProvider,
    ProviderSessionRecord,
};

#[cfg(any(test, feature = "testing"))]
pub use outbound::{MockClockPort, MockLocalPlayerPort, MockPlatformSessionProvider};
