//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing the coordinator to drive a platform's online services without
//! depending on a concrete subsystem.

pub mod clock_port;
pub mod local_player_port;
pub mod platform_session_provider;

pub use clock_port::ClockPort;
pub use local_player_port::LocalPlayerPort;
pub use platform_session_provider::{
    CreateSessionCompleteFn, DestroySessionCompleteFn, FindSessionsCompleteFn,
    JoinSessionCompleteFn, NamedSession, PlatformSessionProvider, ProviderSessionRecord,
};

#[cfg(any(test, feature = "testing"))]
pub use clock_port::MockClockPort;
#[cfg(any(test, feature = "testing"))]
pub use local_player_port::MockLocalPlayerPort;
#[cfg(any(test, feature = "testing"))]
pub use platform_session_provider::MockPlatformSessionProvider;
