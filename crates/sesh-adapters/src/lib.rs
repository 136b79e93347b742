//! Adapters for the session coordinator's outbound ports.

pub mod infrastructure;

pub use infrastructure::clock::SystemClock;
pub use infrastructure::local_player::StaticLocalPlayer;
pub use infrastructure::loopback::{
    AdvertisedSession, LoopbackConfig, LoopbackError, LoopbackRegistry, LoopbackSessionProvider,
    LOOPBACK_SUBSYSTEM,
};
