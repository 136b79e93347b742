//! Loopback online subsystem: every player lives in this process.

mod provider;
mod registry;

pub use provider::{LoopbackConfig, LoopbackSessionProvider, LOOPBACK_SUBSYSTEM};
pub use registry::{AdvertisedSession, LoopbackError, LoopbackRegistry};
