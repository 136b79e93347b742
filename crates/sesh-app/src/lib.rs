//! Session lifecycle coordination.
//!
//! `SessionCoordinator` issues create/find/join/destroy requests to a
//! platform session provider, tracks one request slot per kind, and publishes
//! every outcome as observable state and `SessionEvent`s.

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::{CoordinatorConfig, DestroyPolicy};
pub use coordinator::{CoordinatorSnapshot, JoinedSession, SessionCoordinator};
pub use error::SessionError;
