//! Test-only infrastructure fakes.
//!
//! These implement outbound ports for coordinator tests, letting a test
//! decide exactly when and how each provider request completes.

pub mod fake_session_provider;
pub mod manual_clock;

pub use fake_session_provider::{FakeSessionProvider, ProviderCall};
pub use manual_clock::ManualClock;
