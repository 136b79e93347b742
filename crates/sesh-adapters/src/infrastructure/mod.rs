//! Infrastructure layer - External adapters

pub mod clock;
pub mod local_player;
pub mod loopback;

mod delegates;

// Test-only infrastructure fakes.
// Available for integration testing from other crates via the `testing` feature
#[cfg(any(test, feature = "testing"))]
pub mod testing;
