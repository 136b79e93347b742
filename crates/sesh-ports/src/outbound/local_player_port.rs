//! Local Player Port - the host-supplied identity of the requesting player.

use steamsesh_domain::LocalIdentity;

/// Identity of the local player on whose behalf requests are submitted.
///
/// Supplied by the gameplay host; the coordinator never fabricates one.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait LocalPlayerPort: Send + Sync {
    /// The player's preferred network identity, or `None` when the player is
    /// not signed in to the platform.
    fn preferred_unique_net_id(&self) -> Option<LocalIdentity>;

    /// Display name used when this player owns a session.
    fn display_name(&self) -> String;
}
