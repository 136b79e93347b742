//! Local player adapter backed by fixed values.

use steamsesh_domain::LocalIdentity;
use steamsesh_ports::LocalPlayerPort;

/// A local player whose identity never changes for the lifetime of the
/// process. Used by the host, where the player "signs in" from configuration.
#[derive(Debug, Clone)]
pub struct StaticLocalPlayer {
    identity: Option<LocalIdentity>,
    display_name: String,
}

impl StaticLocalPlayer {
    /// Signed-in player; the identity is derived from the display name.
    pub fn signed_in(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            identity: Some(LocalIdentity::new(format!("local:{display_name}"))),
            display_name,
        }
    }

    pub fn with_identity(identity: LocalIdentity, display_name: impl Into<String>) -> Self {
        Self {
            identity: Some(identity),
            display_name: display_name.into(),
        }
    }

    /// A player with no network identity. Every request is rejected.
    pub fn signed_out(display_name: impl Into<String>) -> Self {
        Self {
            identity: None,
            display_name: display_name.into(),
        }
    }
}

impl LocalPlayerPort for StaticLocalPlayer {
    fn preferred_unique_net_id(&self) -> Option<LocalIdentity> {
        self.identity.clone()
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }
}
