//! Settings a session is created with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::names::SessionName;

/// Player slots offered by a newly created session.
pub const DEFAULT_PUBLIC_CONNECTIONS: u32 = 4;

/// Behavioural flags attached to a session at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags {
    /// LAN match instead of an internet match
    pub is_lan_match: bool,
    /// Players may join after the match has started
    pub allow_join_in_progress: bool,
    /// Joining through presence (same region / friends) is allowed
    pub allow_join_via_presence: bool,
    /// The provider may advertise the session to other players
    pub should_advertise: bool,
    /// The session is discoverable through presence searches
    pub uses_presence: bool,
    /// Prefer the platform lobby API when it exists
    pub use_lobbies_if_available: bool,
}

impl SessionFlags {
    /// Presence-based internet play: advertised, joinable in progress, lobby
    /// preferred.
    pub fn presence_internet() -> Self {
        Self {
            is_lan_match: false,
            allow_join_in_progress: true,
            allow_join_via_presence: true,
            should_advertise: true,
            uses_presence: true,
            use_lobbies_if_available: true,
        }
    }
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self::presence_internet()
    }
}

/// Capacity plus flags, validated so that capacity is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSessionSettings")]
pub struct SessionSettings {
    public_connections: u32,
    flags: SessionFlags,
}

#[derive(Deserialize)]
struct RawSessionSettings {
    public_connections: u32,
    flags: SessionFlags,
}

impl TryFrom<RawSessionSettings> for SessionSettings {
    type Error = DomainError;

    fn try_from(raw: RawSessionSettings) -> Result<Self, Self::Error> {
        Self::new(raw.public_connections, raw.flags)
    }
}

impl SessionSettings {
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when `public_connections` is zero.
    pub fn new(public_connections: u32, flags: SessionFlags) -> Result<Self, DomainError> {
        if public_connections == 0 {
            return Err(DomainError::validation(
                "Session capacity must be greater than zero",
            ));
        }
        Ok(Self {
            public_connections,
            flags,
        })
    }

    /// Four public connections over presence-based internet play.
    pub fn presence_defaults() -> Self {
        Self {
            public_connections: DEFAULT_PUBLIC_CONNECTIONS,
            flags: SessionFlags::presence_internet(),
        }
    }

    pub fn public_connections(&self) -> u32 {
        self.public_connections
    }

    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    pub fn with_lan(mut self, is_lan_match: bool) -> Self {
        self.flags.is_lan_match = is_lan_match;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::presence_defaults()
    }
}

/// A named session this coordinator asked a provider to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub name: SessionName,
    pub settings: SessionSettings,
    pub requested_at: DateTime<Utc>,
}

impl SessionDescriptor {
    pub fn new(name: SessionName, settings: SessionSettings, requested_at: DateTime<Utc>) -> Self {
        Self {
            name,
            settings,
            requested_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_defaults_match_internet_play() {
        let settings = SessionSettings::presence_defaults();
        let flags = settings.flags();
        assert_eq!(settings.public_connections(), 4);
        assert!(!flags.is_lan_match);
        assert!(flags.allow_join_in_progress);
        assert!(flags.allow_join_via_presence);
        assert!(flags.should_advertise);
        assert!(flags.uses_presence);
        assert!(flags.use_lobbies_if_available);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = SessionSettings::new(0, SessionFlags::default());
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn deserialization_enforces_capacity() {
        let json = r#"{"public_connections":0,"flags":{"is_lan_match":false,"allow_join_in_progress":true,"allow_join_via_presence":true,"should_advertise":true,"uses_presence":true,"use_lobbies_if_available":true}}"#;
        assert!(serde_json::from_str::<SessionSettings>(json).is_err());

        let json = json.replace("\"public_connections\":0", "\"public_connections\":8");
        let settings: SessionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings.public_connections(), 8);
    }

    #[test]
    fn with_lan_flips_only_the_lan_flag() {
        let settings = SessionSettings::presence_defaults().with_lan(true);
        assert!(settings.flags().is_lan_match);
        assert!(settings.flags().uses_presence);
    }
}
