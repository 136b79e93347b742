//! Identifier types.
//!
//! `DelegateHandle` and `RequestId` are generated locally (UUID-backed).
//! `SessionId` and `LocalIdentity` are opaque tokens handed to us by the
//! platform provider or the host and are never interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

macro_rules! define_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

// Registration token returned by a provider when a completion delegate is added.
define_id!(DelegateHandle);

// Correlates one submitted request with the completion that answers it.
define_id!(RequestId);

define_token!(
    /// Provider-assigned session identifier.
    SessionId
);

define_token!(
    /// Opaque token naming the requesting local player to the provider.
    LocalIdentity
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
        assert_ne!(DelegateHandle::new(), DelegateHandle::new());
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let id = SessionId::new("steam:1234");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"steam:1234\"");
        assert_eq!(id.to_string(), "steam:1234");
    }
}
