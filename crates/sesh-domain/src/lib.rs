//! Core value types for the session lifecycle.
//!
//! Everything here is plain data: names and identifiers, the settings a
//! session is created with, the search a client issues, the records a search
//! produces, and the per-slot request states the coordinator moves through.
//! No I/O and no provider knowledge lives in this crate.

pub mod error;
pub mod ids;
pub mod names;
pub mod search;
pub mod settings;
pub mod state;

pub use error::DomainError;
pub use ids::{DelegateHandle, LocalIdentity, RequestId, SessionId};
pub use names::{SessionName, GAME_SESSION_NAME};
pub use search::{
    QueryComparison, QuerySetting, QueryValue, SessionSearch, SessionSearchResult,
    DEFAULT_MAX_SEARCH_RESULTS, SEARCH_PRESENCE,
};
pub use settings::{SessionDescriptor, SessionFlags, SessionSettings, DEFAULT_PUBLIC_CONNECTIONS};
pub use state::{JoinOutcome, JoinRequestState, RequestKind, SessionRequestState};
