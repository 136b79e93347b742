//! Session search parameters and results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DomainError;
use crate::ids::SessionId;

/// Upper bound on results requested from a provider. Deliberately large: a
/// shared test app id sees sessions from many unrelated games.
pub const DEFAULT_MAX_SEARCH_RESULTS: u32 = 10_000;

/// Query key restricting a search to presence-discoverable sessions.
pub const SEARCH_PRESENCE: &str = "PRESENCESEARCH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComparison {
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QueryValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl QueryValue {
    /// Compare against a provider-side attribute rendered as text.
    pub fn matches_text(&self, attribute: &str) -> bool {
        match self {
            QueryValue::Bool(b) => attribute.parse::<bool>().map(|v| v == *b).unwrap_or(false),
            QueryValue::Int(i) => attribute.parse::<i64>().map(|v| v == *i).unwrap_or(false),
            QueryValue::Text(s) => s == attribute,
        }
    }
}

/// A single key/value filter of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySetting {
    pub key: String,
    pub value: QueryValue,
    pub comparison: QueryComparison,
}

impl QuerySetting {
    pub fn equals(key: impl Into<String>, value: QueryValue) -> Self {
        Self {
            key: key.into(),
            value,
            comparison: QueryComparison::Equals,
        }
    }

    /// Evaluate this filter against a provider attribute (`None` when absent).
    pub fn accepts(&self, attribute: Option<&str>) -> bool {
        let matched = attribute.is_some_and(|a| self.value.matches_text(a));
        match self.comparison {
            QueryComparison::Equals => matched,
            QueryComparison::NotEquals => !matched,
        }
    }
}

/// What a client asks the provider to look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSearch {
    pub max_results: u32,
    pub is_lan_query: bool,
    pub query_settings: Vec<QuerySetting>,
}

impl SessionSearch {
    /// Internet search for presence-discoverable sessions.
    pub fn presence(max_results: u32) -> Result<Self, DomainError> {
        if max_results == 0 {
            return Err(DomainError::validation(
                "Search must allow at least one result",
            ));
        }
        Ok(Self {
            max_results,
            is_lan_query: false,
            query_settings: vec![QuerySetting::equals(
                SEARCH_PRESENCE,
                QueryValue::Bool(true),
            )],
        })
    }

    pub fn with_lan(mut self, is_lan_query: bool) -> Self {
        self.is_lan_query = is_lan_query;
        self
    }

    /// True when the search filters on presence.
    pub fn is_presence_query(&self) -> bool {
        self.query_settings.iter().any(|q| {
            q.key == SEARCH_PRESENCE
                && q.comparison == QueryComparison::Equals
                && q.value == QueryValue::Bool(true)
        })
    }
}

impl Default for SessionSearch {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_SEARCH_RESULTS,
            is_lan_query: false,
            query_settings: vec![QuerySetting::equals(
                SEARCH_PRESENCE,
                QueryValue::Bool(true),
            )],
        }
    }
}

/// One session found by a completed search. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSearchResult {
    session_id: SessionId,
    owning_user_name: String,
    /// Provider-specific attributes, carried through untouched.
    metadata: BTreeMap<String, String>,
}

impl SessionSearchResult {
    pub fn new(
        session_id: SessionId,
        owning_user_name: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            session_id,
            owning_user_name: owning_user_name.into(),
            metadata,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn owning_user_name(&self) -> &str {
        &self.owning_user_name
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_search_is_internet_presence_query() {
        let search = SessionSearch::default();
        assert_eq!(search.max_results, 10_000);
        assert!(!search.is_lan_query);
        assert!(search.is_presence_query());
    }

    #[test]
    fn zero_max_results_is_rejected() {
        assert!(SessionSearch::presence(0).is_err());
        assert_eq!(SessionSearch::presence(25).unwrap().max_results, 25);
    }

    #[test]
    fn equality_filter_requires_matching_attribute() {
        let filter = QuerySetting::equals(SEARCH_PRESENCE, QueryValue::Bool(true));
        assert!(filter.accepts(Some("true")));
        assert!(!filter.accepts(Some("false")));
        assert!(!filter.accepts(None));
    }

    #[test]
    fn not_equals_filter_accepts_missing_attribute() {
        let filter = QuerySetting {
            key: "MAPNAME".into(),
            value: QueryValue::Text("Lobby".into()),
            comparison: QueryComparison::NotEquals,
        };
        assert!(filter.accepts(None));
        assert!(filter.accepts(Some("Arena")));
        assert!(!filter.accepts(Some("Lobby")));
    }
}
