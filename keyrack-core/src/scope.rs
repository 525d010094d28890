//! Credential usage scopes.
//!
//! A scope tags where a credential may be used. Providers report the scopes
//! that make sense for storing credentials inside an object, and the
//! resolver merges those opinions into a [`ScopeSet`].

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a credential is permitted to be used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsScope {
    /// Usable by anything inside the container and its descendants.
    #[default]
    Global,

    /// Usable only by the container itself, never by child items.
    System,

    /// Private to a single user.
    User,

    /// Provider-defined scope.
    Custom(String),
}

impl CredentialsScope {
    /// Get the scope as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Global => "global",
            Self::System => "system",
            Self::User => "user",
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for CredentialsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CredentialsScope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "global" => Self::Global,
            "system" => Self::System,
            "user" => Self::User,
            _ => Self::Custom(s.to_string()),
        })
    }
}

/// A deduplicated set of scopes that remembers first-insertion order.
pub type ScopeSet = IndexSet<CredentialsScope>;

/// Build a [`ScopeSet`] from any collection of scopes.
///
/// ```
/// use keyrack_core::scope::{scope_set, CredentialsScope};
///
/// let scopes = scope_set([CredentialsScope::Global, CredentialsScope::Global]);
/// assert_eq!(scopes.len(), 1);
/// ```
pub fn scope_set(scopes: impl IntoIterator<Item = CredentialsScope>) -> ScopeSet {
    scopes.into_iter().collect()
}
