//! Built-in credential providers.
//!
//! This module provides:
//! - [`MemoryProvider`] - In-memory credentials attached to groups and items
//! - [`UserProvider`] - In-memory credentials private to individual users
//! - [`UnavailableProvider`] - Stand-in for an integration that is not installed
//!
//! None of these persist anything; data is lost when the process exits.

use crate::credentials::CredentialKind;
use crate::model::{Identity, ItemGroup, ModelObject};
use crate::provider::{CredentialList, CredentialsProvider, ProviderError};
use crate::scope::ScopeSet;

mod memory;
mod user;

pub use memory::MemoryProvider;
pub use user::UserProvider;

/// A provider whose backing integration is missing.
///
/// Every call reports [`ProviderError::Unavailable`], so the resolver skips it.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    name: String,
    reason: String,
}

impl UnavailableProvider {
    /// Create a provider that is always unavailable for `reason`.
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }

    fn error(&self) -> ProviderError {
        ProviderError::unavailable(&self.name, &self.reason)
    }
}

impl CredentialsProvider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn credentials_in_group(
        &self,
        _kind: &CredentialKind,
        _group: &ItemGroup,
        _identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        Err(self.error())
    }

    fn scopes(&self, _object: ModelObject<'_>) -> Result<Option<ScopeSet>, ProviderError> {
        Err(self.error())
    }
}
