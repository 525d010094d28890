//! The credentials provider contract.
//!
//! This module provides:
//! - [`CredentialsProvider`] - Trait implemented by every pluggable credential source
//! - [`ProviderError`] - Failures a provider may report
//! - [`CredentialList`] - The list type providers return
//!
//! Providers are independent units. Any number of them can be registered
//! and the resolver fans out to each in registration order.

use std::sync::Arc;
use thiserror::Error;

use crate::credentials::{CredentialKind, Credentials};
use crate::model::{Identity, Item, ItemGroup, ModelObject};
use crate::scope::ScopeSet;

/// Credentials returned by a single provider call.
pub type CredentialList = Vec<Arc<dyn Credentials>>;

/// Error type for provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider's backing integration is not present.
    ///
    /// The resolver skips the provider and carries on with the others.
    #[error("provider {provider} unavailable: {reason}")]
    Unavailable { provider: String, reason: String },

    /// The provider failed for any other reason.
    #[error("provider {provider} failed: {message}")]
    Failed { provider: String, message: String },
}

impl ProviderError {
    /// Build an [`Unavailable`](ProviderError::Unavailable) error.
    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`Failed`](ProviderError::Failed) error.
    pub fn failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this is the "skip me" signal.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Name of the provider that raised the error.
    pub fn provider(&self) -> &str {
        match self {
            Self::Unavailable { provider, .. } | Self::Failed { provider, .. } => provider,
        }
    }
}

/// A pluggable source of credentials.
///
/// Implementations return only credentials of the requested kind
/// (see [`CredentialKind::accepts`]). The resolver drops anything else,
/// but emitting the right kind is the provider's job.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use keyrack_core::{
///     CredentialKind, Credentials, CredentialsProvider, Identity, ItemGroup, ProviderError, Secret,
///     SecretText,
/// };
/// use keyrack_core::provider::CredentialList;
///
/// struct EnvProvider;
///
/// impl CredentialsProvider for EnvProvider {
///     fn name(&self) -> &str {
///         "env"
///     }
///
///     fn credentials_in_group(
///         &self,
///         kind: &CredentialKind,
///         _group: &ItemGroup,
///         _identity: &Identity,
///     ) -> Result<CredentialList, ProviderError> {
///         let token: Arc<dyn Credentials> =
///             Arc::new(SecretText::new("ci-token", Secret::new("t0k3n")));
///         if kind.accepts(token.as_ref()) {
///             Ok(vec![token])
///         } else {
///             Ok(Vec::new())
///         }
///     }
/// }
/// ```
pub trait CredentialsProvider: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Every credential of `kind` visible to `identity` for items in `group`.
    ///
    /// Repeated identical calls return the same list in the same order
    /// unless the provider's own state changed.
    fn credentials_in_group(
        &self,
        kind: &CredentialKind,
        group: &ItemGroup,
        identity: &Identity,
    ) -> Result<CredentialList, ProviderError>;

    /// Every credential of `kind` visible to `identity` for `item`.
    ///
    /// Defaults to the lookup for the item's parent group. Override to apply
    /// item-specific visibility.
    fn credentials_for_item(
        &self,
        kind: &CredentialKind,
        item: &Item,
        identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        self.credentials_in_group(kind, item.parent(), identity)
    }

    /// Scopes that make sense for credentials stored inside `object`.
    ///
    /// `None` means no opinion: the caller should consider the object's
    /// container instead. `Some` of an empty set is a real opinion.
    fn scopes(&self, _object: ModelObject<'_>) -> Result<Option<ScopeSet>, ProviderError> {
        Ok(None)
    }
}
