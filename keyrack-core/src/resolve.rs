//! Credential resolution across every registered provider.
//!
//! This module provides:
//! - [`CredentialsResolver`] - Fans a lookup out to each provider and merges the results
//! - [`ResolverConfig`] - Tunables for the resolver, loadable from configuration files
//! - [`FailurePolicy`] - What to do when a provider fails for a reason other than being unavailable
//! - [`ResolveError`] - Errors surfaced to callers
//!
//! # Defaults
//!
//! A missing group means the root of the container tree. A missing identity
//! means [`Identity::System`]. A source whose providers cannot be fetched is
//! treated as having no providers.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use keyrack_core::{
//!     CredentialsResolver, MemoryProvider, ProviderRegistry, Secret, UsernamePassword,
//! };
//!
//! let registry = ProviderRegistry::new();
//! let system = MemoryProvider::new("system");
//! system.add_to_root(UsernamePassword::new("deploy", "bot", Secret::new("pw")));
//! registry.register(Arc::new(system));
//!
//! let resolver = CredentialsResolver::default();
//! let found = resolver.lookup::<UsernamePassword>(&registry).unwrap();
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].username(), "bot");
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::credentials::{CredentialKind, CredentialType, downcast_credentials};
use crate::model::{Identity, Item, ItemGroup, ModelObject};
use crate::provider::{CredentialList, CredentialsProvider, ProviderError};
use crate::registry::ProviderSource;
use crate::scope::ScopeSet;

/// Error type for credential resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No credential kind was given.
    #[error("credential kind must be specified")]
    MissingKind,

    /// The credential kind id is not registered.
    #[error("unknown credential kind: {id}")]
    UnknownKind { id: String },

    /// A provider failed and the failure policy is to propagate.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// How the resolver treats provider failures other than
/// [`ProviderError::Unavailable`].
///
/// Unavailable providers are always skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole lookup with [`ResolveError::Provider`].
    #[default]
    Propagate,

    /// Log the failure and carry on with the remaining providers.
    Isolate,
}

/// Configuration for credential resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Policy for provider failures (default: propagate).
    pub failure_policy: FailurePolicy,

    /// Log dropped credentials of the wrong kind at `warn` instead of `debug`
    /// (default: true).
    pub warn_on_kind_mismatch: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Propagate,
            warn_on_kind_mismatch: true,
        }
    }
}

/// Aggregates credentials and scopes from every provider of a source.
///
/// The resolver holds no state besides its configuration. Each call reads a
/// fresh provider snapshot from the source it is given, so one resolver can
/// serve any number of concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct CredentialsResolver {
    config: ResolverConfig,
}

impl CredentialsResolver {
    /// Create a resolver with the given configuration.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// All credentials of type `C` available to the system identity in the root.
    pub fn lookup<C: CredentialType>(
        &self,
        source: &dyn ProviderSource,
    ) -> Result<Vec<Arc<C>>, ResolveError> {
        self.lookup_for_item(source, None, Some(&Identity::System))
    }

    /// All credentials of type `C` available to `identity` in the root.
    pub fn lookup_as<C: CredentialType>(
        &self,
        source: &dyn ProviderSource,
        identity: Option<&Identity>,
    ) -> Result<Vec<Arc<C>>, ResolveError> {
        self.lookup_in_group(source, None, identity)
    }

    /// All credentials of type `C` available to `identity` for items in `group`.
    pub fn lookup_in_group<C: CredentialType>(
        &self,
        source: &dyn ProviderSource,
        group: Option<&ItemGroup>,
        identity: Option<&Identity>,
    ) -> Result<Vec<Arc<C>>, ResolveError> {
        let found = self.lookup_kind(source, Some(&CredentialKind::of::<C>()), group, identity)?;
        Ok(narrow(found))
    }

    /// All credentials of type `C` available to `identity` for `item`.
    ///
    /// Each provider's item-level lookup is used, so providers with
    /// item-specific rules apply them here.
    pub fn lookup_for_item<C: CredentialType>(
        &self,
        source: &dyn ProviderSource,
        item: Option<&Item>,
        identity: Option<&Identity>,
    ) -> Result<Vec<Arc<C>>, ResolveError> {
        let found =
            self.lookup_kind_for_item(source, Some(&CredentialKind::of::<C>()), item, identity)?;
        Ok(narrow(found))
    }

    /// Untyped group lookup.
    ///
    /// Fails with [`ResolveError::MissingKind`] when `kind` is `None`.
    pub fn lookup_kind(
        &self,
        source: &dyn ProviderSource,
        kind: Option<&CredentialKind>,
        group: Option<&ItemGroup>,
        identity: Option<&Identity>,
    ) -> Result<CredentialList, ResolveError> {
        let kind = kind.ok_or(ResolveError::MissingKind)?;

        let root;
        let group = match group {
            Some(group) => group,
            None => {
                root = source.root();
                root.as_ref()
            }
        };
        let system = Identity::System;
        let identity = identity.unwrap_or(&system);

        let Some(providers) = snapshot(source) else {
            return Ok(Vec::new());
        };

        debug!(kind = %kind, group = %group, identity = %identity, "looking up credentials");
        self.collect(&providers, kind, |provider| {
            provider.credentials_in_group(kind, group, identity)
        })
    }

    /// Untyped item lookup.
    ///
    /// A missing item falls back to the group lookup at the root.
    pub fn lookup_kind_for_item(
        &self,
        source: &dyn ProviderSource,
        kind: Option<&CredentialKind>,
        item: Option<&Item>,
        identity: Option<&Identity>,
    ) -> Result<CredentialList, ResolveError> {
        let kind = kind.ok_or(ResolveError::MissingKind)?;
        let Some(item) = item else {
            return self.lookup_kind(source, Some(kind), None, identity);
        };

        let system = Identity::System;
        let identity = identity.unwrap_or(&system);

        let Some(providers) = snapshot(source) else {
            return Ok(Vec::new());
        };

        debug!(kind = %kind, item = %item, identity = %identity, "looking up item credentials");
        self.collect(&providers, kind, |provider| {
            provider.credentials_for_item(kind, item, identity)
        })
    }

    /// Merge every provider's scope opinion about `object`.
    ///
    /// Returns `None` when no provider has an opinion. A source whose
    /// providers cannot be fetched yields an empty set.
    pub fn resolve_scopes(
        &self,
        source: &dyn ProviderSource,
        object: ModelObject<'_>,
    ) -> Result<Option<ScopeSet>, ResolveError> {
        let providers = match source.providers() {
            Ok(providers) => providers,
            Err(e) => {
                debug!("providers unavailable, no scopes for {}: {}", object, e);
                return Ok(Some(ScopeSet::new()));
            }
        };

        let mut result: Option<ScopeSet> = None;
        for provider in &providers {
            let outcome = provider.scopes(object);
            if let Some(Some(scopes)) = self.isolate(provider.as_ref(), outcome)? {
                trace!(provider = provider.name(), count = scopes.len(), "provider scopes");
                result.get_or_insert_with(ScopeSet::new).extend(scopes);
            }
        }
        Ok(result)
    }

    fn collect<F>(
        &self,
        providers: &[Arc<dyn CredentialsProvider>],
        kind: &CredentialKind,
        call: F,
    ) -> Result<CredentialList, ResolveError>
    where
        F: Fn(&dyn CredentialsProvider) -> Result<CredentialList, ProviderError>,
    {
        let mut result = Vec::new();
        for provider in providers {
            let Some(found) = self.isolate(provider.as_ref(), call(provider.as_ref()))? else {
                continue;
            };
            trace!(provider = provider.name(), count = found.len(), "provider credentials");

            for credentials in found {
                if kind.accepts(credentials.as_ref()) {
                    result.push(credentials);
                } else if self.config.warn_on_kind_mismatch {
                    warn!(
                        provider = provider.name(),
                        expected = %kind,
                        actual = %credentials.kind(),
                        id = credentials.id(),
                        "dropping credentials of the wrong kind"
                    );
                } else {
                    debug!(
                        provider = provider.name(),
                        expected = %kind,
                        actual = %credentials.kind(),
                        "dropping credentials of the wrong kind"
                    );
                }
            }
        }
        Ok(result)
    }

    /// Apply the failure policy to one provider call.
    ///
    /// `Ok(None)` means the provider is skipped.
    fn isolate<T>(
        &self,
        provider: &dyn CredentialsProvider,
        outcome: Result<T, ProviderError>,
    ) -> Result<Option<T>, ResolveError> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_unavailable() => {
                debug!(provider = provider.name(), "skipping provider: {}", e);
                Ok(None)
            }
            Err(e) => match self.config.failure_policy {
                FailurePolicy::Propagate => Err(e.into()),
                FailurePolicy::Isolate => {
                    warn!(provider = provider.name(), "ignoring provider failure: {}", e);
                    Ok(None)
                }
            },
        }
    }
}

fn snapshot(source: &dyn ProviderSource) -> Option<Vec<Arc<dyn CredentialsProvider>>> {
    match source.providers() {
        Ok(providers) => Some(providers),
        Err(e) => {
            debug!("providers unavailable, returning no credentials: {}", e);
            None
        }
    }
}

fn narrow<C: CredentialType>(found: CredentialList) -> Vec<Arc<C>> {
    found.into_iter().filter_map(downcast_credentials::<C>).collect()
}
