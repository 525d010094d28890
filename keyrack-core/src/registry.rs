//! Provider registry.
//!
//! This module provides:
//! - [`ProviderSource`] - The handle every resolver call reads its providers from
//! - [`ProviderRegistry`] - Ordered, thread-safe collection of providers and descriptors
//! - [`RegistryError`] - Failures fetching the provider collection
//!
//! Registration order is lookup order. Reads take a snapshot so that
//! concurrent registration never disturbs an in-flight lookup.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::credentials::{CredentialDescriptor, SecretText, UsernamePassword};
use crate::model::ItemGroup;
use crate::provider::CredentialsProvider;

/// Error type for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The hosting environment has not finished initialising.
    #[error("provider registry is not ready")]
    NotReady,
}

/// Source of the active providers and the container root.
///
/// Every resolver call takes one of these explicitly instead of reaching
/// for global state.
pub trait ProviderSource: Send + Sync {
    /// Snapshot of the active providers, in lookup order.
    fn providers(&self) -> Result<Vec<Arc<dyn CredentialsProvider>>, RegistryError>;

    /// The root of the container tree.
    fn root(&self) -> Arc<ItemGroup>;
}

/// A fixed provider list paired with a root.
///
/// Useful when the provider set is known up front.
pub struct StaticSource {
    root: Arc<ItemGroup>,
    providers: Vec<Arc<dyn CredentialsProvider>>,
}

impl StaticSource {
    /// Create a source over `providers` rooted at `root`.
    pub fn new(root: Arc<ItemGroup>, providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self { root, providers }
    }
}

impl ProviderSource for StaticSource {
    fn providers(&self) -> Result<Vec<Arc<dyn CredentialsProvider>>, RegistryError> {
        Ok(self.providers.clone())
    }

    fn root(&self) -> Arc<ItemGroup> {
        Arc::clone(&self.root)
    }
}

/// Registry of credential providers and credential descriptors.
///
/// # Thread Safety
///
/// Uses interior mutability via `parking_lot::RwLock`. The lock is held only
/// while a snapshot is cloned, never across provider calls.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use keyrack_core::{MemoryProvider, ProviderRegistry, ProviderSource};
///
/// let registry = ProviderRegistry::new();
/// registry.register(Arc::new(MemoryProvider::new("system")));
///
/// assert_eq!(registry.names(), vec!["system".to_string()]);
/// assert_eq!(registry.providers().unwrap().len(), 1);
/// ```
pub struct ProviderRegistry {
    root: Arc<ItemGroup>,
    ready: AtomicBool,
    providers: RwLock<Vec<Arc<dyn CredentialsProvider>>>,
    descriptors: RwLock<Vec<CredentialDescriptor>>,
}

impl ProviderRegistry {
    /// Create an empty, ready registry with a fresh root.
    pub fn new() -> Self {
        Self::with_root(ItemGroup::root())
    }

    /// Create an empty, ready registry over an existing container tree.
    pub fn with_root(root: Arc<ItemGroup>) -> Self {
        Self {
            root,
            ready: AtomicBool::new(true),
            providers: RwLock::new(Vec::new()),
            descriptors: RwLock::new(Vec::new()),
        }
    }

    /// Create a registry that reports [`RegistryError::NotReady`] until
    /// [`mark_ready`](Self::mark_ready) is called.
    pub fn pending() -> Self {
        let registry = Self::new();
        registry.ready.store(false, Ordering::Release);
        registry
    }

    /// Create a ready registry with the built-in credential descriptors.
    pub fn with_builtin_descriptors() -> Self {
        let registry = Self::new();
        registry.register_descriptor(CredentialDescriptor::of::<UsernamePassword>());
        registry.register_descriptor(CredentialDescriptor::of::<SecretText>());
        registry
    }

    /// Allow lookups to see the registered providers.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Whether the registry is serving lookups.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Append a provider. It is consulted after every provider already registered.
    pub fn register(&self, provider: Arc<dyn CredentialsProvider>) {
        tracing::debug!(provider = provider.name(), "registering credentials provider");
        self.providers.write().push(provider);
    }

    /// Insert a provider at `index`, shifting later providers back.
    ///
    /// An index past the end appends.
    pub fn insert(&self, index: usize, provider: Arc<dyn CredentialsProvider>) {
        let mut providers = self.providers.write();
        let index = index.min(providers.len());
        providers.insert(index, provider);
    }

    /// Remove every provider named `name`.
    ///
    /// Returns the number of providers removed.
    pub fn remove(&self, name: &str) -> usize {
        let mut providers = self.providers.write();
        let before = providers.len();
        providers.retain(|p| p.name() != name);
        before - providers.len()
    }

    /// Check if a provider with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.read().iter().any(|p| p.name() == name)
    }

    /// Names of the registered providers, in lookup order.
    pub fn names(&self) -> Vec<String> {
        self.providers
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Get the number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Check if no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Register a credential descriptor.
    ///
    /// A descriptor with the same id replaces the existing one in place.
    pub fn register_descriptor(&self, descriptor: CredentialDescriptor) {
        let mut descriptors = self.descriptors.write();
        match descriptors.iter_mut().find(|d| d.id() == descriptor.id()) {
            Some(existing) => *existing = descriptor,
            None => descriptors.push(descriptor),
        }
    }

    /// All registered credential descriptors, in registration order.
    pub fn descriptors(&self) -> Vec<CredentialDescriptor> {
        self.descriptors.read().clone()
    }

    /// Look up a descriptor by kind id.
    pub fn descriptor(&self, id: &str) -> Option<CredentialDescriptor> {
        self.descriptors.read().iter().find(|d| d.id() == id).cloned()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("ready", &self.is_ready())
            .field("providers", &self.names())
            .field("descriptors", &self.descriptors.read().len())
            .finish()
    }
}

impl ProviderSource for ProviderRegistry {
    fn providers(&self) -> Result<Vec<Arc<dyn CredentialsProvider>>, RegistryError> {
        if !self.is_ready() {
            return Err(RegistryError::NotReady);
        }
        Ok(self.providers.read().clone())
    }

    fn root(&self) -> Arc<ItemGroup> {
        Arc::clone(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryProvider;

    fn provider(name: &str) -> Arc<dyn CredentialsProvider> {
        Arc::new(MemoryProvider::new(name))
    }

    #[test]
    fn test_registry_new() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.is_ready());
        assert_eq!(registry.len(), 0);
        assert!(registry.providers().unwrap().is_empty());
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = ProviderRegistry::new();
        registry.register(provider("first"));
        registry.register(provider("second"));
        registry.insert(0, provider("zeroth"));
        registry.insert(99, provider("last"));

        assert_eq!(registry.names(), vec!["zeroth", "first", "second", "last"]);
    }

    #[test]
    fn test_registry_remove() {
        let registry = ProviderRegistry::new();
        registry.register(provider("a"));
        registry.register(provider("b"));
        registry.register(provider("a"));

        assert_eq!(registry.remove("a"), 2);
        assert!(!registry.contains("a"));
        assert!(registry.contains("b"));
        assert_eq!(registry.remove("nonexistent"), 0);
    }

    #[test]
    fn test_pending_registry() {
        let registry = ProviderRegistry::pending();
        registry.register(provider("a"));

        assert!(matches!(registry.providers(), Err(RegistryError::NotReady)));

        registry.mark_ready();
        assert_eq!(registry.providers().unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_registration() {
        let registry = ProviderRegistry::new();
        registry.register(provider("a"));

        let snapshot = registry.providers().unwrap();
        registry.register(provider("b"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_builtin_descriptors() {
        let registry = ProviderRegistry::with_builtin_descriptors();
        let ids: Vec<_> = registry.descriptors().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["username-password", "secret-text"]);

        let descriptor = registry.descriptor("secret-text").unwrap();
        assert_eq!(descriptor.display_name, "Secret text");
        assert!(registry.descriptor("ssh-key").is_none());
    }

    #[test]
    fn test_descriptor_replace() {
        let registry = ProviderRegistry::with_builtin_descriptors();
        let mut renamed = CredentialDescriptor::of::<SecretText>();
        renamed.display_name = "API token".to_string();
        registry.register_descriptor(renamed);

        assert_eq!(registry.descriptors().len(), 2);
        assert_eq!(registry.descriptor("secret-text").unwrap().display_name, "API token");
    }
}
