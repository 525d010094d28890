//! # Keyrack Core
//!
//! Core library for Keyrack credential lookup.
//!
//! This crate provides:
//! - Domain types for containers, identities, and credential scopes
//! - The [`CredentialsProvider`] trait that pluggable credential sources implement
//! - [`ProviderRegistry`], an ordered collection of providers
//! - [`CredentialsResolver`], which merges credentials and scopes from every provider
//! - In-memory providers for system-wide, folder, and per-user credentials
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use keyrack_core::{
//!     CredentialsResolver, Identity, ItemGroup, MemoryProvider, ProviderRegistry,
//!     ProviderSource, Secret, SecretText,
//! };
//!
//! let registry = ProviderRegistry::with_builtin_descriptors();
//! let folders = MemoryProvider::new("folders").with_system_only(false);
//! folders.add_to_group("team", SecretText::new("team-token", Secret::new("t0k3n")));
//! registry.register(Arc::new(folders));
//!
//! let team = ItemGroup::from_path(&registry.root(), "team").unwrap();
//! let resolver = CredentialsResolver::default();
//! let tokens = resolver
//!     .lookup_in_group::<SecretText>(&registry, Some(&team), Some(&Identity::user("alice")))
//!     .unwrap();
//! assert_eq!(tokens[0].secret().expose(), "t0k3n");
//! ```

pub mod credentials;
pub mod error;
pub mod model;
pub mod provider;
pub mod registry;
pub mod resolve;
pub mod scope;
pub mod store;

// Re-export commonly used types at crate root
pub use model::{
    Identity,
    Item,
    ItemGroup,
    ModelObject,
    ParseError,
};

pub use credentials::{
    CredentialDescriptor,
    CredentialKind,
    CredentialType,
    Credentials,
    Secret,
    SecretText,
    UsernamePassword,
};

pub use scope::{
    CredentialsScope,
    ScopeSet,
};

pub use provider::{
    CredentialsProvider,
    ProviderError,
};

pub use registry::{
    ProviderRegistry,
    ProviderSource,
    RegistryError,
    StaticSource,
};

pub use resolve::{
    CredentialsResolver,
    FailurePolicy,
    ResolveError,
    ResolverConfig,
};

pub use store::{
    MemoryProvider,
    UnavailableProvider,
    UserProvider,
};

pub use error::KeyrackError;
