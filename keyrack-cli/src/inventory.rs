//! Provider inventory loaded from TOML.
//!
//! This module provides:
//! - [`Inventory`] - The list of providers, in lookup order, with their credentials
//! - [`ProviderEntry`] / [`CredentialEntry`] - One provider and one credential in the file
//! - [`InventoryError`] - Errors raised while loading or materializing an inventory
//!
//! # Format
//!
//! ```toml
//! [[providers]]
//! name = "system"
//! type = "memory"
//!
//! [[providers.credentials]]
//! id = "agent-login"
//! kind = "username-password"
//! username = "agent"
//! password = "hunter2"
//!
//! [[providers]]
//! name = "vault"
//! enabled = false
//! reason = "vault integration not installed"
//! ```
//!
//! A disabled provider is still registered, as a provider that is always
//! unavailable, so lookups exercise the same skip path a missing plugin would.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use keyrack_core::{
    CredentialType, CredentialsScope, MemoryProvider, ProviderRegistry, Secret, SecretText,
    UnavailableProvider, UserProvider, UsernamePassword,
};

/// Error type for inventory handling.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The inventory file could not be read.
    #[error("failed to read inventory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The inventory is not valid TOML or has the wrong shape.
    #[error("failed to parse inventory: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two providers share a name.
    #[error("duplicate provider name: {name}")]
    DuplicateProvider { name: String },

    /// A credential names a kind that is not registered.
    #[error("provider {provider}: credential {id} has unknown kind {kind}")]
    UnknownKind {
        provider: String,
        id: String,
        kind: String,
    },

    /// A credential is missing a field its kind requires.
    #[error("provider {provider}: credential {id} is missing field {field}")]
    MissingField {
        provider: String,
        id: String,
        field: &'static str,
    },

    /// A credential is attached somewhere its provider cannot hold it.
    #[error("provider {provider}: credential {id} has an invalid location: {message}")]
    InvalidLocation {
        provider: String,
        id: String,
        message: String,
    },
}

/// Backend used for a provider entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Credentials attached to groups and items.
    #[default]
    Memory,

    /// Credentials owned by individual users.
    User,
}

/// A provider in the inventory.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEntry {
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: ProviderKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Why a disabled provider is unavailable.
    #[serde(default)]
    pub reason: Option<String>,

    /// Memory providers only: restrict reads to the system identity.
    #[serde(default = "default_true")]
    pub system_only: bool,

    /// Memory providers only: folders that hold their own store.
    #[serde(default)]
    pub folders: Vec<String>,

    #[serde(default)]
    pub credentials: Vec<CredentialEntry>,
}

/// A credential in the inventory.
///
/// `group` and `item` locate credentials in a memory provider; with neither,
/// the credential is attached to the root. In a user provider, `user` names
/// the owner and `authority` shares the credential with every holder of
/// that authority; exactly one of them is required.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    pub id: String,
    pub kind: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub scope: CredentialsScope,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub item: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub authority: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<Secret>,

    #[serde(default)]
    pub secret: Option<Secret>,
}

fn default_true() -> bool {
    true
}

/// The providers of a deployment, in lookup order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

enum Built {
    Login(UsernamePassword),
    Text(SecretText),
}

impl Inventory {
    /// Load an inventory from a TOML file.
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        contents.parse()
    }

    /// Build a ready registry holding every provider, in file order.
    pub fn build_registry(&self) -> Result<ProviderRegistry, InventoryError> {
        let registry = ProviderRegistry::with_builtin_descriptors();

        for entry in &self.providers {
            if registry.contains(&entry.name) {
                return Err(InventoryError::DuplicateProvider {
                    name: entry.name.clone(),
                });
            }

            if !entry.enabled {
                let reason = entry.reason.as_deref().unwrap_or("provider disabled");
                debug!(provider = %entry.name, "registering disabled provider");
                registry.register(Arc::new(UnavailableProvider::new(&entry.name, reason)));
                continue;
            }

            match entry.kind {
                ProviderKind::Memory => {
                    registry.register(Arc::new(build_memory(entry)?));
                }
                ProviderKind::User => {
                    registry.register(Arc::new(build_user(entry)?));
                }
            }
        }

        Ok(registry)
    }
}

impl std::str::FromStr for Inventory {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

fn build_memory(entry: &ProviderEntry) -> Result<MemoryProvider, InventoryError> {
    let provider = MemoryProvider::new(&entry.name).with_system_only(entry.system_only);
    for folder in &entry.folders {
        provider.add_folder(folder);
    }

    for credential in &entry.credentials {
        if credential.user.is_some() || credential.authority.is_some() {
            return Err(invalid_location(entry, credential, "memory providers have no users"));
        }
        let built = build_credential(entry, credential)?;

        match (&credential.group, &credential.item) {
            (Some(_), Some(_)) => {
                return Err(invalid_location(entry, credential, "both group and item given"));
            }
            (None, Some(item)) => match built {
                Built::Login(c) => provider.add_to_item(item, c),
                Built::Text(c) => provider.add_to_item(item, c),
            },
            (group, None) => {
                let group = group.as_deref().unwrap_or("");
                match built {
                    Built::Login(c) => provider.add_to_group(group, c),
                    Built::Text(c) => provider.add_to_group(group, c),
                }
            }
        }
    }

    debug!(provider = %entry.name, count = provider.len(), "loaded memory provider");
    Ok(provider)
}

fn build_user(entry: &ProviderEntry) -> Result<UserProvider, InventoryError> {
    let provider = UserProvider::new(&entry.name);

    for credential in &entry.credentials {
        if credential.group.is_some() || credential.item.is_some() {
            return Err(invalid_location(entry, credential, "user providers have no containers"));
        }
        let built = build_credential(entry, credential)?;

        match (credential.user.as_deref(), credential.authority.as_deref()) {
            (Some(_), Some(_)) => {
                return Err(invalid_location(entry, credential, "both user and authority given"));
            }
            (None, None) => return Err(missing(entry, credential, "user")),
            (Some(user), None) => match built {
                Built::Login(c) => provider.add(user, c),
                Built::Text(c) => provider.add(user, c),
            },
            (None, Some(authority)) => match built {
                Built::Login(c) => provider.add_for_authority(authority, c),
                Built::Text(c) => provider.add_for_authority(authority, c),
            },
        }
    }

    Ok(provider)
}

fn build_credential(
    entry: &ProviderEntry,
    credential: &CredentialEntry,
) -> Result<Built, InventoryError> {
    match credential.kind.as_str() {
        kind if kind == UsernamePassword::KIND_ID => {
            let username = credential
                .username
                .as_deref()
                .ok_or_else(|| missing(entry, credential, "username"))?;
            let password = credential
                .password
                .clone()
                .ok_or_else(|| missing(entry, credential, "password"))?;
            Ok(Built::Login(
                UsernamePassword::new(&credential.id, username, password)
                    .with_description(&credential.description)
                    .with_scope(credential.scope.clone()),
            ))
        }
        kind if kind == SecretText::KIND_ID => {
            let secret = credential
                .secret
                .clone()
                .ok_or_else(|| missing(entry, credential, "secret"))?;
            Ok(Built::Text(
                SecretText::new(&credential.id, secret)
                    .with_description(&credential.description)
                    .with_scope(credential.scope.clone()),
            ))
        }
        other => Err(InventoryError::UnknownKind {
            provider: entry.name.clone(),
            id: credential.id.clone(),
            kind: other.to_string(),
        }),
    }
}

fn missing(
    entry: &ProviderEntry,
    credential: &CredentialEntry,
    field: &'static str,
) -> InventoryError {
    InventoryError::MissingField {
        provider: entry.name.clone(),
        id: credential.id.clone(),
        field,
    }
}

fn invalid_location(
    entry: &ProviderEntry,
    credential: &CredentialEntry,
    message: &str,
) -> InventoryError {
    InventoryError::InvalidLocation {
        provider: entry.name.clone(),
        id: credential.id.clone(),
        message: message.to_string(),
    }
}
