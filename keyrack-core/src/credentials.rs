//! Credential values and their runtime type tokens.
//!
//! This module provides:
//! - [`Credentials`] - Trait implemented by every credential value
//! - [`CredentialType`] - Static metadata for a concrete credential type
//! - [`CredentialKind`] - Runtime type token used to request credentials
//! - [`CredentialDescriptor`] - Registry entry describing a credential type
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`UsernamePassword`] and [`SecretText`] - Built-in credential types
//!
//! The resolver never looks inside a credential. It only checks its
//! concrete type, which is why every credential is `Any`.

use serde::Deserialize;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::scope::CredentialsScope;

/// Upcasting helper so credential trait objects can be downcast.
///
/// Implemented for every sized `Any + Send + Sync` type.
pub trait AsAny: Any + Send + Sync {
    /// Borrow as `dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Convert a shared pointer into `Arc<dyn Any>`.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A credential value contributed by a provider.
///
/// Providers own their credential objects; no equality contract is
/// imposed here.
pub trait Credentials: AsAny + fmt::Debug {
    /// The runtime kind of this credential.
    fn kind(&self) -> CredentialKind;

    /// Provider-unique identifier.
    fn id(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Where this credential may be used.
    fn scope(&self) -> CredentialsScope {
        CredentialsScope::Global
    }
}

/// Static metadata for a concrete credential type.
pub trait CredentialType: Credentials + Sized {
    /// Stable identifier of the kind (e.g. `"username-password"`).
    const KIND_ID: &'static str;

    /// Human-readable name of the kind.
    const DISPLAY_NAME: &'static str;
}

/// Runtime type token for a credential lookup.
///
/// A kind either names one concrete credential type or matches every
/// credential ([`CredentialKind::any`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialKind {
    type_id: Option<TypeId>,
    id: &'static str,
}

impl CredentialKind {
    /// The kind of the concrete type `C`.
    pub fn of<C: CredentialType>() -> Self {
        Self {
            type_id: Some(TypeId::of::<C>()),
            id: C::KIND_ID,
        }
    }

    /// A kind that matches every credential.
    pub fn any() -> Self {
        Self {
            type_id: None,
            id: "any",
        }
    }

    /// Stable identifier of the kind.
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Whether this kind matches every credential.
    pub fn is_any(&self) -> bool {
        self.type_id.is_none()
    }

    /// Whether `credentials` is of this kind.
    pub fn accepts(&self, credentials: &dyn Credentials) -> bool {
        match self.type_id {
            Some(type_id) => AsAny::as_any(credentials).type_id() == type_id,
            None => true,
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Describes a credential type known to a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    /// The kind this descriptor describes.
    pub kind: CredentialKind,

    /// Human-readable name.
    pub display_name: String,
}

impl CredentialDescriptor {
    /// The descriptor of the concrete type `C`.
    pub fn of<C: CredentialType>() -> Self {
        Self {
            kind: CredentialKind::of::<C>(),
            display_name: C::DISPLAY_NAME.to_string(),
        }
    }

    /// Stable identifier of the described kind.
    pub fn id(&self) -> &'static str {
        self.kind.id()
    }
}

/// Downcast a shared credential to a concrete type.
///
/// Returns `None` when the credential is of another type.
pub fn downcast_credentials<C: CredentialType>(credentials: Arc<dyn Credentials>) -> Option<Arc<C>> {
    AsAny::into_any_arc(credentials).downcast::<C>().ok()
}

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the buffer is wiped when the secret is dropped.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// A username with its password.
#[derive(Debug, Clone)]
pub struct UsernamePassword {
    id: String,
    description: String,
    scope: CredentialsScope,
    username: String,
    password: Secret,
}

impl UsernamePassword {
    /// Create a new global username/password credential.
    pub fn new(id: impl Into<String>, username: impl Into<String>, password: Secret) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            scope: CredentialsScope::Global,
            username: username.into(),
            password,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: CredentialsScope) -> Self {
        self.scope = scope;
        self
    }

    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password.
    pub fn password(&self) -> &Secret {
        &self.password
    }
}

impl Credentials for UsernamePassword {
    fn kind(&self) -> CredentialKind {
        CredentialKind::of::<Self>()
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn scope(&self) -> CredentialsScope {
        self.scope.clone()
    }
}

impl CredentialType for UsernamePassword {
    const KIND_ID: &'static str = "username-password";
    const DISPLAY_NAME: &'static str = "Username with password";
}

/// A single opaque secret string, such as an API key.
#[derive(Debug, Clone)]
pub struct SecretText {
    id: String,
    description: String,
    scope: CredentialsScope,
    secret: Secret,
}

impl SecretText {
    /// Create a new global secret text credential.
    pub fn new(id: impl Into<String>, secret: Secret) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            scope: CredentialsScope::Global,
            secret,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: CredentialsScope) -> Self {
        self.scope = scope;
        self
    }

    /// The secret.
    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

impl Credentials for SecretText {
    fn kind(&self) -> CredentialKind {
        CredentialKind::of::<Self>()
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn scope(&self) -> CredentialsScope {
        self.scope.clone()
    }
}

impl CredentialType for SecretText {
    const KIND_ID: &'static str = "secret-text";
    const DISPLAY_NAME: &'static str = "Secret text";
}
