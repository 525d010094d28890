//! Top-level error types for Keyrack.

use thiserror::Error;

use crate::model::ParseError;
use crate::provider::ProviderError;
use crate::registry::RegistryError;
use crate::resolve::ResolveError;

/// Top-level error type encompassing all Keyrack errors.
#[derive(Debug, Error)]
pub enum KeyrackError {
    /// Error from credential resolution.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Error from a provider used directly.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error fetching providers from a registry.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Error parsing a container path.
    #[error("path error: {0}")]
    Path(#[from] ParseError),
}
