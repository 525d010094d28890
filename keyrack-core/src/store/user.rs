//! Per-user in-memory credentials.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::credentials::{CredentialKind, Credentials};
use crate::model::{Identity, ItemGroup, ModelObject};
use crate::provider::{CredentialList, CredentialsProvider, ProviderError};
use crate::scope::{CredentialsScope, ScopeSet, scope_set};

/// Credentials that belong to individual users.
///
/// A user identity sees its own credentials first, then the credentials
/// shared with each of its authorities, in the order the identity lists
/// them. Visibility is the same in every container. The system and
/// anonymous identities see none.
pub struct UserProvider {
    name: String,
    users: RwLock<HashMap<String, Vec<Arc<dyn Credentials>>>>,
    authorities: RwLock<HashMap<String, Vec<Arc<dyn Credentials>>>>,
}

impl UserProvider {
    /// Create a new empty per-user store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: RwLock::new(HashMap::new()),
            authorities: RwLock::new(HashMap::new()),
        }
    }

    /// Give `user` a private credential.
    pub fn add<C: Credentials>(&self, user: &str, credentials: C) {
        self.users
            .write()
            .entry(user.to_string())
            .or_default()
            .push(Arc::new(credentials));
    }

    /// Share a credential with every user holding `authority`.
    pub fn add_for_authority<C: Credentials>(&self, authority: &str, credentials: C) {
        self.authorities
            .write()
            .entry(authority.to_string())
            .or_default()
            .push(Arc::new(credentials));
    }

    /// Number of credentials held for `user`.
    pub fn count_for(&self, user: &str) -> usize {
        self.users.read().get(user).map(Vec::len).unwrap_or(0)
    }

    /// Number of credentials shared with `authority`.
    pub fn count_for_authority(&self, authority: &str) -> usize {
        self.authorities
            .read()
            .get(authority)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn extend_matching(
    out: &mut CredentialList,
    list: Option<&Vec<Arc<dyn Credentials>>>,
    kind: &CredentialKind,
) {
    if let Some(list) = list {
        out.extend(list.iter().filter(|c| kind.accepts(c.as_ref())).cloned());
    }
}

impl fmt::Debug for UserProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserProvider")
            .field("name", &self.name)
            .field("users_count", &self.users.read().len())
            .field("authorities_count", &self.authorities.read().len())
            .finish()
    }
}

impl CredentialsProvider for UserProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn credentials_in_group(
        &self,
        kind: &CredentialKind,
        _group: &ItemGroup,
        identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        let Identity::User { name, .. } = identity else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        extend_matching(&mut found, self.users.read().get(name), kind);

        let shared = self.authorities.read();
        for authority in identity.authorities() {
            extend_matching(&mut found, shared.get(authority), kind);
        }
        Ok(found)
    }

    fn scopes(&self, object: ModelObject<'_>) -> Result<Option<ScopeSet>, ProviderError> {
        match object {
            ModelObject::User(_) => Ok(Some(scope_set([CredentialsScope::User]))),
            _ => Ok(None),
        }
    }
}
