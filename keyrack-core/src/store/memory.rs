//! In-memory credentials attached to containers.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::credentials::{CredentialKind, Credentials};
use crate::model::{Identity, Item, ItemGroup, ModelObject};
use crate::provider::{CredentialList, CredentialsProvider, ProviderError};
use crate::scope::{CredentialsScope, ScopeSet, scope_set};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Group(String),
    Item(String),
}

struct Entry {
    location: Location,
    credentials: Arc<dyn Credentials>,
}

/// In-memory credential store for the container tree.
///
/// Credentials are attached to a group (by path, the root being `""`) or to
/// an item (by path). Visibility follows the tree:
///
/// - a group lookup sees the group's credentials, then each ancestor's,
///   nearest first;
/// - [`CredentialsScope::System`] credentials are seen only by a lookup on the
///   exact group that holds them, never from descendants or items;
/// - an item lookup sees the item's own credentials first, then its parent
///   chain.
///
/// By default only [`Identity::System`] can read the store. Use
/// [`with_system_only(false)`](Self::with_system_only) to let every identity
/// read it.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
pub struct MemoryProvider {
    name: String,
    system_only: bool,
    folders: RwLock<BTreeSet<String>>,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryProvider {
    /// Create a new empty store readable only by the system identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_only: true,
            folders: RwLock::new(BTreeSet::new()),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Restrict reads to the system identity (`true`) or allow every identity.
    pub fn with_system_only(mut self, system_only: bool) -> Self {
        self.system_only = system_only;
        self
    }

    /// Declare that a folder holds its own credential store.
    ///
    /// Folders are reported by [`CredentialsProvider::scopes`] even when empty.
    pub fn add_folder(&self, path: &str) {
        self.folders.write().insert(normalize(path));
    }

    /// Attach credentials to the root group.
    pub fn add_to_root<C: Credentials>(&self, credentials: C) {
        self.add_to_group("", credentials);
    }

    /// Attach credentials to the group at `path`.
    pub fn add_to_group<C: Credentials>(&self, path: &str, credentials: C) {
        self.add_shared(Location::Group(normalize(path)), Arc::new(credentials));
    }

    /// Attach credentials to the item at `path`.
    pub fn add_to_item<C: Credentials>(&self, path: &str, credentials: C) {
        self.add_shared(Location::Item(normalize(path)), Arc::new(credentials));
    }

    /// Remove every credential with `id`, wherever it is attached.
    ///
    /// Returns the number of credentials removed.
    pub fn remove(&self, id: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.credentials.id() != id);
        before - entries.len()
    }

    /// Get the number of stored credentials.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store holds no credentials.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn add_shared(&self, location: Location, credentials: Arc<dyn Credentials>) {
        if let Location::Group(path) = &location
            && !path.is_empty()
        {
            self.folders.write().insert(path.clone());
        }
        self.entries.write().push(Entry {
            location,
            credentials,
        });
    }

    fn can_read(&self, identity: &Identity) -> bool {
        !self.system_only || identity.is_system()
    }

    /// Credentials at `location` matching `kind`, optionally without
    /// system-scoped ones.
    fn matching(
        &self,
        location: &Location,
        kind: &CredentialKind,
        include_system: bool,
        out: &mut CredentialList,
    ) {
        let entries = self.entries.read();
        out.extend(
            entries
                .iter()
                .filter(|e| &e.location == location)
                .filter(|e| kind.accepts(e.credentials.as_ref()))
                .filter(|e| include_system || e.credentials.scope() != CredentialsScope::System)
                .map(|e| Arc::clone(&e.credentials)),
        );
    }

    /// Walk `group` and its ancestors, nearest first.
    fn walk(
        &self,
        group: &ItemGroup,
        kind: &CredentialKind,
        own_system: bool,
        out: &mut CredentialList,
    ) {
        for (depth, ancestor) in group.ancestors().enumerate() {
            let location = Location::Group(ancestor.full_name());
            self.matching(&location, kind, own_system && depth == 0, out);
        }
    }
}

impl fmt::Debug for MemoryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("name", &self.name)
            .field("system_only", &self.system_only)
            .field("credentials_count", &self.len())
            .finish()
    }
}

impl CredentialsProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn credentials_in_group(
        &self,
        kind: &CredentialKind,
        group: &ItemGroup,
        identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        let mut result = Vec::new();
        if self.can_read(identity) {
            self.walk(group, kind, true, &mut result);
        }
        Ok(result)
    }

    fn credentials_for_item(
        &self,
        kind: &CredentialKind,
        item: &Item,
        identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        let mut result = Vec::new();
        if self.can_read(identity) {
            self.matching(&Location::Item(item.full_name()), kind, true, &mut result);
            self.walk(item.parent(), kind, false, &mut result);
        }
        Ok(result)
    }

    fn scopes(&self, object: ModelObject<'_>) -> Result<Option<ScopeSet>, ProviderError> {
        let scopes = match object {
            ModelObject::Group(group) if group.is_root() => {
                Some(scope_set([CredentialsScope::Global, CredentialsScope::System]))
            }
            ModelObject::Group(group) if self.folders.read().contains(&group.full_name()) => {
                Some(scope_set([CredentialsScope::Global]))
            }
            _ => None,
        };
        Ok(scopes)
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Secret, SecretText, UsernamePassword};

    fn ids(list: &CredentialList) -> Vec<&str> {
        list.iter().map(|c| c.id()).collect()
    }

    fn store() -> MemoryProvider {
        let store = MemoryProvider::new("test");
        store.add_to_root(SecretText::new("root-global", Secret::new("a")));
        store.add_to_root(
            SecretText::new("root-system", Secret::new("b")).with_scope(CredentialsScope::System),
        );
        store.add_to_group("team", SecretText::new("team-global", Secret::new("c")));
        store.add_to_group(
            "team",
            SecretText::new("team-system", Secret::new("d")).with_scope(CredentialsScope::System),
        );
        store.add_to_item("team/deploy", SecretText::new("deploy-only", Secret::new("e")));
        store.add_to_root(UsernamePassword::new("root-login", "bot", Secret::new("f")));
        store
    }

    #[test]
    fn test_group_lookup_walks_ancestors_nearest_first() {
        let store = store();
        let root = ItemGroup::root();
        let team = ItemGroup::from_path(&root, "team").unwrap();
        let kind = CredentialKind::of::<SecretText>();

        let found = store
            .credentials_in_group(&kind, &team, &Identity::system())
            .unwrap();
        assert_eq!(ids(&found), vec!["team-global", "team-system", "root-global"]);
    }

    #[test]
    fn test_root_lookup_sees_root_system_credentials() {
        let store = store();
        let root = ItemGroup::root();
        let kind = CredentialKind::of::<SecretText>();

        let found = store
            .credentials_in_group(&kind, &root, &Identity::system())
            .unwrap();
        assert_eq!(ids(&found), vec!["root-global", "root-system"]);
    }

    #[test]
    fn test_item_lookup_sees_own_credentials_but_no_system_scope() {
        let store = store();
        let root = ItemGroup::root();
        let item = Item::from_path(&root, "team/deploy").unwrap();
        let kind = CredentialKind::of::<SecretText>();

        let found = store
            .credentials_for_item(&kind, &item, &Identity::system())
            .unwrap();
        assert_eq!(ids(&found), vec!["deploy-only", "team-global", "root-global"]);
    }

    #[test]
    fn test_descendants_never_alias_the_root() {
        let store = store();
        let root = ItemGroup::root();
        assert!(ItemGroup::child(&root, "").is_err());
        assert!(ItemGroup::child(&root, "team/deploy").is_err());

        let other = ItemGroup::child(&root, "other").unwrap();
        let found = store
            .credentials_in_group(&CredentialKind::any(), &other, &Identity::system())
            .unwrap();
        assert_eq!(ids(&found), vec!["root-global", "root-login"]);
    }

    #[test]
    fn test_kind_filtering() {
        let store = store();
        let root = ItemGroup::root();
        let kind = CredentialKind::of::<UsernamePassword>();

        let found = store
            .credentials_in_group(&kind, &root, &Identity::system())
            .unwrap();
        assert_eq!(ids(&found), vec!["root-login"]);
    }

    #[test]
    fn test_system_only_store_hides_from_users() {
        let store = store();
        let root = ItemGroup::root();
        let kind = CredentialKind::any();

        let found = store
            .credentials_in_group(&kind, &root, &Identity::user("alice"))
            .unwrap();
        assert!(found.is_empty());

        let open = store.with_system_only(false);
        let found = open
            .credentials_in_group(&kind, &root, &Identity::user("alice"))
            .unwrap();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_scopes() {
        let store = store();
        store.add_folder("/empty-folder/");
        let root = ItemGroup::root();
        let team = ItemGroup::from_path(&root, "team").unwrap();
        let empty = ItemGroup::from_path(&root, "empty-folder").unwrap();
        let other = ItemGroup::from_path(&root, "other").unwrap();
        let item = Item::from_path(&root, "team/deploy").unwrap();

        let root_scopes = store.scopes(ModelObject::Group(&root)).unwrap().unwrap();
        assert!(root_scopes.contains(&CredentialsScope::System));

        let team_scopes = store.scopes(ModelObject::Group(&team)).unwrap().unwrap();
        assert_eq!(team_scopes, scope_set([CredentialsScope::Global]));

        assert!(store.scopes(ModelObject::Group(&empty)).unwrap().is_some());
        assert!(store.scopes(ModelObject::Group(&other)).unwrap().is_none());
        assert!(store.scopes(ModelObject::Item(&item)).unwrap().is_none());
    }

    #[test]
    fn test_remove() {
        let store = store();
        assert_eq!(store.len(), 6);
        assert_eq!(store.remove("team-global"), 1);
        assert_eq!(store.remove("missing"), 0);
        assert_eq!(store.len(), 5);
        assert!(!store.is_empty());
    }
}
