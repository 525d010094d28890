//! Integration tests for credential resolution across providers.
//!
//! These tests verify the aggregation rules end to end:
//! - Default substitution for missing groups and identities
//! - Order-preserving concatenation of provider results
//! - Isolation of unavailable providers
//! - Scope merging
//! - Type filtering and item-level overrides

use std::sync::Arc;

use keyrack_core::provider::CredentialList;
use keyrack_core::scope::scope_set;
use keyrack_core::{
    CredentialKind, Credentials, CredentialsProvider, CredentialsResolver, CredentialsScope,
    Identity, Item, ItemGroup, ModelObject, ProviderError, ProviderRegistry, ProviderSource,
    ScopeSet, Secret, SecretText, StaticSource, UnavailableProvider, UsernamePassword,
};

/// Provider that echoes the group and identity it was asked about.
struct Echo {
    name: &'static str,
}

impl CredentialsProvider for Echo {
    fn name(&self) -> &str {
        self.name
    }

    fn credentials_in_group(
        &self,
        kind: &CredentialKind,
        group: &ItemGroup,
        identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        let id = format!("{}:{}:{}", self.name, group, identity);
        let credentials: Arc<dyn Credentials> = Arc::new(SecretText::new(id, Secret::new("x")));
        if kind.accepts(credentials.as_ref()) {
            Ok(vec![credentials])
        } else {
            Ok(Vec::new())
        }
    }
}

/// Provider with an item-level rule that differs from its group rule.
struct ItemAware;

impl CredentialsProvider for ItemAware {
    fn name(&self) -> &str {
        "item-aware"
    }

    fn credentials_in_group(
        &self,
        _kind: &CredentialKind,
        group: &ItemGroup,
        _identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        let credentials: Arc<dyn Credentials> =
            Arc::new(SecretText::new(format!("group:{}", group), Secret::new("g")));
        Ok(vec![credentials])
    }

    fn credentials_for_item(
        &self,
        _kind: &CredentialKind,
        item: &Item,
        _identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        let credentials: Arc<dyn Credentials> =
            Arc::new(SecretText::new(format!("item:{}", item), Secret::new("i")));
        Ok(vec![credentials])
    }
}

/// Provider with a fixed scope opinion.
struct Opinion {
    name: &'static str,
    scopes: Option<ScopeSet>,
}

impl CredentialsProvider for Opinion {
    fn name(&self) -> &str {
        self.name
    }

    fn credentials_in_group(
        &self,
        _kind: &CredentialKind,
        _group: &ItemGroup,
        _identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        Ok(Vec::new())
    }

    fn scopes(&self, _object: ModelObject<'_>) -> Result<Option<ScopeSet>, ProviderError> {
        Ok(self.scopes.clone())
    }
}

/// Provider that returns a credential of the wrong type regardless of kind.
struct Sloppy;

impl CredentialsProvider for Sloppy {
    fn name(&self) -> &str {
        "sloppy"
    }

    fn credentials_in_group(
        &self,
        _kind: &CredentialKind,
        _group: &ItemGroup,
        _identity: &Identity,
    ) -> Result<CredentialList, ProviderError> {
        let credentials: Arc<dyn Credentials> =
            Arc::new(UsernamePassword::new("login", "bot", Secret::new("pw")));
        Ok(vec![credentials])
    }
}

fn ids<C: Credentials>(found: &[Arc<C>]) -> Vec<String> {
    found.iter().map(|c| c.id().to_string()).collect()
}

fn source(providers: Vec<Arc<dyn CredentialsProvider>>) -> StaticSource {
    StaticSource::new(ItemGroup::root(), providers)
}

#[test]
fn test_missing_group_means_root() {
    let source = source(vec![Arc::new(Echo { name: "p" })]);
    let resolver = CredentialsResolver::default();
    let root = source.root();

    let implicit = resolver
        .lookup_in_group::<SecretText>(&source, None, Some(&Identity::user("alice")))
        .unwrap();
    let explicit = resolver
        .lookup_in_group::<SecretText>(&source, Some(&root), Some(&Identity::user("alice")))
        .unwrap();

    assert_eq!(ids(&implicit), ids(&explicit));
    assert_eq!(ids(&implicit), vec!["p:<root>:alice"]);
}

#[test]
fn test_missing_identity_means_system() {
    let source = source(vec![Arc::new(Echo { name: "p" })]);
    let resolver = CredentialsResolver::default();
    let root = source.root();
    let team = ItemGroup::from_path(&root, "team").unwrap();
    let item = Item::new(&team, "deploy").unwrap();
    let system = Identity::system();

    let implicit = resolver
        .lookup_in_group::<SecretText>(&source, Some(&team), None)
        .unwrap();
    let explicit = resolver
        .lookup_in_group::<SecretText>(&source, Some(&team), Some(&system))
        .unwrap();
    assert_eq!(ids(&implicit), ids(&explicit));
    assert_eq!(ids(&implicit), vec!["p:team:SYSTEM"]);

    let implicit = resolver
        .lookup_for_item::<SecretText>(&source, Some(&item), None)
        .unwrap();
    let explicit = resolver
        .lookup_for_item::<SecretText>(&source, Some(&item), Some(&system))
        .unwrap();
    assert_eq!(ids(&implicit), ids(&explicit));
}

#[test]
fn test_missing_item_means_root_group() {
    let source = source(vec![Arc::new(Echo { name: "p" })]);
    let resolver = CredentialsResolver::default();

    let found = resolver
        .lookup_for_item::<SecretText>(&source, None, Some(&Identity::user("bob")))
        .unwrap();
    assert_eq!(ids(&found), vec!["p:<root>:bob"]);
}

#[test]
fn test_convenience_lookups() {
    let source = source(vec![Arc::new(Echo { name: "p" })]);
    let resolver = CredentialsResolver::default();

    let found = resolver.lookup::<SecretText>(&source).unwrap();
    assert_eq!(ids(&found), vec!["p:<root>:SYSTEM"]);

    let found = resolver
        .lookup_as::<SecretText>(&source, Some(&Identity::Anonymous))
        .unwrap();
    assert_eq!(ids(&found), vec!["p:<root>:anonymous"]);
}

#[test]
fn test_no_providers() {
    let registry = ProviderRegistry::new();
    let resolver = CredentialsResolver::default();
    let root = registry.root();
    let item = Item::new(&root, "job").unwrap();

    assert!(resolver.lookup::<SecretText>(&registry).unwrap().is_empty());
    assert!(resolver
        .lookup_for_item::<SecretText>(&registry, Some(&item), None)
        .unwrap()
        .is_empty());
    assert!(resolver
        .resolve_scopes(&registry, ModelObject::Group(&root))
        .unwrap()
        .is_none());
}

#[test]
fn test_registry_not_ready() {
    let registry = ProviderRegistry::pending();
    registry.register(Arc::new(Echo { name: "p" }));
    let resolver = CredentialsResolver::default();
    let root = registry.root();

    assert!(resolver.lookup::<SecretText>(&registry).unwrap().is_empty());
    assert!(resolver
        .lookup_in_group::<SecretText>(&registry, None, None)
        .unwrap()
        .is_empty());
    assert_eq!(
        resolver
            .resolve_scopes(&registry, ModelObject::Group(&root))
            .unwrap(),
        Some(ScopeSet::new())
    );

    registry.mark_ready();
    assert_eq!(resolver.lookup::<SecretText>(&registry).unwrap().len(), 1);
}

#[test]
fn test_results_concatenate_in_provider_order() {
    let source = source(vec![
        Arc::new(Echo { name: "first" }),
        Arc::new(Echo { name: "second" }),
    ]);
    let resolver = CredentialsResolver::default();

    let found = resolver.lookup::<SecretText>(&source).unwrap();
    assert_eq!(
        ids(&found),
        vec!["first:<root>:SYSTEM", "second:<root>:SYSTEM"]
    );
}

#[test]
fn test_unavailable_provider_is_skipped() {
    let source = source(vec![
        Arc::new(UnavailableProvider::new("vault", "not installed")),
        Arc::new(Echo { name: "c" }),
    ]);
    let resolver = CredentialsResolver::default();
    let root = source.root();
    let item = Item::new(&root, "job").unwrap();

    let found = resolver.lookup::<SecretText>(&source).unwrap();
    assert_eq!(ids(&found), vec!["c:<root>:SYSTEM"]);

    let found = resolver
        .lookup_for_item::<SecretText>(&source, Some(&item), None)
        .unwrap();
    assert_eq!(ids(&found), vec!["c:<root>:SYSTEM"]);

    let scopes = resolver
        .resolve_scopes(&source, ModelObject::Group(&root))
        .unwrap();
    assert!(scopes.is_none());
}

#[test]
fn test_scope_merge() {
    let s1 = CredentialsScope::Custom("s1".to_string());
    let s2 = CredentialsScope::Custom("s2".to_string());
    let resolver = CredentialsResolver::default();
    let object = ModelObject::Other("thing");

    let with_none = source(vec![
        Arc::new(Opinion { name: "p1", scopes: Some(scope_set([s1.clone()])) }),
        Arc::new(Opinion { name: "p2", scopes: None }),
    ]);
    assert_eq!(
        resolver.resolve_scopes(&with_none, object).unwrap(),
        Some(scope_set([s1.clone()]))
    );

    let overlapping = source(vec![
        Arc::new(Opinion { name: "p1", scopes: Some(scope_set([s1.clone()])) }),
        Arc::new(Opinion { name: "p2", scopes: Some(scope_set([s1.clone(), s2.clone()])) }),
    ]);
    let merged = resolver.resolve_scopes(&overlapping, object).unwrap().unwrap();
    assert_eq!(merged.len(), 2);
    assert!(merged.contains(&s1));
    assert!(merged.contains(&s2));

    let silent = source(vec![
        Arc::new(Opinion { name: "p1", scopes: None }),
        Arc::new(Opinion { name: "p2", scopes: None }),
    ]);
    assert!(resolver.resolve_scopes(&silent, object).unwrap().is_none());
}

#[test]
fn test_type_filtering() {
    let source = source(vec![Arc::new(Sloppy), Arc::new(Echo { name: "p" })]);
    let resolver = CredentialsResolver::default();

    let texts = resolver.lookup::<SecretText>(&source).unwrap();
    assert_eq!(ids(&texts), vec!["p:<root>:SYSTEM"]);

    let logins = resolver.lookup::<UsernamePassword>(&source).unwrap();
    assert_eq!(ids(&logins), vec!["login"]);
}

#[test]
fn test_item_lookup_uses_item_override() {
    let source = source(vec![Arc::new(ItemAware)]);
    let resolver = CredentialsResolver::default();
    let root = source.root();
    let item = Item::from_path(&root, "team/deploy").unwrap();

    let by_item = resolver
        .lookup_for_item::<SecretText>(&source, Some(&item), None)
        .unwrap();
    let by_parent = resolver
        .lookup_in_group::<SecretText>(&source, Some(item.parent()), None)
        .unwrap();

    assert_eq!(ids(&by_item), vec!["item:team/deploy"]);
    assert_eq!(ids(&by_parent), vec!["group:team"]);
}
