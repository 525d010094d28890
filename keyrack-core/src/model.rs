//! Domain model types for Keyrack.
//!
//! This module defines the containers and principals every lookup is
//! expressed against:
//! - [`ItemGroup`] - A node in the container tree that can own items and credentials
//! - [`Item`] - A leaf in the container tree, always owned by exactly one group
//! - [`Identity`] - The principal on whose behalf a lookup runs
//! - [`ModelObject`] - Any object a provider may hold a scope opinion about

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Separator used in container paths (`folder/subfolder/item`).
pub const PATH_SEPARATOR: char = '/';

/// A node in the container hierarchy.
///
/// Groups form a tree rooted at a single parentless group. The tree is
/// immutable once built and shared through [`Arc`], so lookups only ever
/// read `parent` links.
///
/// # Examples
///
/// ```
/// use keyrack_core::ItemGroup;
///
/// let root = ItemGroup::root();
/// let team = ItemGroup::child(&root, "team").unwrap();
/// let infra = ItemGroup::child(&team, "infra").unwrap();
///
/// assert_eq!(infra.full_name(), "team/infra");
/// assert!(infra.parent().is_some());
/// assert!(ItemGroup::child(&root, "a/b").is_err());
/// ```
#[derive(Debug)]
pub struct ItemGroup {
    name: String,
    parent: Option<Arc<ItemGroup>>,
}

impl ItemGroup {
    /// Create a new root group.
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            name: String::new(),
            parent: None,
        })
    }

    /// Create a child group owned by `parent`.
    ///
    /// The name must be a single non-blank path segment.
    pub fn child(
        parent: &Arc<ItemGroup>,
        name: impl Into<String>,
    ) -> Result<Arc<Self>, ParseError> {
        let name = checked_name(name.into())?;
        Ok(Arc::new(Self {
            name,
            parent: Some(Arc::clone(parent)),
        }))
    }

    /// Resolve a slash-separated path below `root`, creating the chain of
    /// groups it names.
    ///
    /// An empty path resolves to `root` itself.
    pub fn from_path(root: &Arc<ItemGroup>, path: &str) -> Result<Arc<Self>, ParseError> {
        let mut current = Arc::clone(root);
        for segment in split_path(path)? {
            current = Self::child(&current, segment)?;
        }
        Ok(current)
    }

    /// The group's own name. Empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning group, or `None` for the root.
    pub fn parent(&self) -> Option<&Arc<ItemGroup>> {
        self.parent.as_ref()
    }

    /// Whether this is the root of its tree.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Slash-separated path from the root. Empty for the root.
    pub fn full_name(&self) -> String {
        let mut names: Vec<&str> = self
            .ancestors()
            .filter(|g| !g.is_root())
            .map(|g| g.name())
            .collect();
        names.reverse();
        names.join("/")
    }

    /// Iterate this group and then each ancestor up to and including the root.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }
}

impl PartialEq for ItemGroup {
    fn eq(&self, other: &Self) -> bool {
        self.is_root() == other.is_root() && self.full_name() == other.full_name()
    }
}

impl Eq for ItemGroup {}

impl fmt::Display for ItemGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.full_name())
        }
    }
}

/// Iterator over a group and its ancestors, nearest first.
pub struct Ancestors<'a> {
    next: Option<&'a ItemGroup>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ItemGroup;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

/// A leaf node in the container hierarchy.
///
/// An item always has exactly one parent group.
#[derive(Debug, PartialEq, Eq)]
pub struct Item {
    name: String,
    parent: Arc<ItemGroup>,
}

impl Item {
    /// Create a new item inside `parent`.
    ///
    /// The name must be a single non-blank path segment.
    pub fn new(parent: &Arc<ItemGroup>, name: impl Into<String>) -> Result<Self, ParseError> {
        let name = checked_name(name.into())?;
        Ok(Self {
            name,
            parent: Arc::clone(parent),
        })
    }

    /// Resolve a slash-separated item path below `root`.
    ///
    /// The last segment names the item, everything before it names groups.
    pub fn from_path(root: &Arc<ItemGroup>, path: &str) -> Result<Self, ParseError> {
        let mut segments = split_path(path)?;
        let name = segments.pop().ok_or_else(|| ParseError::InvalidPath {
            message: "item path must not be empty".to_string(),
        })?;

        let mut parent = Arc::clone(root);
        for segment in segments {
            parent = ItemGroup::child(&parent, segment)?;
        }
        Self::new(&parent, name)
    }

    /// The item's own name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group that owns this item.
    pub fn parent(&self) -> &Arc<ItemGroup> {
        &self.parent
    }

    /// Slash-separated path from the root.
    pub fn full_name(&self) -> String {
        if self.parent.is_root() {
            self.name.clone()
        } else {
            format!("{}/{}", self.parent.full_name(), self.name)
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// The principal on whose behalf a lookup is performed.
///
/// [`Identity::System`] is the well-known internal identity that is
/// substituted whenever a caller does not supply one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Identity {
    /// Internal, fully trusted identity.
    #[default]
    System,

    /// Unauthenticated caller.
    Anonymous,

    /// An authenticated user.
    User {
        /// The user's login name.
        name: String,

        /// Groups or roles the user belongs to.
        #[serde(default)]
        authorities: Vec<String>,
    },
}

impl Identity {
    /// The system identity.
    pub fn system() -> Self {
        Self::System
    }

    /// An authenticated user with no extra authorities.
    pub fn user(name: impl Into<String>) -> Self {
        Self::User {
            name: name.into(),
            authorities: Vec::new(),
        }
    }

    /// An authenticated user belonging to `authorities`.
    pub fn user_with_authorities<I, S>(name: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::User {
            name: name.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }

    /// Groups or roles held by this identity. Empty unless it is a user.
    pub fn authorities(&self) -> &[String] {
        match self {
            Self::User { authorities, .. } => authorities,
            _ => &[],
        }
    }

    /// Whether this identity holds `authority`.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities().iter().any(|a| a == authority)
    }

    /// Whether this is the system identity.
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }

    /// The principal name.
    pub fn name(&self) -> &str {
        match self {
            Self::System => "SYSTEM",
            Self::Anonymous => "anonymous",
            Self::User { name, .. } => name,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Any object a provider may hold a scope opinion about.
#[derive(Debug, Clone, Copy)]
pub enum ModelObject<'a> {
    /// A container group (including the root).
    Group(&'a ItemGroup),

    /// A container item.
    Item(&'a Item),

    /// A user's personal credential area.
    User(&'a str),

    /// Anything else, identified by name.
    Other(&'a str),
}

impl fmt::Display for ModelObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(group) => write!(f, "group:{}", group),
            Self::Item(item) => write!(f, "item:{}", item),
            Self::User(name) => write!(f, "user:{}", name),
            Self::Other(name) => write!(f, "object:{}", name),
        }
    }
}

/// Error parsing a container path.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid path: {message}")]
    InvalidPath { message: String },
}

fn checked_name(name: String) -> Result<String, ParseError> {
    if name.trim().is_empty() {
        return Err(ParseError::InvalidPath {
            message: "name must not be blank".to_string(),
        });
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(ParseError::InvalidPath {
            message: format!("name '{}' contains '{}'", name, PATH_SEPARATOR),
        });
    }
    Ok(name)
}

fn split_path(path: &str) -> Result<Vec<&str>, ParseError> {
    let trimmed = path.trim_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let segments: Vec<&str> = trimmed.split(PATH_SEPARATOR).collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(ParseError::InvalidPath {
            message: format!("empty path segment in '{}'", path),
        });
    }
    Ok(segments)
}
