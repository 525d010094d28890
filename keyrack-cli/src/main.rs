//! Keyrack CLI
//!
//! Command-line interface for looking up credentials across every configured
//! provider.
//!
//! # Usage
//!
//! ```bash
//! # Every credential the system identity can see at the root
//! keyrack lookup --kind any
//!
//! # Secret text available to alice for a job in team/infra
//! keyrack lookup --kind secret-text --item team/infra/build --user alice
//!
//! # Scopes the providers offer for a folder
//! keyrack scopes --group team
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use keyrack_cli::report::{self, CredentialRow, OutputFormat};
use keyrack_cli::{Inventory, load_config};
use keyrack_core::{
    CredentialKind, CredentialsResolver, Identity, Item, ItemGroup, ModelObject,
    ProviderRegistry, ProviderSource, ResolveError,
};

#[derive(Parser)]
#[command(name = "keyrack")]
#[command(about = "Look up credentials across pluggable providers")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider inventory (overrides the configured one)
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up credentials of a kind
    Lookup {
        /// Credential kind id (e.g., username-password, secret-text, any)
        #[arg(short, long)]
        kind: Option<String>,

        /// Folder path to look in (defaults to the root)
        #[arg(short, long)]
        group: Option<String>,

        /// Item path to look up for
        #[arg(long, conflicts_with = "group")]
        item: Option<String>,

        /// Look up as this user (defaults to the system identity)
        #[arg(short, long)]
        user: Option<String>,

        /// Authority held by the user (repeatable)
        #[arg(short, long, requires = "user")]
        authority: Vec<String>,

        /// Look up as the anonymous identity
        #[arg(long, conflicts_with = "user")]
        anonymous: bool,
    },

    /// Show the scopes providers offer for an object
    Scopes {
        /// Folder path
        #[arg(long, conflicts_with_all = ["item", "user"])]
        group: Option<String>,

        /// Item path
        #[arg(long, conflicts_with = "user")]
        item: Option<String>,

        /// User name
        #[arg(long)]
        user: Option<String>,
    },

    /// List registered credential kinds
    Kinds,

    /// List providers in lookup order
    Providers,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config.log_level);
    debug!("Loaded configuration from {:?}", config.config_path);

    let registry = load_registry(cli.inventory.as_deref(), &config.inventory_path)?;
    let resolver = CredentialsResolver::new(config.resolver.clone());

    match cli.command {
        Commands::Lookup {
            kind,
            group,
            item,
            user,
            authority,
            anonymous,
        } => {
            let identity = identity(user, authority, anonymous);
            lookup(
                &registry,
                &resolver,
                kind.as_deref(),
                group.as_deref(),
                item.as_deref(),
                identity.as_ref(),
                cli.format,
            )
        }
        Commands::Scopes { group, item, user } => scopes(
            &registry,
            &resolver,
            group.as_deref(),
            item.as_deref(),
            user.as_deref(),
            cli.format,
        ),
        Commands::Kinds => {
            println!(
                "{}",
                report::render_descriptors(&registry.descriptors(), cli.format)?
            );
            Ok(())
        }
        Commands::Providers => {
            for name in registry.names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(level)
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_registry(explicit: Option<&Path>, configured: &Path) -> Result<ProviderRegistry> {
    let inventory = match explicit {
        Some(path) => Inventory::load(path)?,
        None if configured.exists() => Inventory::load(configured)?,
        None => {
            info!("No inventory at {:?}, starting with no providers", configured);
            Inventory::default()
        }
    };

    let registry = inventory
        .build_registry()
        .context("Failed to build provider registry")?;
    debug!(providers = registry.len(), "registry ready");
    Ok(registry)
}

fn identity(user: Option<String>, authorities: Vec<String>, anonymous: bool) -> Option<Identity> {
    match (user, anonymous) {
        (Some(name), _) => Some(Identity::user_with_authorities(name, authorities)),
        (None, true) => Some(Identity::Anonymous),
        (None, false) => None,
    }
}

fn lookup(
    registry: &ProviderRegistry,
    resolver: &CredentialsResolver,
    kind: Option<&str>,
    group: Option<&str>,
    item: Option<&str>,
    identity: Option<&Identity>,
    format: OutputFormat,
) -> Result<()> {
    let kind = match kind {
        None => None,
        Some("any") => Some(CredentialKind::any()),
        Some(id) => Some(
            registry
                .descriptor(id)
                .map(|d| d.kind)
                .ok_or_else(|| ResolveError::UnknownKind { id: id.to_string() })?,
        ),
    };
    let root = registry.root();

    let found = match (group, item) {
        (_, Some(path)) => {
            let item = Item::from_path(&root, path)?;
            resolver.lookup_kind_for_item(registry, kind.as_ref(), Some(&item), identity)?
        }
        (Some(path), None) => {
            let group = ItemGroup::from_path(&root, path)?;
            resolver.lookup_kind(registry, kind.as_ref(), Some(group.as_ref()), identity)?
        }
        (None, None) => resolver.lookup_kind(registry, kind.as_ref(), None, identity)?,
    };

    let rows: Vec<CredentialRow> = found
        .iter()
        .map(|c| CredentialRow::from_credentials(c.as_ref()))
        .collect();
    println!("{}", report::render_credentials(&rows, format)?);
    Ok(())
}

fn scopes(
    registry: &ProviderRegistry,
    resolver: &CredentialsResolver,
    group: Option<&str>,
    item: Option<&str>,
    user: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let root = registry.root();

    let scopes = match (group, item, user) {
        (_, _, Some(name)) => resolver.resolve_scopes(registry, ModelObject::User(name))?,
        (_, Some(path), None) => {
            let item = Item::from_path(&root, path)?;
            resolver.resolve_scopes(registry, ModelObject::Item(&item))?
        }
        (Some(path), None, None) => {
            let group = ItemGroup::from_path(&root, path)?;
            resolver.resolve_scopes(registry, ModelObject::Group(group.as_ref()))?
        }
        (None, None, None) => resolver.resolve_scopes(registry, ModelObject::Group(root.as_ref()))?,
    };

    println!("{}", report::render_scopes(scopes.as_ref(), format)?);
    Ok(())
}
