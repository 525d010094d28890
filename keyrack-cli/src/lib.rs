//! # Keyrack CLI
//!
//! Support code for the `keyrack` binary.
//!
//! This crate provides:
//! - [`config`] - CLI configuration (`config.toml`)
//! - [`inventory`] - Provider inventory files and registry construction
//! - [`report`] - Secret-free rendering of lookup results

pub mod config;
pub mod inventory;
pub mod report;

pub use config::{CliConfig, load_config};
pub use inventory::{Inventory, InventoryError};
pub use report::{CredentialRow, OutputFormat};
