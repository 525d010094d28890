//! Rendering lookup results for the terminal.
//!
//! Secret material is never part of a report; only ids, kinds, scopes, and
//! descriptions are printed.

use serde::Serialize;
use std::str::FromStr;

use keyrack_core::{CredentialDescriptor, Credentials, ScopeSet};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{}', expected text or json", other)),
        }
    }
}

/// One credential in a lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialRow {
    pub id: String,
    pub kind: String,
    pub scope: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl CredentialRow {
    pub fn from_credentials(credentials: &dyn Credentials) -> Self {
        Self {
            id: credentials.id().to_string(),
            kind: credentials.kind().to_string(),
            scope: credentials.scope().to_string(),
            description: credentials.description().to_string(),
        }
    }
}

/// Render lookup results.
pub fn render_credentials(
    rows: &[CredentialRow],
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(rows),
        OutputFormat::Text => {
            if rows.is_empty() {
                return Ok("No credentials found".to_string());
            }
            let lines: Vec<String> = rows
                .iter()
                .map(|row| {
                    let mut line = format!("{}\t{}\t{}", row.id, row.kind, row.scope);
                    if !row.description.is_empty() {
                        line.push('\t');
                        line.push_str(&row.description);
                    }
                    line
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

/// Render a merged scope opinion. `None` means no provider had one.
pub fn render_scopes(
    scopes: Option<&ScopeSet>,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&scopes),
        OutputFormat::Text => Ok(match scopes {
            None => "No provider has an opinion".to_string(),
            Some(scopes) if scopes.is_empty() => "No scopes".to_string(),
            Some(scopes) => scopes
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        }),
    }
}

/// Render the registered credential kinds.
pub fn render_descriptors(
    descriptors: &[CredentialDescriptor],
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = descriptors
                .iter()
                .map(|d| serde_json::json!({ "id": d.id(), "display_name": d.display_name }))
                .collect();
            serde_json::to_string_pretty(&rows)
        }
        OutputFormat::Text => Ok(descriptors
            .iter()
            .map(|d| format!("{}\t{}", d.id(), d.display_name))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}
