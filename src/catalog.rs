//! The consolidated catalog document.
//!
//! [`build_catalog`] is the pure part of the build: it takes the descriptors
//! in scan order, normalizes and stamps them, and aggregates the category
//! list. Reading descriptor files and writing `store.json` happen around it.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::{Descriptor, CANONICAL_REPOSITORY, CATALOG_VERSION};
use crate::discovery::Layout;
use crate::error::{Result, StoreError};
use crate::homepage::normalize_descriptor;

/// The document the storefront loads: every app plus the category list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub apps: Vec<Descriptor>,
    pub categories: Vec<String>,
    pub version: String,
    pub last_updated: String,
}

impl Catalog {
    /// Look up an app by exact id.
    pub fn find(&self, id: &str) -> Option<&Descriptor> {
        self.apps.iter().find(|app| app.id() == Some(id))
    }

    /// Count summary of the catalog contents.
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            agents: self
                .apps
                .iter()
                .filter(|app| app.type_field() == Some("Agent"))
                .count(),
            tools: self
                .apps
                .iter()
                .filter(|app| app.type_field() == Some("Tool"))
                .count(),
            total: self.apps.len(),
            categories: self.categories.len(),
        }
    }
}

/// Counts reported after a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub agents: usize,
    pub tools: usize,
    pub total: usize,
    pub categories: usize,
}

/// Catalog path of an app: `/agents/{id}` for agents, `/tools/{id}` otherwise.
pub fn app_path(app: &Descriptor) -> String {
    format!(
        "/{}/{}",
        app.app_type().partition(),
        app.id().unwrap_or_default()
    )
}

/// Overwrite the computed `repository` and `path` fields.
pub fn stamp_descriptor(app: &mut Descriptor) {
    app.set("repository", CANONICAL_REPOSITORY);
    let path = app_path(app);
    app.set("path", path);
}

/// Sorted, deduplicated set of string `category` values.
///
/// Comparison is case-sensitive and byte-wise.
pub fn collect_categories<'a, I>(apps: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Descriptor>,
{
    apps.into_iter()
        .filter_map(Descriptor::category)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Format a timestamp the way the storefront expects (`2024-01-02T03:04:05.678Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the catalog from descriptors in scan order.
///
/// Homepage normalization only applies to the partitioned layout.
pub fn build_catalog(
    descriptors: Vec<Descriptor>,
    layout: Layout,
    built_at: DateTime<Utc>,
) -> Catalog {
    let apps: Vec<Descriptor> = descriptors
        .into_iter()
        .map(|mut app| {
            if layout == Layout::Partitioned {
                normalize_descriptor(&mut app);
            }
            stamp_descriptor(&mut app);
            app
        })
        .collect();

    let categories = collect_categories(&apps);

    Catalog {
        apps,
        categories,
        version: CATALOG_VERSION.to_string(),
        last_updated: format_timestamp(built_at),
    }
}

/// Write the catalog as pretty-printed JSON, creating parent directories.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::WriteFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json =
        serde_json::to_string_pretty(catalog).map_err(|source| StoreError::SerializeFailed {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, json).map_err(|source| StoreError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), apps = catalog.apps.len(), "catalog written");
    Ok(())
}

/// Load a previously built catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}
