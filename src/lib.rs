//! Catalog builder and maintenance tools for the Hanzo AI app store.
//!
//! The store keeps one JSON descriptor per app under `data/agents/` and
//! `data/tools/`. [`build_store`] turns them into the single `public/store.json`
//! document the storefront loads. The remaining modules cover the storefront's
//! search and install behaviour and the one-off import, rebrand and
//! reorganize migrations.

pub mod catalog;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod homepage;
pub mod import;
pub mod install;
pub mod query;
pub mod rebrand;
pub mod reorganize;
pub mod validation;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

pub use catalog::{build_catalog, load_catalog, write_catalog, Catalog, CatalogSummary};
pub use descriptor::{AppType, Descriptor, DescriptorFile};
pub use discovery::{display_path, repo_root, Layout, StoreLayout};
pub use error::{ProductError, Result, StoreError, ValidationError};
pub use homepage::normalize_homepage;
pub use install::{install_url, sanitize_url};
pub use query::{search, Filter};
pub use validation::{find_duplicate_ids, validate_descriptor};

/// Problems found in one descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub errors: Vec<String>,
}

/// Every descriptor in the store, plus the files that failed to load or validate.
#[derive(Debug, Default)]
pub struct StoreContents {
    pub files: Vec<DescriptorFile>,
    pub problems: Vec<FileReport>,
}

impl StoreContents {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Read every descriptor of the given layout, in build order.
///
/// Unparseable files are recorded as problems rather than stopping the scan.
/// With `validate`, schema violations and duplicate ids are recorded too.
/// Directory and file read failures are returned as errors.
pub fn load_store(store: &StoreLayout, layout: Layout, validate: bool) -> Result<StoreContents> {
    let mut files = Vec::new();
    let mut problems: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();

    for dir in store.partitions(layout) {
        let paths = discovery::descriptor_paths(&dir)?;
        tracing::info!(dir = %dir.display(), count = paths.len(), "scanning partition");

        for path in paths {
            let file = match discovery::read_descriptor(&path) {
                Ok(file) => file,
                Err(err @ StoreError::InvalidJson { .. }) => {
                    problems.entry(path).or_default().push(err.to_string());
                    continue;
                }
                Err(err) => return Err(err),
            };

            if validate {
                let errors = validate_descriptor(&file.descriptor, Some(&file.path));
                if !errors.is_empty() {
                    problems
                        .entry(file.path.clone())
                        .or_default()
                        .extend(errors.iter().map(ToString::to_string));
                }
            }

            files.push(file);
        }
    }

    if validate {
        for duplicate in find_duplicate_ids(&files) {
            if let ValidationError::DuplicateId { id, .. } = &duplicate {
                for file in files.iter().filter(|f| f.descriptor.id() == Some(id.as_str())) {
                    problems
                        .entry(file.path.clone())
                        .or_default()
                        .push(duplicate.to_string());
                }
            }
        }
    }

    Ok(StoreContents {
        files,
        problems: problems
            .into_iter()
            .map(|(path, errors)| FileReport { path, errors })
            .collect(),
    })
}

/// Options for [`build_store`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub layout: Layout,
    /// Catalog path; defaults to `public/store.json` under the store root.
    pub output: Option<PathBuf>,
    /// Skip schema and duplicate-id validation.
    pub skip_validation: bool,
}

/// Result of [`build_store`].
#[derive(Debug)]
pub enum BuildOutcome {
    /// The catalog was written.
    Written {
        path: PathBuf,
        summary: CatalogSummary,
    },
    /// Some descriptors were invalid; nothing was written.
    Rejected(Vec<FileReport>),
}

/// Build `store.json` from the descriptor store.
///
/// Every file is read and checked before anything is written, so one bad
/// descriptor leaves the previous catalog in place.
pub fn build_store(store: &StoreLayout, options: &BuildOptions) -> Result<BuildOutcome> {
    let contents = load_store(store, options.layout, !options.skip_validation)?;
    if !contents.is_valid() {
        tracing::warn!(files = contents.problems.len(), "descriptor problems, catalog not written");
        return Ok(BuildOutcome::Rejected(contents.problems));
    }

    let descriptors = contents.files.into_iter().map(|f| f.descriptor).collect();
    let catalog = build_catalog(descriptors, options.layout, Utc::now());

    let path = options
        .output
        .clone()
        .unwrap_or_else(|| store.catalog_path());
    write_catalog(&path, &catalog)?;

    Ok(BuildOutcome::Written {
        path,
        summary: catalog.summary(),
    })
}
