//! Rename the previous brand to the current one across the descriptor store.
//!
//! Only `author`, `name`, `description` and `id` are touched, plus file names.
//! Running the pass twice changes nothing the second time.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::descriptor::Descriptor;
use crate::discovery::{descriptor_paths, read_descriptor, write_descriptor, StoreLayout};
use crate::error::{Result, StoreError};

/// Brand that replaces the old one in names and descriptions.
pub const BRAND: &str = "Hanzo";

/// Author recorded for apps published by the old brand.
pub const BRAND_AUTHOR: &str = "hanzo.ai";

fn old_brand() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)shinkai").expect("brand regex"))
}

/// Outcome of a rebrand pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RebrandReport {
    /// Descriptors whose content changed.
    pub updated: Vec<PathBuf>,
    /// Files renamed, as `(from, to)`.
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// Files skipped entirely because their rebranded name is already taken.
    pub refused: Vec<PathBuf>,
}

fn is_old_author(author: &str) -> bool {
    author.contains("shinkai") || author.contains("Shinkai") || author.contains("@@official")
}

/// Rebrand the fields of one descriptor. Returns whether anything changed.
pub fn rebrand_descriptor(descriptor: &mut Descriptor) -> bool {
    let mut changed = false;

    if descriptor.author().is_some_and(is_old_author) {
        descriptor.set("author", BRAND_AUTHOR);
        changed = true;
    }

    for field in ["name", "description"] {
        if let Some(Value::String(text)) = descriptor.fields_mut().get_mut(field) {
            if old_brand().is_match(text) {
                *text = old_brand().replace_all(text, BRAND).into_owned();
                changed = true;
            }
        }
    }

    if let Some(Value::String(id)) = descriptor.fields_mut().get_mut("id") {
        if old_brand().is_match(id) {
            *id = old_brand()
                .replace_all(id, BRAND.to_lowercase().as_str())
                .into_owned();
            changed = true;
        }
    }

    changed
}

/// New file name for a file carrying the old brand, if it needs one.
pub fn rebranded_file_name(name: &str) -> Option<String> {
    old_brand()
        .is_match(name)
        .then(|| old_brand().replace_all(name, BRAND.to_lowercase().as_str()).into_owned())
}

/// Rebrand every descriptor in every partition that exists.
///
/// A file whose rebranded name is already taken is left untouched, content
/// included, so its id keeps matching its file name.
pub fn rebrand(layout: &StoreLayout, dry_run: bool) -> Result<RebrandReport> {
    let mut report = RebrandReport::default();

    for dir in layout.all_partitions() {
        for path in descriptor_paths(&dir)? {
            let target = path
                .file_name()
                .and_then(|name| rebranded_file_name(&name.to_string_lossy()))
                .map(|name| path.with_file_name(name));

            if let Some(taken) = target.as_ref().filter(|target| target.exists()) {
                tracing::warn!(
                    path = %path.display(),
                    target = %taken.display(),
                    "rebranded file name already taken, skipping file"
                );
                report.refused.push(path);
                continue;
            }

            let mut file = read_descriptor(&path)?;
            if rebrand_descriptor(&mut file.descriptor) {
                if !dry_run {
                    write_descriptor(&path, &file.descriptor)?;
                }
                tracing::debug!(path = %path.display(), "rebranded descriptor");
                report.updated.push(path.clone());
            }

            let Some(target) = target else {
                continue;
            };
            if !dry_run {
                fs::rename(&path, &target).map_err(|source| StoreError::RenameFailed {
                    path: path.clone(),
                    source,
                })?;
            }
            report.renamed.push((path, target));
        }
    }

    Ok(report)
}
