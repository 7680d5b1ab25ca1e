//! Split the flat `data/apps/` directory into `data/agents/` and `data/tools/`.
//!
//! Files are moved, never rewritten. Apps whose `type` is not `Agent` or
//! `Tool` land in `tools/` and are counted separately.

use std::fs;
use std::path::PathBuf;

use crate::discovery::{descriptor_paths, read_descriptor, StoreLayout};
use crate::error::{Result, StoreError};

/// Outcome of a reorganization.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReorganizeReport {
    /// Files routed to `agents/`.
    pub agents: usize,
    /// Files with `type: "Tool"` routed to `tools/`.
    pub tools: usize,
    /// Files with a missing or unknown type routed to `tools/`.
    pub unknown: usize,
    /// Files left in place because the target already exists.
    pub refused: Vec<PathBuf>,
    /// Whether the emptied `apps/` directory was removed.
    pub removed_apps_dir: bool,
}

impl ReorganizeReport {
    pub const fn moved(&self) -> usize {
        self.agents + self.tools + self.unknown
    }
}

/// Move every descriptor in `data/apps/` into its partition.
///
/// With `dry_run` nothing on disk changes; the report shows what would happen.
pub fn reorganize(layout: &StoreLayout, dry_run: bool) -> Result<ReorganizeReport> {
    let apps_dir = layout.apps_dir();
    if !apps_dir.is_dir() {
        return Err(StoreError::MissingDirectory(apps_dir));
    }

    if !dry_run {
        for dir in [layout.agents_dir(), layout.tools_dir()] {
            fs::create_dir_all(&dir).map_err(|source| StoreError::WriteFailed {
                path: dir.clone(),
                source,
            })?;
        }
    }

    let mut report = ReorganizeReport::default();

    for path in descriptor_paths(&apps_dir)? {
        let file = read_descriptor(&path)?;
        let target_dir = layout.data_dir().join(file.descriptor.app_type().partition());
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = target_dir.join(file_name);

        if target.exists() {
            tracing::warn!(
                path = %path.display(),
                target = %target.display(),
                "target already exists, leaving file in place"
            );
            report.refused.push(path);
            continue;
        }

        if !dry_run {
            fs::rename(&path, &target).map_err(|source| StoreError::RenameFailed {
                path: path.clone(),
                source,
            })?;
        }
        tracing::debug!(from = %path.display(), to = %target.display(), "moved descriptor");

        match file.descriptor.type_field() {
            Some("Agent") => report.agents += 1,
            Some("Tool") => report.tools += 1,
            _ => report.unknown += 1,
        }
    }

    if !dry_run {
        let remaining = fs::read_dir(&apps_dir)
            .map_err(|source| StoreError::ReadFailed {
                path: apps_dir.clone(),
                source,
            })?
            .count();
        if remaining == 0 {
            fs::remove_dir(&apps_dir).map_err(|source| StoreError::WriteFailed {
                path: apps_dir.clone(),
                source,
            })?;
            report.removed_apps_dir = true;
        }
    }

    Ok(report)
}
