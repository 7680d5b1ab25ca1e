//! Descriptor file discovery.
//!
//! A store root holds descriptor partitions under `data/` (`agents/` and
//! `tools/`, or the legacy flat `apps/`) and the generated catalog under
//! `public/`. Partitions are scanned non-recursively; a missing partition
//! simply contributes nothing.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use crate::descriptor::{Descriptor, DescriptorFile, DESCRIPTOR_EXTENSION};
use crate::error::{Result, StoreError};

/// Which directory layout the descriptor store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// `data/agents/` and `data/tools/`.
    #[default]
    Partitioned,
    /// A single flat `data/apps/` directory.
    Legacy,
}

/// Paths of a store checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at the enclosing repository.
    pub fn discover() -> Self {
        Self::new(repo_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.data_dir().join("agents")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.data_dir().join("tools")
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.data_dir().join("apps")
    }

    /// Default location of the consolidated catalog.
    pub fn catalog_path(&self) -> PathBuf {
        self.root.join("public").join("store.json")
    }

    /// Partition directories in build order.
    pub fn partitions(&self, layout: Layout) -> Vec<PathBuf> {
        match layout {
            Layout::Partitioned => vec![self.agents_dir(), self.tools_dir()],
            Layout::Legacy => vec![self.apps_dir()],
        }
    }

    /// Every partition directory that may hold descriptors, legacy included.
    pub fn all_partitions(&self) -> Vec<PathBuf> {
        vec![self.apps_dir(), self.agents_dir(), self.tools_dir()]
    }
}

/// Find the repository root by looking for a git directory.
///
/// Falls back to the current working directory if not in a git repository.
pub fn repo_root() -> PathBuf {
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
    {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Convert a path to a display-friendly relative path.
pub fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| rel.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

/// Whether a file name looks like a descriptor file.
pub fn is_descriptor_name(name: &str) -> bool {
    name.ends_with(&format!(".{DESCRIPTOR_EXTENSION}"))
}

/// List the descriptor files directly inside `dir`, sorted by file name.
///
/// A directory that does not exist yields an empty list.
pub fn descriptor_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        tracing::debug!(path = %dir.display(), "partition does not exist");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| StoreError::ReadFailed {
            path: err
                .path()
                .map_or_else(|| dir.to_path_buf(), Path::to_path_buf),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_descriptor_name(&entry.file_name().to_string_lossy()) {
            paths.push(entry.into_path());
        } else {
            tracing::trace!(path = %entry.path().display(), "not a descriptor, skipping");
        }
    }

    Ok(paths)
}

/// Read and parse one descriptor file.
pub fn read_descriptor(path: &Path) -> Result<DescriptorFile> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let descriptor: Descriptor =
        serde_json::from_str(&content).map_err(|source| StoreError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), id = descriptor.id().unwrap_or(""), "read descriptor");
    Ok(DescriptorFile {
        path: path.to_path_buf(),
        descriptor,
    })
}

/// Write a descriptor back as pretty-printed JSON.
pub fn write_descriptor(path: &Path, descriptor: &Descriptor) -> Result<()> {
    let mut json =
        serde_json::to_string_pretty(descriptor).map_err(|source| StoreError::SerializeFailed {
            path: path.to_path_buf(),
            source,
        })?;
    json.push('\n');
    fs::write(path, json).map_err(|source| StoreError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
