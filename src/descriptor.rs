//! Core descriptor types and constants.
//!
//! A descriptor is one JSON object describing an installable app. The store
//! keeps it as an ordered JSON map so the catalog builder can pass every field
//! through untouched; the accessors here read fields leniently, treating a
//! missing or wrongly-typed field as absent.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File extension of descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "json";

/// Delimiter of the legacy colon-delimited identifier syntax.
pub const LEGACY_DELIMITER: &str = ":::";

/// Package namespace that legacy identifiers are rewritten into.
pub const PACKAGE_NAMESPACE: &str = "@hanzo/";

/// Canonical hosting location stamped into every catalog entry.
pub const CANONICAL_REPOSITORY: &str = "github.com/hanzoai/tools";

/// Version of the consolidated catalog document format.
pub const CATALOG_VERSION: &str = "1.0.0";

/// Version shown when a descriptor has none.
pub const DEFAULT_DISPLAY_VERSION: &str = "1.0.0";

/// License shown when a descriptor has none.
pub const DEFAULT_DISPLAY_LICENSE: &str = "MIT";

/// Maximum length for app ids (in characters).
pub const MAX_ID_LENGTH: usize = 128;

/// Top-level kind of an app. Anything that is not literally `"Agent"` is a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AppType {
    Agent,
    Tool,
}

impl AppType {
    /// Resolve the `type` field, defaulting to [`AppType::Tool`].
    pub fn from_field(value: Option<&str>) -> Self {
        match value {
            Some("Agent") => Self::Agent,
            _ => Self::Tool,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "Agent",
            Self::Tool => "Tool",
        }
    }

    /// Name of the partition directory holding apps of this type.
    pub const fn partition(self) -> &'static str {
        match self {
            Self::Agent => "agents",
            Self::Tool => "tools",
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One app record, kept as the ordered JSON object it was read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    fields: Map<String, Value>,
}

impl Descriptor {
    pub const fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Insert or replace a field. Existing keys keep their position.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    pub fn category(&self) -> Option<&str> {
        self.str_field("category")
    }

    /// The raw `type` field, if it is a string.
    pub fn type_field(&self) -> Option<&str> {
        self.str_field("type")
    }

    pub fn app_type(&self) -> AppType {
        AppType::from_field(self.type_field())
    }

    pub fn version(&self) -> Option<&str> {
        self.str_field("version")
    }

    pub fn author(&self) -> Option<&str> {
        self.str_field("author")
    }

    pub fn license(&self) -> Option<&str> {
        self.str_field("license")
    }

    pub fn homepage(&self) -> Option<&str> {
        self.str_field("homepage")
    }

    pub fn repository(&self) -> Option<&str> {
        self.str_field("repository")
    }

    pub fn install_command(&self) -> Option<&str> {
        self.str_field("installCommand")
    }

    /// String tags, skipping any non-string entries.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.fields
            .get("tags")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    pub fn featured(&self) -> bool {
        matches!(self.fields.get("featured"), Some(Value::Bool(true)))
    }

    /// Download count, `0` when absent.
    pub fn downloads(&self) -> f64 {
        self.fields
            .get("downloads")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

impl From<Map<String, Value>> for Descriptor {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_map(fields)
    }
}

/// A descriptor together with the file it was loaded from.
#[derive(Debug, Clone)]
pub struct DescriptorFile {
    /// Path to the `.json` file.
    pub path: PathBuf,
    /// The parsed descriptor.
    pub descriptor: Descriptor,
}

impl DescriptorFile {
    /// File name without the `.json` extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}
