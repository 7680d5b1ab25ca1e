//! Error types for hanzo-store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading a file or directory failed.
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a file or creating a directory failed.
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Moving or renaming a file failed.
    #[error("Failed to rename {path}: {source}")]
    RenameFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A descriptor or catalog file is not valid JSON, or not a JSON object.
    #[error("Invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing a document failed.
    #[error("Failed to serialize {path}: {source}")]
    SerializeFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A directory an operation requires is missing.
    #[error("Directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    /// No app with the given id exists in the catalog.
    #[error("App not found: {0}")]
    AppNotFound(String),

    /// One or more descriptors failed to load or validate.
    #[error("{count} descriptor file(s) failed validation")]
    InvalidDescriptors { count: usize },

    /// The external catalog API could not be reached or decoded.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The external catalog API answered with a non-success status.
    #[error("store API error: {0}")]
    Api(String),

    /// The async runtime for network operations could not start.
    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Why an external product could not be turned into a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("product is not a JSON object")]
    NotAnObject,

    #[error("product has no string '{0}'")]
    MissingField(&'static str),

    /// The name slugs to an empty id.
    #[error("product name '{0}' has no characters usable in an app id")]
    UnusableName(String),
}

/// A schema violation found in a single descriptor, or across the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is absent.
    #[error("Missing required field in descriptor: {0}")]
    MissingField(String),

    /// A required string field is empty.
    #[error("Field '{0}' must be a non-empty string")]
    EmptyField(String),

    /// A field has the wrong JSON type.
    #[error("Field '{field}' must be {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    /// An array field contains a non-string entry.
    #[error("Field '{field}' item {index} must be a string")]
    InvalidArrayItem { field: String, index: usize },

    /// The id exceeds the maximum length.
    #[error("App id '{id}' exceeds {limit} character limit ({actual} chars)")]
    IdTooLong {
        id: String,
        limit: usize,
        actual: usize,
    },

    /// The id is not kebab-case.
    #[error("App id '{0}' must be kebab-case: lowercase letters, digits and single hyphens")]
    IdNotKebabCase(String),

    /// The id does not match the file it lives in.
    #[error("File name '{stem}.json' must match app id '{id}'")]
    IdMismatch { stem: String, id: String },

    /// A numeric field is negative.
    #[error("Field '{field}' must not be negative (got {value})")]
    NegativeNumber { field: String, value: f64 },

    /// A timestamp field is not RFC 3339.
    #[error("Field '{field}' must be an ISO-8601 timestamp (got '{value}')")]
    InvalidTimestamp { field: String, value: String },

    /// `mcpConfig.env` contains a non-string value.
    #[error("Field 'mcpConfig.env' value for '{key}' must be a string")]
    InvalidEnvValue { key: String },

    /// The same id is used by more than one descriptor file.
    #[error("Duplicate app id '{id}' in {}", files.join(", "))]
    DuplicateId { id: String, files: Vec<String> },
}
