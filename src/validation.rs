//! Schema validation for app descriptors.
//!
//! # Validation Rules
//!
//! - `id`: Required, kebab-case, 1-128 chars, must match the file stem (NFKC normalized)
//! - `name`: Required, non-empty string
//! - `description`: Required string
//! - `category`: Required, non-empty string
//! - `tags`, `screenshots`, `operatingSystem`: Optional arrays of strings
//! - `downloads`, `rating`, `price`: Optional non-negative numbers
//! - `featured`: Optional boolean
//! - `createdAt`, `updatedAt`: Optional RFC 3339 timestamps
//! - `mcpConfig`: Optional `{ command: string, args: string[], env: {string: string} }`
//!
//! Ids must also be unique across the whole store; see [`find_duplicate_ids`].

use std::collections::BTreeMap;
use std::path::Path;

use chrono::DateTime;
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use crate::descriptor::{Descriptor, DescriptorFile, MAX_ID_LENGTH};
use crate::error::ValidationError;

/// Optional fields that must be strings when present. `null` is tolerated.
const OPTIONAL_STRING_FIELDS: [&str; 9] = [
    "type",
    "version",
    "author",
    "license",
    "icon",
    "installCommand",
    "homepage",
    "repository",
    "runner",
];

const OPTIONAL_STRING_ARRAYS: [&str; 3] = ["tags", "screenshots", "operatingSystem"];

const OPTIONAL_NUMBERS: [&str; 3] = ["downloads", "rating", "price"];

const TIMESTAMP_FIELDS: [&str; 2] = ["createdAt", "updatedAt"];

/// Validate a single descriptor.
///
/// Returns every violation found. An empty list means the descriptor is valid.
///
/// # Arguments
///
/// * `descriptor` - The parsed descriptor.
/// * `file` - Optional path of the descriptor file, for id/file-name matching.
pub fn validate_descriptor(descriptor: &Descriptor, file: Option<&Path>) -> Vec<ValidationError> {
    let fields = descriptor.fields();
    let mut errors = Vec::new();

    match fields.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => {
            errors.extend(validate_id(id, file));
        }
        Some(Value::String(_)) => errors.push(ValidationError::EmptyField("id".to_string())),
        Some(_) => errors.push(invalid_type("id", "a string")),
        None => errors.push(ValidationError::MissingField("id".to_string())),
    }

    errors.extend(require_string(fields, "name", true));
    errors.extend(require_string(fields, "description", false));
    errors.extend(require_string(fields, "category", true));

    for field in OPTIONAL_STRING_FIELDS {
        match fields.get(field) {
            None | Some(Value::Null | Value::String(_)) => {}
            Some(_) => errors.push(invalid_type(field, "a string")),
        }
    }

    for field in OPTIONAL_STRING_ARRAYS {
        if let Some(value) = fields.get(field) {
            errors.extend(validate_string_array(field, value));
        }
    }

    for field in OPTIONAL_NUMBERS {
        match fields.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::Number(number)) => {
                let value = number.as_f64().unwrap_or_default();
                if value < 0.0 {
                    errors.push(ValidationError::NegativeNumber {
                        field: field.to_string(),
                        value,
                    });
                }
            }
            Some(_) => errors.push(invalid_type(field, "a number")),
        }
    }

    match fields.get("featured") {
        None | Some(Value::Null | Value::Bool(_)) => {}
        Some(_) => errors.push(invalid_type("featured", "a boolean")),
    }

    for field in TIMESTAMP_FIELDS {
        match fields.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) => {
                if DateTime::parse_from_rfc3339(text).is_err() {
                    errors.push(ValidationError::InvalidTimestamp {
                        field: field.to_string(),
                        value: text.clone(),
                    });
                }
            }
            Some(_) => errors.push(invalid_type(field, "a string")),
        }
    }

    if let Some(value) = fields.get("mcpConfig") {
        errors.extend(validate_mcp_config(value));
    }

    errors
}

/// Report every id used by more than one descriptor file.
///
/// Files without a string id are ignored here; [`validate_descriptor`]
/// reports those.
pub fn find_duplicate_ids(files: &[DescriptorFile]) -> Vec<ValidationError> {
    let mut seen: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for file in files {
        if let Some(id) = file.descriptor.id() {
            seen.entry(id)
                .or_default()
                .push(file.path.display().to_string());
        }
    }

    seen.into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(id, files)| ValidationError::DuplicateId {
            id: id.to_string(),
            files,
        })
        .collect()
}

/// Whether `id` is lowercase ASCII alphanumerics joined by single hyphens.
pub fn is_kebab_case(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('-')
        && !id.ends_with('-')
        && !id.contains("--")
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn validate_id(id: &str, file: Option<&Path>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let char_count = id.chars().count();
    if char_count > MAX_ID_LENGTH {
        errors.push(ValidationError::IdTooLong {
            id: id.to_string(),
            limit: MAX_ID_LENGTH,
            actual: char_count,
        });
    }

    // Checked on the raw value: the id is stamped into catalog paths verbatim.
    if !is_kebab_case(id) {
        errors.push(ValidationError::IdNotKebabCase(id.to_string()));
    }

    if let Some(stem) = file.and_then(Path::file_stem) {
        let stem = stem.to_string_lossy().to_string();
        let stem_norm: String = stem.nfkc().collect();
        let id_norm: String = id.nfkc().collect();
        if stem_norm != id_norm {
            errors.push(ValidationError::IdMismatch {
                stem,
                id: id.to_string(),
            });
        }
    }

    errors
}

fn require_string(
    fields: &Map<String, Value>,
    field: &str,
    non_empty: bool,
) -> Option<ValidationError> {
    match fields.get(field) {
        Some(Value::String(text)) if non_empty && text.trim().is_empty() => {
            Some(ValidationError::EmptyField(field.to_string()))
        }
        Some(Value::String(_)) => None,
        Some(_) => Some(invalid_type(field, "a string")),
        None => Some(ValidationError::MissingField(field.to_string())),
    }
}

fn validate_string_array(field: &str, value: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match value {
        Value::Null => {}
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if !item.is_string() {
                    errors.push(ValidationError::InvalidArrayItem {
                        field: field.to_string(),
                        index,
                    });
                }
            }
        }
        _ => errors.push(invalid_type(field, "an array of strings")),
    }

    errors
}

fn validate_mcp_config(value: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let Value::Object(config) = value else {
        if !value.is_null() {
            errors.push(invalid_type("mcpConfig", "an object"));
        }
        return errors;
    };

    match config.get("command") {
        None | Some(Value::String(_)) => {}
        Some(_) => errors.push(invalid_type("mcpConfig.command", "a string")),
    }

    if let Some(args) = config.get("args") {
        errors.extend(validate_string_array("mcpConfig.args", args));
    }

    match config.get("env") {
        None | Some(Value::Null) => {}
        Some(Value::Object(env)) => {
            for (key, val) in env {
                if !val.is_string() {
                    errors.push(ValidationError::InvalidEnvValue { key: key.clone() });
                }
            }
        }
        Some(_) => errors.push(invalid_type("mcpConfig.env", "an object")),
    }

    errors
}

fn invalid_type(field: &str, expected: &'static str) -> ValidationError {
    ValidationError::InvalidType {
        field: field.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn base_descriptor() -> Descriptor {
        serde_json::from_value(json!({
            "id": "audio-insight",
            "name": "Audio Insight",
            "description": "Transcribe and summarize audio",
            "category": "Media",
            "tags": ["audio", "Insight"],
            "type": "Tool",
            "downloads": 10,
            "featured": false,
            "createdAt": "2024-05-01T12:00:00.000Z",
            "mcpConfig": {"command": "deno", "args": ["@hanzo/audio-insight"], "env": {}}
        }))
        .expect("descriptor")
    }

    #[test]
    fn test_valid_descriptor() {
        let errors = validate_descriptor(&base_descriptor(), Some(Path::new("tools/audio-insight.json")));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["id", "name", "description", "category"] {
            let mut app = base_descriptor();
            app.fields_mut().remove(field);
            let errors = validate_descriptor(&app, None);
            assert!(
                errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::MissingField(f) if f == field)),
                "{field}: {errors:?}"
            );
        }
    }

    #[test]
    fn test_empty_description_is_allowed() {
        let mut app = base_descriptor();
        app.set("description", "");
        assert!(validate_descriptor(&app, None).is_empty());

        app.set("name", "  ");
        let errors = validate_descriptor(&app, None);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::EmptyField(f) if f == "name")));
    }

    #[test]
    fn test_id_rules() {
        for bad in ["Audio-Insight", "-audio", "audio-", "audio--insight", "audio_insight"] {
            let mut app = base_descriptor();
            app.set("id", bad);
            let errors = validate_descriptor(&app, None);
            assert!(
                errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::IdNotKebabCase(_))),
                "{bad}: {errors:?}"
            );
        }

        let mut app = base_descriptor();
        app.set("id", "a".repeat(MAX_ID_LENGTH + 1));
        let errors = validate_descriptor(&app, None);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::IdTooLong { .. })));

        let mut app = base_descriptor();
        app.set("id", 7);
        let errors = validate_descriptor(&app, None);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidType { field, .. } if field == "id")));
    }

    #[test]
    fn test_padded_and_full_width_ids_are_rejected() {
        for (bad, stem) in [(" x ", "x"), ("ｙ", "ｙ")] {
            let mut app = base_descriptor();
            app.set("id", bad);
            let path = PathBuf::from(format!("tools/{stem}.json"));
            let errors = validate_descriptor(&app, Some(&path));
            assert!(
                errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::IdNotKebabCase(id) if id == bad)),
                "{bad:?}: {errors:?}"
            );
        }
    }

    #[test]
    fn test_id_must_match_file_stem() {
        let errors = validate_descriptor(&base_descriptor(), Some(Path::new("tools/other.json")));
        assert!(errors.iter().any(
            |e| matches!(e, ValidationError::IdMismatch { stem, id } if stem == "other" && id == "audio-insight")
        ));
    }

    #[test]
    fn test_field_types() {
        let mut app = base_descriptor();
        app.set("tags", "audio");
        app.set("downloads", "many");
        app.set("featured", "yes");
        app.set("homepage", 12);
        let errors = validate_descriptor(&app, None);
        for field in ["tags", "downloads", "featured", "homepage"] {
            assert!(
                errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::InvalidType { field: f, .. } if f == field)),
                "{field}: {errors:?}"
            );
        }
    }

    #[test]
    fn test_nulls_are_tolerated_for_optional_fields() {
        let mut app = base_descriptor();
        app.set("homepage", Value::Null);
        app.set("rating", Value::Null);
        app.set("toolLanguage", Value::Null);
        app.set("mcpConfig", Value::Null);
        assert!(validate_descriptor(&app, None).is_empty());
    }

    #[test]
    fn test_numbers_and_timestamps() {
        let mut app = base_descriptor();
        app.set("price", -1);
        app.set("updatedAt", "yesterday");
        let errors = validate_descriptor(&app, None);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::NegativeNumber { field, .. } if field == "price")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidTimestamp { field, .. } if field == "updatedAt")));
    }

    #[test]
    fn test_mcp_config_rules() {
        let mut app = base_descriptor();
        app.set(
            "mcpConfig",
            json!({"command": 1, "args": ["ok", 2], "env": {"TOKEN": 5}}),
        );
        let errors = validate_descriptor(&app, None);
        assert!(errors.iter().any(
            |e| matches!(e, ValidationError::InvalidType { field, .. } if field == "mcpConfig.command")
        ));
        assert!(errors.iter().any(
            |e| matches!(e, ValidationError::InvalidArrayItem { field, index } if field == "mcpConfig.args" && *index == 1)
        ));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidEnvValue { key } if key == "TOKEN")));

        let mut app = base_descriptor();
        app.set("mcpConfig", "deno run");
        let errors = validate_descriptor(&app, None);
        assert!(errors.iter().any(
            |e| matches!(e, ValidationError::InvalidType { field, .. } if field == "mcpConfig")
        ));
    }

    #[test]
    fn test_duplicate_ids_across_partitions() {
        let file = |path: &str| DescriptorFile {
            path: PathBuf::from(path),
            descriptor: base_descriptor(),
        };
        let files = vec![
            file("data/agents/audio-insight.json"),
            file("data/tools/audio-insight.json"),
        ];
        let errors = find_duplicate_ids(&files);
        assert_eq!(errors.len(), 1);
        let message = errors[0].to_string();
        assert!(message.contains("Duplicate app id 'audio-insight'"));
        assert!(message.contains("data/agents/audio-insight.json"));
        assert!(message.contains("data/tools/audio-insight.json"));

        assert!(find_duplicate_ids(&files[..1]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_kebab_ids_are_accepted(id in "[a-z0-9]{1,8}(-[a-z0-9]{1,8}){0,6}") {
            let mut app = base_descriptor();
            app.set("id", id);
            let errors = validate_descriptor(&app, None);
            prop_assert!(errors.is_empty());
        }

        #[test]
        fn prop_uppercase_ids_are_rejected(id in "[A-Z]{1,10}") {
            prop_assert!(!is_kebab_case(&id));
        }
    }
}
