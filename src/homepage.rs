//! Homepage normalization.
//!
//! Older descriptors identify their package with a colon-delimited syntax
//! such as `local:::__official_shinkai:::audio_insight`. The catalog exposes
//! package names instead (`@hanzo/audio-insight`). The rewrite is idempotent:
//! its output never contains the delimiter, so rebuilding is always safe.

use serde_json::Value;

use crate::descriptor::{Descriptor, LEGACY_DELIMITER, PACKAGE_NAMESPACE};

/// Rewrite a legacy identifier into a package name.
///
/// Strings without the `:::` delimiter are returned unchanged.
pub fn normalize_homepage(value: &str) -> String {
    if value.is_empty() || !value.contains(LEGACY_DELIMITER) {
        return value.to_string();
    }

    let last = value.split(LEGACY_DELIMITER).last().unwrap_or_default();
    format!("{PACKAGE_NAMESPACE}{}", last.replace('_', "-"))
}

/// Apply [`normalize_homepage`] to a JSON value. Non-strings pass through.
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(normalize_homepage(text)),
        other => other.clone(),
    }
}

/// Normalize `homepage` and every `mcpConfig.args` entry of a descriptor.
///
/// Returns whether anything changed.
pub fn normalize_descriptor(descriptor: &mut Descriptor) -> bool {
    let mut changed = false;
    let fields = descriptor.fields_mut();

    if let Some(homepage) = fields.get_mut("homepage") {
        let normalized = normalize_value(homepage);
        if *homepage != normalized {
            *homepage = normalized;
            changed = true;
        }
    }

    if let Some(Value::Array(args)) = fields
        .get_mut("mcpConfig")
        .and_then(Value::as_object_mut)
        .and_then(|config| config.get_mut("args"))
    {
        for arg in args.iter_mut() {
            let normalized = normalize_value(arg);
            if *arg != normalized {
                *arg = normalized;
                changed = true;
            }
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn rewrites_legacy_identifier() {
        assert_eq!(
            normalize_homepage("local:::__official_shinkai:::audio_insight"),
            "@hanzo/audio-insight"
        );
        assert_eq!(normalize_homepage("a:::b_c_d"), "@hanzo/b-c-d");
    }

    #[test]
    fn leaves_other_values_alone() {
        assert_eq!(normalize_homepage("https://example.com"), "https://example.com");
        assert_eq!(normalize_homepage(""), "");
        assert_eq!(normalize_homepage("a::b"), "a::b");
        assert_eq!(normalize_homepage("@hanzo/audio-insight"), "@hanzo/audio-insight");
    }

    #[test]
    fn splits_left_to_right() {
        // The last segment of "a::::" is ":" when scanning from the left.
        assert_eq!(normalize_homepage("a::::"), "@hanzo/:");
        assert_eq!(normalize_homepage("x:::"), "@hanzo/");
    }

    #[test]
    fn non_string_values_pass_through() {
        assert_eq!(normalize_value(&Value::Null), Value::Null);
        assert_eq!(normalize_value(&json!(3)), json!(3));
    }

    #[test]
    fn normalizes_homepage_and_args() {
        let mut app: Descriptor = serde_json::from_value(json!({
            "id": "audio-insight",
            "homepage": "local:::__official_shinkai:::audio_insight",
            "mcpConfig": {
                "command": "deno",
                "args": ["local:::__official_shinkai:::audio_insight", "--flag", 5],
                "env": {}
            }
        }))
        .expect("descriptor");

        assert!(normalize_descriptor(&mut app));
        assert_eq!(app.homepage(), Some("@hanzo/audio-insight"));
        assert_eq!(
            app.get("mcpConfig").and_then(|c| c.get("args")),
            Some(&json!(["@hanzo/audio-insight", "--flag", 5]))
        );
        assert!(!normalize_descriptor(&mut app));
    }

    #[test]
    fn absent_fields_stay_absent() {
        let mut app: Descriptor =
            serde_json::from_value(json!({"id": "plain", "mcpConfig": {"command": "node"}}))
                .expect("descriptor");
        assert!(!normalize_descriptor(&mut app));
        assert!(app.get("homepage").is_none());
        assert!(app.get("mcpConfig").and_then(|c| c.get("args")).is_none());
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(input in ".*") {
            let once = normalize_homepage(&input);
            prop_assert_eq!(normalize_homepage(&once), once);
        }

        #[test]
        fn prop_delimiter_free_strings_unchanged(input in "[^:]*(:[^:]+)*:?") {
            prop_assert_eq!(normalize_homepage(&input), input);
        }

        #[test]
        fn prop_legacy_ids_gain_namespace(
            source in "[a-z_]{1,12}",
            name in "[a-z0-9_]{1,16}",
        ) {
            let legacy = format!("local:::{source}:::{name}");
            let normalized = normalize_homepage(&legacy);
            prop_assert!(normalized.starts_with(PACKAGE_NAMESPACE));
            prop_assert!(!normalized.contains('_'));
        }
    }
}
