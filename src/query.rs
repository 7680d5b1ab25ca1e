//! Catalog search: type, category and text filters plus the storefront ordering.

use std::cmp::Ordering;

use crate::descriptor::{AppType, Descriptor};

/// Filter value meaning "no filter".
pub const ALL: &str = "all";

/// Search inputs. `None` means the filter is not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub query: String,
    pub category: Option<String>,
    pub app_type: Option<String>,
}

impl Filter {
    /// Build a filter from raw inputs, treating `"all"` as no filter.
    pub fn new(query: impl Into<String>, category: Option<&str>, app_type: Option<&str>) -> Self {
        let selection = |value: Option<&str>| value.filter(|v| *v != ALL).map(str::to_string);
        Self {
            query: query.into(),
            category: selection(category),
            app_type: selection(app_type),
        }
    }

    /// Whether an app passes every active filter.
    pub fn matches(&self, app: &Descriptor) -> bool {
        if let Some(app_type) = &self.app_type {
            if app.type_field() != Some(app_type.as_str()) {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if app.category() != Some(category.as_str()) {
                return false;
            }
        }

        if self.query.trim().is_empty() {
            return true;
        }

        let query = self.query.to_lowercase();
        let contains = |text: &str| text.to_lowercase().contains(&query);
        contains(app.name().unwrap_or_default())
            || contains(app.description().unwrap_or_default())
            || app.tags().any(contains)
    }
}

/// Storefront ordering: featured apps first, then downloads descending.
pub fn storefront_order(a: &Descriptor, b: &Descriptor) -> Ordering {
    b.featured().cmp(&a.featured()).then_with(|| {
        b.downloads()
            .partial_cmp(&a.downloads())
            .unwrap_or(Ordering::Equal)
    })
}

/// Apply the filter and sort the matches. The sort is stable.
pub fn search<'a>(apps: &'a [Descriptor], filter: &Filter) -> Vec<&'a Descriptor> {
    let mut matches: Vec<&Descriptor> = apps.iter().filter(|app| filter.matches(app)).collect();
    matches.sort_by(|a, b| storefront_order(a, b));
    matches
}

/// App counts for the type filter bar: all apps, agents, tools.
pub fn type_counts(apps: &[Descriptor]) -> [(&'static str, usize); 3] {
    let count = |ty: AppType| {
        apps.iter()
            .filter(|app| app.type_field() == Some(ty.as_str()))
            .count()
    };
    [
        (ALL, apps.len()),
        (AppType::Agent.as_str(), count(AppType::Agent)),
        (AppType::Tool.as_str(), count(AppType::Tool)),
    ]
}
