//! Import apps from the external store API into `data/apps/`.
//!
//! The API serves products page by page (`{ total, products: [...] }`).
//! Each product is converted into a descriptor and written to
//! `data/apps/{id}.json`. Products that cannot be converted are skipped.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::descriptor::{Descriptor, DEFAULT_DISPLAY_LICENSE, DEFAULT_DISPLAY_VERSION};
use crate::discovery::{write_descriptor, StoreLayout};
use crate::error::{ProductError, Result, StoreError};

/// Default product listing endpoint.
pub const DEFAULT_API_URL: &str = "https://store-api.shinkai.com/store/products";

/// Environment variable overriding [`DEFAULT_API_URL`].
pub const API_URL_ENV: &str = "HANZO_STORE_API";

/// Products requested per page.
pub const PAGE_SIZE: u32 = 50;

/// Pause between page requests.
pub const PAGE_DELAY: Duration = Duration::from_millis(100);

/// Total assumed when the first page does not report one.
const FALLBACK_TOTAL: u64 = 203;

const FALLBACK_CATEGORY: &str = "Utilities";

/// One page of the product listing.
#[derive(Debug, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub products: Vec<Value>,
}

fn str_field<'a>(product: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    product.get(key).and_then(Value::as_str)
}

/// The field's value, or `default` when it is absent or null.
fn value_or(product: &Map<String, Value>, key: &str, default: Value) -> Value {
    match product.get(key) {
        None | Some(Value::Null) => default,
        Some(value) => value.clone(),
    }
}

fn slug_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("slug regex"))
}

/// Kebab-case id derived from a product name.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let dashed = slug_separator().replace_all(&lowered, "-");
    let dashed = dashed.strip_prefix('-').unwrap_or(&dashed);
    dashed.strip_suffix('-').unwrap_or(dashed).to_string()
}

/// Shell command that runs a product, when its runner is known.
pub fn install_command(runner: Option<&str>, router_key: Option<&str>) -> String {
    match (runner, router_key) {
        (Some("deno"), Some(key)) if !key.is_empty() => format!("deno run -A {key}"),
        (Some("python"), Some(key)) if !key.is_empty() => format!("python {key}"),
        (Some("node"), Some(key)) if !key.is_empty() => format!("node {key}"),
        _ => String::new(),
    }
}

/// Number of pages needed to list `total` products.
pub const fn page_count(total: u64, limit: u32) -> u64 {
    total.div_ceil(limit as u64)
}

/// Convert one external product into a descriptor.
///
/// Only `name` and `author` are required. Every other field is read
/// leniently: a missing or wrongly-typed value falls back to its default.
pub fn convert_product(product: &Value) -> std::result::Result<Descriptor, ProductError> {
    let Value::Object(product) = product else {
        return Err(ProductError::NotAnObject);
    };
    let name = str_field(product, "name").ok_or(ProductError::MissingField("name"))?;
    let author = str_field(product, "author").ok_or(ProductError::MissingField("author"))?;

    let id = slugify(name);
    if id.is_empty() {
        return Err(ProductError::UnusableName(name.to_string()));
    }

    let runner = str_field(product, "runner");
    let router_key = str_field(product, "routerKey").filter(|key| !key.is_empty());

    let category = product
        .get("category")
        .and_then(|category| category.get("name"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_CATEGORY);

    let tags: Vec<&str> = product
        .get("keywords")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();

    let mcp_config = router_key.map(|key| {
        json!({
            "command": runner.unwrap_or("node"),
            "args": [key],
            "env": {}
        })
    });
    let created_at = str_field(product, "createdAt");

    let mut descriptor = Descriptor::default();
    descriptor.set("id", id);
    descriptor.set("name", name);
    descriptor.set("description", str_field(product, "description"));
    descriptor.set("version", DEFAULT_DISPLAY_VERSION);
    descriptor.set("author", author.replace('@', ""));
    descriptor.set(
        "repository",
        router_key.filter(|key| key.contains("github")),
    );
    descriptor.set("homepage", router_key);
    descriptor.set("license", DEFAULT_DISPLAY_LICENSE);
    descriptor.set("category", category);
    descriptor.set("tags", tags);
    descriptor.set("icon", str_field(product, "icon_url"));
    descriptor.set("screenshots", value_or(product, "banner_url", json!([])));
    descriptor.set("installCommand", install_command(runner, router_key));
    descriptor.set("mcpConfig", mcp_config);
    descriptor.set("downloads", value_or(product, "downloads", json!(0)));
    descriptor.set("createdAt", created_at);
    descriptor.set("updatedAt", created_at);
    descriptor.set("type", str_field(product, "type"));
    descriptor.set("toolLanguage", value_or(product, "toolLanguage", Value::Null));
    descriptor.set(
        "operatingSystem",
        value_or(product, "operating_system", json!([])),
    );
    descriptor.set("runner", runner);
    descriptor.set(
        "featured",
        product
            .get("featured")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    );
    descriptor.set("price", value_or(product, "price_usd", json!(0)));

    descriptor.fields_mut().retain(|_, value| !value.is_null());
    Ok(descriptor)
}

/// HTTP client for the external store API.
pub struct StoreApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl StoreApiClient {
    /// Create a client for `$HANZO_STORE_API`, or the default endpoint.
    pub fn new() -> Self {
        let base_url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        Self::with_url(base_url)
    }

    /// Create a client for a custom endpoint.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            base_url: url.into(),
            http: reqwest::Client::builder()
                .user_agent(concat!("hanzo-store/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of products, sorted by downloads.
    pub async fn fetch_page(&self, page: u64, limit: u32) -> Result<ProductPage> {
        tracing::info!(page, "fetching product page");
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("page", page.to_string()),
                ("limit", limit.to_string()),
                ("sort", "downloads".to_string()),
                ("type", "all".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Api(format!(
                "page {page} failed: HTTP {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Fetch every product, page by page, pausing `delay` between requests.
    pub async fn fetch_all(&self, limit: u32, delay: Duration) -> Result<Vec<Value>> {
        let first = self.fetch_page(1, limit).await?;
        let total = first.total.unwrap_or(FALLBACK_TOTAL);
        let pages = page_count(total, limit);
        tracing::info!(total, pages, "product listing size");

        let mut products = first.products;
        for page in 2..=pages {
            tokio::time::sleep(delay).await;
            let next = self.fetch_page(page, limit).await?;
            tracing::debug!(page, count = next.products.len(), "page fetched");
            products.extend(next.products);
        }

        Ok(products)
    }
}

impl Default for StoreApiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of an import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub fetched: usize,
    pub saved: usize,
    pub skipped: usize,
    pub dir: PathBuf,
}

/// Fetch all products and write one descriptor per product into `data/apps/`.
pub async fn import_products(
    client: &StoreApiClient,
    layout: &StoreLayout,
    delay: Duration,
) -> Result<ImportReport> {
    let dir = layout.apps_dir();
    fs::create_dir_all(&dir).map_err(|source| StoreError::WriteFailed {
        path: dir.clone(),
        source,
    })?;

    let products = client.fetch_all(PAGE_SIZE, delay).await?;
    let mut report = ImportReport {
        fetched: products.len(),
        dir: dir.clone(),
        ..ImportReport::default()
    };

    let mut written = HashSet::new();
    for product in &products {
        let label = product
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>");
        let descriptor = match convert_product(product) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::warn!(product = %label, error = %err, "failed to convert product");
                report.skipped += 1;
                continue;
            }
        };

        let id = descriptor.id().unwrap_or_default().to_string();
        if !written.insert(id.clone()) {
            tracing::warn!(product = %label, id = %id, "id already imported in this run, skipping");
            report.skipped += 1;
            continue;
        }

        let path = dir.join(format!("{id}.json"));
        write_descriptor(&path, &descriptor)?;
        report.saved += 1;
    }

    Ok(report)
}

/// Run [`import_products`] on a single-threaded runtime.
pub fn import_blocking(client: &StoreApiClient, layout: &StoreLayout) -> Result<ImportReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(StoreError::Runtime)?;
    runtime.block_on(import_products(client, layout, PAGE_DELAY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use tempfile::TempDir;

    #[test]
    fn slugify_names() {
        assert_eq!(slugify("Audio Insight"), "audio-insight");
        assert_eq!(slugify("  Shinkai: Web Search!! "), "shinkai-web-search");
        assert_eq!(slugify("X.com / Twitter"), "x-com-twitter");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn install_commands_per_runner() {
        assert_eq!(install_command(Some("deno"), Some("k")), "deno run -A k");
        assert_eq!(install_command(Some("python"), Some("k")), "python k");
        assert_eq!(install_command(Some("node"), Some("k")), "node k");
        assert_eq!(install_command(Some("rust"), Some("k")), "");
        assert_eq!(install_command(Some("deno"), None), "");
    }

    #[test]
    fn page_counts() {
        assert_eq!(page_count(203, 50), 5);
        assert_eq!(page_count(200, 50), 4);
        assert_eq!(page_count(0, 50), 0);
    }

    #[test]
    fn converts_full_product() {
        let descriptor = convert_product(&json!({
            "name": "Audio Insight",
            "description": "Summarize audio",
            "author": "@@official.shinkai",
            "category": {"name": "Media"},
            "runner": "deno",
            "routerKey": "local:::__official_shinkai:::audio_insight",
            "keywords": ["audio"],
            "icon_url": "https://cdn.example.com/icon.png",
            "downloads": 42,
            "createdAt": "2024-05-01T12:00:00.000Z",
            "type": "Tool",
            "featured": true,
            "price_usd": 1.5
        }))
        .expect("convert");

        assert_eq!(descriptor.id(), Some("audio-insight"));
        assert_eq!(descriptor.author(), Some("official.shinkai"));
        assert_eq!(descriptor.category(), Some("Media"));
        assert_eq!(descriptor.version(), Some("1.0.0"));
        assert_eq!(descriptor.license(), Some("MIT"));
        assert_eq!(
            descriptor.install_command(),
            Some("deno run -A local:::__official_shinkai:::audio_insight")
        );
        assert_eq!(
            descriptor.get("mcpConfig"),
            Some(&json!({
                "command": "deno",
                "args": ["local:::__official_shinkai:::audio_insight"],
                "env": {}
            }))
        );
        assert_eq!(descriptor.get("updatedAt"), descriptor.get("createdAt"));
        assert!(descriptor.featured());
        assert_eq!(descriptor.repository(), None);
        assert!(descriptor.fields().keys().next().is_some_and(|k| k == "id"));
    }

    #[test]
    fn converts_minimal_product_with_defaults() {
        let descriptor = convert_product(&json!({
            "name": "Git Helper",
            "author": "dev",
            "routerKey": "https://github.com/dev/git-helper"
        }))
        .expect("convert");

        assert_eq!(descriptor.category(), Some("Utilities"));
        assert_eq!(descriptor.repository(), Some("https://github.com/dev/git-helper"));
        assert_eq!(descriptor.get("tags"), Some(&json!([])));
        assert_eq!(descriptor.get("screenshots"), Some(&json!([])));
        assert_eq!(descriptor.get("installCommand"), Some(&json!("")));
        assert_eq!(
            descriptor.get("mcpConfig").and_then(|c| c.get("command")),
            Some(&json!("node"))
        );
        assert_eq!(descriptor.get("downloads"), Some(&json!(0)));
        assert_eq!(descriptor.get("price"), Some(&json!(0)));
        assert!(!descriptor.featured());
        assert!(descriptor.get("icon").is_none());
        assert!(descriptor.get("type").is_none());
    }

    #[test]
    fn products_without_name_or_author_fail() {
        assert_eq!(
            convert_product(&json!({"author": "dev"})).unwrap_err(),
            ProductError::MissingField("name")
        );
        assert_eq!(
            convert_product(&json!({"name": "X"})).unwrap_err(),
            ProductError::MissingField("author")
        );
        assert_eq!(
            convert_product(&json!("X")).unwrap_err(),
            ProductError::NotAnObject
        );
    }

    #[test]
    fn names_without_id_characters_fail() {
        assert_eq!(
            convert_product(&json!({"name": "日本語ツール", "author": "dev"})).unwrap_err(),
            ProductError::UnusableName("日本語ツール".to_string())
        );
        assert!(convert_product(&json!({"name": "!!!", "author": "dev"})).is_err());
    }

    #[test]
    fn loosely_typed_fields_fall_back_to_defaults() {
        let descriptor = convert_product(&json!({
            "name": "Loose",
            "author": "dev",
            "category": "Media",
            "keywords": ["ok", 3, null, "fine"],
            "featured": "yes",
            "runner": 7
        }))
        .expect("convert");

        assert_eq!(descriptor.category(), Some("Utilities"));
        assert_eq!(descriptor.get("tags"), Some(&json!(["ok", "fine"])));
        assert!(!descriptor.featured());
        assert_eq!(descriptor.get("runner"), None);
        assert_eq!(descriptor.get("installCommand"), Some(&json!("")));
    }

    /// Serve canned pages over plain HTTP, one connection per request.
    fn serve_pages(pages: Vec<Value>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        std::thread::spawn(move || {
            for stream in listener.incoming().take(pages.len()) {
                let mut stream = stream.expect("accept");
                let mut buf = [0u8; 4096];
                let n = stream.read(&mut buf).expect("read request");
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let page: usize = request
                    .split(['?', '&', ' '])
                    .find_map(|part| part.strip_prefix("page="))
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(1);
                let body = pages[page - 1].to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).expect("write response");
            }
        });
        format!("http://{addr}/store/products")
    }

    fn product(name: &str) -> Value {
        json!({"name": name, "author": "dev", "category": {"name": "Media"}})
    }

    #[tokio::test]
    async fn fetch_all_walks_every_page() {
        let url = serve_pages(vec![
            json!({"total": 3, "products": [product("Alpha"), product("Beta")]}),
            json!({"total": 3, "products": [product("Gamma")]}),
        ]);
        let client = StoreApiClient::with_url(url);
        let products = client.fetch_all(2, Duration::ZERO).await.expect("fetch");
        let names: Vec<&str> = products
            .iter()
            .filter_map(|p| p.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn import_writes_descriptors_and_skips_bad_products() {
        let url = serve_pages(vec![json!({
            "total": 4,
            "products": [
                product("Alpha"),
                {"author": "nameless"},
                product("日本語ツール"),
                {"name": "ALPHA!", "author": "other", "category": {"name": "Games"}}
            ]
        })]);
        let dir = TempDir::new().expect("temp dir");
        let layout = StoreLayout::new(dir.path());
        let client = StoreApiClient::with_url(url);

        let report = import_products(&client, &layout, Duration::ZERO)
            .await
            .expect("import");
        assert_eq!(report.fetched, 4);
        assert_eq!(report.saved, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.dir, layout.apps_dir());

        let written = crate::discovery::read_descriptor(&layout.apps_dir().join("alpha.json"))
            .expect("read");
        assert_eq!(written.descriptor.name(), Some("Alpha"));
        assert_eq!(written.descriptor.category(), Some("Media"));
        assert!(!layout.apps_dir().join(".json").exists());
        assert_eq!(
            crate::discovery::descriptor_paths(&layout.apps_dir())
                .expect("list")
                .len(),
            1
        );
    }
}
