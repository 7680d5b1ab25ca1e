use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use hanzo_store::descriptor::{DEFAULT_DISPLAY_LICENSE, DEFAULT_DISPLAY_VERSION};
use hanzo_store::import::{import_blocking, StoreApiClient};
use hanzo_store::query::type_counts;
use hanzo_store::rebrand::rebrand;
use hanzo_store::reorganize::reorganize;
use hanzo_store::{
    build_store, display_path, install_url, load_catalog, load_store, sanitize_url, search,
    BuildOptions, BuildOutcome, Catalog, CatalogSummary, Descriptor, FileReport, Filter, Layout,
    StoreError, StoreLayout,
};

#[derive(Parser)]
#[command(name = "hanzo-store", version, about = "Build and maintain the Hanzo app store catalog")]
struct Cli {
    /// Store root (defaults to the git work tree root, else the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build public/store.json from the descriptor store
    Build {
        /// Catalog output path
        #[arg(long)]
        output: Option<PathBuf>,
        /// Read the single data/apps directory and skip homepage normalization
        #[arg(long)]
        legacy: bool,
        /// Only stop on unreadable or unparseable files
        #[arg(long)]
        no_validate: bool,
        /// Print the build summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate every descriptor without writing anything
    Check {
        /// Read the single data/apps directory
        #[arg(long)]
        legacy: bool,
        /// Print a JSON report
        #[arg(long)]
        json: bool,
        /// Only print problems
        #[arg(short, long)]
        quiet: bool,
    },
    /// Search a built catalog
    Search {
        /// Text matched against name, description and tags
        #[arg(default_value = "")]
        query: String,
        /// Category filter ("all" for none)
        #[arg(long, default_value = "all")]
        category: String,
        /// Type filter: Agent, Tool or "all"
        #[arg(long = "type", default_value = "all")]
        app_type: String,
        /// Catalog to read
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Print matching descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one app from a built catalog
    Show {
        id: String,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Print the install URL for an app
    InstallUrl {
        id: String,
        /// Connected wallet address
        #[arg(long)]
        wallet: Option<String>,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Move data/apps descriptors into data/agents and data/tools
    Reorganize {
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace the old brand in names, descriptions, authors and file names
    Rebrand {
        #[arg(long)]
        dry_run: bool,
    },
    /// Import products from the store API into data/apps
    Import {
        /// API endpoint (defaults to $HANZO_STORE_API)
        #[arg(long)]
        api: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "warn" });

    let store = cli.root.map_or_else(StoreLayout::discover, StoreLayout::new);

    let exit_code = match cli.command {
        Command::Build {
            output,
            legacy,
            no_validate,
            json,
        } => run_build(&store, output, legacy, no_validate, json),
        Command::Check {
            legacy,
            json,
            quiet,
        } => run_check(&store, legacy, json, quiet),
        Command::Search {
            query,
            category,
            app_type,
            catalog,
            json,
        } => run_search(&store, catalog, &query, &category, &app_type, json),
        Command::Show { id, catalog } => run_show(&store, catalog, &id),
        Command::InstallUrl {
            id,
            wallet,
            catalog,
        } => run_install_url(&store, catalog, &id, wallet.as_deref()),
        Command::Reorganize { dry_run } => run_reorganize(&store, dry_run),
        Command::Rebrand { dry_run } => run_rebrand(&store, dry_run),
        Command::Import { api } => run_import(&store, api),
    };

    std::process::exit(exit_code);
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

const fn layout_for(legacy: bool) -> Layout {
    if legacy {
        Layout::Legacy
    } else {
        Layout::Partitioned
    }
}

fn report_error(err: &StoreError) -> i32 {
    eprintln!("Error: {err}");
    1
}

fn report_problems(store: &StoreLayout, problems: &[FileReport]) {
    for problem in problems {
        eprintln!(
            "Validation failed for {}:",
            display_path(&problem.path, store.root())
        );
        for error in &problem.errors {
            eprintln!("  - {error}");
        }
    }
}

fn print_json(value: &impl Serialize) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            0
        }
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}

/// `build --json` output: the catalog counts plus where it was written.
#[derive(Serialize)]
struct BuildSummary<'a> {
    #[serde(flatten)]
    summary: CatalogSummary,
    output: &'a Path,
}

fn run_build(
    store: &StoreLayout,
    output: Option<PathBuf>,
    legacy: bool,
    no_validate: bool,
    json: bool,
) -> i32 {
    let options = BuildOptions {
        layout: layout_for(legacy),
        output,
        skip_validation: no_validate,
    };

    match build_store(store, &options) {
        Ok(BuildOutcome::Written { path, summary }) => {
            if json {
                return print_json(&BuildSummary {
                    summary,
                    output: &path,
                });
            }
            println!("Built store.json with {} apps", summary.total);
            println!("  Agents: {}", summary.agents);
            println!("  Tools: {}", summary.tools);
            println!("  Categories: {}", summary.categories);
            println!("  Output: {}", display_path(&path, store.root()));
            0
        }
        Ok(BuildOutcome::Rejected(problems)) => {
            report_problems(store, &problems);
            report_error(&StoreError::InvalidDescriptors {
                count: problems.len(),
            })
        }
        Err(err) => report_error(&err),
    }
}

fn run_check(store: &StoreLayout, legacy: bool, json: bool, quiet: bool) -> i32 {
    let contents = match load_store(store, layout_for(legacy), true) {
        Ok(contents) => contents,
        Err(err) => return report_error(&err),
    };
    let valid = contents.is_valid();

    if json {
        let code = print_json(&json!({
            "version": env!("CARGO_PKG_VERSION"),
            "status": if valid { "valid" } else { "invalid" },
            "descriptors": contents.files.len(),
            "problems": contents.problems,
        }));
        return if valid { code } else { 1 };
    }

    if !valid {
        report_problems(store, &contents.problems);
        return 1;
    }

    if !quiet {
        println!("{} descriptors valid.", contents.files.len());
    }
    0
}

fn open_catalog(store: &StoreLayout, catalog: Option<PathBuf>) -> Result<Catalog, StoreError> {
    let path = catalog.unwrap_or_else(|| store.catalog_path());
    load_catalog(&path)
}

fn run_search(
    store: &StoreLayout,
    catalog: Option<PathBuf>,
    query: &str,
    category: &str,
    app_type: &str,
    json: bool,
) -> i32 {
    let catalog = match open_catalog(store, catalog) {
        Ok(catalog) => catalog,
        Err(err) => return report_error(&err),
    };

    let filter = Filter::new(query, Some(category), Some(app_type));
    let matches = search(&catalog.apps, &filter);

    if json {
        return print_json(&matches);
    }

    let counts = type_counts(&catalog.apps)
        .iter()
        .map(|(label, count)| format!("{label}: {count}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{counts}");

    for app in &matches {
        println!(
            "{} {}  ({})  {}  {}  {} downloads",
            if app.featured() { "*" } else { " " },
            app.name().unwrap_or_default(),
            app.id().unwrap_or_default(),
            app.type_field().unwrap_or_default(),
            app.category().unwrap_or_default(),
            app.downloads(),
        );
    }
    println!("{} apps found", matches.len());
    0
}

fn find_app(catalog: &Catalog, id: &str) -> Result<Descriptor, StoreError> {
    catalog
        .find(id)
        .cloned()
        .ok_or_else(|| StoreError::AppNotFound(id.to_string()))
}

fn format_price(price: &Value) -> String {
    match price.as_f64() {
        Some(amount) if amount == 0.0 => "Free".to_string(),
        _ => format!("${price}"),
    }
}

fn run_show(store: &StoreLayout, catalog: Option<PathBuf>, id: &str) -> i32 {
    let app = match open_catalog(store, catalog).and_then(|catalog| find_app(&catalog, id)) {
        Ok(app) => app,
        Err(err) => return report_error(&err),
    };

    println!("{}", app.name().unwrap_or_default());
    println!("{}", app.description().unwrap_or_default());
    println!();
    println!("Version   {}", app.version().unwrap_or(DEFAULT_DISPLAY_VERSION));
    println!("Author    {}", app.author().unwrap_or_default());
    println!("License   {}", app.license().unwrap_or(DEFAULT_DISPLAY_LICENSE));
    println!("Category  {}", app.category().unwrap_or_default());
    println!("Type      {}", app.type_field().unwrap_or_default());
    if let Some(price) = app.get("price") {
        println!("Price     {}", format_price(price));
    }

    let tags: Vec<&str> = app.tags().collect();
    if !tags.is_empty() {
        println!("Tags      {}", tags.join(", "));
    }

    for (label, link) in [("Homepage", app.homepage()), ("Repository", app.repository())] {
        if let Some(url) = link.and_then(sanitize_url) {
            println!("{label:<9} {url}");
        }
    }

    if let Some(command) = app.install_command() {
        println!();
        println!("Install   {command}");
    }
    0
}

fn run_install_url(
    store: &StoreLayout,
    catalog: Option<PathBuf>,
    id: &str,
    wallet: Option<&str>,
) -> i32 {
    match open_catalog(store, catalog).and_then(|catalog| find_app(&catalog, id)) {
        Ok(app) => {
            println!("{}", install_url(&app, wallet));
            0
        }
        Err(err) => report_error(&err),
    }
}

fn dry_run_note(dry_run: bool) -> &'static str {
    if dry_run {
        " (dry run)"
    } else {
        ""
    }
}

fn run_reorganize(store: &StoreLayout, dry_run: bool) -> i32 {
    let report = match reorganize(store, dry_run) {
        Ok(report) => report,
        Err(err) => return report_error(&err),
    };

    println!("Reorganized apps{}:", dry_run_note(dry_run));
    println!("  Agents: {}", report.agents);
    println!("  Tools: {}", report.tools);
    println!("  Unknown type (moved to tools): {}", report.unknown);
    println!("  Total: {}", report.moved());
    if report.removed_apps_dir {
        println!("Removed empty {}", display_path(&store.apps_dir(), store.root()));
    }

    if report.refused.is_empty() {
        return 0;
    }
    for path in &report.refused {
        eprintln!(
            "Not moved, target exists: {}",
            display_path(path, store.root())
        );
    }
    1
}

fn run_rebrand(store: &StoreLayout, dry_run: bool) -> i32 {
    let report = match rebrand(store, dry_run) {
        Ok(report) => report,
        Err(err) => return report_error(&err),
    };

    for (from, to) in &report.renamed {
        println!(
            "Renamed {} -> {}",
            display_path(from, store.root()),
            display_path(to, store.root())
        );
    }
    println!("Rebrand complete{}:", dry_run_note(dry_run));
    println!("  Updated: {}", report.updated.len());
    println!("  Renamed: {}", report.renamed.len());

    if report.refused.is_empty() {
        return 0;
    }
    for path in &report.refused {
        eprintln!(
            "Skipped, rebranded name already taken: {}",
            display_path(path, store.root())
        );
    }
    1
}

fn run_import(store: &StoreLayout, api: Option<String>) -> i32 {
    let client = api.map_or_else(StoreApiClient::new, StoreApiClient::with_url);
    tracing::info!(api = client.base_url(), "importing products");

    match import_blocking(&client, store) {
        Ok(report) => {
            println!("Fetched {} products", report.fetched);
            println!(
                "Saved {} apps to {}",
                report.saved,
                display_path(&report.dir, store.root())
            );
            if report.skipped > 0 {
                println!("Skipped {} products", report.skipped);
            }
            0
        }
        Err(err) => report_error(&err),
    }
}
