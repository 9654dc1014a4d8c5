use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use taxon::api::{CategoryId, CategoryRepository, ClientOptions, HttpCategoryRepository};
use taxon::app::{App, AppEvent};
use taxon::config::{Config, TOKEN_ENV_VAR};
use taxon::form::FormSettings;
use taxon::hierarchy::{build_forest, rows};
use taxon::i18n::Messages;
use taxon::preview::TempDirPreviewStore;
use taxon::ui;
use taxon::util::strip_control_chars;

/// Get the config directory path (~/.config/taxon/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("taxon"))
}

#[derive(Parser, Debug)]
#[command(name = "taxon", about = "Manage a course category taxonomy from the terminal")]
struct Args {
    /// Config file (default: ~/.config/taxon/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Category API base URL, overrides the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Print the category tree and exit
    #[arg(long, conflicts_with = "show")]
    list: bool,

    /// Print one category and exit
    #[arg(long, value_name = "ID")]
    show: Option<String>,
}

impl Args {
    fn is_one_shot(&self) -> bool {
        self.list || self.show.is_some()
    }
}

/// Send logs to stderr for one-shot commands, to a file otherwise so the
/// alternate screen stays clean.
fn init_tracing(config_dir: &std::path::Path, to_stderr: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let log_path = config_dir.join("taxon.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn ensure_config_dir(config_dir: &std::path::Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }
    Ok(())
}

/// `--list`: the indented tree on stdout.
async fn print_tree(repo: &dyn CategoryRepository) -> Result<()> {
    let records = repo.list_all().await.context("Failed to load categories")?;
    let forest = build_forest(&records);
    for row in rows(&forest.roots) {
        println!(
            "{}{} ({}) [{} courses]",
            "  ".repeat(row.depth),
            strip_control_chars(&row.name),
            row.slug,
            row.course_count
        );
    }
    if !forest.broken_cycles.is_empty() {
        eprintln!(
            "Warning: {} categories had circular parents and are listed at top level",
            forest.broken_cycles.len()
        );
    }
    if !forest.too_deep.is_empty() {
        eprintln!(
            "Warning: {} categories were nested too deeply and are listed at top level",
            forest.too_deep.len()
        );
    }
    Ok(())
}

/// `--show ID`: one record on stdout.
async fn print_record(repo: &dyn CategoryRepository, id: &str) -> Result<()> {
    let record = repo
        .get(&CategoryId::from(id))
        .await
        .with_context(|| format!("Failed to fetch category {id}"))?;
    let dash = "-".to_string();
    println!("id:            {}", record.id);
    println!("name:          {}", strip_control_chars(&record.name));
    println!("slug:          {}", record.slug);
    println!(
        "parent:        {}",
        record.parent_id.as_ref().map_or(dash.clone(), |p| p.to_string())
    );
    println!("display order: {}", record.display_order);
    println!("courses:       {}", record.course_count);
    println!(
        "icon:          {}",
        record.icon.as_deref().map_or(dash.clone(), |s| strip_control_chars(s).into_owned())
    );
    println!(
        "picture:       {}",
        record.picture.as_deref().unwrap_or(&dash)
    );
    println!(
        "description:   {}",
        record
            .description
            .as_deref()
            .map_or(dash.clone(), |s| strip_control_chars(s).into_owned())
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    ensure_config_dir(&config_dir)?;
    init_tracing(&config_dir, args.is_one_shot())?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    if let Some(base_url) = &args.base_url {
        config.api_base_url = base_url.clone();
    }
    tracing::debug!(?config, "Effective configuration");

    let options = ClientOptions {
        timeout_secs: config.request_timeout_secs,
        max_response_bytes: config.max_response_bytes,
        api_token: config.resolve_token(std::env::var(TOKEN_ENV_VAR).ok()),
    };
    let repo = HttpCategoryRepository::new(&config.api_base_url, options)
        .with_context(|| format!("Invalid API base URL: {}", config.api_base_url))?;
    tracing::info!(base_url = %repo.base_url(), "Using category API");

    if args.list {
        return print_tree(&repo).await;
    }
    if let Some(id) = &args.show {
        return print_record(&repo, id).await;
    }

    let previews = TempDirPreviewStore::new(config.preview_dir()).with_context(|| {
        format!(
            "Failed to create preview directory: {}",
            config.preview_dir().display()
        )
    })?;
    let settings = FormSettings {
        max_image_bytes: config.max_image_bytes,
        exclude_descendants: config.exclude_descendants_from_parents,
    };
    let messages = Messages::new(std::mem::take(&mut config.messages));

    let mut app = App::new(Arc::new(repo), Arc::new(previews), messages, settings);

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    ui::run(&mut app, event_tx, event_rx).await?;
    Ok(())
}
