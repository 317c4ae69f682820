use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use homedir::my_home;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod documents;
mod lock;
mod output;
mod sample;
mod semantic;
#[cfg(test)]
mod tests;
mod web;

use app::{App, AppError, LoadOutcome, Status};
use config::Config;
use lock::FileLock;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn get_base_path(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(data_dir) = data_dir {
        return Ok(data_dir);
    }

    if let Ok(base_path) = std::env::var("PROJFIND_BASE_PATH") {
        return Ok(PathBuf::from(base_path));
    }

    let home = my_home()
        .context("Could not determine home directory")?
        .context("Home directory path is empty")?;
    Ok(home.join(".local/share/projfind"))
}

/// Take the writer lock on the data directory.
fn acquire_writer_lock(config: &Config) -> Result<FileLock, AppError> {
    FileLock::try_acquire(config.base_path()).map_err(AppError::Locked)
}

/// Open the app and make sure the index is loaded, building it if needed.
fn open_app(app: App) -> Result<App> {
    match app.load_or_build()? {
        LoadOutcome::Loaded if app.engine().is_empty() => {
            log::warn!("saved index has no documents")
        }
        LoadOutcome::Loaded => log::debug!("using saved index"),
        LoadOutcome::Built => log::info!("built index with {} documents", app.engine().len()),
        LoadOutcome::BuiltUnsaved => log::info!(
            "built in-memory index with {} documents",
            app.engine().len()
        ),
        LoadOutcome::Empty => log::warn!(
            "nothing indexed yet; run `projfind index` or `projfind sample` first"
        ),
    }

    Ok(app)
}

fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let base_path = get_base_path(args.data_dir)?;
    let config = Config::load_with(&base_path)?;

    match args.command {
        cli::Command::Index { from } => {
            let lock = acquire_writer_lock(&config)?;
            let app = App::with_default_model(config)?.with_writer_lock(lock);

            let count = app.reindex_from_file(from.as_deref())?;
            println!("{count} documents indexed");
        }

        cli::Command::Search { query, top_k, json } => {
            let app = open_app(App::with_default_model(config)?)?;
            let results = app.search(&query, top_k)?;

            let output = if json {
                output::format_json(&query, &results)
            } else {
                output::format_human(&query, &results)
            };
            println!("{output}");
        }

        cli::Command::Status {} => {
            let status = Status::from_saved_index(&config);
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        cli::Command::List { json } => {
            let app = open_app(App::with_default_model(config)?)?;
            let corpus = app.engine().snapshot();

            if json {
                println!("{}", serde_json::to_string_pretty(corpus.documents())?);
            } else {
                println!("{}", output::format_document_list(corpus.documents()));
            }
        }

        cli::Command::Sample { out } => {
            let path = out.unwrap_or_else(|| config.documents_path());
            let samples = sample::sample_documents();

            documents::save_documents(&path, &samples)?;
            println!("{} sample documents written to {}", samples.len(), path.display());
        }

        cli::Command::Daemon {} => {
            let lock = acquire_writer_lock(&config)?;
            log::info!("daemon holds writer lock {}", lock.path().display());

            let app = App::with_default_model(config)?.with_writer_lock(lock);
            web::start_daemon(open_app(app)?)?;
        }
    }

    Ok(())
}
