mod app;
mod form;

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;

use bookshelf_core::{
    config::{self, AppConfig},
    Library, LibraryFile, LoadOutcome,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_dir)?;

    let file = LibraryFile::new(&config.data_file);
    let (library, status) = match file.load()? {
        LoadOutcome::Loaded(library) => {
            let status = format!("Library data loaded: {} titles.", library.len());
            (library, status)
        }
        LoadOutcome::NoPriorData => (
            Library::new(),
            "No previous library data found. Starting with an empty library.".to_string(),
        ),
    };
    info!(path = %file.path().display(), titles = library.len(), "Session started");

    let mut app = app::BookshelfApp::new(library, file.clone(), config.save_on_exit);
    app.set_status(status);
    app.run().await?;

    if let Some(saved) = app.finish()? {
        println!(
            "Saved {saved} titles to {}. Thank you for using Book Library! Goodbye!",
            file.path().display()
        );
    } else {
        println!("Thank you for using Book Library! Goodbye!");
    }
    Ok(())
}

fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("bookshelf.log");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
