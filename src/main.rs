//! recite - scripture and creed memorization in the terminal
//!
//! Keeps a collection of passages, schedules them for review, and builds
//! fill-in-the-blank exercises and quizzes through a hosted language model.

mod ai;
mod config;
mod creeds;
mod library;
mod models;
mod practice;
mod scheduler;
mod storage;
mod streak;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use ai::GeminiClient;
use config::Config;
use library::Library;
use storage::Store;
use ui::App;

// ══════════════════════════════════════════════════════════════════════════
// CLI Arguments
// ══════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "recite")]
#[command(author, version, about = "Scripture and creed memorization TUI", long_about = None)]
struct Args {
    /// Directory holding the collection
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Add `reference,text` rows from a CSV file
    #[arg(short, long)]
    import: Option<PathBuf>,

    /// Write a backup of the collection to this file
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Merge items from a backup file
    #[arg(short, long)]
    restore: Option<PathBuf>,

    /// Store the Gemini API key and exit
    #[arg(long)]
    api_key: Option<String>,
}

// ══════════════════════════════════════════════════════════════════════════
// Main Entry Point
// ══════════════════════════════════════════════════════════════════════════

fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = args.data_dir.unwrap_or_else(Store::default_path);
    let store = Store::new(data_dir)?;
    init_logging(store.dir());

    let now = Local::now();
    let mut library = Library::open(store, now.date_naive());

    // One-shot commands run without the TUI
    if let Some(key) = args.api_key {
        library::save_api_key(library.store(), &key)?;
        println!("✓ API key saved");
        return Ok(());
    }

    if let Some(csv_path) = args.import {
        let drafts = storage::import_csv(&csv_path)?;
        let count = library.add_items(drafts, now)?;
        println!("✓ Imported {} items from {}", count, csv_path.display());
        return Ok(());
    }

    if let Some(path) = args.export {
        let count = library.store().export_backup(&path)?;
        println!("✓ Exported {} items to {}", count, path.display());
        return Ok(());
    }

    if let Some(path) = args.restore {
        let backup = Store::read_backup(&path)?;
        let (imported, skipped) = library.restore(backup)?;
        if skipped > 0 {
            println!("✓ Restored {} items ({} skipped - already exist)", imported, skipped);
        } else {
            println!("✓ Restored {} items", imported);
        }
        return Ok(());
    }

    run_tui(library)
}

/// Log to a file in the data directory; the terminal belongs to the TUI.
fn init_logging(dir: &Path) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    match OpenOptions::new().create(true).append(true).open(dir.join("recite.log")) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("Could not open log file, logging to stderr: {}", e),
    }

    let _ = builder.try_init();
}

fn run_tui(library: Library) -> Result<()> {
    // Load config
    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Using default config: {:#}", e);
        Config::default()
    });
    let source = Arc::new(GeminiClient::new(&config));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(library, config, source);

    // Run main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result.context("recite exited with an error")
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while app.running {
        terminal.draw(|frame| app.render(frame))?;
        app.handle_events()?;
    }
    Ok(())
}
