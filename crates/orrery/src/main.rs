//! Orrery interactive browser
//!
//! Loads the first page of the configured collection, then reads commands
//! from stdin: `n` next page, `p` previous page, `/text` search, `/` clear
//! the search, `q` quit.

use anyhow::{Context, Result};
use clap::Parser;
use orrery::{load_config, LiveSource, Mode, OrreryConfig, SearchBackend, Session, SessionHandle, ViewState};
use orrery_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "orrery", about = "Browse and search a paginated planet catalogue")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API base URL (should end with '/')
    #[arg(long)]
    base_url: Option<String>,

    /// Records per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Walk remaining pages into the local index in the background
    #[arg(long)]
    backfill: bool,

    /// Where searches are answered
    #[arg(long, value_enum)]
    search_backend: Option<SearchBackend>,

    /// Also write logs to <DIR>/orrery.log
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Next,
    Prev,
    /// Query text; empty clears the search.
    Search(String),
    Quit,
    Help,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim_end_matches('\r');
    if let Some(query) = line.strip_prefix('/') {
        return Input::Search(query.to_string());
    }
    match line.trim() {
        "n" => Input::Next,
        "p" => Input::Prev,
        "q" => Input::Quit,
        _ => Input::Help,
    }
}

fn resolve_config(cli: &Cli) -> Result<OrreryConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => OrreryConfig::default(),
    };

    if let Some(base_url) = &cli.base_url {
        config.source.base_url = base_url.clone();
    }
    if let Some(page_size) = cli.page_size {
        config.session.page_size = page_size;
    }
    if cli.backfill {
        config.session.background_backfill = true;
    }
    if let Some(backend) = cli.search_backend {
        config.session.search_backend = backend;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn render(state: &ViewState) {
    match state.mode {
        Mode::Browsing => println!("-- Page {} --", state.page_indicator()),
        Mode::Searching => println!("-- {} result(s) --", state.visible.len()),
    }
    for record in &state.visible {
        println!(
            "  {:<22} {:<26} {}",
            record.name, record.climate, record.terrain
        );
    }
    if let Some(error) = &state.error {
        println!("!! {}", error);
    }
}

fn print_help() {
    println!("Commands: n (next)  p (previous)  /text (search)  / (clear search)  q (quit)");
}

/// Wait for a debounced search to be issued and settle.
async fn settle_search(session: &SessionHandle, debounce: Duration) -> Result<ViewState> {
    tokio::time::sleep(debounce + Duration::from_millis(10)).await;
    session
        .wait_for(|state| !state.loading)
        .await
        .context("Session closed while searching")
}

async fn show(session: &SessionHandle, state: ViewState) -> Result<()> {
    render(&state);
    if state.error.is_some() {
        session.dismiss_error().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LogConfig {
        app_name: "orrery",
        verbose: cli.verbose,
        log_dir: cli.log_dir.as_deref(),
    })?;

    let config = resolve_config(&cli)?;
    let source = LiveSource::from_config(&config.source).context("Failed to build HTTP source")?;
    info!(url = %source.collection_url(), "Using collection");

    let session = Session::spawn(Arc::new(source), &config.session);
    session.load_first_page().await?;
    show(&session, session.state()).await?;
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let state = match parse_input(&line) {
            Input::Next => {
                session.next_page().await?;
                session.state()
            }
            Input::Prev => {
                session.prev_page().await?;
                session.state()
            }
            Input::Search(text) => {
                session.set_search_term(text).await?;
                settle_search(&session, config.session.debounce_interval()).await?
            }
            Input::Quit => break,
            Input::Help => {
                print_help();
                continue;
            }
        };
        show(&session, state).await?;
    }

    session.shutdown().await?;
    Ok(())
}
