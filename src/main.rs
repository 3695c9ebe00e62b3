mod config;
mod effects;
mod error;
mod input;
mod logging;
mod models;
mod network;
mod state;
mod theme;
mod ui;
mod utils;

use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, prelude::CrosstermBackend};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::info;

use crate::config::Settings;
use crate::effects::EffectRunner;
use crate::input::{KeyOutcome, handle_key};
use crate::network::HttpBackend;
use crate::state::{Action, AppState};
use crate::theme::Theme;

#[derive(Parser, Debug)]
#[command(author, version, about = "Rewrite Jira tickets through the rewrite backend", long_about = None)]
struct Args {
    /// Base URL of the rewrite backend (overrides config and environment).
    #[arg(long)]
    backend_url: Option<String>,

    /// Read settings from this file instead of ./jira-rewriter.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store --backend-url in the user config file before starting.
    #[arg(long, requires = "backend_url")]
    save_backend_url: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    if let Some(url) = args.backend_url.as_deref() {
        if args.save_backend_url {
            let path = config::save_backend_url(url)?;
            println!("Saved backend URL to {}", path.display());
        }
    }
    settings.apply_backend_url_override(args.backend_url.as_deref());
    settings.validate()?;
    logging::init(&settings.log_path()?)?;
    info!(backend = %settings.backend_url, "starting");

    let backend = HttpBackend::new(&settings.backend_url)
        .with_context(|| format!("unusable backend URL {}", settings.backend_url))?;
    let rt = Runtime::new().context("failed to start async runtime")?;
    let (tx, rx) = mpsc::unbounded_channel();
    let runner = EffectRunner::new(
        Arc::new(backend),
        tx,
        rt.handle().clone(),
        settings.banner_timeout(),
    );

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, runner, rx, &settings);
    restore_terminal(&mut terminal)?;
    info!("exiting");
    result
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut runner: EffectRunner,
    mut rx: UnboundedReceiver<Action>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let theme = Theme::default();
    let mut state = AppState::new();
    let mut dispatch = |state: &mut AppState, action: Action| {
        for effect in state.apply(action) {
            runner.run(effect);
        }
    };
    dispatch(&mut state, Action::Init);

    loop {
        terminal.draw(|f| ui::render(f, &state, &theme, &settings.backend_url))?;

        while let Ok(action) = rx.try_recv() {
            dispatch(&mut state, action);
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match handle_key(key, &state) {
                    KeyOutcome::Quit => break,
                    KeyOutcome::Dispatch(action) => dispatch(&mut state, action),
                    KeyOutcome::Ignore => {}
                }
            }
        }
    }
    Ok(())
}
