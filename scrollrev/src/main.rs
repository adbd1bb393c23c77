//! scrollrev: review a whole change set as one scrollable document.
//!
//! Entry point for the `scrollrev` binary. Wires together the terminal
//! lifecycle (`tui`), the unified event bus (`event`), the git worker thread
//! (`git`), rendering (`ui`) and the comment store in `scrollrev-core`.
//!
//! # Startup sequence
//!
//! 1. Parse arguments and locate the repository.
//! 2. Start file logging under `<repo>/.scrollrev/`; stderr belongs to the TUI.
//! 3. Load config and open the comment database, resuming the session for
//!    this repository and diff mode.
//! 4. `install_panic_hook()` and `register_sigterm()`, then `init_tui()`.
//! 5. Spawn the event task and the git worker, and request the change set.
//!
//! `restore_tui()` runs once after the event loop, whatever ended it. Errors
//! inside the loop break out of it rather than returning early.

mod app;
mod event;
mod git;
mod highlight;
mod theme;
mod tui;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use scrollrev_core::config::{self, Config};
use scrollrev_core::db;
use scrollrev_core::session::ReviewSession;

use crate::app::AppState;
use crate::event::AppEvent;
use crate::git::types::{DiffMode, DiffRequest};
use crate::git::worker::{git_worker_loop, SourceOptions};
use crate::ui::keybindings::{handle_key, handle_mouse, KeyAction};

#[derive(Parser, Debug)]
#[command(name = "scrollrev", version, about = "Review every changed file of a git diff in one scrolling view")]
struct Cli {
    /// Path inside the repository to review.
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Review staged changes (index vs HEAD) instead of the working tree.
    #[arg(long, conflicts_with_all = ["branch", "range"])]
    staged: bool,

    /// Review HEAD against its merge base with BASE.
    #[arg(long, value_name = "BASE", conflicts_with = "range")]
    branch: Option<String>,

    /// Review an explicit revision range, written FROM..TO.
    #[arg(long, value_name = "FROM..TO")]
    range: Option<String>,

    /// Start in single-file layout.
    #[arg(long)]
    single_file: bool,

    /// Config file to use instead of the default location.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn diff_mode(&self) -> Result<DiffMode> {
        if self.staged {
            return Ok(DiffMode::Staged);
        }
        if let Some(base) = &self.branch {
            return Ok(DiffMode::Branch { base: base.clone() });
        }
        if let Some(range) = &self.range {
            let Some((from, to)) = range.split_once("..") else {
                bail!("--range expects FROM..TO, got {range:?}");
            };
            if from.is_empty() || to.is_empty() {
                bail!("--range expects FROM..TO, got {range:?}");
            }
            return Ok(DiffMode::Range { from: from.to_owned(), to: to.trim_start_matches('.').to_owned() });
        }
        Ok(DiffMode::Unstaged)
    }
}

/// Sends logs to `<dir>/scrollrev.log`. `SCROLLREV_LOG` overrides the level
/// filter, e.g. `SCROLLREV_LOG=scrollrev_core=debug`.
fn init_tracing(dir: &Path) -> Result<()> {
    let log_path = dir.join("scrollrev.log");
    let file = File::options()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("SCROLLREV_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    Ok(())
}

/// Root of the working tree containing `path`, or the git dir for bare repositories.
fn repo_root(path: &Path) -> Result<PathBuf> {
    let repo = git2::Repository::discover(path)
        .with_context(|| format!("{} is not inside a git repository", path.display()))?;
    let root = repo.workdir().unwrap_or_else(|| repo.path());
    Ok(root.to_path_buf())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let diff_mode = cli.diff_mode()?;
    let root = repo_root(&cli.path)?;

    let data_dir = root.join(".scrollrev");
    std::fs::create_dir_all(&data_dir).with_context(|| format!("creating {}", data_dir.display()))?;
    init_tracing(&data_dir)?;

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = Config::load_or_default(&config_path);
    let theme = theme::Theme::from_name(&config.theme);
    tracing::info!(repo = %root.display(), mode = %diff_mode.label(), "starting review");

    let db_path = data_dir.join("reviews.db");
    let conn = db::open_db(&db_path.to_string_lossy()).await.context("opening review database")?;
    let session = db::detect_or_create_session(&conn, &root.to_string_lossy(), &diff_mode.label())
        .await
        .context("resuming review session")?;
    let comments = db::load_comments(&conn, &session.id).await.context("loading comments")?;

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let mut rx = handler.rx;

    let (git_tx, git_rx) = crossbeam_channel::unbounded::<DiffRequest>();
    {
        let event_tx = handler.tx.clone();
        let mode = diff_mode.clone();
        let options = SourceOptions::from_config(&config);
        let path = root.clone();
        std::thread::spawn(move || git_worker_loop(path, mode, options, git_rx, event_tx));
    }

    let mut state = AppState::new(ReviewSession::new(config.tunables()), diff_mode, comments, Some(git_tx));
    if cli.single_file {
        state.toggle_layout();
    }
    state.request_changed_files();

    let mut outcome: Result<()> = Ok(());

    'event_loop: loop {
        tokio::select! {
            // Heartbeat so SIGTERM is noticed even when no events arrive.
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else { break 'event_loop };
                match event {
                    AppEvent::Render => {
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut state, &theme)) {
                            outcome = Err(e).context("drawing frame");
                            break 'event_loop;
                        }
                    }
                    AppEvent::Tick => state.tick(Instant::now()),
                    AppEvent::Key(key) => match handle_key(key, &mut state) {
                        KeyAction::Quit => break 'event_loop,
                        KeyAction::SaveComment => {
                            if let Some((selection, body)) = state.take_comment() {
                                match db::add_comment(&conn, &session.id, &selection, &body).await {
                                    Ok(comment) => {
                                        tracing::info!(file = %selection.file, "comment saved");
                                        state.push_comment(comment);
                                        state.status = Some("comment saved".to_owned());
                                    }
                                    Err(e) => {
                                        tracing::error!("saving comment failed: {e}");
                                        state.status = Some(format!("could not save comment: {e}"));
                                    }
                                }
                            }
                        }
                        KeyAction::Continue => {}
                    },
                    AppEvent::Mouse(mouse) => {
                        handle_mouse(mouse, &mut state);
                    }
                    AppEvent::Resize(_, _) => {}
                    AppEvent::ChangedFiles(result) => state.apply_changed_files(result),
                    AppEvent::BatchLoaded(result) => state.apply_batch(*result),
                }

                // Deferred work runs only once input has drained.
                if rx.is_empty() {
                    state.run_idle();
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    tui::restore_tui()?;
    tracing::info!("exiting");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("scrollrev").chain(args.iter().copied()))
    }

    #[test]
    fn flags_pick_the_diff_mode() {
        assert_eq!(cli(&[]).diff_mode().unwrap(), DiffMode::Unstaged);
        assert_eq!(cli(&["--staged"]).diff_mode().unwrap(), DiffMode::Staged);
        assert_eq!(
            cli(&["--branch", "main"]).diff_mode().unwrap(),
            DiffMode::Branch { base: "main".into() }
        );
        assert_eq!(
            cli(&["--range", "v1..HEAD"]).diff_mode().unwrap(),
            DiffMode::Range { from: "v1".into(), to: "HEAD".into() }
        );
        assert!(cli(&["--range", "v1"]).diff_mode().is_err());
    }

    #[test]
    fn conflicting_modes_are_rejected() {
        assert!(Cli::try_parse_from(["scrollrev", "--staged", "--branch", "main"]).is_err());
    }
}
