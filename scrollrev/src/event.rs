//! Event bus for scrollrev.
//!
//! All user input, timer ticks, and git worker results are normalised into a
//! single `AppEvent` enum and sent over a tokio unbounded MPSC channel. The
//! main loop receives from this channel and dispatches accordingly.
//!
//! Two independent intervals drive the render and logic cycles:
//! - **Render interval** (33 ms ≈ 30 FPS) triggers a `terminal.draw()` call.
//! - **Tick interval** (50 ms) drives the visibility debounce and the
//!   eviction timer. It must be shorter than the debounce window or flushes
//!   would lag by up to a whole tick.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

use scrollrev_core::loader::BatchResult;
use scrollrev_core::LoadError;

use crate::git::types::FileSummary;

/// All events the application can receive from any source.
#[derive(Debug)]
pub enum AppEvent {
    /// A key press from the terminal (`KeyEventKind::Press` only).
    ///
    /// Release and repeat events are filtered in [`spawn_event_task`] to avoid
    /// double-firing on Windows.
    Key(KeyEvent),
    /// A mouse event from the terminal (press, drag, release, wheel).
    Mouse(MouseEvent),
    /// Terminal was resized to (columns, rows).
    Resize(u16, u16),
    /// Logic tick: debounce flush and eviction.
    Tick,
    /// Render tick: triggers a `terminal.draw()` call.
    Render,
    /// A freshly computed change set from the git worker.
    ChangedFiles(Result<Vec<FileSummary>, LoadError>),
    /// One finished load batch.
    ///
    /// Boxed to keep the enum variant small on the channel.
    BatchLoaded(Box<BatchResult>),
}

/// Holds the sender and receiver ends of the unified event channel.
///
/// The sender (`tx`) is cloned and handed to background tasks and the git
/// worker; the receiver (`rx`) is owned by the main event loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the background tokio task that feeds terminal input and timers
/// into the channel.
///
/// - `reader.next().fuse()` keeps `tokio::select!` from polling a completed
///   future if the crossterm stream ends.
/// - The task exits once the receiver is gone and a send fails.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(50));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            let event = tokio::select! {
                _ = tick_tick => AppEvent::Tick,
                _ = render_tick => AppEvent::Render,
                maybe_event = crossterm_event => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Some(Ok(Event::Mouse(mouse))) => AppEvent::Mouse(mouse),
                    Some(Ok(Event::Resize(w, h))) => AppEvent::Resize(w, h),
                    Some(Err(err)) => {
                        tracing::warn!("terminal input error: {err}");
                        continue;
                    }
                    None => break,
                    _ => continue,
                },
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}
