pub mod branch_picker;
pub mod diff_view;
pub mod field_picker;
pub mod file_picker;
pub mod filter_manager;
pub mod input;
pub mod pr_picker;
pub mod prune;
pub mod search;
pub mod ticket_picker;
pub mod toast;
pub mod ui;

use crate::git::Git;
use crate::util::send_or_log;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::future::Future;
use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// One interactive screen driven by [`run_screen`].
pub trait Screen {
    type Outcome;

    fn draw(&mut self, f: &mut Frame);

    /// Handle a key press. `Some` ends the screen with that outcome.
    fn handle_key(&mut self, key: KeyEvent) -> Result<Option<Self::Outcome>>;

    /// Called every tick to drain background results and expire toasts.
    fn on_tick(&mut self) {}
}

/// Run `screen` in the alternate screen until it produces an outcome.
pub async fn run_screen<S: Screen>(screen: &mut S) -> Result<S::Outcome> {
    if !io::stdout().is_terminal() {
        anyhow::bail!("jg pickers require an interactive terminal");
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, screen).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<S: Screen>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    screen: &mut S,
) -> Result<S::Outcome> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| screen.draw(f))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(outcome) = screen.handle_key(key)? {
                        return Ok(outcome);
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            screen.on_tick();
            last_tick = Instant::now();
            tokio::task::yield_now().await;
        }
    }
}

/// "ticket: X   branch: Y" line shown at the top of every picker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBar {
    pub ticket: Option<String>,
    pub branch: Option<String>,
}

impl ContextBar {
    pub fn new(ticket: Option<String>, branch: Option<String>) -> Self {
        Self { ticket, branch }
    }

    /// Context for the current process: the given ticket plus git's current branch.
    pub fn detect(ticket: Option<String>) -> Self {
        Self::new(ticket, Git::new().current_branch())
    }

    pub fn text(&self) -> String {
        format!(
            "  ticket: {}   branch: {}",
            self.ticket.as_deref().unwrap_or("—"),
            self.branch.as_deref().unwrap_or("—")
        )
    }
}

/// Background results delivered to a screen, drained on tick.
///
/// Every job is tagged with the generation it was started in; bumping the
/// generation (closing the modal that asked) makes late results stale.
pub struct TaskChannel<T> {
    tx: mpsc::Sender<(u64, T)>,
    rx: mpsc::Receiver<(u64, T)>,
    generation: u64,
}

impl<T: Send + 'static> Default for TaskChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> TaskChannel<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self { tx, rx, generation: 0 }
    }

    /// Invalidate every job started so far.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn spawn<F>(&self, context: &'static str, fut: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let value = fut.await;
            send_or_log(&tx, (generation, value), context).await;
        });
    }

    pub fn spawn_blocking<F>(&self, context: &'static str, job: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(job).await {
                Ok(value) => send_or_log(&tx, (generation, value), context).await,
                Err(e) => tracing::warn!("{} task failed: {}", context, e),
            }
        });
    }

    /// Results from the current generation; stale ones are dropped.
    pub fn drain(&mut self) -> Vec<T> {
        let mut fresh = Vec::new();
        while let Ok((generation, value)) = self.rx.try_recv() {
            if generation == self.generation {
                fresh.push(value);
            } else {
                tracing::debug!("Discarding stale background result");
            }
        }
        fresh
    }
}
