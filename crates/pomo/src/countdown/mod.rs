//! Interactive countdown timer
//!
//! Runs one interval full-screen. Keyboard input is read on a blocking task
//! and forwarded over a channel; the main loop selects over that channel, a
//! one second ticker and the completion deadline.
//!
//! Key bindings:
//! - Esc, Ctrl-C: quit (the interval is not recorded)
//! - p, P: pause
//! - c, C: continue

pub mod ui;

use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, IsTerminal, Stdout};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::SessionType;
use crate::task::Task;

/// Redraw period
pub const TICK: Duration = Duration::from_secs(1);

/// How often the input listener checks whether the timer has finished
const INPUT_POLL: Duration = Duration::from_millis(100);

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The full duration elapsed
    Completed,
    /// The user quit before the deadline
    Interrupted,
}

impl Outcome {
    /// `Ok` for a completed run, [`Error::Interrupted`] otherwise
    pub fn into_result(self) -> Result<()> {
        match self {
            Outcome::Completed => Ok(()),
            Outcome::Interrupted => Err(Error::Interrupted),
        }
    }
}

/// A key press the timer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Quit,
    Pause,
    Resume,
}

impl Control {
    pub fn from_event(event: &Event) -> Option<Self> {
        let Event::Key(key) = event else {
            return None;
        };
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Esc => Some(Control::Quit),
            KeyCode::Char('c') | KeyCode::Char('C')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Some(Control::Quit)
            }
            KeyCode::Char('p') | KeyCode::Char('P') => Some(Control::Pause),
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Control::Resume),
            _ => None,
        }
    }
}

/// A single interval bound to one task
pub struct Countdown {
    duration: Duration,
    task: Task,
    session_type: SessionType,
    count_up: bool,
    remaining: Duration,
    paused: bool,
}

impl Countdown {
    pub fn new(duration: Duration, task: Task, session_type: SessionType) -> Self {
        Self {
            duration,
            task,
            session_type,
            count_up: false,
            remaining: duration,
            paused: false,
        }
    }

    /// Show elapsed time instead of remaining time
    pub fn count_up(mut self, count_up: bool) -> Self {
        self.count_up = count_up;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// The time shown on the clock
    pub fn display_time(&self) -> Duration {
        if self.count_up {
            self.duration.saturating_sub(self.remaining)
        } else {
            self.remaining
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Take over the terminal and run until the deadline or a quit key.
    ///
    /// The terminal is restored on every exit path.
    pub async fn run(&mut self) -> Result<Outcome> {
        if !io::stdout().is_terminal() {
            return Err(Error::DisplayInit(io::Error::other("stdout is not a terminal")));
        }
        let mut screen = Screen::enter().map_err(Error::DisplayInit)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = spawn_input_listener(tx);

        let outcome = self.drive(&mut screen.terminal, &mut rx).await;

        // Closing the channel stops the listener at its next poll
        drop(rx);
        if let Err(e) = listener.await {
            warn!(error = %e, "input listener failed");
        }

        outcome
    }

    /// The timer loop, independent of where input comes from and what the
    /// terminal is backed by.
    pub async fn drive<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut UnboundedReceiver<Event>,
    ) -> Result<Outcome> {
        self.remaining = self.duration;
        self.paused = false;

        let deadline = time::sleep(self.duration);
        tokio::pin!(deadline);
        let mut ticker = new_ticker();
        let mut input_open = true;

        debug!(
            duration = ?self.duration,
            session = %self.session_type,
            task = %self.task.id,
            "countdown started"
        );
        self.draw(terminal)?;

        loop {
            tokio::select! {
                biased;

                event = events.recv(), if input_open => {
                    let Some(event) = event else {
                        debug!("input closed");
                        input_open = false;
                        continue;
                    };

                    match Control::from_event(&event) {
                        Some(Control::Quit) => {
                            debug!(remaining = ?self.remaining, "countdown interrupted");
                            return Ok(Outcome::Interrupted);
                        }
                        Some(Control::Pause) if !self.paused => {
                            self.remaining = deadline.deadline().saturating_duration_since(Instant::now());
                            self.paused = true;
                            debug!(remaining = ?self.remaining, "paused");
                            self.draw(terminal)?;
                        }
                        Some(Control::Resume) if self.paused => {
                            deadline.as_mut().reset(Instant::now() + self.remaining);
                            ticker = new_ticker();
                            self.paused = false;
                            debug!(remaining = ?self.remaining, "resumed");
                            self.draw(terminal)?;
                        }
                        Some(Control::Pause) | Some(Control::Resume) | None => {}
                    }
                }

                _ = ticker.tick(), if !self.paused => {
                    self.remaining = deadline.deadline().saturating_duration_since(Instant::now());
                    self.draw(terminal)?;
                }

                _ = &mut deadline, if !self.paused => {
                    self.remaining = Duration::ZERO;
                    debug!("countdown completed");
                    return Ok(Outcome::Completed);
                }

                // Paused with no input left: nothing can resume the clock
                else => {
                    warn!("input closed while paused");
                    return Ok(Outcome::Interrupted);
                }
            }
        }
    }

    fn draw<B: Backend>(&self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal
            .draw(|f| ui::draw(f, self))
            .map_err(Error::Display)?;
        Ok(())
    }
}

/// Ticker whose first tick is one period from now
fn new_ticker() -> Interval {
    let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Forward terminal events until the receiving side goes away
fn spawn_input_listener(tx: UnboundedSender<Event>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read terminal event");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "failed to poll terminal events");
                    break;
                }
            }
        }
    })
}

/// Raw-mode alternate screen, restored on drop
struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Screen {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;

        let setup = || -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen, Hide)?;
            Terminal::new(CrosstermBackend::new(stdout))
        };

        match setup() {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                restore_terminal();
                Err(e)
            }
        }
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        warn!(error = %e, "failed to disable raw mode");
    }
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, Show) {
        warn!(error = %e, "failed to leave alternate screen");
    }
}
