//! pomo - a task list with a Pomodoro timer
//!
//! Pomo keeps a persistent list of tasks and runs focus/break intervals
//! against the task you are working on:
//! - Tasks and the current-task pointer live in a transactional store
//! - The session record decides whether the next interval is a focus
//!   period, a short break or a long break, and survives restarts
//! - The countdown takes over the terminal for one interval and can be
//!   paused, resumed or quit from the keyboard
//!
//! Commands:
//! - add TITLE: Add a task
//! - list: Show pending tasks
//! - set ID --current|--complete: Pick the task to time, or finish one
//! - timer start: Run the next interval for the current task

pub mod countdown;
pub mod error;
pub mod kv;
pub mod session;
pub mod task;

pub use countdown::{Countdown, Outcome};
pub use error::{Error, Result};
pub use session::{Session, SessionStore, SessionType};
pub use task::{Status, Task, TaskStore};
