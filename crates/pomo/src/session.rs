//! Pomodoro session state
//!
//! A single record tracks which interval comes next (focus, short break or
//! long break) and how many focus intervals have been completed. It lives in
//! its own store so it survives restarts independently of the task list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Error, Result};
use crate::kv::{KvStore, Txn};

/// Key of the session record
pub const SESSION_KEY: &str = "session";

/// Kind of interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// Work interval
    #[default]
    Focus,
    /// Short break between focus intervals
    Short,
    /// Long break after every Nth focus interval
    Long,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Focus => "focus",
            SessionType::Short => "short",
            SessionType::Long => "long",
        }
    }

    /// What follows this interval, given the completed focus `count` and
    /// the configured long break `interval`.
    ///
    /// Breaks always return to focus. A focus interval is followed by a long
    /// break when `count` is a positive multiple of `interval`, otherwise by
    /// a short one.
    pub fn next(self, count: u32, interval: u32) -> SessionType {
        match self {
            SessionType::Short | SessionType::Long => SessionType::Focus,
            SessionType::Focus if count > 0 && interval > 0 && count % interval == 0 => {
                SessionType::Long
            }
            SessionType::Focus => SessionType::Short,
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "focus" => Ok(SessionType::Focus),
            "short" => Ok(SessionType::Short),
            "long" => Ok(SessionType::Long),
            other => Err(Error::Validation(format!("unknown session type: {}", other))),
        }
    }
}

/// The persisted session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Session {
    /// The interval the user is in, or will start next
    pub current: SessionType,
    /// Completed focus intervals
    pub count: u32,
}

impl Session {
    /// The interval after `current`
    pub fn next(&self, interval: u32) -> SessionType {
        self.current.next(self.count, interval)
    }

    /// Complete the current interval: count it if it was a focus interval,
    /// then move on to the next one.
    pub fn advance(&mut self, interval: u32) {
        if self.current == SessionType::Focus {
            self.count += 1;
        }
        self.current = self.next(interval);
    }
}

/// Persistent session state
pub struct SessionStore {
    kv: KvStore,
    interval: u32,
}

impl SessionStore {
    /// Open or create the session store at `path`.
    ///
    /// `interval` is the number of focus intervals between long breaks and
    /// must be at least 1.
    pub fn open(path: &Path, interval: u32) -> Result<Self> {
        if interval == 0 {
            return Err(Error::Validation(
                "interval must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            kv: KvStore::open(path)?,
            interval,
        })
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Overwrite the record with the defaults
    pub fn reset(&self) -> Result<()> {
        self.kv.update(|txn| txn.set_json(SESSION_KEY, &Session::default()))?;
        debug!("reset session");
        Ok(())
    }

    /// The current interval type
    pub fn current(&self) -> Result<SessionType> {
        Ok(self.session()?.current)
    }

    /// The interval that follows the current one
    pub fn next(&self) -> Result<SessionType> {
        Ok(self.session()?.next(self.interval))
    }

    /// Record the current interval as completed and rotate to the next
    pub fn increment(&self) -> Result<Session> {
        let interval = self.interval;
        self.kv.update(|txn| {
            let mut session = load_or_init(txn)?;
            session.advance(interval);
            txn.set_json(SESSION_KEY, &session)?;
            debug!(current = %session.current, count = session.count, "incremented session");
            Ok(session)
        })
    }

    /// The full session record
    pub fn session(&self) -> Result<Session> {
        self.kv.update(load_or_init)
    }
}

/// Read the session record, creating it within the same transaction if absent
fn load_or_init(txn: &Txn<'_>) -> Result<Session> {
    match txn.get_json(SESSION_KEY)? {
        Some(session) => Ok(session),
        None => {
            let session = Session::default();
            txn.set_json(SESSION_KEY, &session)?;
            debug!("created session record");
            Ok(session)
        }
    }
}
