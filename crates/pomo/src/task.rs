//! Task storage
//!
//! Tasks are JSON records keyed by their UUID. One extra record, stored under
//! [`CURRENT_TASK_KEY`], holds the id of the task the timer is bound to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::kv::{KvStore, Txn};

/// Key of the current-task pointer record
pub const CURRENT_TASK_KEY: &str = "current";

/// Task status. The only transition is Pending -> Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Complete,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Complete => "complete",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "complete" => Ok(Status::Complete),
            other => Err(Error::Validation(format!("unknown status: {}", other))),
        }
    }
}

/// A task on the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub status: Status,
    /// Completed focus intervals spent on this task
    pub sessions: u32,
    pub created_at: DateTime<Utc>,
    /// Set by every mutation, absent until the first one
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            status: Status::Pending,
            sessions: 0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Storage key of this task
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    /// One-line summary, e.g. "Task: write docs, sessions: 3"
    pub fn describe(&self) -> String {
        format!("Task: {}, sessions: {}", self.title, self.sessions)
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// Parse a task id given on the command line
pub fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|e| Error::Validation(format!("invalid task id {:?}: {}", s, e)))
}

/// Persistent task list plus the current-task pointer
pub struct TaskStore {
    kv: KvStore,
}

impl TaskStore {
    /// Open or create the task store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            kv: KvStore::open(path)?,
        })
    }

    /// Add a new pending task
    pub fn add(&self, title: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Validation("task title must not be empty".to_string()));
        }

        let task = Task::new(title);
        self.kv.update(|txn| txn.set_json(&task.key(), &task))?;
        debug!(id = %task.id, title = %task.title, "added task");
        Ok(task)
    }

    /// Delete a task. Clears the current-task pointer if it referenced it.
    pub fn remove(&self, id: Uuid) -> Result<()> {
        self.kv.update(|txn| {
            let key = id.to_string();
            if !txn.delete(&key)? {
                return Err(not_found(id));
            }

            if current_id(txn)? == Some(id) {
                txn.delete(CURRENT_TASK_KEY)?;
                debug!(%id, "removed task was current, pointer cleared");
            }

            debug!(%id, "removed task");
            Ok(())
        })
    }

    /// All tasks matching `filter`, in storage order
    pub fn list<F>(&self, filter: F) -> Result<Vec<Task>>
    where
        F: Fn(&Task) -> bool,
    {
        self.kv.view(|txn| {
            let mut tasks = Vec::new();
            for (key, value) in txn.scan()? {
                // Skip the pointer and anything else that isn't a task
                if Uuid::parse_str(&key).is_err() {
                    continue;
                }

                let task: Task = serde_json::from_slice(&value)?;
                if filter(&task) {
                    tasks.push(task);
                }
            }
            Ok(tasks)
        })
    }

    /// Fetch a single task
    pub fn get(&self, id: Uuid) -> Result<Task> {
        self.kv.view(|txn| get_task(txn, id))
    }

    /// Change the status of a task
    pub fn set_state(&self, id: Uuid, status: Status) -> Result<Task> {
        self.kv.update(|txn| {
            let mut task = get_task(txn, id)?;
            if task.status == Status::Complete && status == Status::Pending {
                return Err(Error::Validation(format!(
                    "task {} is already complete",
                    id
                )));
            }

            task.status = status;
            task.touch();
            txn.set_json(&task.key(), &task)?;
            debug!(%id, status = %status, "set task state");
            Ok(task)
        })
    }

    /// Record one completed focus interval on a task
    pub fn add_session(&self, id: Uuid) -> Result<Task> {
        self.kv.update(|txn| {
            let mut task = get_task(txn, id)?;
            task.sessions += 1;
            task.touch();
            txn.set_json(&task.key(), &task)?;
            debug!(%id, sessions = task.sessions, "added session");
            Ok(task)
        })
    }

    /// Point the timer at an existing task
    pub fn set_current_task(&self, id: Uuid) -> Result<()> {
        self.kv.update(|txn| {
            let task = get_task(txn, id)?;
            txn.set(CURRENT_TASK_KEY, task.key().as_bytes())?;
            debug!(%id, "set current task");
            Ok(())
        })
    }

    /// Clear the current-task pointer if it references `id`.
    ///
    /// Fails with NotFound when the task does not exist. A pointer that
    /// references some other task is left alone; the return value says
    /// whether anything was cleared.
    pub fn clear_current_task(&self, id: Uuid) -> Result<bool> {
        self.kv.update(|txn| {
            get_task(txn, id)?;

            if current_id(txn)? != Some(id) {
                debug!(%id, "current task points elsewhere, not cleared");
                return Ok(false);
            }

            txn.delete(CURRENT_TASK_KEY)?;
            debug!(%id, "cleared current task");
            Ok(true)
        })
    }

    /// The task the pointer references
    pub fn current_task(&self) -> Result<Task> {
        self.kv.view(|txn| {
            let id = current_id(txn)?
                .ok_or_else(|| Error::NotFound("current task is not set".to_string()))?;
            get_task(txn, id)
        })
    }
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("task {}", id))
}

fn get_task(txn: &Txn<'_>, id: Uuid) -> Result<Task> {
    txn.get_json(&id.to_string())?.ok_or_else(|| not_found(id))
}

fn current_id(txn: &Txn<'_>) -> Result<Option<Uuid>> {
    match txn.get(CURRENT_TASK_KEY)? {
        Some(bytes) => {
            let raw = String::from_utf8_lossy(&bytes);
            let id = Uuid::parse_str(&raw).map_err(|e| {
                Error::Validation(format!("current task pointer {:?} is not an id: {}", raw, e))
            })?;
            Ok(Some(id))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> Result<(TaskStore, TempDir)> {
        let tmp = TempDir::new()?;
        let store = TaskStore::open(&tmp.path().join("tasks.db"))?;
        Ok((store, tmp))
    }

    #[test]
    fn test_add_then_list() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let added = store.add("write the report")?;

        let tasks = store.list(|_| true)?;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0], added);
        assert_eq!(tasks[0].title, "write the report");
        assert_eq!(tasks[0].status, Status::Pending);
        assert_eq!(tasks[0].sessions, 0);
        assert!(tasks[0].updated_at.is_none());
        Ok(())
    }

    #[test]
    fn test_add_rejects_blank_title() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        assert!(matches!(store.add("   "), Err(Error::Validation(_))));
        assert!(store.list(|_| true)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_list_skips_pointer_and_filters() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let a = store.add("a")?;
        let b = store.add("b")?;
        store.set_current_task(a.id)?;
        store.set_state(b.id, Status::Complete)?;

        assert_eq!(store.list(|_| true)?.len(), 2);

        let pending = store.list(|t| !t.is_complete())?;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);

        assert!(store.list(|_| false)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_remove() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let task = store.add("short lived")?;

        store.remove(task.id)?;
        assert!(store.get(task.id).unwrap_err().is_not_found());
        assert!(store.list(|_| true)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_remove_missing_is_not_found() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let task = store.add("once")?;
        store.remove(task.id)?;

        assert!(store.remove(task.id).unwrap_err().is_not_found());
        assert!(store.remove(Uuid::new_v4()).unwrap_err().is_not_found());
        Ok(())
    }

    #[test]
    fn test_remove_current_task_clears_pointer() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let task = store.add("current")?;
        store.set_current_task(task.id)?;

        store.remove(task.id)?;
        assert!(store.current_task().unwrap_err().is_not_found());
        Ok(())
    }

    #[test]
    fn test_set_state_is_idempotent() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let task = store.add("finish me")?;

        let once = store.set_state(task.id, Status::Complete)?;
        let twice = store.set_state(task.id, Status::Complete)?;
        assert_eq!(once.status, Status::Complete);
        assert_eq!(twice.status, once.status);
        assert_eq!(twice.sessions, once.sessions);
        assert_eq!(store.get(task.id)?.status, Status::Complete);
        Ok(())
    }

    #[test]
    fn test_set_state_is_one_way() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let task = store.add("done is done")?;
        store.set_state(task.id, Status::Complete)?;

        assert!(matches!(
            store.set_state(task.id, Status::Pending),
            Err(Error::Validation(_))
        ));
        assert_eq!(store.get(task.id)?.status, Status::Complete);
        Ok(())
    }

    #[test]
    fn test_mutations_set_updated_at() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let task = store.add("tracked")?;
        assert!(task.updated_at.is_none());

        let updated = store.add_session(task.id)?;
        let first = updated.updated_at.expect("add_session sets updated_at");
        assert!(first >= task.created_at);

        let completed = store.set_state(task.id, Status::Complete)?;
        assert!(completed.updated_at.expect("set_state sets updated_at") >= first);
        assert_eq!(store.get(task.id)?.updated_at, completed.updated_at);
        Ok(())
    }

    #[test]
    fn test_add_session_increments_by_one() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let task = store.add("focus")?;

        store.add_session(task.id)?;
        let task = store.add_session(task.id)?;
        assert_eq!(task.sessions, 2);
        assert_eq!(store.get(task.id)?.sessions, 2);
        Ok(())
    }

    #[test]
    fn test_missing_task_operations_fail() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let missing = Uuid::new_v4();

        assert!(store.get(missing).unwrap_err().is_not_found());
        assert!(store.set_state(missing, Status::Complete).unwrap_err().is_not_found());
        assert!(store.add_session(missing).unwrap_err().is_not_found());
        assert!(store.set_current_task(missing).unwrap_err().is_not_found());
        assert!(store.clear_current_task(missing).unwrap_err().is_not_found());
        Ok(())
    }

    #[test]
    fn test_current_task_lifecycle() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        assert!(store.current_task().unwrap_err().is_not_found());

        let task = store.add("bound to timer")?;
        store.set_current_task(task.id)?;
        assert_eq!(store.current_task()?.id, task.id);

        assert!(store.clear_current_task(task.id)?);
        assert!(store.current_task().unwrap_err().is_not_found());

        // Clearing again is harmless
        assert!(!store.clear_current_task(task.id)?);
        Ok(())
    }

    #[test]
    fn test_set_current_task_overwrites() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let a = store.add("a")?;
        let b = store.add("b")?;

        store.set_current_task(a.id)?;
        store.set_current_task(b.id)?;
        assert_eq!(store.current_task()?.id, b.id);
        Ok(())
    }

    #[test]
    fn test_clear_with_other_id_keeps_pointer() -> Result<()> {
        let (store, _tmp) = temp_store()?;
        let current = store.add("current")?;
        let other = store.add("other")?;
        store.set_current_task(current.id)?;

        // Only a pointer that references the given task is cleared
        assert!(!store.clear_current_task(other.id)?);
        assert_eq!(store.current_task()?.id, current.id);
        Ok(())
    }

    #[test]
    fn test_persists_across_reopen() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("tasks.db");

        let id = {
            let store = TaskStore::open(&path)?;
            let task = store.add("survives restart")?;
            store.set_current_task(task.id)?;
            task.id
        };

        let store = TaskStore::open(&path)?;
        assert_eq!(store.current_task()?.id, id);
        Ok(())
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("not-a-uuid"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Complete".parse::<Status>().unwrap(), Status::Complete);
        assert_eq!("pending".parse::<Status>().unwrap(), Status::Pending);
        assert!("done".parse::<Status>().is_err());
    }

    #[test]
    fn test_describe() {
        let mut task = Task::new("write docs");
        task.sessions = 3;
        assert_eq!(task.describe(), "Task: write docs, sessions: 3");
    }
}
