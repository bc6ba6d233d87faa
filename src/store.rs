//! In-memory alarm and task collections with write-through persistence.

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ReminderError, Result};
use crate::models::{Alarm, AlarmFields, NewTask, Priority, Task, TaskPatch, TaskStatus};
use crate::storage::KeyValueStore;

/// Substrate key of the alarm collection.
pub const ALARMS_KEY: &str = "quick-access-alarms";

/// Substrate key of the task collection.
pub const TASKS_KEY: &str = "quick-access-tasks";

/// Title given to a task created without one.
pub const DEFAULT_TASK_TITLE: &str = "New Task";

/// Owner of the alarm and task collections.
///
/// Every mutation writes the whole affected collection back before
/// returning. When that write fails the collection is rolled back, so the
/// in-memory and persisted forms never diverge.
#[derive(Debug, Clone, Default)]
pub struct ReminderStore {
    alarms: Vec<Alarm>,
    tasks: Vec<Task>,
}

impl ReminderStore {
    /// Loads both collections, seeding sample tasks when no task collection
    /// was ever stored.
    ///
    /// Never fails: unreadable or malformed content becomes an empty
    /// collection and malformed records are dropped.
    pub fn load<S: KeyValueStore + ?Sized>(kv: &mut S, seed_sample_tasks: bool, now: NaiveDateTime) -> Self {
        let mut alarms: Vec<Alarm> = match kv.get(ALARMS_KEY) {
            Ok(Some(raw)) => decode_collection(&raw, "alarm", |a: &Alarm| !a.title.trim().is_empty()),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("cannot read alarms, starting empty: {e}");
                Vec::new()
            }
        };
        alarms.sort_by_key(Alarm::due_at);

        let tasks = match kv.get(TASKS_KEY) {
            Ok(Some(raw)) => decode_collection(&raw, "task", |_: &Task| true),
            Ok(None) if seed_sample_tasks => {
                let seeded = sample_tasks(now);
                if let Err(e) = save_collection(kv, TASKS_KEY, &seeded) {
                    warn!("cannot persist sample tasks: {e}");
                }
                info!("seeded {} sample tasks", seeded.len());
                seeded
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("cannot read tasks, starting empty: {e}");
                Vec::new()
            }
        };

        debug!("loaded {} alarms and {} tasks", alarms.len(), tasks.len());
        Self { alarms, tasks }
    }

    /// Alarms, ascending by due instant.
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn alarm(&self, id: &str) -> Option<&Alarm> {
        self.alarms.iter().find(|a| a.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Inserts a new alarm and keeps the collection sorted by due instant.
    pub fn create_alarm<S: KeyValueStore + ?Sized>(
        &mut self,
        kv: &mut S,
        fields: AlarmFields,
        now: NaiveDateTime,
    ) -> Result<Alarm> {
        let alarm = Alarm {
            id: new_id(),
            title: fields.title,
            date: fields.date,
            time: fields.time,
            note: fields.note,
            is_completed: false,
            created_at: now,
        };
        let previous = self.alarms.clone();
        self.alarms.push(alarm.clone());
        self.alarms.sort_by_key(Alarm::due_at);
        self.commit_alarms(kv, previous)?;
        Ok(alarm)
    }

    /// Replaces the user-editable fields of an alarm.
    pub fn update_alarm<S: KeyValueStore + ?Sized>(
        &mut self,
        kv: &mut S,
        id: &str,
        fields: AlarmFields,
    ) -> Result<Alarm> {
        let previous = self.alarms.clone();
        let alarm = self.alarms.iter_mut().find(|a| a.id == id).ok_or_else(|| not_found("alarm", id))?;
        alarm.title = fields.title;
        alarm.date = fields.date;
        alarm.time = fields.time;
        alarm.note = fields.note;
        let updated = alarm.clone();
        self.alarms.sort_by_key(Alarm::due_at);
        self.commit_alarms(kv, previous)?;
        Ok(updated)
    }

    pub fn remove_alarm<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, id: &str) -> Result<Alarm> {
        let idx = self.alarms.iter().position(|a| a.id == id).ok_or_else(|| not_found("alarm", id))?;
        let previous = self.alarms.clone();
        let removed = self.alarms.remove(idx);
        self.commit_alarms(kv, previous)?;
        Ok(removed)
    }

    /// Flips `is_completed` and returns the new value.
    pub fn toggle_alarm<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, id: &str) -> Result<bool> {
        let previous = self.alarms.clone();
        let alarm = self.alarms.iter_mut().find(|a| a.id == id).ok_or_else(|| not_found("alarm", id))?;
        alarm.is_completed = !alarm.is_completed;
        let completed = alarm.is_completed;
        self.commit_alarms(kv, previous)?;
        Ok(completed)
    }

    pub fn create_task<S: KeyValueStore + ?Sized>(
        &mut self,
        kv: &mut S,
        new_task: NewTask,
        now: NaiveDateTime,
    ) -> Result<Task> {
        let title = if new_task.title.trim().is_empty() {
            DEFAULT_TASK_TITLE.to_owned()
        } else {
            new_task.title
        };
        let task = Task {
            id: new_id(),
            title,
            description: new_task.description.filter(|d| !d.trim().is_empty()),
            status: TaskStatus::Pending,
            priority: new_task.priority,
            created_at: now,
        };
        let previous = self.tasks.clone();
        self.tasks.push(task.clone());
        self.commit_tasks(kv, previous)?;
        Ok(task)
    }

    pub fn remove_task<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, id: &str) -> Result<Task> {
        let idx = self.tasks.iter().position(|t| t.id == id).ok_or_else(|| not_found("task", id))?;
        let previous = self.tasks.clone();
        let removed = self.tasks.remove(idx);
        self.commit_tasks(kv, previous)?;
        Ok(removed)
    }

    pub fn advance_task<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, id: &str) -> Result<TaskStatus> {
        let previous = self.tasks.clone();
        let task = self.tasks.iter_mut().find(|t| t.id == id).ok_or_else(|| not_found("task", id))?;
        let status = task.advance();
        self.commit_tasks(kv, previous)?;
        Ok(status)
    }

    pub fn update_task<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, id: &str, patch: TaskPatch) -> Result<Task> {
        let previous = self.tasks.clone();
        let task = self.tasks.iter_mut().find(|t| t.id == id).ok_or_else(|| not_found("task", id))?;
        task.apply(patch);
        let updated = task.clone();
        self.commit_tasks(kv, previous)?;
        Ok(updated)
    }

    /// Re-reads both collections from the substrate. Never seeds.
    pub fn reload<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, now: NaiveDateTime) {
        *self = Self::load(kv, false, now);
    }

    fn commit_alarms<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, previous: Vec<Alarm>) -> Result<()> {
        if let Err(e) = save_collection(kv, ALARMS_KEY, &self.alarms) {
            self.alarms = previous;
            return Err(e);
        }
        Ok(())
    }

    fn commit_tasks<S: KeyValueStore + ?Sized>(&mut self, kv: &mut S, previous: Vec<Task>) -> Result<()> {
        if let Err(e) = save_collection(kv, TASKS_KEY, &self.tasks) {
            self.tasks = previous;
            return Err(e);
        }
        Ok(())
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn not_found(kind: &'static str, id: &str) -> ReminderError {
    ReminderError::NotFound { kind, id: id.to_owned() }
}

fn save_collection<S: KeyValueStore + ?Sized, T: Serialize>(kv: &mut S, key: &str, items: &[T]) -> Result<()> {
    let json = serde_json::to_string(items)?;
    kv.set(key, &json)
}

/// Parses a stored collection as an untyped document, then coerces each
/// element into `T`. Elements that fail to coerce, fail `keep`, or repeat an
/// earlier id are dropped.
fn decode_collection<T>(raw: &str, what: &str, keep: impl Fn(&T) -> bool) -> Vec<T>
where
    T: DeserializeOwned + HasId,
{
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!("stored {what} collection is not a list, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!("cannot parse stored {what} collection, starting empty: {e}");
            return Vec::new();
        }
    };

    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(record) if !keep(&record) => warn!("dropping invalid {what} at index {idx}"),
            Ok(record) if out.iter().any(|r| r.id() == record.id()) => {
                warn!("dropping duplicate {what} '{}'", record.id())
            }
            Ok(record) => out.push(record),
            Err(e) => warn!("dropping malformed {what} at index {idx}: {e}"),
        }
    }
    out
}

trait HasId {
    fn id(&self) -> &str;
}

impl HasId for Alarm {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Fixture tasks shown on first use.
fn sample_tasks(now: NaiveDateTime) -> Vec<Task> {
    let fixture = [
        ("Review open tickets", "Check unassigned tickets in the omnichannel queue", TaskStatus::Pending, Priority::High),
        ("Update email templates", "Refresh the follow-up templates for blast campaigns", TaskStatus::InProgress, Priority::Medium),
        ("Check QA scores", "Go through this week's QA evaluations", TaskStatus::Completed, Priority::Low),
    ];
    fixture
        .into_iter()
        .map(|(title, description, status, priority)| Task {
            id: new_id(),
            title: title.to_owned(),
            description: Some(description.to_owned()),
            status,
            priority: Some(priority),
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn fields(title: &str, date: (i32, u32, u32), time: (u32, u32)) -> AlarmFields {
        AlarmFields {
            title: title.into(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            note: None,
        }
    }

    #[test]
    fn seeds_tasks_only_when_key_is_absent() {
        let mut kv = MemoryStore::new();
        let store = ReminderStore::load(&mut kv, true, now());
        assert_eq!(store.tasks().len(), 3);
        assert!(kv.get(TASKS_KEY).unwrap().is_some());

        let mut kv = MemoryStore::new();
        kv.set(TASKS_KEY, "[]").unwrap();
        let store = ReminderStore::load(&mut kv, true, now());
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn corrupt_collections_load_as_empty() {
        let mut kv = MemoryStore::new();
        kv.set(ALARMS_KEY, "{not json").unwrap();
        kv.set(TASKS_KEY, "{\"a\": 1}").unwrap();
        let store = ReminderStore::load(&mut kv, true, now());
        assert!(store.alarms().is_empty());
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn malformed_and_duplicate_entries_are_dropped() {
        let mut kv = MemoryStore::new();
        let raw = r#"[
            {"id":"a","title":"Standup","date":"2026-03-02","time":"09:30","isCompleted":false,"createdAt":"2026-03-01T10:00:00"},
            {"id":"b","title":"Broken","date":"2026-13-40","time":"09:30","createdAt":"2026-03-01T10:00:00"},
            {"id":"c","title":"   ","date":"2026-03-02","time":"10:00","createdAt":"2026-03-01T10:00:00"},
            {"id":"a","title":"Dup","date":"2026-03-03","time":"08:00","createdAt":"2026-03-01T10:00:00"},
            42,
            {"id":"d","title":"Early","date":"2026-03-02","time":"07:15:30","createdAt":"2026-03-01T10:00:00"}
        ]"#;
        kv.set(ALARMS_KEY, raw).unwrap();
        let store = ReminderStore::load(&mut kv, false, now());
        let ids: Vec<&str> = store.alarms().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a"]);
        assert_eq!(store.alarms()[0].time_label(), "07:15");
    }

    #[test]
    fn create_alarm_keeps_due_order() {
        let mut kv = MemoryStore::new();
        let mut store = ReminderStore::load(&mut kv, false, now());
        store.create_alarm(&mut kv, fields("late", (2026, 3, 4), (8, 0)), now()).unwrap();
        store.create_alarm(&mut kv, fields("early", (2026, 3, 2), (17, 45)), now()).unwrap();
        store.create_alarm(&mut kv, fields("middle", (2026, 3, 3), (0, 5)), now()).unwrap();

        let titles: Vec<&str> = store.alarms().iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "middle", "late"]);

        let reloaded = ReminderStore::load(&mut kv, false, now());
        assert_eq!(reloaded.alarms(), store.alarms());
    }

    #[test]
    fn blank_task_gets_placeholder_title() {
        let mut kv = MemoryStore::new();
        let mut store = ReminderStore::load(&mut kv, false, now());
        let task = store.create_task(&mut kv, NewTask::default(), now()).unwrap();
        assert_eq!(task.title, DEFAULT_TASK_TITLE);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut kv = MemoryStore::new();
        let mut store = ReminderStore::load(&mut kv, false, now());
        assert!(matches!(store.toggle_alarm(&mut kv, "nope"), Err(ReminderError::NotFound { kind: "alarm", .. })));
        assert!(matches!(store.advance_task(&mut kv, "nope"), Err(ReminderError::NotFound { kind: "task", .. })));
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
        fn remove(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
        fn keys(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn failed_write_rolls_back() {
        let mut kv = FailingStore;
        let mut store = ReminderStore::load(&mut kv, false, now());
        assert!(store.create_alarm(&mut kv, fields("x", (2026, 3, 2), (9, 0)), now()).is_err());
        assert!(store.alarms().is_empty());
        assert!(store.create_task(&mut kv, NewTask::default(), now()).is_err());
        assert!(store.tasks().is_empty());
    }
}
