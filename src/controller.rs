//! Reminder controller: the only entry point the UI layer uses.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{ReminderError, Result, ValidationError};
use crate::ledger::DedupLedger;
use crate::models::{hhmm, Alarm, AlarmFields, NewAlarm, NewTask, Task, TaskPatch, TaskStatus};
use crate::notify::NotificationSink;
use crate::scheduler::{Scheduler, TickReport};
use crate::storage::KeyValueStore;
use crate::store::ReminderStore;

/// Wires store, ledger and scheduler together.
///
/// The scheduler starts on construction and is stopped by [`stop`] or when
/// the controller is dropped. Timers only advance inside [`poll`], which the
/// host event loop is expected to call regularly.
///
/// [`stop`]: ReminderController::stop
/// [`poll`]: ReminderController::poll
pub struct ReminderController<S: KeyValueStore> {
    kv: S,
    store: ReminderStore,
    ledger: DedupLedger,
    scheduler: Scheduler,
    sink: Box<dyn NotificationSink>,
    clock: Box<dyn Clock>,
}

impl<S: KeyValueStore> ReminderController<S> {
    pub fn new(mut kv: S, sink: Box<dyn NotificationSink>, clock: Box<dyn Clock>, config: &Config) -> Self {
        let now = clock.now();
        let store = ReminderStore::load(&mut kv, config.seed_sample_tasks, now);
        let ledger = DedupLedger::new(config.marker_ttl);
        let scheduler = Scheduler::new(
            config.tick_interval,
            config.fire_policy,
            config.marker_ttl,
            config.notification_duration_ms,
        );
        let mut controller = Self { kv, store, ledger, scheduler, sink, clock };
        controller.start();
        controller
    }

    /// Restores persisted markers and runs an immediate evaluation. No effect
    /// when already running.
    pub fn start(&mut self) {
        if self.scheduler.is_running() {
            return;
        }
        let now = self.clock.now();
        match self.ledger.restore(&mut self.kv, now) {
            Ok(live) => debug!("restored {live} live markers"),
            Err(e) => warn!("cannot restore markers: {e}"),
        }
        self.scheduler.start(now);
        self.poll();
    }

    /// Cancels the tick deadline and every pending marker expiry.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        self.ledger.cancel_pending();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Deadline of the next scheduler tick, if running.
    pub fn next_deadline(&self) -> Option<NaiveDateTime> {
        self.scheduler.next_tick()
    }

    /// Services expired markers, then runs a tick if one is due.
    pub fn poll(&mut self) -> Option<TickReport> {
        if !self.scheduler.is_running() {
            return None;
        }
        let now = self.clock.now();
        self.ledger.sweep(&mut self.kv, now);
        if !self.scheduler.poll(now) {
            return None;
        }
        let report = self
            .scheduler
            .run_tick(self.store.alarms(), &mut self.ledger, &mut self.kv, self.sink.as_ref(), now);
        if !report.fired.is_empty() || report.failed > 0 {
            debug!(
                "tick at {now}: {} fired, {} suppressed, {} failed",
                report.fired.len(),
                report.suppressed,
                report.failed
            );
        }
        Some(report)
    }

    /// Re-reads both collections from the substrate, picking up changes
    /// written by another process.
    pub fn reload(&mut self) {
        let before: Vec<Alarm> = self.store.alarms().to_vec();
        self.store.reload(&mut self.kv, self.clock.now());
        if self.store.alarms() != before.as_slice() {
            self.alarms_changed();
        }
    }

    pub fn alarms(&self) -> &[Alarm] {
        self.store.alarms()
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    /// Uncompleted alarms dated today or later, ascending by due instant.
    pub fn upcoming_alarms(&self) -> Vec<&Alarm> {
        let today = self.clock.now().date();
        self.store
            .alarms()
            .iter()
            .filter(|a| !a.is_completed && a.date >= today)
            .collect()
    }

    /// The persistence substrate, read-only.
    pub fn substrate(&self) -> &S {
        &self.kv
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }

    pub fn create_alarm(&mut self, input: NewAlarm) -> Result<Alarm> {
        let fields = validate_alarm(input)?;
        let alarm = self.store.create_alarm(&mut self.kv, fields, self.clock.now())?;
        info!("created alarm '{}' for {} {}", alarm.title, alarm.date, alarm.time_label());
        self.alarms_changed();
        Ok(alarm)
    }

    /// Replaces title, date, time and note of an alarm. Markers recorded for
    /// the old due instant are left alone.
    pub fn update_alarm(&mut self, id: &str, input: NewAlarm) -> Result<Alarm> {
        let fields = validate_alarm(input)?;
        let alarm = self.store.update_alarm(&mut self.kv, id, fields)?;
        self.alarms_changed();
        Ok(alarm)
    }

    /// Deletes an alarm once `confirm` approves it. Returns `Ok(false)` when
    /// the confirmation is declined.
    pub fn delete_alarm(&mut self, id: &str, confirm: impl FnOnce(&Alarm) -> bool) -> Result<bool> {
        let alarm = self.store.alarm(id).ok_or_else(|| not_found("alarm", id))?;
        if !confirm(alarm) {
            debug!("deletion of alarm '{id}' declined");
            return Ok(false);
        }
        let removed = self.store.remove_alarm(&mut self.kv, id)?;
        info!("deleted alarm '{}'", removed.title);
        self.alarms_changed();
        Ok(true)
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle_alarm_complete(&mut self, id: &str) -> Result<bool> {
        let completed = self.store.toggle_alarm(&mut self.kv, id)?;
        self.alarms_changed();
        Ok(completed)
    }

    pub fn create_task(&mut self, input: NewTask) -> Result<Task> {
        let task = self.store.create_task(&mut self.kv, input, self.clock.now())?;
        info!("created task '{}'", task.title);
        Ok(task)
    }

    /// Deletes a task once `confirm` approves it. Returns `Ok(false)` when the
    /// confirmation is declined.
    pub fn delete_task(&mut self, id: &str, confirm: impl FnOnce(&Task) -> bool) -> Result<bool> {
        let task = self.store.task(id).ok_or_else(|| not_found("task", id))?;
        if !confirm(task) {
            debug!("deletion of task '{id}' declined");
            return Ok(false);
        }
        let removed = self.store.remove_task(&mut self.kv, id)?;
        info!("deleted task '{}'", removed.title);
        Ok(true)
    }

    pub fn advance_task_status(&mut self, id: &str) -> Result<TaskStatus> {
        self.store.advance_task(&mut self.kv, id)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        self.store.update_task(&mut self.kv, id, patch)
    }

    /// Resolves a full id or a unique prefix of an alarm id.
    pub fn resolve_alarm_id(&self, prefix: &str) -> Result<String> {
        resolve_prefix("alarm", prefix, self.store.alarms().iter().map(|a| a.id.as_str()))
    }

    /// Resolves a full id or a unique prefix of a task id.
    pub fn resolve_task_id(&self, prefix: &str) -> Result<String> {
        resolve_prefix("task", prefix, self.store.tasks().iter().map(|t| t.id.as_str()))
    }

    fn alarms_changed(&mut self) {
        self.scheduler.request_evaluation(self.clock.now());
        self.poll();
    }
}

impl<S: KeyValueStore> Drop for ReminderController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Checks the mandatory alarm fields and parses date and time.
pub fn validate_alarm(input: NewAlarm) -> std::result::Result<AlarmFields, ValidationError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    let date = input.date.trim();
    if date.is_empty() {
        return Err(ValidationError::MissingDate);
    }
    let time = input.time.trim();
    if time.is_empty() {
        return Err(ValidationError::MissingTime);
    }

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(date.to_owned()))?;
    let time = hhmm::parse(time).ok_or_else(|| ValidationError::InvalidTime(time.to_owned()))?;
    let note = input.note.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());

    Ok(AlarmFields { title: title.to_owned(), date, time, note })
}

fn not_found(kind: &'static str, id: &str) -> ReminderError {
    ReminderError::NotFound { kind, id: id.to_owned() }
}

fn resolve_prefix<'a>(kind: &'static str, prefix: &str, ids: impl Iterator<Item = &'a str>) -> Result<String> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(not_found(kind, prefix));
    }
    let matches: Vec<&str> = ids.filter(|id| id.starts_with(prefix)).collect();
    if let Some(exact) = matches.iter().find(|id| **id == prefix) {
        return Ok((*exact).to_owned());
    }
    match matches.as_slice() {
        [] => Err(not_found(kind, prefix)),
        [only] => Ok((*only).to_owned()),
        _ => Err(ReminderError::AmbiguousId { kind, prefix: prefix.to_owned() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, date: &str, time: &str) -> NewAlarm {
        NewAlarm { title: title.into(), date: date.into(), time: time.into(), note: None }
    }

    #[test]
    fn validation_reports_first_missing_field() {
        assert_eq!(validate_alarm(input(" ", "2026-01-01", "09:00")), Err(ValidationError::MissingTitle));
        assert_eq!(validate_alarm(input("x", "", "09:00")), Err(ValidationError::MissingDate));
        assert_eq!(validate_alarm(input("x", "2026-01-01", "")), Err(ValidationError::MissingTime));
    }

    #[test]
    fn validation_rejects_malformed_values() {
        assert!(matches!(validate_alarm(input("x", "01/02/2026", "09:00")), Err(ValidationError::InvalidDate(_))));
        assert!(matches!(validate_alarm(input("x", "2026-01-01", "25:00")), Err(ValidationError::InvalidTime(_))));
    }

    #[test]
    fn validation_trims_and_drops_blank_note() {
        let mut raw = input("  Standup ", "2026-01-01", " 09:05 ");
        raw.note = Some("   ".into());
        let fields = validate_alarm(raw).unwrap();
        assert_eq!(fields.title, "Standup");
        assert_eq!(fields.time.format("%H:%M").to_string(), "09:05");
        assert!(fields.note.is_none());
    }

    #[test]
    fn prefix_resolution() {
        let ids = ["abc123", "abd456", "abc"];
        assert_eq!(resolve_prefix("alarm", "abd", ids.iter().copied()).unwrap(), "abd456");
        assert_eq!(resolve_prefix("alarm", "abc", ids.iter().copied()).unwrap(), "abc");
        assert!(matches!(resolve_prefix("alarm", "ab", ids.iter().copied()), Err(ReminderError::AmbiguousId { .. })));
        assert!(matches!(resolve_prefix("alarm", "zz", ids.iter().copied()), Err(ReminderError::NotFound { .. })));
    }
}
