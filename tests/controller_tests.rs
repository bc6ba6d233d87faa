use chrono::{Duration, NaiveDate, NaiveDateTime};
use quick_reminders::clock::{Clock, ManualClock};
use quick_reminders::config::Config;
use quick_reminders::controller::ReminderController;
use quick_reminders::models::{NewAlarm, NewTask, Notification, TaskPatch, TaskStatus};
use quick_reminders::notify::ChannelSink;
use quick_reminders::scheduler::FirePolicy;
use quick_reminders::storage::{KeyValueStore, MemoryStore};
use quick_reminders::store::{ReminderStore, DEFAULT_TASK_TITLE};
use quick_reminders::{ReminderError, ValidationError};
use std::sync::mpsc::{self, Receiver};

fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap().and_hms_opt(h, m, s).unwrap()
}

struct Harness {
    reminders: ReminderController<MemoryStore>,
    clock: ManualClock,
    rx: Receiver<Notification>,
}

impl Harness {
    fn new(now: NaiveDateTime) -> Self {
        Self::with(MemoryStore::new(), now, Config::default().without_sample_tasks())
    }

    fn with(kv: MemoryStore, now: NaiveDateTime, config: Config) -> Self {
        let clock = ManualClock::new(now);
        let (tx, rx) = mpsc::channel();
        let reminders = ReminderController::new(kv, Box::new(ChannelSink::new(tx)), Box::new(clock.clone()), &config);
        Self { reminders, clock, rx }
    }

    fn notifications(&self) -> Vec<Notification> {
        self.rx.try_iter().collect()
    }

    /// Advances the clock in one-second steps, polling after each.
    fn run_for(&mut self, duration: Duration) {
        let end = self.clock_now() + duration;
        while self.clock_now() < end {
            self.clock.advance(Duration::seconds(1));
            self.reminders.poll();
        }
    }

    fn clock_now(&self) -> NaiveDateTime {
        self.clock.now()
    }
}

fn alarm(title: &str, date: &str, time: &str) -> NewAlarm {
    NewAlarm { title: title.into(), date: date.into(), time: time.into(), note: None }
}

#[test]
fn due_alarm_notifies_exactly_once_in_its_minute() {
    let mut h = Harness::new(at(16, 9, 30, 0));
    h.reminders.create_alarm(alarm("Standup", "2026-10-16", "09:30")).unwrap();

    let got = h.notifications();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].title, "Standup");
    assert_eq!(got[0].message, "Reminder: Standup at 09:30");

    // Another evaluation inside the same minute.
    h.clock.set(at(16, 9, 30, 40));
    h.reminders.create_alarm(alarm("Lunch", "2026-10-16", "12:00")).unwrap();
    assert!(h.notifications().is_empty());

    h.run_for(Duration::minutes(5));
    assert!(h.notifications().is_empty());
}

#[test]
fn alarm_is_caught_by_the_regular_tick() {
    let mut h = Harness::new(at(16, 9, 28, 30));
    let mut with_note = alarm("Queue review", "2026-10-16", "09:30");
    with_note.note = Some("Check the email backlog".into());
    h.reminders.create_alarm(with_note).unwrap();
    assert!(h.notifications().is_empty());

    h.run_for(Duration::minutes(3));
    let got = h.notifications();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].message, "Check the email backlog");
}

#[test]
fn past_alarm_never_notifies() {
    let mut h = Harness::new(at(16, 9, 30, 0));
    h.reminders.create_alarm(alarm("Yesterday", "2026-10-15", "09:30")).unwrap();
    h.run_for(Duration::hours(2));
    assert!(h.notifications().is_empty());
}

#[test]
fn completed_alarm_is_silent() {
    let mut h = Harness::new(at(16, 9, 29, 0));
    let a = h.reminders.create_alarm(alarm("Silenced", "2026-10-16", "09:30")).unwrap();
    assert!(h.reminders.toggle_alarm_complete(&a.id).unwrap());

    h.run_for(Duration::minutes(3));
    assert!(h.notifications().is_empty());
}

#[test]
fn missing_title_is_rejected_without_mutation() {
    let mut h = Harness::new(at(16, 9, 0, 0));
    h.reminders.create_alarm(alarm("Keep", "2026-10-17", "08:00")).unwrap();

    let err = h.reminders.create_alarm(alarm("", "2026-10-17", "09:00")).unwrap_err();
    assert!(matches!(err, ReminderError::Validation(ValidationError::MissingTitle)));
    let err = h.reminders.create_alarm(alarm("No time", "2026-10-17", "")).unwrap_err();
    assert!(matches!(err, ReminderError::Validation(ValidationError::MissingTime)));

    assert_eq!(h.reminders.alarms().len(), 1);
}

#[test]
fn delete_requires_confirmation() {
    let mut h = Harness::new(at(16, 9, 0, 0));
    let a = h.reminders.create_alarm(alarm("Escalation call", "2026-10-18", "14:00")).unwrap();
    h.reminders.create_alarm(alarm("Other", "2026-10-18", "15:00")).unwrap();

    assert!(!h.reminders.delete_alarm(&a.id, |_| false).unwrap());
    assert_eq!(h.reminders.alarms().len(), 2);

    assert!(h.reminders.delete_alarm(&a.id, |found| found.title == "Escalation call").unwrap());
    assert_eq!(h.reminders.alarms().len(), 1);

    let mut kv = h.reminders.substrate().clone();
    let reloaded = ReminderStore::load(&mut kv, false, at(16, 9, 0, 0));
    assert!(reloaded.alarms().iter().all(|x| x.id != a.id));
    assert_eq!(reloaded.alarms().len(), 1);

    assert!(matches!(h.reminders.delete_alarm(&a.id, |_| true), Err(ReminderError::NotFound { .. })));
}

#[test]
fn upcoming_alarms_are_sorted_and_filtered() {
    let mut h = Harness::new(at(16, 7, 0, 0));
    h.reminders.create_alarm(alarm("c", "2026-10-20", "08:00")).unwrap();
    h.reminders.create_alarm(alarm("past", "2026-10-10", "08:00")).unwrap();
    h.reminders.create_alarm(alarm("a", "2026-10-16", "06:00")).unwrap();
    let done = h.reminders.create_alarm(alarm("done", "2026-10-17", "08:00")).unwrap();
    h.reminders.create_alarm(alarm("b", "2026-10-16", "18:15")).unwrap();
    h.reminders.toggle_alarm_complete(&done.id).unwrap();

    let titles: Vec<&str> = h.reminders.upcoming_alarms().iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b", "c"]);

    let all: Vec<&str> = h.reminders.alarms().iter().map(|a| a.title.as_str()).collect();
    assert_eq!(all, vec!["past", "a", "b", "done", "c"]);
}

#[test]
fn empty_task_gets_placeholder_and_cycles() {
    let mut h = Harness::new(at(16, 9, 0, 0));
    let t = h.reminders.create_task(NewTask::default()).unwrap();
    assert_eq!(t.title, DEFAULT_TASK_TITLE);
    assert_eq!(t.status, TaskStatus::Pending);

    assert_eq!(h.reminders.advance_task_status(&t.id).unwrap(), TaskStatus::InProgress);
    assert_eq!(h.reminders.advance_task_status(&t.id).unwrap(), TaskStatus::Completed);
    assert_eq!(h.reminders.advance_task_status(&t.id).unwrap(), TaskStatus::Pending);
}

#[test]
fn update_task_keeps_status() {
    let mut h = Harness::new(at(16, 9, 0, 0));
    let t = h.reminders.create_task(NewTask { title: "Draft".into(), ..NewTask::default() }).unwrap();
    h.reminders.advance_task_status(&t.id).unwrap();

    let updated = h
        .reminders
        .update_task(&t.id, TaskPatch { title: Some("Final".into()), description: Some("for QA".into()) })
        .unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.status, TaskStatus::InProgress);

    assert!(!h.reminders.delete_task(&t.id, |_| false).unwrap());
    assert!(h.reminders.delete_task(&t.id, |_| true).unwrap());
    assert!(h.reminders.tasks().is_empty());
}

#[test]
fn collections_round_trip_through_the_substrate() {
    let mut h = Harness::new(at(16, 9, 0, 0));
    let mut noted = alarm("Standup", "2026-10-17", "09:30");
    noted.note = Some("room 4".into());
    h.reminders.create_alarm(noted).unwrap();
    h.reminders.create_alarm(alarm("Retro", "2026-10-19", "16:00")).unwrap();
    let t = h.reminders.create_task(NewTask { title: "Call back".into(), ..NewTask::default() }).unwrap();
    h.reminders.advance_task_status(&t.id).unwrap();
    h.reminders.create_task(NewTask::default()).unwrap();

    let mut kv = h.reminders.substrate().clone();
    let reloaded = ReminderStore::load(&mut kv, true, at(16, 9, 0, 0));
    assert_eq!(reloaded.alarms(), h.reminders.alarms());
    assert_eq!(reloaded.tasks(), h.reminders.tasks());
}

#[test]
fn sample_tasks_seed_a_fresh_store() {
    let h = Harness::with(MemoryStore::new(), at(16, 9, 0, 0), Config::default());
    assert_eq!(h.reminders.tasks().len(), 3);
    assert!(h.reminders.alarms().is_empty());
}

#[test]
fn stop_cancels_ticks() {
    let mut h = Harness::new(at(16, 9, 29, 0));
    h.reminders.create_alarm(alarm("Standup", "2026-10-16", "09:30")).unwrap();
    h.reminders.stop();
    assert!(!h.reminders.is_running());
    assert!(h.reminders.next_deadline().is_none());

    h.run_for(Duration::minutes(3));
    assert!(h.notifications().is_empty());

    // Restarting inside the minute evaluates immediately.
    h.clock.set(at(16, 9, 30, 10));
    h.reminders.start();
    assert_eq!(h.notifications().len(), 1);
}

#[test]
fn catch_up_fires_missed_alarm_once_across_restarts() {
    let config = Config::default().without_sample_tasks().with_fire_policy(FirePolicy::CatchUp);

    let mut h = Harness::with(MemoryStore::new(), at(16, 8, 0, 0), config.clone());
    h.reminders.create_alarm(alarm("Report", "2026-10-16", "09:00")).unwrap();
    let kv = h.reminders.substrate().clone();
    drop(h);

    // Host reopened twenty minutes after the due minute.
    let second = Harness::with(kv, at(16, 9, 20, 0), config.clone());
    let got = second.notifications();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].title, "Report");
    let kv = second.reminders.substrate().clone();
    drop(second);

    // The marker survives the restart.
    let mut third = Harness::with(kv, at(16, 9, 25, 0), config);
    assert!(third.notifications().is_empty());

    // After the marker expires the alarm is outside the catch-up window.
    third.run_for(Duration::minutes(60));
    assert!(third.notifications().is_empty());
    let markers = third
        .reminders
        .substrate()
        .keys()
        .unwrap()
        .into_iter()
        .filter(|k| k.starts_with("alarm-notified-"))
        .count();
    assert_eq!(markers, 0);
}

#[test]
fn edited_alarm_fires_for_its_new_minute() {
    let mut h = Harness::new(at(16, 9, 30, 0));
    let a = h.reminders.create_alarm(alarm("Standup", "2026-10-16", "09:30")).unwrap();
    assert_eq!(h.notifications().len(), 1);

    h.reminders.update_alarm(&a.id, alarm("Standup", "2026-10-16", "09:32")).unwrap();
    h.run_for(Duration::minutes(3));
    assert_eq!(h.notifications().len(), 1);
}

/// Substrate that refuses to persist dedup markers.
struct MarkerlessStore(MemoryStore);

impl KeyValueStore for MarkerlessStore {
    fn get(&self, key: &str) -> quick_reminders::Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> quick_reminders::Result<()> {
        if key.starts_with("alarm-notified-") {
            return Err(std::io::Error::other("marker writes disabled").into());
        }
        self.0.set(key, value)
    }

    fn remove(&mut self, key: &str) -> quick_reminders::Result<()> {
        self.0.remove(key)
    }

    fn keys(&self) -> quick_reminders::Result<Vec<String>> {
        self.0.keys()
    }
}

#[test]
fn failed_marker_write_does_not_refire() {
    for policy in [FirePolicy::ExactMinute, FirePolicy::CatchUp] {
        let config = Config::default().without_sample_tasks().with_fire_policy(policy);
        let clock = ManualClock::new(at(16, 8, 59, 30));
        let (tx, rx) = mpsc::channel();
        let mut reminders = ReminderController::new(
            MarkerlessStore(MemoryStore::new()),
            Box::new(ChannelSink::new(tx)),
            Box::new(clock.clone()),
            &config,
        );
        reminders.create_alarm(alarm("Report", "2026-10-16", "09:00")).unwrap();

        let end = at(16, 9, 10, 0);
        while clock.now() < end {
            clock.advance(Duration::seconds(1));
            reminders.poll();
            if clock.now() == at(16, 9, 0, 20) {
                // Extra evaluations inside the due minute.
                reminders.create_alarm(alarm("Other", "2026-10-17", "09:00")).unwrap();
            }
        }

        let fired: Vec<Notification> = rx.try_iter().collect();
        assert_eq!(fired.len(), 1, "{policy:?}");
        assert_eq!(fired[0].title, "Report");
    }
}
