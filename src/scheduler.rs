//! Scheduler loop.
//!
//! The scheduler owns no thread. It keeps the deadline of the next tick and
//! the host event loop asks [`Scheduler::poll`] whether that deadline has
//! passed. A tick evaluates every alarm in collection order, one at a time:
//! check the ledger, dispatch, record the marker.

use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::{debug, error, info};

use crate::ledger::DedupLedger;
use crate::models::{Alarm, Severity};
use crate::notify::NotificationSink;
use crate::storage::KeyValueStore;

/// Rule deciding whether an alarm is due on a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirePolicy {
    /// Due only while the local clock shows the alarm's exact date and minute.
    #[default]
    ExactMinute,
    /// Due from its minute onward, for as long as a marker would live. An
    /// alarm missed while nothing was polling fires once on the next tick.
    CatchUp,
}

impl FromStr for FirePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" | "exact-minute" => Ok(FirePolicy::ExactMinute),
            "catch-up" | "catchup" => Ok(FirePolicy::CatchUp),
            other => Err(format!("unknown fire policy '{}', expected exact or catch-up", other)),
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Ids of alarms notified on this tick.
    pub fired: Vec<String>,
    /// Due alarms skipped because a live marker exists.
    pub suppressed: usize,
    /// Due alarms whose evaluation failed.
    pub failed: usize,
}

pub struct Scheduler {
    interval: Duration,
    policy: FirePolicy,
    catch_up_window: Duration,
    notification_duration_ms: u64,
    next_tick: Option<NaiveDateTime>,
}

impl Scheduler {
    pub fn new(interval: Duration, policy: FirePolicy, catch_up_window: Duration, notification_duration_ms: u64) -> Self {
        Self {
            interval,
            policy,
            catch_up_window,
            notification_duration_ms,
            next_tick: None,
        }
    }

    pub fn policy(&self) -> FirePolicy {
        self.policy
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Deadline of the next tick, if running.
    pub fn next_tick(&self) -> Option<NaiveDateTime> {
        self.next_tick
    }

    /// Starts the loop with a tick due immediately.
    pub fn start(&mut self, now: NaiveDateTime) {
        info!("scheduler started, ticking every {}s ({:?})", self.interval.num_seconds(), self.policy);
        self.next_tick = Some(now);
    }

    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            info!("scheduler stopped");
        }
    }

    /// Pulls the next tick forward to `now`. No effect when stopped.
    pub fn request_evaluation(&mut self, now: NaiveDateTime) {
        if let Some(next) = self.next_tick.as_mut() {
            if *next > now {
                *next = now;
            }
        }
    }

    /// Returns `true` when a tick is due and moves the deadline past `now`.
    ///
    /// Deadlines advance in whole intervals from the previous one so that
    /// slow polling does not drift the cadence.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        let Some(next) = self.next_tick else {
            return false;
        };
        if now < next {
            return false;
        }
        let mut following = next + self.interval;
        while following <= now {
            following += self.interval;
        }
        self.next_tick = Some(following);
        true
    }

    /// Whether `alarm` is due at `now` under the configured policy.
    pub fn is_due(&self, alarm: &Alarm, now: NaiveDateTime) -> bool {
        match self.policy {
            FirePolicy::ExactMinute => {
                alarm.date == now.date() && alarm.time.hour() == now.hour() && alarm.time.minute() == now.minute()
            }
            FirePolicy::CatchUp => {
                let due = alarm.due_at();
                due <= now && now - due < self.catch_up_window
            }
        }
    }

    /// Evaluates every alarm once and notifies the newly due ones.
    ///
    /// A failure on one alarm is logged and the remaining alarms are still
    /// evaluated.
    pub fn run_tick<S: KeyValueStore + ?Sized>(
        &self,
        alarms: &[Alarm],
        ledger: &mut DedupLedger,
        kv: &mut S,
        sink: &dyn NotificationSink,
        now: NaiveDateTime,
    ) -> TickReport {
        let mut report = TickReport::default();

        for alarm in alarms {
            if alarm.is_completed || !self.is_due(alarm, now) {
                continue;
            }

            match ledger.has_fired(kv, &alarm.id, alarm.date, alarm.time, now) {
                Ok(true) => {
                    debug!("alarm '{}' already notified, suppressing", alarm.id);
                    report.suppressed += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!("cannot check marker for alarm '{}', skipping: {e}", alarm.id);
                    report.failed += 1;
                    continue;
                }
            }

            sink.dispatch(&alarm.title, &notification_message(alarm), Severity::Info, self.notification_duration_ms);
            info!("alarm '{}' fired ({} {})", alarm.title, alarm.date, alarm.time_label());

            if let Err(e) = ledger.mark_fired(kv, &alarm.id, alarm.date, alarm.time, now) {
                error!("cannot record marker for alarm '{}': {e}", alarm.id);
                report.failed += 1;
            }
            report.fired.push(alarm.id.clone());
        }

        report
    }
}

/// The alarm's note, or a generated message when it has none.
pub fn notification_message(alarm: &Alarm) -> String {
    match alarm.note.as_deref().map(str::trim) {
        Some(note) if !note.is_empty() => note.to_owned(),
        _ => format!("Reminder: {} at {}", alarm.title, alarm.time_label()),
    }
}
