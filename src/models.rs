use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A one-shot reminder bound to a local date and minute.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    /// Opaque identifier, assigned at creation.
    pub id: String,
    /// Display title. Never empty.
    pub title: String,
    /// Due date (`YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Due minute (`HH:mm`).
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Optional free text shown as the notification body.
    #[serde(default)]
    pub note: Option<String>,
    /// Set by the user; unrelated to whether the alarm has fired.
    #[serde(default)]
    pub is_completed: bool,
    /// Local wall-clock creation time.
    pub created_at: NaiveDateTime,
}

impl Alarm {
    /// The due instant in local time.
    pub fn due_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Zero-padded `HH:mm` form of the due minute.
    pub fn time_label(&self) -> String {
        self.time.format(hhmm::FORMAT).to_string()
    }
}

/// Raw alarm fields as entered by the user, validated by the controller.
#[derive(Debug, Clone, Default)]
pub struct NewAlarm {
    pub title: String,
    pub date: String,
    pub time: String,
    pub note: Option<String>,
}

/// Alarm fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFields {
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub note: Option<String>,
}

/// Position of a task in its status cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Cosmetic priority. Does not affect scheduling.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}', expected low, medium or high", other)),
        }
    }
}

/// A checklist item with a cyclic status.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque identifier, assigned at creation.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Local wall-clock creation time.
    pub created_at: NaiveDateTime,
}

/// Fields for a new task. Every field may be left empty.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
}

/// Free-form edit of a task. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A notification handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub duration_ms: u64,
}

/// How a notification is styled. Fired alarms are `Info`; the front ends use
/// the other levels for feedback on user actions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Serde adapter storing a `NaiveTime` as zero-padded `HH:mm`.
///
/// Reading also accepts `HH:mm:ss`; seconds are dropped so the value always
/// names a whole minute.
pub mod hhmm {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn parse(s: &str) -> Option<NaiveTime> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", s)))
    }
}
