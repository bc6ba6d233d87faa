use std::io::{self, Write};
use std::time::Duration as StdDuration;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::warn;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::controller::ReminderController;
use crate::models::{Alarm, NewAlarm, NewTask, Priority, Task, TaskPatch, TaskStatus};
use crate::notify::{LogSink, NotificationSink, TerminalSink};
use crate::scheduler::FirePolicy;
use crate::storage::FileStore;

/// How often the watch loop wakes up to poll the scheduler.
const WATCH_POLL: StdDuration = StdDuration::from_secs(1);

/// Number of id characters shown in tables.
const SHORT_ID: usize = 8;

/// Opens the controller on the configured store file.
///
/// Notifications that fall due while a command runs are printed, or only
/// logged when `silent`.
pub fn open_controller(config: &Config, silent: bool) -> ReminderController<FileStore> {
    let sink: Box<dyn NotificationSink> = if silent { Box::new(LogSink) } else { Box::new(TerminalSink) };
    ReminderController::new(FileStore::new(&config.db_path), sink, Box::new(SystemClock), config)
}

/// Creates a new alarm.
pub fn cmd_alarm_add(title: String, date: String, time: String, note: Option<String>, silent: bool) {
    let mut reminders = open_controller(&Config::from_env(), silent);
    match reminders.create_alarm(NewAlarm { title, date, time, note }) {
        Ok(alarm) => {
            if !silent { println!("Alarm added (id = {})", short_id(&alarm.id)); }
        }
        Err(e) => {
            if !silent { eprintln!("Cannot add alarm: {}", e); }
        }
    }
}

/// Lists alarms in a table, upcoming only unless `all` is true.
pub fn cmd_alarm_list(all: bool) {
    let reminders = open_controller(&Config::from_env(), false);
    let today = reminders.today();
    let alarms: Vec<&Alarm> = if all { reminders.alarms().iter().collect() } else { reminders.upcoming_alarms() };
    if alarms.is_empty() {
        println!("No alarms found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Date").add_attribute(Attribute::Bold),
            Cell::new("Time").add_attribute(Attribute::Bold),
            Cell::new("Note").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for a in alarms {
        let (status, color) = if a.is_completed {
            ("Done", Color::Green)
        } else if a.date < today {
            ("Past", Color::Grey)
        } else if a.date == today {
            ("Today", Color::Yellow)
        } else {
            ("Pending", Color::Reset)
        };
        table.add_row(vec![
            Cell::new(short_id(&a.id)),
            Cell::new(&a.title),
            Cell::new(a.date),
            Cell::new(a.time_label()),
            Cell::new(a.note.clone().unwrap_or_default()),
            Cell::new(status).fg(color),
        ]);
    }

    println!("{table}");
}

/// Toggles the completion flag of an alarm.
pub fn cmd_alarm_toggle(id: String, silent: bool) {
    let mut reminders = open_controller(&Config::from_env(), silent);
    let result = reminders.resolve_alarm_id(&id).and_then(|full| reminders.toggle_alarm_complete(&full));
    match result {
        Ok(true) => { if !silent { println!("Alarm {} marked as done.", id); } }
        Ok(false) => { if !silent { println!("Alarm {} marked as pending.", id); } }
        Err(e) => { if !silent { eprintln!("{}", e); } }
    }
}

/// Removes an alarm, asking for confirmation unless `force`.
pub fn cmd_alarm_remove(id: String, force: bool, silent: bool) {
    let mut reminders = open_controller(&Config::from_env(), silent);
    let result = reminders
        .resolve_alarm_id(&id)
        .and_then(|full| reminders.delete_alarm(&full, |a| force || confirm(&format!("Delete alarm '{}'?", a.title))));
    match result {
        Ok(true) => { if !silent { println!("Alarm {} removed.", id); } }
        Ok(false) => { if !silent { println!("Aborted."); } }
        Err(e) => { if !silent { eprintln!("{}", e); } }
    }
}

/// Adds a task. A missing title gets the placeholder title.
pub fn cmd_task_add(title: Option<String>, description: Option<String>, priority: Option<Priority>, silent: bool) {
    let mut reminders = open_controller(&Config::from_env(), silent);
    let new_task = NewTask { title: title.unwrap_or_default(), description, priority };
    match reminders.create_task(new_task) {
        Ok(task) => { if !silent { println!("Task added (id = {})", short_id(&task.id)); } }
        Err(e) => { if !silent { eprintln!("Failed to save task: {}", e); } }
    }
}

/// Lists tasks in a table.
pub fn cmd_task_list() {
    let reminders = open_controller(&Config::from_env(), false);
    let tasks: &[Task] = reminders.tasks();
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for t in tasks {
        let priority_color = match t.priority {
            Some(Priority::High) => Color::Red,
            Some(Priority::Medium) => Color::Yellow,
            Some(Priority::Low) => Color::Green,
            None => Color::Reset,
        };
        table.add_row(vec![
            Cell::new(short_id(&t.id)),
            Cell::new(&t.title),
            Cell::new(t.description.clone().unwrap_or_default()),
            Cell::new(t.priority.map(Priority::label).unwrap_or("-")).fg(priority_color),
            Cell::new(t.status.label()).fg(status_color(t.status)),
        ]);
    }

    println!("{table}");
}

/// Moves a task one step along its status cycle.
pub fn cmd_task_advance(id: String, silent: bool) {
    let mut reminders = open_controller(&Config::from_env(), silent);
    match reminders.resolve_task_id(&id).and_then(|full| reminders.advance_task_status(&full)) {
        Ok(status) => { if !silent { println!("Task {} is now {}.", id, status.label()); } }
        Err(e) => { if !silent { eprintln!("{}", e); } }
    }
}

/// Edits the title and/or description of a task.
pub fn cmd_task_edit(id: String, title: Option<String>, description: Option<String>, silent: bool) {
    let mut reminders = open_controller(&Config::from_env(), silent);
    let patch = TaskPatch { title, description };
    match reminders.resolve_task_id(&id).and_then(|full| reminders.update_task(&full, patch)) {
        Ok(_) => { if !silent { println!("Task {} updated.", id); } }
        Err(e) => { if !silent { eprintln!("{}", e); } }
    }
}

/// Removes a task, asking for confirmation unless `force`.
pub fn cmd_task_remove(id: String, force: bool, silent: bool) {
    let mut reminders = open_controller(&Config::from_env(), silent);
    let result = reminders
        .resolve_task_id(&id)
        .and_then(|full| reminders.delete_task(&full, |t| force || confirm(&format!("Delete task '{}'?", t.title))));
    match result {
        Ok(true) => { if !silent { println!("Task {} removed.", id); } }
        Ok(false) => { if !silent { println!("Aborted."); } }
        Err(e) => { if !silent { eprintln!("{}", e); } }
    }
}

/// Runs the scheduler in the foreground, printing notifications as they
/// fire. Changes made by other commands are picked up on every poll.
pub fn cmd_watch(catch_up: bool) {
    let mut config = Config::from_env();
    if catch_up {
        config = config.with_fire_policy(FirePolicy::CatchUp);
    }
    let mut reminders = open_controller(&config, false);
    println!(
        "Watching {} upcoming alarms in {} (Ctrl-C to stop)",
        reminders.upcoming_alarms().len(),
        config.db_path.display()
    );
    loop {
        std::thread::sleep(WATCH_POLL);
        reminders.reload();
        reminders.poll();
    }
}

/// Resets the database by deleting all alarms, tasks and markers.
pub fn cmd_reset(force: bool) {
    if !force && !confirm("Are you sure you want to delete all alarms and tasks? This cannot be undone.") {
        println!("Aborted.");
        return;
    }

    let store = FileStore::new(Config::from_env().db_path);
    if let Err(e) = store.delete() {
        eprintln!("Failed to reset database: {}", e);
    } else {
        println!("Database reset successfully.");
    }
}

/// Asks a yes/no question on stdin. Anything but `y` is a no.
fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if let Err(e) = io::stdout().flush() {
        warn!("cannot flush prompt: {e}");
    }
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID).unwrap_or(id)
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::InProgress => Color::Cyan,
        TaskStatus::Completed => Color::Green,
    }
}
