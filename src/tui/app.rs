use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use ratatui::widgets::TableState;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::controller::ReminderController;
use crate::error::{ReminderError, Result};
use crate::models::{Alarm, NewAlarm, NewTask, Notification, Priority, Severity, Task, TaskPatch};
use crate::notify::ChannelSink;
use crate::storage::FileStore;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
    Confirming,
}

pub enum ViewMode {
    Alarms,
    Tasks,
}

pub enum InputField {
    None,
    Title,
    Description,
}

/// State for the multi-step "Add" wizards.
#[derive(Default)]
pub struct AddState {
    pub title: String,
    pub date: String,
    pub time: String,
    pub description: Option<String>,
    pub step: usize, // alarms: 0 title, 1 date, 2 time, 3 note; tasks: 0 title, 1 description, 2 priority
}

pub struct App {
    pub reminders: ReminderController<FileStore>,
    pub notifications: Receiver<Notification>,
    /// Notification currently shown and when it stops being shown.
    pub banner: Option<(Notification, Instant)>,
    pub alarm_state: TableState,
    pub task_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<String>,
    pub add_state: AddState,
    pub show_completed: bool,
    /// One-line feedback on the last action.
    pub status: Option<(Severity, String)>,
}

impl App {
    /// Opens the store and starts the scheduler.
    pub fn new() -> App {
        let config = Config::from_env();
        let (tx, rx) = mpsc::channel();
        let reminders = ReminderController::new(
            FileStore::new(&config.db_path),
            Box::new(ChannelSink::new(tx)),
            Box::new(SystemClock),
            &config,
        );

        let mut app = App {
            reminders,
            notifications: rx,
            banner: None,
            alarm_state: TableState::default(),
            task_state: TableState::default(),
            view_mode: ViewMode::Alarms,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            show_completed: false,
            status: None,
        };
        app.clamp_selection();
        app
    }

    /// Alarms shown in the Alarms view.
    pub fn visible_alarms(&self) -> Vec<&Alarm> {
        if self.show_completed {
            self.reminders.alarms().iter().collect()
        } else {
            self.reminders.upcoming_alarms()
        }
    }

    /// Advances timers and moves fired notifications into the banner.
    pub fn on_tick(&mut self) {
        self.reminders.poll();
        while let Ok(n) = self.notifications.try_recv() {
            let until = Instant::now() + Duration::from_millis(n.duration_ms);
            self.banner = Some((n, until));
        }
        if let Some((_, until)) = &self.banner {
            if Instant::now() >= *until {
                self.banner = None;
            }
        }
        self.clamp_selection();
    }

    /// Selects the next row in the current view.
    pub fn next(&mut self) {
        let (len, state) = self.current_list();
        if len == 0 { return; }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous row in the current view.
    pub fn previous(&mut self) {
        let (len, state) = self.current_list();
        if len == 0 { return; }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Toggles the selected alarm's completion, or advances the selected task.
    pub fn toggle_selected(&mut self) {
        let result = match self.view_mode {
            ViewMode::Alarms => match self.selected_alarm_id() {
                Some(id) => self.reminders.toggle_alarm_complete(&id).map(|_| ()),
                None => return,
            },
            ViewMode::Tasks => match self.selected_task_id() {
                Some(id) => self.reminders.advance_task_status(&id).map(|_| ()),
                None => return,
            },
        };
        if let Err(e) = result {
            self.status = Some(outcome(Err(e)));
        }
        self.clamp_selection();
    }

    /// Asks for confirmation before deleting the selected row.
    pub fn start_delete(&mut self) {
        let id = match self.view_mode {
            ViewMode::Alarms => self.selected_alarm_id(),
            ViewMode::Tasks => self.selected_task_id(),
        };
        if let Some(id) = id {
            self.target_id = Some(id);
            self.input_mode = InputMode::Confirming;
        }
    }

    /// Finishes a pending deletion; `accepted` is the user's answer.
    pub fn confirm_delete(&mut self, accepted: bool) {
        self.input_mode = InputMode::Normal;
        let Some(id) = self.target_id.take() else { return };
        let result = match self.view_mode {
            ViewMode::Alarms => self.reminders.delete_alarm(&id, |_: &Alarm| accepted),
            ViewMode::Tasks => self.reminders.delete_task(&id, |_: &Task| accepted),
        };
        self.status = match result {
            Ok(false) => None,
            other => Some(outcome(other.map(|_| "Deleted.".to_string()))),
        };
        self.clamp_selection();
    }

    /// Title of the record awaiting delete confirmation.
    pub fn pending_delete_title(&self) -> Option<&str> {
        let id = self.target_id.as_deref()?;
        match self.view_mode {
            ViewMode::Alarms => self.reminders.alarms().iter().find(|a| a.id == id).map(|a| a.title.as_str()),
            ViewMode::Tasks => self.reminders.tasks().iter().find(|t| t.id == id).map(|t| t.title.as_str()),
        }
    }

    /// Toggles the visibility of completed and past alarms.
    pub fn toggle_completed(&mut self) {
        self.show_completed = !self.show_completed;
        self.clamp_selection();
    }

    /// Toggles between Alarm and Task views.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Alarms => ViewMode::Tasks,
            ViewMode::Tasks => ViewMode::Alarms,
        };
    }

    /// Initiates the "Add" wizard for the current view.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
        self.status = None;
    }

    /// Initiates editing of a field of the selected task.
    pub fn start_edit(&mut self, field: InputField) {
        if let ViewMode::Alarms = self.view_mode { return; }
        let Some(id) = self.selected_task_id() else { return };
        let Some(task) = self.reminders.tasks().iter().find(|t| t.id == id) else { return };

        self.input_buffer = match field {
            InputField::Title => task.title.clone(),
            InputField::Description => task.description.clone().unwrap_or_default(),
            InputField::None => String::new(),
        };
        self.target_id = Some(id);
        self.input_field = field;
        self.input_mode = InputMode::Editing;
    }

    /// Leaves input mode without applying anything.
    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.target_id = None;
    }

    /// Handles text input based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => match self.view_mode {
                ViewMode::Alarms => self.handle_alarm_wizard(),
                ViewMode::Tasks => self.handle_task_wizard(),
            },
            InputMode::Editing => self.handle_editing_input(),
            _ => {}
        }
    }

    fn handle_alarm_wizard(&mut self) {
        match self.add_state.step {
            0 => { // Title
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.title = std::mem::take(&mut self.input_buffer);
                    self.add_state.step += 1;
                }
            }
            1 => { // Date, today when left empty
                self.add_state.date = if self.input_buffer.trim().is_empty() {
                    self.reminders.today().to_string()
                } else {
                    std::mem::take(&mut self.input_buffer)
                };
                self.input_buffer.clear();
                self.add_state.step += 1;
            }
            2 => { // Time
                self.add_state.time = std::mem::take(&mut self.input_buffer);
                self.add_state.step += 1;
            }
            3 => { // Note, then finish
                let note = Some(std::mem::take(&mut self.input_buffer));
                let input = NewAlarm {
                    title: std::mem::take(&mut self.add_state.title),
                    date: std::mem::take(&mut self.add_state.date),
                    time: std::mem::take(&mut self.add_state.time),
                    note,
                };
                let result = self.reminders.create_alarm(input);
                self.status = Some(outcome(result.map(|alarm| {
                    format!("Alarm '{}' set for {} {}", alarm.title, alarm.date, alarm.time_label())
                })));
                self.input_mode = InputMode::Normal;
                self.clamp_selection();
            }
            _ => {}
        }
    }

    fn handle_task_wizard(&mut self) {
        match self.add_state.step {
            0 => { // Title, placeholder when left empty
                self.add_state.title = std::mem::take(&mut self.input_buffer);
                self.add_state.step += 1;
            }
            1 => { // Description
                let description = std::mem::take(&mut self.input_buffer);
                self.add_state.description = Some(description).filter(|d| !d.trim().is_empty());
                self.add_state.step += 1;
            }
            2 => { // Priority, then finish
                let raw = std::mem::take(&mut self.input_buffer);
                let priority = if raw.trim().is_empty() {
                    None
                } else {
                    match raw.parse::<Priority>() {
                        Ok(p) => Some(p),
                        Err(e) => {
                            self.status = Some((Severity::Warning, e));
                            return;
                        }
                    }
                };
                let input = NewTask {
                    title: std::mem::take(&mut self.add_state.title),
                    description: self.add_state.description.take(),
                    priority,
                };
                let result = self.reminders.create_task(input);
                self.status = Some(outcome(result.map(|task| format!("Task '{}' added", task.title))));
                self.input_mode = InputMode::Normal;
                self.clamp_selection();
            }
            _ => {}
        }
    }

    /// Handles input for the "Edit Task" mode.
    fn handle_editing_input(&mut self) {
        if let Some(id) = self.target_id.take() {
            let value = std::mem::take(&mut self.input_buffer);
            let patch = match self.input_field {
                InputField::Title => TaskPatch { title: Some(value), description: None },
                InputField::Description => TaskPatch { title: None, description: Some(value) },
                InputField::None => TaskPatch::default(),
            };
            if let Err(e) = self.reminders.update_task(&id, patch) {
                self.status = Some(outcome(Err(e)));
            }
        }
        self.input_mode = InputMode::Normal;
    }

    fn current_list(&mut self) -> (usize, &mut TableState) {
        let len = match self.view_mode {
            ViewMode::Alarms => self.visible_alarms().len(),
            ViewMode::Tasks => self.reminders.tasks().len(),
        };
        match self.view_mode {
            ViewMode::Alarms => (len, &mut self.alarm_state),
            ViewMode::Tasks => (len, &mut self.task_state),
        }
    }

    fn selected_alarm_id(&self) -> Option<String> {
        let i = self.alarm_state.selected()?;
        self.visible_alarms().get(i).map(|a| a.id.clone())
    }

    fn selected_task_id(&self) -> Option<String> {
        let i = self.task_state.selected()?;
        self.reminders.tasks().get(i).map(|t| t.id.clone())
    }

    /// Keeps both selections inside their lists after the lists change.
    fn clamp_selection(&mut self) {
        let alarms = self.visible_alarms().len();
        let tasks = self.reminders.tasks().len();
        clamp(&mut self.alarm_state, alarms);
        clamp(&mut self.task_state, tasks);
    }
}

fn clamp(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}

/// Severity and text of the feedback line for an action's result. Input the
/// user can correct is a warning; anything else that failed is an error.
fn outcome(result: Result<String>) -> (Severity, String) {
    match result {
        Ok(message) => (Severity::Success, message),
        Err(e @ ReminderError::Validation(_)) => (Severity::Warning, e.to_string()),
        Err(e) => (Severity::Error, e.to_string()),
    }
}
