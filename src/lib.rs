//! # Quick Reminders
//!
//! The quick-access reminder engine of the contact-center dashboard: a small
//! set of user-created alarms and tasks, persisted in a key-value store, and a
//! scheduler that notifies each alarm at most once when its minute arrives.
//!
//! The [`controller::ReminderController`] is the whole public surface for UI
//! code. It owns the store, the dedup ledger and the scheduler; the host event
//! loop drives time forward by calling [`controller::ReminderController::poll`].
//!
//! ```no_run
//! use quick_reminders::clock::SystemClock;
//! use quick_reminders::config::Config;
//! use quick_reminders::controller::ReminderController;
//! use quick_reminders::models::NewAlarm;
//! use quick_reminders::notify::TerminalSink;
//! use quick_reminders::storage::FileStore;
//!
//! let config = Config::from_env();
//! let store = FileStore::new(&config.db_path);
//! let mut reminders = ReminderController::new(store, Box::new(TerminalSink), Box::new(SystemClock), &config);
//! reminders
//!     .create_alarm(NewAlarm {
//!         title: "Standup".into(),
//!         date: "2026-10-16".into(),
//!         time: "09:30".into(),
//!         note: None,
//!     })
//!     .expect("valid alarm");
//! loop {
//!     reminders.poll();
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//! }
//! ```

pub mod clock;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod status;
pub mod storage;
pub mod store;
pub mod tui;

pub use error::{ReminderError, Result, ValidationError};
