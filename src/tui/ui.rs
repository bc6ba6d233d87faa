use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use crate::models::{Priority, Severity, TaskStatus};
use super::app::{App, InputMode, ViewMode, InputField};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Banner / status
            Constraint::Min(0),    // Table
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    render_banner(f, app, chunks[0]);

    match app.view_mode {
        ViewMode::Alarms => {
            let today = app.reminders.today();
            let rows: Vec<Row> = app
                .visible_alarms()
                .into_iter()
                .map(|a| {
                    let style = if a.is_completed {
                        Style::default().fg(Color::DarkGray)
                    } else if a.date < today {
                        Style::default().fg(Color::Gray)
                    } else if a.date == today {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default().fg(Color::Green)
                    };

                    Row::new(vec![
                        Cell::from(a.title.clone()),
                        Cell::from(a.date.to_string()),
                        Cell::from(a.time_label()),
                        Cell::from(a.note.clone().unwrap_or_default()),
                        Cell::from(if a.is_completed { "Done" } else { "Pending" }),
                    ]).style(style)
                })
                .collect();

            let widths = [
                Constraint::Min(20),
                Constraint::Length(12),
                Constraint::Length(7),
                Constraint::Min(20),
                Constraint::Length(8),
            ];

            let title = if app.show_completed { "Alarms - All" } else { "Alarms - Upcoming" };
            let table = Table::new(rows, widths)
                .header(Row::new(vec!["Title", "Date", "Time", "Note", "Status"])
                    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title(title))
                .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[1], &mut app.alarm_state);
        }
        ViewMode::Tasks => {
            let rows: Vec<Row> = app
                .reminders
                .tasks()
                .iter()
                .map(|t| {
                    let style = match t.status {
                        TaskStatus::Pending => Style::default().fg(Color::Yellow),
                        TaskStatus::InProgress => Style::default().fg(Color::Cyan),
                        TaskStatus::Completed => Style::default().fg(Color::DarkGray),
                    };
                    let priority = t.priority.map(Priority::label).unwrap_or("-");

                    Row::new(vec![
                        Cell::from(t.title.clone()),
                        Cell::from(t.description.clone().unwrap_or_default()),
                        Cell::from(priority),
                        Cell::from(t.status.label()),
                    ]).style(style)
                })
                .collect();

            let widths = [
                Constraint::Min(20),
                Constraint::Min(30),
                Constraint::Length(8),
                Constraint::Length(12),
            ];

            let table = Table::new(rows, widths)
                .header(Row::new(vec!["Title", "Description", "Priority", "Status"])
                    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title("Tasks"))
                .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[1], &mut app.task_state);
        }
    }

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Alarms => "q: Quit | a: Add | Space: Toggle Done | d: Del | c: Show All/Upcoming | v: View Tasks",
            ViewMode::Tasks => "q: Quit | a: Add | Space: Next Status | n: Title | e: Description | d: Del | v: View Alarms",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
        InputMode::Confirming => "y: Delete | any other key: Keep",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    // Render Input Box if needed
    match app.input_mode {
        InputMode::Editing | InputMode::Adding => {
            let area = centered_rect(60, 3, f.area());
            f.render_widget(Clear, area);

            let title = match app.input_mode {
                InputMode::Adding => match app.view_mode {
                    ViewMode::Alarms => match app.add_state.step {
                        0 => "Add Alarm: Enter Title",
                        1 => "Add Alarm: Enter Date (YYYY-MM-DD, empty for today)",
                        2 => "Add Alarm: Enter Time (HH:mm)",
                        3 => "Add Alarm: Enter Note (Optional)",
                        _ => "Add Alarm",
                    },
                    ViewMode::Tasks => match app.add_state.step {
                        0 => "Add Task: Enter Title (Optional)",
                        1 => "Add Task: Enter Description (Optional)",
                        2 => "Add Task: Enter Priority (low/medium/high, Optional)",
                        _ => "Add Task",
                    },
                },
                InputMode::Editing => match app.input_field {
                    InputField::Title => "Edit Title",
                    InputField::Description => "Edit Description",
                    InputField::None => "Edit",
                },
                _ => "",
            };

            let input = Paragraph::new(app.input_buffer.as_str())
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL).title(title));

            f.render_widget(input, area);
        }
        InputMode::Confirming => {
            let area = centered_rect(60, 3, f.area());
            f.render_widget(Clear, area);
            let question = format!("Delete '{}'? [y/N]", app.pending_delete_title().unwrap_or("?"));
            let prompt = Paragraph::new(question)
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL).title("Confirm"));
            f.render_widget(prompt, area);
        }
        InputMode::Normal => {}
    }
}

fn render_banner(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if let Some((n, _)) = &app.banner {
        (
            format!("{}: {}", n.title, n.message),
            Style::default().fg(severity_color(n.severity)).add_modifier(Modifier::BOLD),
        )
    } else if let Some((severity, status)) = &app.status {
        (status.clone(), Style::default().fg(severity_color(*severity)))
    } else {
        let next = app
            .reminders
            .next_deadline()
            .map(|t| format!("Next check at {}", t.format("%H:%M:%S")))
            .unwrap_or_else(|| "Scheduler stopped".to_string());
        (next, Style::default().fg(Color::DarkGray))
    };

    let banner = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Quick Reminders"));
    f.render_widget(banner, area);
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
