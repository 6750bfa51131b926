//! UI rendering functions for TUI

use crate::tui::app::App;
use crate::tui::types::{LoginField, Screen};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Main UI rendering function - dispatches to screen-specific render functions
pub fn ui(f: &mut Frame, app: &App) {
    match app.current_screen() {
        Screen::Splash => render_splash(f),
        Screen::Login => render_login(f, app),
        Screen::Inventory => render_inventory(f, app),
    }
}

fn render_splash(f: &mut Frame) {
    let area = centered(f.size(), 40, 5);
    let splash = Paragraph::new("Loading session...")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Stockkeep"));
    f.render_widget(splash, area);
}

fn render_login(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(4)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Email
            Constraint::Length(3), // Password
            Constraint::Min(3),    // Status/Help
        ])
        .split(f.size());

    let title = Paragraph::new("Sign in")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let form = &app.login_form;
    let field_style = |field: LoginField| {
        if form.focus == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let email = Paragraph::new(form.email.as_str())
        .style(field_style(LoginField::Email))
        .block(Block::default().borders(Borders::ALL).title("Email"));
    f.render_widget(email, chunks[1]);

    let masked = "*".repeat(form.password.chars().count());
    let password = Paragraph::new(masked)
        .style(field_style(LoginField::Password))
        .block(Block::default().borders(Borders::ALL).title("Password"));
    f.render_widget(password, chunks[2]);

    let mut lines = vec![Line::from(Span::styled(
        "Tab: switch field | Enter: sign in | Esc: quit",
        Style::default().fg(Color::DarkGray),
    ))];
    lines.push(Line::from(format!("Backend: {}", app.backend_status())));
    if let Some(status) = &app.status {
        lines.push(Line::from(Span::styled(status.clone(), Style::default().fg(Color::Red))));
    }
    let help = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_inventory(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(3)])
        .split(f.size());

    let title = Paragraph::new("Inventory")
        .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let user = app
        .profile()
        .map(|profile| format!("{} ({})", profile.email, profile.user_id))
        .unwrap_or_else(|| "unknown".to_string());
    let details = vec![
        Line::from(vec![Span::styled("User: ", Style::default().fg(Color::Yellow)), Span::raw(user)]),
        Line::from(vec![
            Span::styled("Backend: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.backend_status()),
        ]),
        Line::from(vec![
            Span::styled("Install: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.install.install_id.to_string()),
        ]),
    ];
    let body = Paragraph::new(details)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Session"));
    f.render_widget(body, chunks[1]);

    let help_text = match &app.status {
        Some(status) => format!("{} | o: sign out | r: retry backend | q: quit", status),
        None => "o: sign out | r: retry backend | q: quit".to_string(),
    };
    let help = Paragraph::new(help_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
