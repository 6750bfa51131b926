//! Stockkeep TUI (Terminal User Interface)
//!
//! A terminal front-end that exercises the session layer: splash, sign-in and
//! the inventory landing screen.

use anyhow::Context;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use stockkeep::config::AppConfig;
use stockkeep::tui::{ui::ui, App, Screen};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "stockkeep.json".to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    if let Err(e) = config.validate() {
        eprintln!("Warning: {} (backend features will be unavailable)", e);
    }

    init_file_logging("./app_data/stockkeep.log")?;

    // Create app state
    let mut app = App::new(config).context("Failed to start application")?;
    app.restore_session();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run main loop
    let res = run_app(&mut terminal, &mut app);

    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn init_file_logging(path: &str) -> anyhow::Result<()> {
    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        // Pick up route changes made by scheduled navigations
        app.tick();
        terminal.draw(|f| ui(f, app))?;

        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.current_screen() {
                    Screen::Splash => {
                        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                            app.should_quit = true;
                        }
                    }
                    Screen::Login => match key.code {
                        KeyCode::Esc => app.should_quit = true,
                        KeyCode::Tab | KeyCode::BackTab => app.login_form.toggle_focus(),
                        KeyCode::Enter => app.submit_login(),
                        KeyCode::Backspace => app.login_form.backspace(),
                        KeyCode::Char(c) if !c.is_control() => app.login_form.add_char(c),
                        _ => {}
                    },
                    Screen::Inventory => match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                        KeyCode::Char('o') => app.sign_out(),
                        KeyCode::Char('r') => app.retry_backend(),
                        _ => {}
                    },
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
