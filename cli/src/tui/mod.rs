pub mod app;
pub mod ui;

use std::io;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use meterboard_core::{DashboardRequest, DashboardService};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::tui::app::{App, InputMode};
use crate::Store;

pub fn run(service: DashboardService<Store>, request: DashboardRequest) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(service, request);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal
            .draw(|f| ui::draw(f, app))
            .map_err(|e| io::Error::other(e.to_string()))?;

        if event::poll(std::time::Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.input_mode {
                    InputMode::Normal => {
                        app.status = None;
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                            KeyCode::Left | KeyCode::Char('h') => app.previous_window(),
                            KeyCode::Right | KeyCode::Char('l') => app.next_window(),
                            KeyCode::Char('+') | KeyCode::Char('=') => app.widen(),
                            KeyCode::Char('-') => app.narrow(),
                            KeyCode::Char('t') => app.jump_to_today(),
                            KeyCode::Char('p') => app.cycle_package(),
                            KeyCode::Char('v') => app.cycle_view(),
                            KeyCode::Char('r') => app.refresh(),
                            KeyCode::Char('a') => app.enter_edit_mode(),
                            _ => {}
                        }
                    }
                    InputMode::Editing => match key.code {
                        KeyCode::Enter => app.submit_command(),
                        KeyCode::Esc => app.exit_input_mode(),
                        KeyCode::Char(c) => app.input_char(c),
                        KeyCode::Backspace => app.delete_char(),
                        KeyCode::Left => app.move_cursor_left(),
                        KeyCode::Right => app.move_cursor_right(),
                        _ => {}
                    },
                }
            }
        }
    }
}
