use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::Frame;

use crate::error::Result;
use crate::fmt::amount;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const ERROR_STYLE: Style = Style::new().fg(Color::Red);

pub const REALIZED_COLOR: Color = Color::Rgb(31, 119, 180);
pub const OFFERED_COLOR: Color = Color::Gray;
pub const TARGET_COLOR: Color = Color::Red;
pub const CURRENT_WEEK_COLOR: Color = Color::LightBlue;

pub const AMOUNT_POS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const AMOUNT_NEG_STYLE: Style = Style::new().fg(Color::Red);

/// Format an amount as a colored Span (green when non-negative).
pub fn amount_span(val: f64, currency: &str) -> Span<'static> {
    let style = if val < 0.0 {
        AMOUNT_NEG_STYLE
    } else {
        AMOUNT_POS_STYLE
    };
    Span::styled(amount(val, currency), style)
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

pub enum AppAction {
    Continue,
    Quit,
}

pub trait App {
    fn draw(&mut self, frame: &mut Frame);
    fn handle_key(&mut self, code: KeyCode) -> AppAction;
    /// Called once per loop iteration after drawing. Returns true when the
    /// state changed and the screen should be redrawn right away.
    fn tick(&mut self) -> bool;
    fn poll_timeout(&self) -> Duration;
}

/// Run an interactive ratatui app. Sets up the terminal, event loop and
/// panic hook, then restores the terminal on exit.
pub fn run_app(app: &mut dyn App) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| app.draw(frame)) {
            break Err(e.into());
        }
        if app.tick() {
            continue;
        }

        match event::poll(app.poll_timeout()) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => break Err(e.into()),
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    break Ok(());
                }
                match app.handle_key(key.code) {
                    AppAction::Quit => break Ok(()),
                    AppAction::Continue => {}
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}
