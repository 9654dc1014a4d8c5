//! Render functions for the TUI.
//!
//! The category list fills the screen above a one-line status bar. The form
//! modal and the delete confirmation are drawn on top when active.

use crate::app::{App, ConfirmAction};
use crate::i18n::MessageKey;
use crate::util::strip_control_chars;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{categories, form, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 50;
pub(super) const MIN_HEIGHT: u16 = 12;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    // EDGE-001: Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    categories::render(f, app, chunks[0]);
    status::render(f, app, chunks[1]);

    if let Some(ref category_form) = app.form {
        form::render(f, app, category_form);
    }

    // The confirmation sits above everything else
    if let Some(ref confirm) = app.pending_confirm {
        render_confirm_overlay(f, app, confirm);
    }
}

/// Centered rect of at most `width` x `height`, leaving a 2-cell margin.
pub(super) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Render a confirmation dialog overlay centered on screen.
fn render_confirm_overlay(f: &mut Frame, app: &App, confirm: &ConfirmAction) {
    let text = match confirm {
        ConfirmAction::DeleteCategory { name, .. } => {
            let name = strip_control_chars(name);
            app.messages
                .format(MessageKey::DeleteConfirm, &[("name", name.as_ref())])
        }
    };

    let overlay = centered(f.area(), 50, 5);
    if overlay.width < 10 || overlay.height < 3 {
        return;
    }

    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(format!(" {} ", app.text(MessageKey::ConfirmTitle))),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{rec, FakeRepo};
    use crate::form::FormSettings;
    use crate::i18n::Messages;
    use crate::preview::testing::TrackingStore;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app_with(records: Vec<crate::api::CategoryRecord>) -> App {
        let mut app = App::new(
            FakeRepo::with(Vec::new()),
            Arc::new(TrackingStore::default()),
            Messages::default(),
            FormSettings {
                max_image_bytes: 1024,
                exclude_descendants: false,
            },
        );
        app.apply_categories(records);
        app
    }

    fn screen(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for row in buffer.content.chunks(buffer.area.width as usize) {
            for cell in row {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_too_small_terminal() {
        let app = app_with(Vec::new());
        assert!(screen(&app, 30, 8).contains("Terminal too small"));
    }

    #[test]
    fn test_list_shows_indented_children() {
        let app = app_with(vec![rec(1, None, "Tech"), rec(2, Some(1), "Web")]);
        let out = screen(&app, 60, 14);
        assert!(out.contains("Tech"));
        assert!(out.contains("  Web"));
    }

    #[test]
    fn test_confirm_overlay_names_category() {
        let mut app = app_with(vec![rec(1, None, "Tech")]);
        app.request_delete();
        let out = screen(&app, 60, 14);
        assert!(out.contains("Delete \"Tech\"?"));
    }

    #[test]
    fn test_form_overlay_shows_title() {
        let mut app = app_with(vec![rec(1, None, "Tech")]);
        app.open_edit();
        let out = screen(&app, 80, 24);
        assert!(out.contains(MessageKey::FormTitleEdit.default_text()));
        assert!(out.contains("tech"));
    }
}
