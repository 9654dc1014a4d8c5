use crate::app::App;
use crate::i18n::MessageKey;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    // EDGE-001: Guard against zero-width/height areas
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if app.is_loading() {
        Cow::Borrowed(app.text(MessageKey::Loading))
    } else if let Some((msg, _)) = &app.status_message {
        // Borrow existing status message instead of cloning
        Cow::Borrowed(msg.as_ref())
    } else if app.form.is_some() {
        Cow::Borrowed(app.text(MessageKey::FormHelp))
    } else {
        Cow::Borrowed(app.text(MessageKey::ListHelp))
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);

    let paragraph = Paragraph::new(text).style(style);
    f.render_widget(paragraph, area);
}
