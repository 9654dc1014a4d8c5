//! Create/edit modal.

use crate::app::App;
use crate::form::{CategoryForm, FormField, FormPhase, PictureField};
use crate::i18n::MessageKey;
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::borrow::Cow;

use super::render::centered;

/// Width of the label column, including the ": " separator.
const LABEL_WIDTH: usize = 16;

/// Render the form modal centered on screen.
pub(super) fn render(f: &mut Frame, app: &App, form: &CategoryForm) {
    let overlay = centered(f.area(), 72, 16);
    if overlay.width < 30 || overlay.height < 10 {
        return;
    }

    let value_width = (overlay.width as usize).saturating_sub(2 + LABEL_WIDTH + 1);
    let submitting = form.is_submitting();

    let mut lines: Vec<Line> = Vec::with_capacity(FormField::ALL.len() + 5);
    for field in FormField::ALL {
        let focused = form.focus() == field;
        let label = format!(
            "{:<width$}",
            format!("{}:", app.text(field.label())),
            width = LABEL_WIDTH
        );
        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        let value = field_value(app, form, field);
        let cursor = if focused && !submitting && field != FormField::Parent {
            "_"
        } else {
            ""
        };
        let value = truncate_to_width(&value, value_width.saturating_sub(cursor.len()));

        let marker = if focused { ">" } else { " " };
        lines.push(Line::from(vec![
            Span::styled(marker, label_style),
            Span::styled(label, label_style),
            Span::raw(format!("{value}{cursor}")),
        ]));

        if let Some(key) = form.error_for(field) {
            lines.push(Line::from(Span::styled(
                format!("  {}", app.text(key)),
                Style::default().fg(Color::Red),
            )));
        }
    }

    lines.push(Line::default());
    match form.phase() {
        FormPhase::Submitting { .. } => lines.push(Line::from(Span::styled(
            app.text(MessageKey::FormSubmitting),
            Style::default().fg(Color::Yellow),
        ))),
        FormPhase::Failed { message } => lines.push(Line::from(Span::styled(
            strip_control_chars(message).into_owned(),
            Style::default().fg(Color::Red),
        ))),
        FormPhase::Editing => {
            if form.focus() == FormField::Picture {
                lines.push(Line::from(Span::styled(
                    app.text(MessageKey::PicturePathHint),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }
    lines.push(Line::from(Span::styled(
        app.text(MessageKey::FormHelp),
        Style::default().fg(Color::DarkGray),
    )));

    let title_key = if form.is_editing() {
        MessageKey::FormTitleEdit
    } else {
        MessageKey::FormTitleCreate
    };

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(format!(" {} ", app.text(title_key)))
                .title_alignment(Alignment::Center),
        )
        .style(if submitting {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        });
    f.render_widget(paragraph, overlay);
}

/// Display text for one field.
fn field_value<'a>(app: &'a App, form: &'a CategoryForm, field: FormField) -> Cow<'a, str> {
    let draft = form.draft();
    match field {
        FormField::Name => strip_control_chars(&draft.name),
        FormField::Slug => strip_control_chars(&draft.slug),
        FormField::Description => strip_control_chars(&draft.description),
        FormField::Icon => strip_control_chars(&draft.icon),
        FormField::DisplayOrder => Cow::Borrowed(draft.display_order.as_str()),
        FormField::Parent => {
            let name = form
                .parent_label()
                .unwrap_or_else(|| app.text(MessageKey::ParentNone).to_string());
            Cow::Owned(format!("< {} >", strip_control_chars(&name)))
        }
        FormField::Picture => {
            let current: Cow<'a, str> = match &draft.picture {
                PictureField::Empty => Cow::Borrowed(app.text(MessageKey::PictureNone)),
                PictureField::Remote(uri) => strip_control_chars(uri),
                PictureField::Selected(handle) => Cow::Owned(format!(
                    "{} ({} bytes)",
                    strip_control_chars(handle.file_name()),
                    handle.len()
                )),
                PictureField::Removed => Cow::Borrowed(app.text(MessageKey::PictureWillRemove)),
            };
            if form.image_path().is_empty() {
                current
            } else {
                Cow::Owned(format!("{current} <- {}", form.image_path()))
            }
        }
    }
}
