use crate::app::{App, LoadState};
use crate::hierarchy::CategoryRow;
use crate::i18n::MessageKey;
use crate::util::{display_width, strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Render the category tree.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(
            " {} ({}) ",
            app.text(MessageKey::ListTitle),
            app.rows.len()
        ));

    if app.rows.is_empty() {
        let key = match app.load_state {
            LoadState::Loading | LoadState::Idle => MessageKey::Loading,
            _ => MessageKey::Empty,
        };
        let placeholder = Paragraph::new(app.text(key))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    // Borders take two columns
    let inner_width = area.width.saturating_sub(2) as usize;
    let style_selected = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let style_normal = Style::default();
    let style_counts = Style::default().fg(Color::DarkGray);

    let items: Vec<ListItem> = app
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let selected = i == app.selected;
            let style = if selected { style_selected } else { style_normal };
            let counts = counts_label(row);
            let indent = "  ".repeat(row.depth);
            let icon = row
                .icon
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| format!("{} ", strip_control_chars(s)))
                .unwrap_or_default();

            // SEC: names come from the server, strip escape sequences
            let name = strip_control_chars(&row.name);
            let budget = inner_width
                .saturating_sub(indent.len() + counts.len())
                .saturating_sub(display_width(&icon));
            let name = truncate_to_width(&name, budget).into_owned();

            let counts_style = if selected { style_selected } else { style_counts };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{indent}{icon}"), style),
                Span::styled(name, style),
                Span::styled(counts, counts_style),
            ]))
        })
        .collect();

    let list = List::new(items).block(block);
    let mut state = ListState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}

/// Trailing " [courses, children]" annotation.
fn counts_label(row: &CategoryRow) -> String {
    if row.child_count > 0 {
        format!("  [{} courses, {} sub]", row.course_count, row.child_count)
    } else {
        format!("  [{} courses]", row.course_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CategoryId;

    fn row(course_count: i64, child_count: usize) -> CategoryRow {
        CategoryRow {
            id: CategoryId::from(1),
            name: "Tech".to_string(),
            slug: "tech".to_string(),
            icon: None,
            picture: None,
            depth: 0,
            course_count,
            child_count,
        }
    }

    #[test]
    fn test_counts_label() {
        assert_eq!(counts_label(&row(3, 0)), "  [3 courses]");
        assert_eq!(counts_label(&row(0, 2)), "  [0 courses, 2 sub]");
    }
}
