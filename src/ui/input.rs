//! Input handling for the TUI.
//!
//! Keys go to the confirm dialog when one is pending, to the form modal when
//! one is open, and to the category list otherwise.

use crate::app::{App, AppEvent};
use crate::form::FormField;
use crate::i18n::MessageKey;
use crate::util::validate_url_for_open;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    // Confirmation dialog captures all keys when visible
    if app.pending_confirm.is_some() {
        return Ok(handle_confirm_input(app, code, event_tx));
    }

    if app.form.is_some() {
        return Ok(handle_form_input(app, code, modifiers, event_tx));
    }

    Ok(handle_list_input(app, code, event_tx))
}

/// Handle input in the category list.
fn handle_list_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) -> Action {
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Home | KeyCode::Char('g') => {
            app.selected = 0;
        }
        KeyCode::End | KeyCode::Char('G') => {
            app.selected = app.rows.len().saturating_sub(1);
        }
        KeyCode::Char('a') => app.open_create(),
        KeyCode::Char('e') | KeyCode::Enter => app.open_edit(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('r') => app.reload(event_tx),
        KeyCode::Char('o') => open_selected_picture(app),
        _ => {}
    }
    Action::Continue
}

/// Open the selected category's picture in the system browser.
fn open_selected_picture(app: &mut App) {
    let picture = app
        .selected_row()
        .and_then(|row| row.picture.clone())
        .filter(|p| !p.trim().is_empty());

    let Some(url) = picture else {
        app.set_status(app.text(MessageKey::NoPicture).to_string());
        return;
    };

    // SEC: Validate URL before open::that() to prevent command injection
    match validate_url_for_open(&url) {
        Err(e) => {
            tracing::warn!(error = %e, "Refusing to open picture URL");
            app.set_status(app.text(MessageKey::PictureInvalidUrl).to_string());
        }
        Ok(valid) => {
            if let Err(e) = open::that(valid.as_str()) {
                let msg = app
                    .messages
                    .format(MessageKey::PictureOpenFailed, &[("reason", e.to_string().as_str())]);
                app.set_status(msg);
            }
        }
    }
}

/// Handle input while the create/edit modal is open.
fn handle_form_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);

    match code {
        KeyCode::Esc => {
            app.close_form();
            return Action::Continue;
        }
        KeyCode::Char('s') if ctrl => {
            app.submit_form(event_tx);
            return Action::Continue;
        }
        _ => {}
    }

    let Some(form) = app.form.as_mut() else {
        return Action::Continue;
    };

    match code {
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Left if form.focus() == FormField::Parent => form.cycle_parent(false),
        KeyCode::Right if form.focus() == FormField::Parent => form.cycle_parent(true),
        KeyCode::Char('x') if ctrl && form.focus() == FormField::Picture => {
            form.remove_image();
            let msg = app.messages.get(MessageKey::ImageRemoved).to_string();
            app.set_status(msg);
        }
        KeyCode::Enter if form.focus() == FormField::Picture => match form.load_typed_image() {
            Ok(()) => {
                let name = form
                    .draft()
                    .picture
                    .handle()
                    .map(|h| h.file_name().to_string())
                    .unwrap_or_default();
                let msg = app
                    .messages
                    .format(MessageKey::ImageSelected, &[("name", name.as_str())]);
                app.set_status(msg);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Image rejected");
                let msg = app
                    .messages
                    .format(MessageKey::ImageRejected, &[("reason", e.to_string().as_str())]);
                app.set_status(msg);
            }
        },
        KeyCode::Enter => form.focus_next(),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) if !ctrl => form.insert_char(c),
        _ => {}
    }
    Action::Continue
}

/// Handle y/n for the pending confirmation.
fn handle_confirm_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) -> Action {
    match code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_pending(event_tx),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_confirm(),
        _ => {}
    }
    Action::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{rec, FakeRepo};
    use crate::app::ConfirmAction;
    use crate::form::FormSettings;
    use crate::i18n::Messages;
    use crate::preview::testing::TrackingStore;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn loaded_app(repo: Arc<FakeRepo>) -> App {
        let mut app = App::new(
            repo.clone(),
            Arc::new(TrackingStore::default()),
            Messages::default(),
            FormSettings {
                max_image_bytes: 1024,
                exclude_descendants: false,
            },
        );
        app.apply_categories(repo.records.lock().unwrap().clone());
        app
    }

    fn press(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AppEvent>) -> Action {
        handle_input(app, code, KeyModifiers::NONE, tx).unwrap()
    }

    fn ctrl(app: &mut App, c: char, tx: &mpsc::Sender<AppEvent>) -> Action {
        handle_input(app, KeyCode::Char(c), KeyModifiers::CONTROL, tx).unwrap()
    }

    #[tokio::test]
    async fn test_q_quits_from_list() {
        let mut app = loaded_app(FakeRepo::with(Vec::new()));
        let (tx, _rx) = mpsc::channel(8);
        assert_eq!(press(&mut app, KeyCode::Char('q'), &tx), Action::Quit);
    }

    #[tokio::test]
    async fn test_q_types_into_form() {
        let mut app = loaded_app(FakeRepo::with(Vec::new()));
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('a'), &tx);
        assert_eq!(press(&mut app, KeyCode::Char('q'), &tx), Action::Continue);
        assert_eq!(app.form.as_ref().unwrap().draft().name, "q");
    }

    #[tokio::test]
    async fn test_delete_waits_for_y() {
        let repo = FakeRepo::with(vec![rec(1, None, "Tech")]);
        let mut app = loaded_app(repo.clone());
        let (tx, mut rx) = mpsc::channel(8);

        press(&mut app, KeyCode::Char('d'), &tx);
        assert!(matches!(
            app.pending_confirm,
            Some(ConfirmAction::DeleteCategory { .. })
        ));
        // Other keys are swallowed by the dialog
        press(&mut app, KeyCode::Char('a'), &tx);
        assert!(app.form.is_none());

        press(&mut app, KeyCode::Char('y'), &tx);
        assert!(app.pending_confirm.is_none());
        let _ = rx.recv().await;
        assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_esc_cancels_delete() {
        let repo = FakeRepo::with(vec![rec(1, None, "Tech")]);
        let mut app = loaded_app(repo.clone());
        let (tx, _rx) = mpsc::channel(8);

        press(&mut app, KeyCode::Char('d'), &tx);
        press(&mut app, KeyCode::Esc, &tx);
        assert!(app.pending_confirm.is_none());
        assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_form_keys() {
        let repo = FakeRepo::with(vec![rec(1, None, "Tech"), rec(2, Some(1), "Web")]);
        let mut app = loaded_app(repo.clone());
        let (tx, mut rx) = mpsc::channel(8);

        press(&mut app, KeyCode::Char('a'), &tx);
        for c in "Go".chars() {
            press(&mut app, KeyCode::Char(c), &tx);
        }
        // Name -> Slug -> Description -> Icon -> Parent
        for _ in 0..4 {
            press(&mut app, KeyCode::Tab, &tx);
        }
        press(&mut app, KeyCode::Right, &tx);
        assert_eq!(
            app.form.as_ref().unwrap().parent_label().as_deref(),
            Some("Tech")
        );

        ctrl(&mut app, 's', &tx);
        assert!(app.form.as_ref().unwrap().is_submitting());
        let _ = rx.recv().await;
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_esc_closes_form() {
        let mut app = loaded_app(FakeRepo::with(Vec::new()));
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('a'), &tx);
        press(&mut app, KeyCode::Esc, &tx);
        assert!(app.form.is_none());
    }

    #[tokio::test]
    async fn test_open_without_picture_sets_status() {
        let mut app = loaded_app(FakeRepo::with(vec![rec(1, None, "Tech")]));
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('o'), &tx);
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, MessageKey::NoPicture.default_text());
    }

    #[tokio::test]
    async fn test_open_rejects_non_http_picture() {
        let mut record = rec(1, None, "Tech");
        record.picture = Some("file:///etc/passwd".to_string());
        let mut app = loaded_app(FakeRepo::with(vec![record]));
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('o'), &tx);
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, MessageKey::PictureInvalidUrl.default_text());
    }
}
