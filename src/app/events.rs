//! Folding background task results into [`App`] state.

use tokio::sync::mpsc;

use super::{tasks, App, AppEvent, LoadState};
use crate::api::{CategoryId, CategoryRecord, TransportError};
use crate::i18n::MessageKey;

impl App {
    /// Handle one event from a background task.
    pub fn handle_event(&mut self, event: AppEvent, tx: &mpsc::Sender<AppEvent>) {
        match event {
            AppEvent::CategoriesLoaded { generation, result } => {
                self.handle_loaded(generation, result);
            }
            AppEvent::CategorySaved {
                generation,
                created,
                name,
                result,
            } => {
                self.handle_saved(generation, created, name, result, tx);
            }
            AppEvent::CategoryDeleted { id, name, result } => {
                self.handle_deleted(id, name, result, tx);
            }
            AppEvent::TaskPanicked {
                task,
                generation,
                error,
            } => {
                self.handle_panicked(task, generation, error);
            }
        }
        self.needs_redraw = true;
    }

    fn handle_loaded(
        &mut self,
        generation: u64,
        result: Result<Vec<CategoryRecord>, TransportError>,
    ) {
        if generation != self.load_generation {
            tracing::debug!(
                generation,
                current = self.load_generation,
                "Dropping stale category list"
            );
            return;
        }
        self.load_handle = None;

        match result {
            Ok(records) => {
                let count = records.len();
                self.apply_categories(records);
                self.load_state = LoadState::Loaded;
                tracing::info!(count, generation, "Categories loaded");

                // Re-rooted records get called out, the rest is a plain count
                let mut notes = Vec::new();
                for (key, n) in [
                    (MessageKey::CycleDetected, self.forest.broken_cycles.len()),
                    (MessageKey::TooDeep, self.forest.too_deep.len()),
                ] {
                    if n > 0 {
                        notes.push(self.messages.format(key, &[("count", n.to_string().as_str())]));
                    }
                }
                let msg = if notes.is_empty() {
                    self.messages
                        .format(MessageKey::Loaded, &[("count", count.to_string().as_str())])
                } else {
                    notes.join("; ")
                };
                self.set_status(msg);
            }
            Err(e) => {
                // The previous collection stays; on first load that is empty.
                tracing::error!(error = %e, generation, "Failed to load categories");
                let reason = self.failure_text(&e);
                self.load_state = LoadState::Failed(reason.clone());
                let msg = self
                    .messages
                    .format(MessageKey::LoadFailed, &[("reason", reason.as_str())]);
                self.set_status(msg);
            }
        }
    }

    fn handle_saved(
        &mut self,
        generation: u64,
        created: bool,
        name: String,
        result: Result<CategoryRecord, TransportError>,
        tx: &mpsc::Sender<AppEvent>,
    ) {
        let current = self
            .form
            .as_ref()
            .and_then(|f| f.submitting_generation())
            == Some(generation);

        match result {
            Ok(record) => {
                tracing::info!(category_id = %record.id, generation, created, "Category saved");
                if current {
                    self.close_form();
                } else {
                    tracing::debug!(generation, "Save finished after its form closed");
                }
                let key = if created {
                    MessageKey::Created
                } else {
                    MessageKey::Updated
                };
                let msg = self.messages.format(key, &[("name", record.name.as_str())]);
                self.set_status(msg);
                // Storage changed either way.
                self.reload(tx);
            }
            Err(e) => {
                tracing::warn!(error = %e, generation, created, "Category save failed");
                let message = self.failure_text(&e);
                let applied = self
                    .form
                    .as_mut()
                    .is_some_and(|f| f.submission_failed(generation, message.clone()));
                if applied {
                    self.set_status(message);
                } else {
                    // The form is gone, so the status line is the only place left
                    tracing::debug!(generation, "Save failed after its form closed");
                    let msg = self.messages.format(
                        MessageKey::SaveFailed,
                        &[("name", name.as_str()), ("reason", message.as_str())],
                    );
                    self.set_status(msg);
                }
            }
        }
    }

    fn handle_deleted(
        &mut self,
        id: CategoryId,
        name: String,
        result: Result<(), TransportError>,
        tx: &mpsc::Sender<AppEvent>,
    ) {
        match result {
            Ok(()) => {
                tracing::info!(category_id = %id, "Category deleted");
                let msg = self.messages.format(MessageKey::Deleted, &[("name", name.as_str())]);
                self.set_status(msg);
                self.reload(tx);
            }
            Err(e) => {
                // No optimistic removal, so nothing to roll back.
                tracing::warn!(category_id = %id, error = %e, "Category delete failed");
                let reason = self.failure_text(&e);
                let msg = self.messages.format(
                    MessageKey::DeleteFailed,
                    &[("name", name.as_str()), ("reason", reason.as_str())],
                );
                self.set_status(msg);
            }
        }
    }

    fn handle_panicked(&mut self, task: &'static str, generation: Option<u64>, error: String) {
        tracing::error!(task, ?generation, error = %error, "Background task panicked");
        let generic = self.messages.get(MessageKey::GenericError).to_string();

        match (task, generation) {
            (tasks::LOAD_TASK, Some(g)) if g == self.load_generation => {
                self.load_handle = None;
                self.load_state = LoadState::Failed(generic);
            }
            (tasks::SAVE_TASK, Some(g)) => {
                // Only the submit that panicked; a newer form's submit is
                // still running.
                let applied = self
                    .form
                    .as_mut()
                    .is_some_and(|f| f.submission_failed(g, generic));
                if !applied {
                    tracing::debug!(generation = g, "Panicked save belonged to a closed form");
                }
            }
            _ => {}
        }

        let msg = self
            .messages
            .format(MessageKey::TaskPanicked, &[("task", task)]);
        self.set_status(msg);
    }
}
