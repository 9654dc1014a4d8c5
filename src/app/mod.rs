//! Manager Controller.
//!
//! [`App`] owns the category collection and everything derived from it, the
//! open form (if any) and the pending delete confirmation. Repository calls
//! run as background tasks (see [`tasks`]) and come back as [`AppEvent`]s,
//! which [`App::handle_event`] folds into state.
//!
//! The collection is only ever replaced wholesale by a fresh `list_all`;
//! mutations trigger a reload instead of patching it locally.

mod events;
pub mod tasks;

use std::borrow::Cow;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::{CategoryId, CategoryRecord, CategoryRepository, TransportError};
use crate::form::{CategoryForm, FormSettings, SubmitRefused};
use crate::hierarchy::{build_forest, rows, CategoryRow, Forest};
use crate::i18n::{MessageKey, Messages};
use crate::preview::PreviewStore;

/// How long a status message stays visible.
pub const STATUS_TTL_SECS: u64 = 3;

/// Events from background tasks
pub enum AppEvent {
    /// `list_all` finished. `generation` is the reload that spawned it.
    CategoriesLoaded {
        generation: u64,
        result: Result<Vec<CategoryRecord>, TransportError>,
    },
    /// `create` or `update` finished. `name` is the submitted name, for
    /// reporting a failure after the form has closed.
    CategorySaved {
        generation: u64,
        created: bool,
        name: String,
        result: Result<CategoryRecord, TransportError>,
    },
    CategoryDeleted {
        id: CategoryId,
        name: String,
        result: Result<(), TransportError>,
    },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task (see the `*_TASK` constants in [`tasks`])
    /// - `generation`: The load or submit generation the task ran for, if any
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked {
        task: &'static str,
        generation: Option<u64>,
        error: String,
    },
}

/// State of the category list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Pending confirmation action for destructive operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteCategory { id: CategoryId, name: String },
}

pub struct App {
    pub repo: Arc<dyn CategoryRepository>,
    pub previews: Arc<dyn PreviewStore>,
    pub messages: Messages,
    pub settings: FormSettings,

    /// Last collection confirmed by storage, in storage order.
    pub categories: Arc<Vec<CategoryRecord>>,
    pub forest: Forest,
    /// Pre-order rows of `forest`, what the list view shows.
    pub rows: Vec<CategoryRow>,
    pub load_state: LoadState,
    pub selected: usize,

    /// Open create/edit modal. Dropping it releases its preview.
    pub form: Option<CategoryForm>,

    /// When set, input is routed to the y/n handler.
    pub pending_confirm: Option<ConfirmAction>,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,

    /// Incremented per reload; responses from older reloads are dropped.
    load_generation: u64,
    /// Incremented per submit; matched against the form's in-flight submit.
    submit_generation: u64,
    load_handle: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        previews: Arc<dyn PreviewStore>,
        messages: Messages,
        settings: FormSettings,
    ) -> Self {
        Self {
            repo,
            previews,
            messages,
            settings,
            categories: Arc::new(Vec::new()),
            forest: Forest::default(),
            rows: Vec::new(),
            load_state: LoadState::Idle,
            selected: 0,
            form: None,
            pending_confirm: None,
            status_message: None,
            needs_redraw: true,
            load_generation: 0,
            submit_generation: 0,
            load_handle: None,
        }
    }

    pub fn text(&self, key: MessageKey) -> &str {
        self.messages.get(key)
    }

    // ------------------------------------------------------------------
    // Status line
    // ------------------------------------------------------------------

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear status message if expired. Returns true if one was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    /// Fetch the whole collection again. Any reload still in flight is
    /// aborted; its response would be stale anyway.
    pub fn reload(&mut self, tx: &mpsc::Sender<AppEvent>) {
        if let Some(handle) = self.load_handle.take() {
            handle.abort();
        }
        self.load_generation += 1;
        self.load_state = LoadState::Loading;
        self.needs_redraw = true;
        tracing::debug!(generation = self.load_generation, "Reloading categories");
        self.load_handle = Some(tasks::spawn_load(
            Arc::clone(&self.repo),
            self.load_generation,
            tx.clone(),
        ));
    }

    /// Replace the collection and rebuild the derived forest and rows.
    pub fn apply_categories(&mut self, records: Vec<CategoryRecord>) {
        let selected_id = self.selected_row().map(|r| r.id.clone());

        self.categories = Arc::new(records);
        self.forest = build_forest(&self.categories);
        self.rows = rows(&self.forest.roots);

        // Keep the cursor on the same category when it survived the reload
        if let Some(id) = selected_id {
            if let Some(pos) = self.rows.iter().position(|r| r.id == id) {
                self.selected = pos;
            }
        }
        self.clamp_selection();
        self.needs_redraw = true;
    }

    pub fn clamp_selection(&mut self) {
        self.selected = if self.rows.is_empty() {
            0
        } else {
            self.selected.min(self.rows.len() - 1)
        };
    }

    pub fn selected_row(&self) -> Option<&CategoryRow> {
        self.rows.get(self.selected)
    }

    pub fn selected_record(&self) -> Option<&CategoryRecord> {
        let row = self.selected_row()?;
        self.categories.iter().find(|r| r.id == row.id)
    }

    pub fn nav_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.needs_redraw = true;
    }

    pub fn nav_down(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
        self.needs_redraw = true;
    }

    // ------------------------------------------------------------------
    // Form
    // ------------------------------------------------------------------

    pub fn open_create(&mut self) {
        self.form = Some(CategoryForm::create(
            &self.categories,
            Arc::clone(&self.previews),
            self.settings,
        ));
        self.needs_redraw = true;
    }

    pub fn open_edit(&mut self) {
        let Some(record) = self.selected_record().cloned() else {
            self.set_status(self.messages.get(MessageKey::NoSelection).to_string());
            return;
        };
        self.form = Some(CategoryForm::edit(
            &record,
            &self.categories,
            Arc::clone(&self.previews),
            self.settings,
        ));
        self.needs_redraw = true;
    }

    /// Close the modal on any path. An in-flight submit is not cancelled;
    /// its response no longer matches a form and only triggers a reload.
    pub fn close_form(&mut self) {
        if let Some(form) = self.form.take() {
            if let Some(generation) = form.submitting_generation() {
                tracing::debug!(generation, "Form closed with submit in flight");
            }
        }
        self.needs_redraw = true;
    }

    pub fn submit_form(&mut self, tx: &mpsc::Sender<AppEvent>) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let generation = self.submit_generation + 1;
        match form.begin_submit(generation) {
            Ok(payload) => {
                self.submit_generation = generation;
                tracing::info!(generation, mode = ?form.mode(), "Submitting category");
                tasks::spawn_save(
                    Arc::clone(&self.repo),
                    form.mode().clone(),
                    payload,
                    generation,
                    tx.clone(),
                );
            }
            Err(SubmitRefused::Busy) => {
                let msg = self.messages.get(MessageKey::FormBusy).to_string();
                self.set_status(msg);
            }
            Err(SubmitRefused::Invalid) => {
                tracing::debug!(errors = form.errors().len(), "Form validation failed");
                let msg = self.messages.get(MessageKey::FormInvalid).to_string();
                self.set_status(msg);
            }
        }
        self.needs_redraw = true;
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Ask for confirmation before deleting the selected category.
    pub fn request_delete(&mut self) {
        let Some(row) = self.selected_row() else {
            self.set_status(self.messages.get(MessageKey::NoSelection).to_string());
            return;
        };
        self.pending_confirm = Some(ConfirmAction::DeleteCategory {
            id: row.id.clone(),
            name: row.name.clone(),
        });
        self.needs_redraw = true;
    }

    /// Run the confirmed action.
    pub fn confirm_pending(&mut self, tx: &mpsc::Sender<AppEvent>) {
        match self.pending_confirm.take() {
            Some(ConfirmAction::DeleteCategory { id, name }) => {
                tracing::info!(category_id = %id, "Deleting category");
                tasks::spawn_delete(Arc::clone(&self.repo), id, name, tx.clone());
            }
            None => {}
        }
        self.needs_redraw = true;
    }

    pub fn cancel_confirm(&mut self) {
        if self.pending_confirm.take().is_some() {
            let msg = self.messages.get(MessageKey::DeleteCancelled).to_string();
            self.set_status(msg);
        }
    }

    /// User-facing text for a failed repository call: the server's message
    /// verbatim when it sent one, the generic fallback otherwise.
    pub fn failure_text(&self, error: &TransportError) -> String {
        error
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.messages.get(MessageKey::GenericError).to_string())
    }
}

/// RES-002: Abort the in-flight reload when the app goes away.
impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.load_handle.take() {
            handle.abort();
            tracing::debug!("Aborted category load task on App drop");
        }
    }
}
