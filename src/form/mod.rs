//! Category Form Model.
//!
//! A [`CategoryForm`] is opened in create or edit mode, holds a
//! [`CategoryDraft`] while the user types, validates synchronously, and hands
//! out a [`CategoryPayload`] for submission. It never talks to the
//! repository itself; the controller does that and reports back through
//! [`CategoryForm::submission_failed`].

mod draft;

use std::path::Path;
use std::sync::Arc;

use crate::api::{CategoryId, CategoryPayload, CategoryRecord};
use crate::hierarchy::parent_candidates;
use crate::i18n::MessageKey;
use crate::preview::{load_image, PreviewError, PreviewHandle, PreviewStore};
use crate::util::{slugify, strip_control_chars};

pub use draft::{CategoryDraft, FieldError, PictureField};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: CategoryId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPhase {
    Editing,
    /// A create/update is in flight; further submits are refused.
    Submitting { generation: u64 },
    /// The last submit was rejected; the draft is intact for a retry.
    Failed { message: String },
}

/// Focusable fields, in Tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Slug,
    Description,
    Icon,
    Parent,
    DisplayOrder,
    Picture,
}

impl FormField {
    pub const ALL: [FormField; 7] = [
        FormField::Name,
        FormField::Slug,
        FormField::Description,
        FormField::Icon,
        FormField::Parent,
        FormField::DisplayOrder,
        FormField::Picture,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> MessageKey {
        match self {
            FormField::Name => MessageKey::FieldName,
            FormField::Slug => MessageKey::FieldSlug,
            FormField::Description => MessageKey::FieldDescription,
            FormField::Icon => MessageKey::FieldIcon,
            FormField::Parent => MessageKey::FieldParent,
            FormField::DisplayOrder => MessageKey::FieldDisplayOrder,
            FormField::Picture => MessageKey::FieldPicture,
        }
    }
}

/// One selectable parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentOption {
    pub id: CategoryId,
    pub name: String,
}

/// Knobs the form takes from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FormSettings {
    pub max_image_bytes: u64,
    pub exclude_descendants: bool,
}

/// Why a submit did not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitRefused {
    /// A submit is already in flight.
    Busy,
    /// Local validation failed; see [`CategoryForm::errors`].
    Invalid,
}

pub struct CategoryForm {
    mode: FormMode,
    original: Option<CategoryRecord>,
    draft: CategoryDraft,
    parents: Vec<ParentOption>,
    focus: FormField,
    /// Path typed into the picture field, loaded on Enter.
    image_path: String,
    phase: FormPhase,
    errors: Vec<FieldError>,
    previews: Arc<dyn PreviewStore>,
    settings: FormSettings,
}

impl CategoryForm {
    /// Empty draft. Every record is a parent candidate.
    pub fn create(
        records: &[CategoryRecord],
        previews: Arc<dyn PreviewStore>,
        settings: FormSettings,
    ) -> Self {
        Self::open(FormMode::Create, None, records, previews, settings)
    }

    /// Draft seeded from `record`.
    pub fn edit(
        record: &CategoryRecord,
        records: &[CategoryRecord],
        previews: Arc<dyn PreviewStore>,
        settings: FormSettings,
    ) -> Self {
        Self::open(
            FormMode::Edit {
                id: record.id.clone(),
            },
            Some(record.clone()),
            records,
            previews,
            settings,
        )
    }

    fn open(
        mode: FormMode,
        original: Option<CategoryRecord>,
        records: &[CategoryRecord],
        previews: Arc<dyn PreviewStore>,
        settings: FormSettings,
    ) -> Self {
        let editing = original.as_ref().map(|r| &r.id);
        let parents = parent_candidates(records, editing, settings.exclude_descendants)
            .into_iter()
            .map(|r| ParentOption {
                id: r.id.clone(),
                name: r.name.clone(),
            })
            .collect();
        let draft = original
            .as_ref()
            .map(CategoryDraft::from_record)
            .unwrap_or_default();

        tracing::debug!(mode = ?mode, "Opened category form");
        Self {
            mode,
            original,
            draft,
            parents,
            focus: FormField::Name,
            image_path: String::new(),
            phase: FormPhase::Editing,
            errors: Vec::new(),
            previews,
            settings,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit { .. })
    }

    pub fn draft(&self) -> &CategoryDraft {
        &self.draft
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, FormPhase::Submitting { .. })
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn error_for(&self, field: FormField) -> Option<MessageKey> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.key)
    }

    pub fn parent_options(&self) -> &[ParentOption] {
        &self.parents
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    /// Display name of the selected parent, or the raw id when it is not a
    /// candidate (e.g. a dangling reference).
    pub fn parent_label(&self) -> Option<String> {
        let id = self.draft.parent_id.as_ref()?;
        Some(
            self.parents
                .iter()
                .find(|p| &p.id == id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.to_string()),
        )
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Sets the name; while creating, the slug follows it.
    pub fn set_name(&mut self, name: &str) {
        self.draft.name = strip_control_chars(name).into_owned();
        if self.mode == FormMode::Create {
            self.draft.slug = slugify(&self.draft.name);
        }
        self.touched();
    }

    pub fn set_slug(&mut self, slug: &str) {
        self.draft.slug = strip_control_chars(slug).into_owned();
        self.touched();
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Type a character into the focused text field.
    pub fn insert_char(&mut self, c: char) {
        if self.is_submitting() || c.is_control() {
            return;
        }
        match self.focus {
            FormField::Name => {
                let mut name = self.draft.name.clone();
                name.push(c);
                self.set_name(&name);
            }
            FormField::Slug => {
                let mut slug = self.draft.slug.clone();
                slug.push(c);
                self.set_slug(&slug);
            }
            FormField::Description => {
                self.draft.description.push(c);
                self.touched();
            }
            FormField::Icon => {
                self.draft.icon.push(c);
                self.touched();
            }
            FormField::DisplayOrder => {
                self.draft.display_order.push(c);
                self.touched();
            }
            FormField::Picture => self.image_path.push(c),
            FormField::Parent => {}
        }
    }

    pub fn backspace(&mut self) {
        if self.is_submitting() {
            return;
        }
        match self.focus {
            FormField::Name => {
                let mut name = self.draft.name.clone();
                name.pop();
                self.set_name(&name);
            }
            FormField::Slug => {
                self.draft.slug.pop();
                self.touched();
            }
            FormField::Description => {
                self.draft.description.pop();
                self.touched();
            }
            FormField::Icon => {
                self.draft.icon.pop();
                self.touched();
            }
            FormField::DisplayOrder => {
                self.draft.display_order.pop();
                self.touched();
            }
            FormField::Picture => {
                self.image_path.pop();
            }
            FormField::Parent => {}
        }
    }

    /// Step through "(none)" followed by every candidate.
    pub fn cycle_parent(&mut self, forward: bool) {
        if self.is_submitting() {
            return;
        }
        let slots = self.parents.len() + 1;
        let current = match &self.draft.parent_id {
            None => 0,
            Some(id) => self
                .parents
                .iter()
                .position(|p| &p.id == id)
                .map_or(0, |i| i + 1),
        };
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        self.draft.parent_id = match next {
            0 => None,
            i => Some(self.parents[i - 1].id.clone()),
        };
        self.touched();
    }

    fn touched(&mut self) {
        if matches!(self.phase, FormPhase::Failed { .. }) {
            self.phase = FormPhase::Editing;
        }
    }

    // ------------------------------------------------------------------
    // Image
    // ------------------------------------------------------------------

    /// Load the path typed into the picture field.
    pub fn load_typed_image(&mut self) -> Result<(), PreviewError> {
        let path = self.image_path.trim().to_string();
        self.select_image(Path::new(&path))?;
        self.image_path.clear();
        Ok(())
    }

    /// Replace the draft's image with the file at `path`.
    ///
    /// The file is read and checked first; on failure the current image is
    /// kept. Only then is the held preview released, and only after that is
    /// the new one allocated.
    pub fn select_image(&mut self, path: &Path) -> Result<(), PreviewError> {
        if self.is_submitting() {
            return Ok(());
        }
        let image = load_image(path, self.settings.max_image_bytes)?;

        // Release before allocating.
        let previous = std::mem::take(&mut self.draft.picture);
        drop(previous);

        match PreviewHandle::acquire(Arc::clone(&self.previews), image) {
            Ok(handle) => {
                tracing::debug!(
                    file = handle.file_name(),
                    uri = handle.uri(),
                    "Selected category image"
                );
                self.draft.picture = PictureField::Selected(handle);
                self.touched();
                Ok(())
            }
            Err(e) => {
                self.draft.picture = PictureField::baseline(self.original.as_ref());
                Err(PreviewError::Io(e))
            }
        }
    }

    /// Drop any picked image and mark the stored one for clearing.
    pub fn remove_image(&mut self) {
        if self.is_submitting() {
            return;
        }
        let has_stored = matches!(
            PictureField::baseline(self.original.as_ref()),
            PictureField::Remote(_)
        );
        self.draft.picture = if has_stored {
            PictureField::Removed
        } else {
            PictureField::Empty
        };
        self.image_path.clear();
        self.touched();
    }

    // ------------------------------------------------------------------
    // Submit
    // ------------------------------------------------------------------

    /// Validate and, if valid, move to `Submitting` and return the payload.
    ///
    /// Refused while a submit is already in flight.
    pub fn begin_submit(&mut self, generation: u64) -> Result<CategoryPayload, SubmitRefused> {
        if self.is_submitting() {
            return Err(SubmitRefused::Busy);
        }
        self.errors = self.draft.validate();
        if !self.errors.is_empty() {
            self.phase = FormPhase::Editing;
            if let Some(first) = self.errors.first() {
                self.focus = first.field;
            }
            return Err(SubmitRefused::Invalid);
        }
        self.phase = FormPhase::Submitting { generation };
        Ok(self.draft.to_payload(self.original.as_ref()))
    }

    /// Record a rejected submit. Returns false when `generation` is not the
    /// one in flight.
    pub fn submission_failed(&mut self, generation: u64, message: String) -> bool {
        match self.phase {
            FormPhase::Submitting { generation: g } if g == generation => {
                self.phase = FormPhase::Failed { message };
                true
            }
            _ => false,
        }
    }

    /// Generation of the in-flight submit, if any.
    pub fn submitting_generation(&self) -> Option<u64> {
        match self.phase {
            FormPhase::Submitting { generation } => Some(generation),
            _ => None,
        }
    }
}

impl std::fmt::Debug for CategoryForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryForm")
            .field("mode", &self.mode)
            .field("draft", &self.draft)
            .field("focus", &self.focus)
            .field("phase", &self.phase)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FieldUpdate;
    use crate::preview::testing::{png, StoreEvent, TrackingStore};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const SETTINGS: FormSettings = FormSettings {
        max_image_bytes: 1024,
        exclude_descendants: false,
    };

    fn rec(id: i64, parent: Option<i64>, name: &str) -> CategoryRecord {
        CategoryRecord {
            id: CategoryId::from(id),
            name: name.to_string(),
            slug: slugify(name),
            description: None,
            icon: None,
            picture: None,
            parent_id: parent.map(CategoryId::from),
            display_order: 0,
            course_count: 0,
        }
    }

    fn scenario() -> Vec<CategoryRecord> {
        vec![
            rec(1, None, "Tech"),
            rec(2, Some(1), "Web"),
            rec(3, Some(99), "Orphan"),
        ]
    }

    fn image_file(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("taxon_form_{}_{}", label, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{label}.png"));
        std::fs::write(&path, png(label).bytes).unwrap();
        path
    }

    fn type_str(form: &mut CategoryForm, s: &str) {
        for c in s.chars() {
            form.insert_char(c);
        }
    }

    #[test]
    fn test_create_slug_follows_name() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&scenario(), store, SETTINGS);
        type_str(&mut form, "Web Development!");
        assert_eq!(form.draft().name, "Web Development!");
        assert_eq!(form.draft().slug, "web-development");
    }

    #[test]
    fn test_edit_keeps_remote_slug() {
        let records = scenario();
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::edit(&records[1], &records, store, SETTINGS);
        form.set_name("Web Platform");
        assert_eq!(form.draft().slug, "web");
    }

    #[test]
    fn test_name_strips_control_chars() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store, SETTINGS);
        form.set_name("Tech\x1b[31m");
        assert_eq!(form.draft().name, "Tech");
    }

    #[test]
    fn test_edit_parent_candidates_exclude_only_self() {
        let records = scenario();
        let store = Arc::new(TrackingStore::default());
        let form = CategoryForm::edit(&records[0], &records, store, SETTINGS);
        let ids: Vec<&str> = form.parent_options().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_edit_parent_candidates_can_exclude_descendants() {
        let records = scenario();
        let store = Arc::new(TrackingStore::default());
        let settings = FormSettings {
            exclude_descendants: true,
            ..SETTINGS
        };
        let form = CategoryForm::edit(&records[0], &records, store, settings);
        let ids: Vec<&str> = form.parent_options().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn test_cycle_parent_wraps_through_none() {
        let records = scenario();
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&records, store, SETTINGS);
        assert_eq!(form.parent_label(), None);

        form.cycle_parent(true);
        assert_eq!(form.parent_label().as_deref(), Some("Tech"));
        form.cycle_parent(false);
        assert_eq!(form.parent_label(), None);
        form.cycle_parent(false);
        assert_eq!(form.parent_label().as_deref(), Some("Orphan"));
    }

    #[test]
    fn test_empty_name_blocks_submit() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store, SETTINGS);
        form.focus_next();

        assert_eq!(form.begin_submit(1), Err(SubmitRefused::Invalid));
        assert_eq!(form.error_for(FormField::Name), Some(MessageKey::NameRequired));
        assert_eq!(form.focus(), FormField::Name);
        assert_eq!(form.phase(), &FormPhase::Editing);
    }

    #[test]
    fn test_second_submit_is_refused_while_in_flight() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store, SETTINGS);
        form.set_name("Tech");

        let payload = form.begin_submit(1).unwrap();
        assert_eq!(payload.slug, "tech");
        assert_eq!(form.begin_submit(2), Err(SubmitRefused::Busy));
        assert_eq!(form.submitting_generation(), Some(1));
    }

    #[test]
    fn test_failed_submit_keeps_draft() {
        let records = scenario();
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::edit(&records[1], &records, store, SETTINGS);
        form.set_name("Web Platform");
        form.focus_next();
        form.focus_next();
        type_str(&mut form, "Sites");

        form.begin_submit(4).unwrap();
        assert!(!form.submission_failed(3, "stale".to_string()));
        assert!(form.submission_failed(4, "Slug already taken".to_string()));

        assert_eq!(
            form.phase(),
            &FormPhase::Failed {
                message: "Slug already taken".to_string()
            }
        );
        assert_eq!(form.draft().name, "Web Platform");
        assert_eq!(form.draft().slug, "web");
        assert_eq!(form.draft().description, "Sites");

        // Editing again leaves the failed state
        form.insert_char('!');
        assert_eq!(form.phase(), &FormPhase::Editing);
    }

    #[test]
    fn test_input_ignored_while_submitting() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store, SETTINGS);
        form.set_name("Tech");
        form.begin_submit(1).unwrap();
        form.insert_char('x');
        form.backspace();
        assert_eq!(form.draft().name, "Tech");
    }

    #[test]
    fn test_replacing_image_releases_previous_once() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store.clone(), SETTINGS);

        form.select_image(&image_file("first")).unwrap();
        let first = form.draft().picture.handle().unwrap().key();
        form.select_image(&image_file("second")).unwrap();
        let second = form.draft().picture.handle().unwrap().key();

        assert_eq!(
            store.events(),
            vec![
                StoreEvent::Allocate(first),
                StoreEvent::Release(first),
                StoreEvent::Allocate(second),
            ]
        );
        assert_eq!(store.releases_of(first), 1);

        drop(form);
        assert_eq!(store.releases_of(second), 1);
        assert_eq!(store.live(), 0);
    }

    #[test]
    fn test_rejected_image_keeps_current_one() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store.clone(), SETTINGS);
        form.select_image(&image_file("keep")).unwrap();

        let missing = std::env::temp_dir().join("taxon_form_missing.png");
        assert!(form.select_image(&missing).is_err());
        assert!(form.draft().picture.handle().is_some());
        assert_eq!(store.live(), 1);
    }

    #[test]
    fn test_typed_path_is_loaded() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store.clone(), SETTINGS);
        for _ in 0..6 {
            form.focus_next();
        }
        assert_eq!(form.focus(), FormField::Picture);
        let path = image_file("typed");
        type_str(&mut form, &path.display().to_string());

        form.load_typed_image().unwrap();
        assert!(form.image_path().is_empty());
        assert_eq!(form.draft().picture.handle().map(|h| h.file_name()), Some("typed.png"));
    }

    #[test]
    fn test_remove_image_in_edit_mode_clears_stored() {
        let mut record = rec(5, None, "Art");
        record.picture = Some("https://cdn.example.com/art.png".to_string());
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::edit(&record, &[record.clone()], store.clone(), SETTINGS);

        form.select_image(&image_file("art")).unwrap();
        form.remove_image();

        assert!(matches!(form.draft().picture, PictureField::Removed));
        assert_eq!(store.live(), 0);
        form.set_name("Art");
        let payload = form.begin_submit(1).unwrap();
        assert_eq!(payload.picture, FieldUpdate::Cleared);
    }

    #[test]
    fn test_remove_image_without_stored_is_unset() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store.clone(), SETTINGS);
        form.select_image(&image_file("new")).unwrap();
        form.remove_image();
        form.set_name("New");

        let payload = form.begin_submit(1).unwrap();
        assert!(payload.picture.is_unset());
        assert_eq!(store.live(), 0);
    }

    #[test]
    fn test_selected_image_is_uploaded() {
        let store = Arc::new(TrackingStore::default());
        let mut form = CategoryForm::create(&[], store, SETTINGS);
        form.set_name("Tech");
        form.select_image(&image_file("logo")).unwrap();

        let payload = form.begin_submit(1).unwrap();
        let upload = payload.picture.as_set().unwrap();
        assert_eq!(upload.file_name, "logo.png");
        assert_eq!(upload.mime, "image/png");
    }
}
