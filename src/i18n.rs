//! User-facing strings, looked up by stable key.
//!
//! Everything the UI shows goes through [`Messages`]. Keys never change;
//! the text behind them can be overridden from the `[messages]` table of the
//! config file.

use std::collections::HashMap;

macro_rules! message_keys {
    ($( $variant:ident => $key:literal, $text:literal; )*) => {
        /// Stable message key.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageKey {
            $( $variant, )*
        }

        impl MessageKey {
            pub const ALL: &'static [MessageKey] = &[$( MessageKey::$variant, )*];

            /// Dotted key used in config overrides.
            pub fn key(self) -> &'static str {
                match self {
                    $( MessageKey::$variant => $key, )*
                }
            }

            /// Built-in English text.
            pub fn default_text(self) -> &'static str {
                match self {
                    $( MessageKey::$variant => $text, )*
                }
            }
        }
    };
}

message_keys! {
    Loading => "category.loading", "Loading categories...";
    Loaded => "category.loaded", "Loaded {count} categories";
    LoadFailed => "category.load_failed", "Could not load categories: {reason}";
    Empty => "category.empty", "No categories yet. Press 'a' to add one.";
    CycleDetected => "category.cycle_detected", "{count} categories had circular parents and are shown at top level";
    TooDeep => "category.too_deep", "{count} categories were nested too deeply and are shown at top level";
    Created => "category.created", "Created {name}";
    Updated => "category.updated", "Saved {name}";
    SaveFailed => "category.save_failed", "Could not save {name}: {reason}";
    DeleteConfirm => "category.delete_confirm", "Delete \"{name}\"? (y/n)";
    Deleted => "category.deleted", "Deleted {name}";
    DeleteFailed => "category.delete_failed", "Could not delete {name}: {reason}";
    DeleteCancelled => "category.delete_cancelled", "Delete cancelled";
    NoSelection => "category.no_selection", "No category selected";
    NoPicture => "category.no_picture", "Category has no picture";
    PictureInvalidUrl => "category.picture_invalid_url", "Picture URL cannot be opened";
    PictureOpenFailed => "category.picture_open_failed", "Could not open picture: {reason}";
    GenericError => "error.generic", "Something went wrong. Please try again.";
    TaskPanicked => "error.task_panicked", "Internal error in {task}";
    FormTitleCreate => "form.title_create", "New category";
    FormTitleEdit => "form.title_edit", "Edit category";
    FormSubmitting => "form.submitting", "Saving...";
    FormBusy => "form.busy", "Save already in progress";
    FormInvalid => "form.invalid", "Please fix the highlighted fields";
    NameRequired => "form.name_required", "Name is required";
    SlugRequired => "form.slug_required", "Slug is required";
    DisplayOrderInvalid => "form.display_order_invalid", "Display order must be a whole number";
    ImageRejected => "form.image_rejected", "Could not use image: {reason}";
    ImageSelected => "form.image_selected", "Selected {name}";
    ImageRemoved => "form.image_removed", "Image removed";
    FieldName => "form.field.name", "Name";
    FieldSlug => "form.field.slug", "Slug";
    FieldDescription => "form.field.description", "Description";
    FieldIcon => "form.field.icon", "Icon";
    FieldParent => "form.field.parent", "Parent";
    FieldDisplayOrder => "form.field.display_order", "Display order";
    FieldPicture => "form.field.picture", "Picture";
    ParentNone => "form.parent_none", "(none)";
    PictureNone => "form.picture_none", "(no image)";
    PictureWillRemove => "form.picture_will_remove", "(will be removed)";
    PicturePathHint => "form.picture_path_hint", "type a file path, Enter to load, Ctrl-X to remove";
    FormHelp => "form.help", "Tab: next field  Ctrl-S: save  Esc: cancel";
    ListHelp => "list.help", "a:add  e:edit  d:delete  r:reload  o:open picture  q:quit";
    ListTitle => "list.title", "Categories";
    ConfirmTitle => "confirm.title", "Confirm";
}

/// Message catalog: config overrides over the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    overrides: HashMap<String, String>,
}

impl Messages {
    /// Build from `[messages]` overrides. Keys that match no [`MessageKey`]
    /// are logged and dropped.
    pub fn new(overrides: HashMap<String, String>) -> Self {
        let overrides = overrides
            .into_iter()
            .filter(|(k, _)| {
                let known = MessageKey::ALL.iter().any(|m| m.key() == k);
                if !known {
                    tracing::warn!(key = %k, "Unknown message override key, ignoring");
                }
                known
            })
            .collect();
        Self { overrides }
    }

    pub fn get(&self, key: MessageKey) -> &str {
        self.overrides
            .get(key.key())
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text())
    }

    /// Text for `key` with `{placeholder}` substitution.
    ///
    /// Placeholders without a matching argument are left as-is.
    pub fn format(&self, key: MessageKey, args: &[(&str, &str)]) -> String {
        let mut text = self.get(key).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}
