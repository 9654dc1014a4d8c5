use crate::api::{CategoryId, CategoryPayload, CategoryRecord, FieldUpdate};
use crate::i18n::MessageKey;
use crate::preview::PreviewHandle;

use super::FormField;

/// Image state of a draft.
#[derive(Debug, Default)]
pub enum PictureField {
    /// No image, none stored.
    #[default]
    Empty,
    /// The stored image, untouched.
    Remote(String),
    /// A newly picked image, not yet uploaded.
    Selected(PreviewHandle),
    /// The stored image is to be cleared on submit.
    Removed,
}

impl PictureField {
    /// Starting state for a draft seeded from `original`.
    pub fn baseline(original: Option<&CategoryRecord>) -> Self {
        match original.and_then(|r| r.picture.as_deref()) {
            Some(uri) if !uri.trim().is_empty() => PictureField::Remote(uri.to_string()),
            _ => PictureField::Empty,
        }
    }

    pub fn handle(&self) -> Option<&PreviewHandle> {
        match self {
            PictureField::Selected(h) => Some(h),
            _ => None,
        }
    }
}

/// Field-scoped validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub key: MessageKey,
}

/// In-progress values of one category. Every field is held as typed so a
/// failed submit never loses input.
#[derive(Debug, Default)]
pub struct CategoryDraft {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub icon: String,
    pub parent_id: Option<CategoryId>,
    pub display_order: String,
    pub picture: PictureField,
}

impl CategoryDraft {
    pub fn from_record(record: &CategoryRecord) -> Self {
        Self {
            name: record.name.clone(),
            slug: record.slug.clone(),
            description: record.description.clone().unwrap_or_default(),
            icon: record.icon.clone().unwrap_or_default(),
            parent_id: record.parent_id.clone(),
            display_order: record.display_order.to_string(),
            picture: PictureField::baseline(Some(record)),
        }
    }

    /// Synchronous pre-submit checks. Empty means valid.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError {
                field: FormField::Name,
                key: MessageKey::NameRequired,
            });
        }
        if self.slug.trim().is_empty() {
            errors.push(FieldError {
                field: FormField::Slug,
                key: MessageKey::SlugRequired,
            });
        }
        let order = self.display_order.trim();
        if !order.is_empty() && order.parse::<i64>().is_err() {
            errors.push(FieldError {
                field: FormField::DisplayOrder,
                key: MessageKey::DisplayOrderInvalid,
            });
        }
        errors
    }

    /// Encode against the record being edited (`None` when creating).
    ///
    /// Optional fields are `Unset` when they match the stored value,
    /// `Cleared` when a stored value was emptied, `Set` otherwise. Call
    /// [`validate`](Self::validate) first; an unparsable display order is
    /// left `Unset`.
    pub fn to_payload(&self, original: Option<&CategoryRecord>) -> CategoryPayload {
        CategoryPayload {
            name: self.name.trim().to_string(),
            slug: self.slug.trim().to_string(),
            description: text_update(
                &self.description,
                original.and_then(|r| r.description.as_deref()),
            ),
            icon: text_update(&self.icon, original.and_then(|r| r.icon.as_deref())),
            parent_id: parent_update(
                self.parent_id.as_ref(),
                original.map(|r| r.parent_id.as_ref()),
            ),
            display_order: order_update(&self.display_order, original.map(|r| r.display_order)),
            picture: match &self.picture {
                PictureField::Selected(handle) => FieldUpdate::Set(handle.to_upload()),
                PictureField::Removed => FieldUpdate::Cleared,
                PictureField::Empty | PictureField::Remote(_) => FieldUpdate::Unset,
            },
        }
    }
}

fn text_update(value: &str, stored: Option<&str>) -> FieldUpdate<String> {
    let value = value.trim();
    let stored = stored.map(str::trim).filter(|s| !s.is_empty());
    match (value.is_empty(), stored) {
        (true, None) => FieldUpdate::Unset,
        (true, Some(_)) => FieldUpdate::Cleared,
        (false, Some(s)) if s == value => FieldUpdate::Unset,
        (false, _) => FieldUpdate::Set(value.to_string()),
    }
}

/// `stored` is `None` when creating, `Some(None)` when editing a root.
fn parent_update(
    value: Option<&CategoryId>,
    stored: Option<Option<&CategoryId>>,
) -> FieldUpdate<CategoryId> {
    match (value, stored.flatten()) {
        (None, None) => FieldUpdate::Unset,
        (None, Some(_)) => FieldUpdate::Cleared,
        (Some(v), Some(s)) if v == s => FieldUpdate::Unset,
        (Some(v), _) => FieldUpdate::Set(v.clone()),
    }
}

fn order_update(value: &str, stored: Option<i64>) -> FieldUpdate<i64> {
    match value.trim().parse::<i64>() {
        Ok(v) if stored == Some(v) => FieldUpdate::Unset,
        Ok(v) => FieldUpdate::Set(v),
        Err(_) => FieldUpdate::Unset,
    }
}
