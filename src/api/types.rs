use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Failures talking to the category storage backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success status. `message` is the server's human-readable message
    /// when the body carried one.
    #[error("HTTP error: status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl TransportError {
    /// Server-provided message, surfaced verbatim to the user when present.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Rejected {
                message: Some(m), ..
            } if !m.trim().is_empty() => Some(m.as_str()),
            _ => None,
        }
    }
}

// ============================================================================
// Category Record
// ============================================================================

/// Opaque category identifier.
///
/// Backends hand out numeric or string ids; both are held as a string and
/// compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<i64> for CategoryId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Uint(u64),
    Str(String),
}

impl From<RawId> for CategoryId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => Self(n.to_string()),
            RawId::Uint(n) => Self(n.to_string()),
            RawId::Str(s) => Self(s),
        }
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(Self::from)
    }
}

/// `null`, missing and `""` all mean "no parent".
fn parent_ref<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<CategoryId>, D::Error> {
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw
        .map(CategoryId::from)
        .filter(|id| !id.as_str().trim().is_empty()))
}

/// Immutable snapshot of a stored category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default, alias = "parent_id", deserialize_with = "parent_ref")]
    pub parent_id: Option<CategoryId>,
    #[serde(default, alias = "display_order")]
    pub display_order: i64,
    /// Server-computed; read-only here.
    #[serde(default, alias = "course_count")]
    pub course_count: i64,
}

// ============================================================================
// Outgoing Payload
// ============================================================================

/// Per-field intent for an outgoing create/update.
///
/// Keeps "not provided" and "explicitly cleared" apart on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Leave the stored value alone (part omitted).
    #[default]
    Unset,
    /// Clear the stored value (part sent empty).
    Cleared,
    /// Store this value.
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, FieldUpdate::Unset)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldUpdate::Set(v) => Some(v),
            _ => None,
        }
    }
}

/// Newly selected image bytes, copied out of the preview handle for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Arc<[u8]>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Encoded create/update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPayload {
    pub name: String,
    pub slug: String,
    pub description: FieldUpdate<String>,
    pub icon: FieldUpdate<String>,
    pub parent_id: FieldUpdate<CategoryId>,
    pub display_order: FieldUpdate<i64>,
    pub picture: FieldUpdate<ImageUpload>,
}

/// Multipart part names.
pub(crate) mod field {
    pub const NAME: &str = "name";
    pub const SLUG: &str = "slug";
    pub const DESCRIPTION: &str = "description";
    pub const ICON: &str = "icon";
    pub const PARENT_ID: &str = "parentId";
    pub const DISPLAY_ORDER: &str = "displayOrder";
    pub const PICTURE: &str = "picture";
}

/// One multipart part, before it is handed to reqwest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadPart {
    Text { name: &'static str, value: String },
    File { name: &'static str, upload: ImageUpload },
}

impl CategoryPayload {
    /// Flatten into parts: `Unset` fields are omitted, `Cleared` fields are
    /// sent as empty text, `Set` fields carry their value.
    pub fn parts(&self) -> Vec<PayloadPart> {
        fn text<T: ToString>(parts: &mut Vec<PayloadPart>, name: &'static str, f: &FieldUpdate<T>) {
            match f {
                FieldUpdate::Unset => {}
                FieldUpdate::Cleared => parts.push(PayloadPart::Text {
                    name,
                    value: String::new(),
                }),
                FieldUpdate::Set(v) => parts.push(PayloadPart::Text {
                    name,
                    value: v.to_string(),
                }),
            }
        }

        let mut parts = vec![
            PayloadPart::Text {
                name: field::NAME,
                value: self.name.clone(),
            },
            PayloadPart::Text {
                name: field::SLUG,
                value: self.slug.clone(),
            },
        ];
        text(&mut parts, field::DESCRIPTION, &self.description);
        text(&mut parts, field::ICON, &self.icon);
        text(&mut parts, field::PARENT_ID, &self.parent_id);
        text(&mut parts, field::DISPLAY_ORDER, &self.display_order);

        match &self.picture {
            FieldUpdate::Unset => {}
            FieldUpdate::Cleared => parts.push(PayloadPart::Text {
                name: field::PICTURE,
                value: String::new(),
            }),
            FieldUpdate::Set(upload) => parts.push(PayloadPart::File {
                name: field::PICTURE,
                upload: upload.clone(),
            }),
        }
        parts
    }
}

// ============================================================================
// Response Envelopes
// ============================================================================

/// Bodies may be bare or wrapped in `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(v) => v,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}
