//! Scoped preview resources for images picked in the form.
//!
//! A [`PreviewHandle`] is the only owner of an allocation in a
//! [`PreviewStore`]. It cannot be cloned and releases its allocation exactly
//! once, when dropped. Every way out of the form (submit, cancel, replacing
//! the image, removing it, shutting down) ends with the handle being dropped.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::api::ImageUpload;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Could not read image: {0}")]
    Io(#[from] io::Error),

    #[error("Image is {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
}

/// Allocation id inside a [`PreviewStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewKey(pub u64);

/// Backing storage for preview bytes.
pub trait PreviewStore: Send + Sync + fmt::Debug {
    /// Reserve a preview for `bytes`, returning a key and a local URI for it.
    fn allocate(&self, file_name: &str, bytes: &[u8]) -> io::Result<(PreviewKey, String)>;

    /// Free the allocation. Called once per key, from `PreviewHandle::drop`.
    fn release(&self, key: PreviewKey);
}

/// Writes each preview to its own file under a directory and deletes it on
/// release.
#[derive(Debug)]
pub struct TempDirPreviewStore {
    dir: PathBuf,
    next: AtomicU64,
    live: Mutex<HashMap<PreviewKey, PathBuf>>,
}

impl TempDirPreviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            next: AtomicU64::new(1),
            live: Mutex::new(HashMap::new()),
        })
    }
}

impl PreviewStore for TempDirPreviewStore {
    fn allocate(&self, file_name: &str, bytes: &[u8]) -> io::Result<(PreviewKey, String)> {
        let key = PreviewKey(self.next.fetch_add(1, Ordering::Relaxed));
        // SEC: never trust the picked file's name as a path component
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let path = self
            .dir
            .join(format!("preview-{}-{}.{}", std::process::id(), key.0, ext));
        std::fs::write(&path, bytes)?;

        let uri = format!("file://{}", path.display());
        match self.live.lock() {
            Ok(mut live) => {
                live.insert(key, path);
            }
            Err(_) => {
                let _ = std::fs::remove_file(&path);
                return Err(io::Error::other("preview store lock poisoned"));
            }
        }
        tracing::debug!(key = key.0, file_name, "Allocated preview");
        Ok((key, uri))
    }

    fn release(&self, key: PreviewKey) {
        let path = match self.live.lock() {
            Ok(mut live) => live.remove(&key),
            Err(_) => None,
        };
        match path {
            Some(path) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(key = key.0, error = %e, "Failed to remove preview file");
                }
                tracing::debug!(key = key.0, "Released preview");
            }
            None => tracing::warn!(key = key.0, "Release of unknown preview key"),
        }
    }
}

/// Exclusive owner of one preview allocation plus the bytes to upload.
pub struct PreviewHandle {
    key: PreviewKey,
    uri: String,
    file_name: String,
    mime: &'static str,
    bytes: Arc<[u8]>,
    store: Arc<dyn PreviewStore>,
}

impl PreviewHandle {
    pub fn acquire(store: Arc<dyn PreviewStore>, image: LoadedImage) -> io::Result<Self> {
        let (key, uri) = store.allocate(&image.file_name, &image.bytes)?;
        Ok(Self {
            key,
            uri,
            file_name: image.file_name,
            mime: image.mime,
            bytes: image.bytes.into(),
            store,
        })
    }

    pub fn key(&self) -> PreviewKey {
        self.key
    }

    /// Local URI of the preview, for display.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Upload part for the outgoing payload. Shares the bytes; the handle
    /// keeps ownership of the preview allocation.
    pub fn to_upload(&self) -> ImageUpload {
        ImageUpload {
            file_name: self.file_name.clone(),
            mime: self.mime,
            bytes: Arc::clone(&self.bytes),
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.release(self.key);
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("key", &self.key)
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Image bytes read from disk, validated but not yet allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// MIME type for a supported image extension.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Read and validate an image file.
///
/// Checks the extension and the size from metadata before reading, then
/// checks the size again on the bytes actually read.
pub fn load_image(path: &Path, max_bytes: u64) -> Result<LoadedImage, PreviewError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let mime = mime_for_extension(ext)
        .ok_or_else(|| PreviewError::UnsupportedType(path.display().to_string()))?;

    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(PreviewError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = std::fs::read(path)?;
    if bytes.len() as u64 > max_bytes {
        return Err(PreviewError::TooLarge {
            size: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(LoadedImage {
        file_name,
        mime,
        bytes,
    })
}
