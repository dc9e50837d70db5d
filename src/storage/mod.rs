//! Local object storage for uploaded images.
//!
//! Objects live under one root directory and are addressed by keys such as
//! `projects/<uuid>.png`. The router serves the root directory at the
//! configured public URL prefix.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::errors::AppError;
use crate::models::SLUG_RE;

/// Largest accepted upload.
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Folder used when an upload does not name one.
pub const DEFAULT_FOLDER: &str = "projects";

/// A stored object as returned to the admin UI.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub size: usize,
    pub mime_type: String,
}

/// Detect a supported image type from its leading bytes.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Check that a key is relative and stays inside the store.
fn validate_key(key: &str) -> Result<(), AppError> {
    let invalid = || AppError::BadRequest(format!("Invalid object key: {}", key));

    if key.is_empty() || key.contains('\\') || key.contains('\0') {
        return Err(invalid());
    }
    let all_normal = Path::new(key)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !all_normal {
        return Err(invalid());
    }
    Ok(())
}

/// Directory-backed object store.
pub struct ObjectStore {
    root: PathBuf,
    public_url: String,
}

impl ObjectStore {
    /// Open the store, creating its root directory.
    pub fn open(root: &Path, public_url: &str) -> Result<Self, AppError> {
        std::fs::create_dir_all(root)
            .map_err(|e| AppError::Storage(format!("Failed to create storage directory: {}", e)))?;
        Ok(Self {
            root: root.to_path_buf(),
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL of a key.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    /// Map a stored reference (key or public URL) back to a key.
    /// External URLs yield `None`.
    pub fn key_for(&self, reference: &str) -> Option<String> {
        let prefix = format!("{}/", self.public_url);
        let key = match reference.strip_prefix(&prefix) {
            Some(key) => key,
            None if reference.contains("://") || reference.starts_with('/') => return None,
            None => reference,
        };
        validate_key(key).ok().map(|_| key.to_string())
    }

    /// Validate and store an image under `folder`.
    pub async fn put_image(&self, folder: &str, bytes: &[u8]) -> Result<StoredObject, AppError> {
        if !SLUG_RE.is_match(folder) {
            return Err(AppError::validation(
                "Folder must contain only lowercase letters, numbers, and hyphens",
            ));
        }
        if bytes.is_empty() {
            return Err(AppError::validation("File is empty"));
        }
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(AppError::validation("File too large. Maximum size is 5MB."));
        }
        let mime = sniff_image(bytes).ok_or_else(|| {
            AppError::validation("Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.")
        })?;

        let key = format!("{}/{}.{}", folder, uuid::Uuid::new_v4(), extension_for(mime));
        let path = self.root.join(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create folder {}: {}", folder, e)))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", key, e)))?;

        tracing::info!("Stored object {} ({} bytes)", key, bytes.len());

        Ok(StoredObject {
            url: self.url_for(&key),
            key,
            size: bytes.len(),
            mime_type: mime.to_string(),
        })
    }

    /// Delete an object by key.
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.root.join(key)).await {
            Ok(()) => {
                tracing::info!("Deleted object {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("Object {} not found", key)))
            }
            Err(e) => Err(AppError::Storage(format!("Failed to delete {}: {}", key, e))),
        }
    }

    /// Delete every stored object among `references`, logging failures.
    pub async fn delete_all_best_effort(&self, references: &[String]) {
        for reference in references {
            let Some(key) = self.key_for(reference) else {
                continue;
            };
            if let Err(e) = self.delete(&key).await {
                tracing::warn!("Failed to clean up object {}: {}", key, e);
            }
        }
    }
}
