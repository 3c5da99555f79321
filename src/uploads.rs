//! Storage for uploaded product images.
//!
//! Files are written to a single directory under a name derived from the upload time plus a
//! short random suffix, so unrelated uploads never collide. Products reference them by a path
//! relative to the public root (`{prefix}/{file}`), which is also the URL they are served at.

use crate::errors::{Error, Result};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Longest file extension kept from the uploaded file name.
const MAX_EXTENSION_LEN: usize = 5;

pub struct UploadStore {
    dir: PathBuf,
    url_prefix: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Writes `bytes` under a fresh name and returns the relative image path to store on the
    /// product, e.g. `productos/1718000000000-3f2a9c1d.jpg`.
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            return Err(Error::validation("Uploaded image is empty"));
        }

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::storage(format!(
                "Failed to create upload directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let file_name = generate_file_name(original_name);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            Error::storage(format!("Failed to write image {}: {e}", path.display()))
        })?;

        info!("Stored image {} ({} bytes)", file_name, bytes.len());
        Ok(format!("{}/{file_name}", self.url_prefix))
    }

    /// Deletes the file behind a stored image path. Returns `false` if it was already gone.
    pub async fn remove(&self, image: &str) -> Result<bool> {
        let path = self
            .resolve(image)
            .ok_or_else(|| Error::validation(format!("'{image}' is not an uploaded image path")))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage(format!(
                "Failed to delete image {}: {e}",
                path.display()
            ))),
        }
    }

    /// Deletes an image without failing the caller. The outcome is logged.
    pub async fn remove_best_effort(&self, image: &str) {
        if image.is_empty() {
            return;
        }
        match self.remove(image).await {
            Ok(true) => info!("Deleted image {}", image),
            Ok(false) => info!("Image {} was already absent", image),
            Err(e) => warn!("Could not delete image {}: {}", image, e),
        }
    }

    /// Maps a stored image path back to a file inside the upload directory.
    /// Anything outside the prefix, or trying to climb out of the directory, resolves to `None`.
    fn resolve(&self, image: &str) -> Option<PathBuf> {
        let relative = image.trim_start_matches('/');
        let file_name = relative
            .strip_prefix(self.url_prefix.as_str())?
            .strip_prefix('/')?;

        let safe = !file_name.is_empty()
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\']);
        safe.then(|| self.dir.join(file_name))
    }
}

fn generate_file_name(original_name: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];

    match original_name.and_then(sanitized_extension) {
        Some(ext) => format!("{millis}-{suffix}.{ext}"),
        None => format!("{millis}-{suffix}"),
    }
}

fn sanitized_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}
