use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Context;

use crate::foundation::error::{MockupError, MockupResult};

/// Byte provider behind the texture loader.
///
/// `fetch` is blocking; the loader calls it from tokio's blocking pool.
pub trait TextureSource: Send + Sync + 'static {
    /// Return the encoded bytes stored at `url`.
    fn fetch(&self, url: &str) -> MockupResult<Vec<u8>>;
}

/// Reads `file://` URLs and root-relative paths from the local filesystem.
#[derive(Clone, Debug)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Resolve relative paths under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory used for relative paths.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, url: &str) -> MockupResult<PathBuf> {
        if let Ok(parsed) = url::Url::parse(url) {
            if parsed.scheme() != "file" {
                return Err(MockupError::load(format!(
                    "unsupported url scheme '{}' for filesystem source",
                    parsed.scheme()
                )));
            }
            return parsed
                .to_file_path()
                .map_err(|_| MockupError::load(format!("'{url}' is not a local file url")));
        }
        Ok(self.root.join(normalize_rel_path(url)?))
    }
}

impl TextureSource for FsSource {
    fn fetch(&self, url: &str) -> MockupResult<Vec<u8>> {
        let path = self.path_for(url)?;
        std::fs::read(&path)
            .with_context(|| format!("read texture bytes from '{}'", path.display()))
            .map_err(MockupError::from)
    }
}

/// In-memory source keyed by exact URL.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    entries: HashMap<String, Arc<Vec<u8>>>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `url`.
    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(url.into(), Arc::new(bytes));
    }

    /// Builder-style [`MemorySource::insert`].
    pub fn with(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl TextureSource for MemorySource {
    fn fetch(&self, url: &str) -> MockupResult<Vec<u8>> {
        self.entries
            .get(url)
            .map(|b| b.as_ref().clone())
            .ok_or_else(|| MockupError::load(format!("no entry for '{url}'")))
    }
}

/// URL prefix of session-scoped upload blobs.
pub const BLOB_SCHEME_PREFIX: &str = "blob:mockup/";

/// Session-scoped store for user uploads, addressed by `blob:mockup/<n>` URLs.
///
/// Clones share the same blobs.
#[derive(Clone, Debug, Default)]
pub struct BlobRegistry {
    blobs: Arc<Mutex<HashMap<String, Arc<Vec<u8>>>>>,
    next: Arc<AtomicU64>,
}

impl BlobRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` and return the URL that loads them.
    pub fn create_url(&self, bytes: Vec<u8>) -> String {
        let n = self.next.fetch_add(1, Ordering::AcqRel) + 1;
        let url = format!("{BLOB_SCHEME_PREFIX}{n}");
        self.lock().insert(url.clone(), Arc::new(bytes));
        url
    }

    /// Release a blob. Returns `true` when the URL was registered.
    pub fn revoke(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    /// Release every blob.
    pub fn revoke_all(&self) {
        self.lock().clear();
    }

    /// Number of live blobs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no blob is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `true` for URLs minted by a blob registry.
    pub fn is_blob_url(url: &str) -> bool {
        url.starts_with(BLOB_SCHEME_PREFIX)
    }

    fn get(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        self.lock().get(url).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Vec<u8>>>> {
        // A poisoned map still holds valid blobs.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Serves blob URLs from a [`BlobRegistry`] and everything else from a fallback source.
pub struct BlobSource {
    blobs: BlobRegistry,
    fallback: Arc<dyn TextureSource>,
}

impl BlobSource {
    /// Route `blob:` URLs to `blobs`, the rest to `fallback`.
    pub fn new(blobs: BlobRegistry, fallback: Arc<dyn TextureSource>) -> Self {
        Self { blobs, fallback }
    }
}

impl TextureSource for BlobSource {
    fn fetch(&self, url: &str) -> MockupResult<Vec<u8>> {
        if BlobRegistry::is_blob_url(url) {
            return self
                .blobs
                .get(url)
                .map(|b| b.as_ref().clone())
                .ok_or_else(|| MockupError::load(format!("blob '{url}' was revoked")));
        }
        self.fallback.fetch(url)
    }
}

/// Normalize and validate root-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> MockupResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(MockupError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(MockupError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(MockupError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(MockupError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
