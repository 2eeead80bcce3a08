//! Object store adapters.
//!
//! Spaces persist through an addressable blob store keyed by path. The
//! [`ObjectStore`] trait is the seam; two backends ship with the crate.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SpaceStore                             │
//! │   - signs, verifies, and (de)serializes tab documents         │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ObjectStore                            │
//! │   - MemoryObjectStore: in-memory (testing, ephemeral)         │
//! │   - FileObjectStore: one file per object (file-store)         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StoreError::Io` | File I/O failure | Returned to caller |
//! | `StoreError::Conflict` | Non-upsert write to an existing path | Returned, object untouched |
//! | `StoreError::Corruption` | Poisoned lock, undecodable file name | Returned or entry skipped |
//! | `StoreError::Unavailable` | Backend offline | Returned to caller |
//! | Missing object | First run, deleted tab | `Ok(None)` |
//!
//! There is no delete: removing a tab only rewrites the tab order.

use std::collections::BTreeMap;
use std::fmt;
use std::future::{Future, ready};
use std::sync::RwLock;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from an [`ObjectStore`].
#[derive(Debug)]
pub enum StoreError {
    /// I/O error in a file-backed store.
    Io(std::io::Error),
    /// A non-upsert write found an existing object.
    Conflict(String),
    /// Stored data or store state is unreadable.
    Corruption(String),
    /// The backend cannot serve requests (network down, remote refused).
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Conflict(path) => write!(f, "object already exists: {path}"),
            StoreError::Corruption(msg) => write!(f, "store corruption: {msg}"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Conflict(_) | StoreError::Corruption(_) | StoreError::Unavailable(_) => {
                None
            }
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Object Store Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Options for [`ObjectStore::upload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Replace an existing object instead of failing with a conflict.
    pub upsert: bool,
}

impl UploadOptions {
    pub const UPSERT: Self = Self { upsert: true };
    pub const CREATE: Self = Self { upsert: false };
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::UPSERT
    }
}

/// Addressable blob store keyed by `/`-separated paths.
///
/// Implementations must be thread-safe (`Send + Sync`). Writes to one path
/// are last-writer-wins.
pub trait ObjectStore: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Store `bytes` at `path`.
    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Fetch the object at `path`, or `None` if there is none.
    fn download(&self, path: &str) -> impl Future<Output = StoreResult<Option<Vec<u8>>>> + Send;

    /// Paths starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> impl Future<Output = StoreResult<Vec<String>>> + Send;
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store (always available)
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory object store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with objects.
    #[must_use]
    pub fn with_objects(objects: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self {
            objects: RwLock::new(objects.into_iter().collect()),
        }
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().map(|g| g.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn upload_now(&self, path: &str, bytes: Vec<u8>, options: UploadOptions) -> StoreResult<()> {
        let mut guard = self
            .objects
            .write()
            .map_err(|_| StoreError::Corruption("lock poisoned".into()))?;
        if !options.upsert && guard.contains_key(path) {
            return Err(StoreError::Conflict(path.to_string()));
        }
        let _ = guard.insert(path.to_string(), bytes);
        Ok(())
    }

    fn download_now(&self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        let guard = self
            .objects
            .read()
            .map_err(|_| StoreError::Corruption("lock poisoned".into()))?;
        Ok(guard.get(path).cloned())
    }

    fn list_now(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let guard = self
            .objects
            .read()
            .map_err(|_| StoreError::Corruption("lock poisoned".into()))?;
        Ok(guard
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &str {
        "MemoryObjectStore"
    }

    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        ready(self.upload_now(path, bytes, options))
    }

    fn download(&self, path: &str) -> impl Future<Output = StoreResult<Option<Vec<u8>>>> + Send {
        ready(self.download_now(path))
    }

    fn list(&self, prefix: &str) -> impl Future<Output = StoreResult<Vec<String>>> + Send {
        ready(self.list_now(prefix))
    }
}

impl fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryObjectStore")
            .field("objects", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Store (requires file-store feature)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "file-store")]
mod file_store {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use std::fs::{self, File};
    use std::io::{BufWriter, ErrorKind, Write};
    use std::path::{Path, PathBuf};

    const TEMP_SUFFIX: &str = ".tmp";

    /// Directory-backed object store.
    ///
    /// Each object is one file directly under the root. The file name is the
    /// URL-safe base64 (no padding) of the object path, so arbitrary paths
    /// map to flat, portable names.
    ///
    /// # Atomic Writes
    ///
    /// 1. Write to `{name}.tmp`
    /// 2. Flush and sync
    /// 3. Rename `{name}.tmp` -> `{name}`
    pub struct FileObjectStore {
        root: PathBuf,
    }

    impl FileObjectStore {
        /// Store rooted at `root`. The directory is created on first write.
        #[must_use]
        pub fn new(root: impl AsRef<Path>) -> Self {
            Self {
                root: root.as_ref().to_path_buf(),
            }
        }

        /// Root directory.
        #[must_use]
        pub fn root(&self) -> &Path {
            &self.root
        }

        fn object_path(&self, path: &str) -> PathBuf {
            self.root.join(URL_SAFE_NO_PAD.encode(path.as_bytes()))
        }

        fn upload_now(&self, path: &str, bytes: &[u8], options: UploadOptions) -> StoreResult<()> {
            fs::create_dir_all(&self.root)?;
            let target = self.object_path(path);
            if !options.upsert && target.exists() {
                return Err(StoreError::Conflict(path.to_string()));
            }

            let mut tmp = target.clone().into_os_string();
            tmp.push(TEMP_SUFFIX);
            let tmp = PathBuf::from(tmp);
            {
                let file = File::create(&tmp)?;
                let mut writer = BufWriter::new(file);
                writer.write_all(bytes)?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp, &target)?;

            tracing::debug!(
                path,
                file = %target.display(),
                bytes = bytes.len(),
                "stored object"
            );
            Ok(())
        }

        fn download_now(&self, path: &str) -> StoreResult<Option<Vec<u8>>> {
            match fs::read(self.object_path(path)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn list_now(&self, prefix: &str) -> StoreResult<Vec<String>> {
            let entries = match fs::read_dir(&self.root) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut paths = Vec::new();
            for entry in entries {
                let entry = entry?;
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                if name.ends_with(TEMP_SUFFIX) {
                    continue;
                }
                let decoded = URL_SAFE_NO_PAD
                    .decode(name)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok());
                match decoded {
                    Some(path) if path.starts_with(prefix) => paths.push(path),
                    Some(_) => {}
                    None => {
                        tracing::warn!(file = name, "unrecognized file in object store, skipping");
                    }
                }
            }
            paths.sort();
            Ok(paths)
        }
    }

    impl ObjectStore for FileObjectStore {
        fn name(&self) -> &str {
            "FileObjectStore"
        }

        fn upload(
            &self,
            path: &str,
            bytes: Vec<u8>,
            options: UploadOptions,
        ) -> impl Future<Output = StoreResult<()>> + Send {
            ready(self.upload_now(path, &bytes, options))
        }

        fn download(
            &self,
            path: &str,
        ) -> impl Future<Output = StoreResult<Option<Vec<u8>>>> + Send {
            ready(self.download_now(path))
        }

        fn list(&self, prefix: &str) -> impl Future<Output = StoreResult<Vec<String>>> + Send {
            ready(self.list_now(prefix))
        }
    }

    impl fmt::Debug for FileObjectStore {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileObjectStore")
                .field("root", &self.root)
                .finish()
        }
    }
}

#[cfg(feature = "file-store")]
pub use file_store::FileObjectStore;
