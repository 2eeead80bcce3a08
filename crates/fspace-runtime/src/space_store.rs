//! Signed, sanitized persistence of a Space's tabs.
//!
//! Object layout under the owner's public key:
//!
//! | Path | Payload (`fileData`) |
//! |------|----------------------|
//! | `{pk}/tabs/{tabName}` | JSON [`SpaceConfig`] |
//! | `{pk}/tabOrder` | `{"tabOrder": [...]}` |
//!
//! Writes sign the payload, check the signature with the verifier, then
//! upsert. Reads refuse envelopes that fail verification or that were
//! signed by a key other than the owner's, and sanitize every config
//! before returning it.

use std::fmt;
use std::sync::Arc;

use fspace_layout::model::SpaceConfig;
use fspace_layout::sanitize::{SanitizeOptions, SanitizeOutcome, sanitize_bytes};
use serde::{Deserialize, Serialize};

use crate::authorize::normalize_key;
use crate::persistence::{ObjectStore, StoreError, UploadOptions};
use crate::signed_file::{SignError, SignatureVerifier, SignedFile, Signer, UnsignedFile};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from [`SpaceStore`].
#[derive(Debug)]
pub enum PersistError {
    Store(StoreError),
    /// Envelope or payload JSON could not be encoded or decoded.
    Serialization(serde_json::Error),
    /// The verifier refused the envelope at `path`.
    SignatureRejected { path: String },
    /// The envelope at `path` was signed by someone other than the owner.
    ForeignSigner { path: String, public_key: String },
    SigningFailed(SignError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Store(e) => write!(f, "store error: {e}"),
            PersistError::Serialization(e) => write!(f, "serialization error: {e}"),
            PersistError::SignatureRejected { path } => {
                write!(f, "signature rejected for {path}")
            }
            PersistError::ForeignSigner { path, public_key } => {
                write!(f, "{path} is signed by {public_key}, not the space owner")
            }
            PersistError::SigningFailed(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Store(e) => Some(e),
            PersistError::Serialization(e) => Some(e),
            PersistError::SigningFailed(e) => Some(e),
            PersistError::SignatureRejected { .. } | PersistError::ForeignSigner { .. } => None,
        }
    }
}

impl From<StoreError> for PersistError {
    fn from(e: StoreError) -> Self {
        PersistError::Store(e)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Serialization(e)
    }
}

impl From<SignError> for PersistError {
    fn from(e: SignError) -> Self {
        PersistError::SigningFailed(e)
    }
}

pub type PersistResult<T> = Result<T, PersistError>;

// ─────────────────────────────────────────────────────────────────────────────
// Paths
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabOrderDocument {
    tab_order: Vec<String>,
}

/// Object path of a tab.
#[must_use]
pub fn tab_path(owner_key: &str, tab_name: &str) -> String {
    format!("{owner_key}/tabs/{tab_name}")
}

/// Object path of the tab order.
#[must_use]
pub fn tab_order_path(owner_key: &str) -> String {
    format!("{owner_key}/tabOrder")
}

// ─────────────────────────────────────────────────────────────────────────────
// Space Store
// ─────────────────────────────────────────────────────────────────────────────

/// Reads and writes one Space's documents.
pub struct SpaceStore<S> {
    store: S,
    owner_key: String,
    signer: Option<Arc<dyn Signer>>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl<S: ObjectStore> SpaceStore<S> {
    /// Read-only store for the Space owned by `owner_key`.
    #[must_use]
    pub fn new(
        store: S,
        owner_key: impl Into<String>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            store,
            owner_key: owner_key.into(),
            signer: None,
            verifier,
        }
    }

    /// Enable writes signed by `signer`.
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    #[must_use]
    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    /// Public key of the signer, if one is attached.
    #[must_use]
    pub fn signer_key(&self) -> Option<&str> {
        self.signer.as_deref().map(Signer::public_key)
    }

    #[must_use]
    pub fn object_store(&self) -> &S {
        &self.store
    }

    /// Persist one tab's config.
    pub async fn save_tab(&self, tab_name: &str, config: &SpaceConfig) -> PersistResult<()> {
        let data = serde_json::to_string(config)?;
        self.write(&tab_path(&self.owner_key, tab_name), data, tab_name)
            .await
    }

    /// Load and sanitize one tab. `None` if the tab has no stored object.
    ///
    /// Malformed nested values are dropped as repairs; only a payload that
    /// is not a JSON object fails with [`PersistError::Serialization`].
    pub async fn load_tab(
        &self,
        tab_name: &str,
        options: &SanitizeOptions,
    ) -> PersistResult<Option<SanitizeOutcome>> {
        let path = tab_path(&self.owner_key, tab_name);
        let Some(file) = self.read(&path).await? else {
            return Ok(None);
        };
        Ok(Some(sanitize_bytes(file.file_data.as_bytes(), options)?))
    }

    /// Persist the tab order.
    pub async fn save_tab_order(&self, order: &[String]) -> PersistResult<()> {
        let document = TabOrderDocument {
            tab_order: order.to_vec(),
        };
        let data = serde_json::to_string(&document)?;
        self.write(&tab_order_path(&self.owner_key), data, "tabOrder")
            .await
    }

    /// Load the tab order. `None` if none was ever saved.
    pub async fn load_tab_order(&self) -> PersistResult<Option<Vec<String>>> {
        let path = tab_order_path(&self.owner_key);
        let Some(file) = self.read(&path).await? else {
            return Ok(None);
        };
        let document: TabOrderDocument = serde_json::from_str(&file.file_data)?;
        Ok(Some(document.tab_order))
    }

    /// Names of every stored tab, sorted. Includes tabs no longer in the
    /// tab order.
    pub async fn list_tabs(&self) -> PersistResult<Vec<String>> {
        let prefix = tab_path(&self.owner_key, "");
        let paths = self.store.list(&prefix).await?;
        Ok(paths
            .into_iter()
            .filter_map(|path| path.strip_prefix(&prefix).map(str::to_string))
            .filter(|name| !name.is_empty())
            .collect())
    }

    async fn write(&self, path: &str, data: String, file_name: &str) -> PersistResult<()> {
        let signer = self
            .signer
            .as_deref()
            .ok_or_else(|| SignError("no signing identity attached".into()))?;
        let unsigned = UnsignedFile::json(data, signer.public_key()).with_file_name(file_name);
        let signed = signer.sign(unsigned)?;
        if !self.verifier.validate_signable(&signed) {
            tracing::warn!(path, "refusing to upload envelope that fails verification");
            return Err(PersistError::SignatureRejected {
                path: path.to_string(),
            });
        }
        let bytes = signed.to_json_bytes()?;
        let len = bytes.len();
        self.store.upload(path, bytes, UploadOptions::UPSERT).await?;
        tracing::debug!(path, bytes = len, store = self.store.name(), "persisted document");
        Ok(())
    }

    async fn read(&self, path: &str) -> PersistResult<Option<SignedFile>> {
        let Some(bytes) = self.store.download(path).await? else {
            return Ok(None);
        };
        let file = SignedFile::from_json_bytes(&bytes)?;
        if normalize_key(&file.public_key) != normalize_key(&self.owner_key) {
            tracing::warn!(path, signer = %file.public_key, "envelope signed by a foreign key");
            return Err(PersistError::ForeignSigner {
                path: path.to_string(),
                public_key: file.public_key,
            });
        }
        if !self.verifier.validate_signable(&file) {
            tracing::warn!(path, "stored envelope failed signature verification");
            return Err(PersistError::SignatureRejected {
                path: path.to_string(),
            });
        }
        Ok(Some(file))
    }
}

impl<S: ObjectStore> fmt::Debug for SpaceStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpaceStore")
            .field("store", &self.store.name())
            .field("owner_key", &self.owner_key)
            .field("signer", &self.signer_key())
            .finish()
    }
}
