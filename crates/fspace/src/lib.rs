#![forbid(unsafe_code)]

//! fspace public facade crate.
//!
//! Re-exports the configuration model, the sanitizer, and (with the
//! `runtime` feature) the editing session, plus a prelude for everyday use.

use std::fmt;

// --- Layout re-exports -----------------------------------------------------

pub use fspace_core::GridRect;
pub use fspace_layout::{
    GridPlacement, LayoutKind, LayoutView, OverlapPolicy, RepairAction, SanitizeOptions,
    SanitizeOutcome, SchemaRegistry, Settings, SettingsCapability, SettingsError, SpaceConfig,
    Theme, ViewName, WidgetInstance, recover_config, reconcile_grid, sanitize, sanitize_bytes,
    shift_overlaps_down,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use fspace_runtime::{
    EditError, Editability, EngineConfig, MemoryObjectStore, NoticeLog, ObjectStore,
    PersistError, SignatureVerifier, SignedFile, Signer, SpaceEditor, SpaceStore, StoreError,
    TabNameError, is_editable, with_optimistic_update,
};

#[cfg(all(feature = "runtime", feature = "file-store"))]
pub use fspace_runtime::FileObjectStore;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for fspace applications.
#[derive(Debug)]
pub enum Error {
    /// An edit was refused or its commit failed.
    #[cfg(feature = "runtime")]
    Edit(EditError),
    /// Reading or writing Space documents failed.
    #[cfg(feature = "runtime")]
    Persist(PersistError),
    /// A config document could not be parsed.
    Json(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "runtime")]
            Self::Edit(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Persist(err) => write!(f, "{err}"),
            Self::Json(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "runtime")]
            Self::Edit(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Persist(err) => Some(err),
            Self::Json(_) => None,
        }
    }
}

#[cfg(feature = "runtime")]
impl From<EditError> for Error {
    fn from(err: EditError) -> Self {
        Self::Edit(err)
    }
}

#[cfg(feature = "runtime")]
impl From<PersistError> for Error {
    fn from(err: PersistError) -> Self {
        Self::Persist(err)
    }
}

#[cfg(feature = "runtime")]
impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::Persist(PersistError::Store(err))
    }
}

/// Standard result type for fspace APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Parse a stored config document and sanitize it in one step.
///
/// Malformed nested values are dropped and reported as repairs; only a
/// document that is not a JSON object is an error.
pub fn parse_and_sanitize(bytes: &[u8], options: &SanitizeOptions) -> Result<SanitizeOutcome> {
    sanitize_bytes(bytes, options).map_err(|err| Error::Json(err.to_string()))
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Error, GridPlacement, LayoutView, Result, SanitizeOptions, SpaceConfig, ViewName,
        WidgetInstance,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{EditError, EngineConfig, MemoryObjectStore, ObjectStore, SpaceEditor, SpaceStore};

    pub use crate::{core, layout};

    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use fspace_core as core;
pub use fspace_layout as layout;
#[cfg(feature = "runtime")]
pub use fspace_runtime as runtime;
