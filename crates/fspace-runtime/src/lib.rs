#![forbid(unsafe_code)]

//! Editing runtime for fspace Spaces.
//!
//! # Role in fspace
//! `fspace-runtime` turns the pure model of `fspace-layout` into a live
//! editing session: it decides who may edit, applies edits optimistically,
//! and persists signed documents through an object store.
//!
//! # Primary responsibilities
//! - **authorize**: key-identity editability check.
//! - **optimistic**: apply / commit / rollback coordinator.
//! - **tabs**: tab name policy and tab-order arithmetic.
//! - **persistence**: [`ObjectStore`] trait with memory and file backends.
//! - **signed_file** / **space_store**: signed envelopes and the Space
//!   object layout.
//! - **editor**: [`SpaceEditor`], the session tying it all together.
//!
//! # How it fits in the system
//! Application code builds an [`EngineConfig`], wraps a store in a
//! [`SpaceStore`], and drives a [`SpaceEditor`] from UI events. Nothing here
//! spawns tasks; futures run on whatever executor the caller uses.

pub mod authorize;
pub mod config;
pub mod editor;
pub mod optimistic;
pub mod persistence;
pub mod signed_file;
pub mod space_store;
pub mod tabs;

pub use authorize::{Editability, IdentityInput, editability, is_editable, normalize_key};
pub use config::EngineConfig;
pub use editor::{EditError, EditTarget, InFlight, LoadReport, SpaceEditor};
pub use optimistic::{ErrorConfig, ErrorNotice, ErrorSink, NoticeLog, with_optimistic_update};
#[cfg(feature = "file-store")]
pub use persistence::FileObjectStore;
pub use persistence::{MemoryObjectStore, ObjectStore, StoreError, StoreResult, UploadOptions};
pub use signed_file::{SignError, SignatureVerifier, SignedFile, Signer, UnsignedFile};
pub use space_store::{PersistError, PersistResult, SpaceStore};
pub use tabs::{TabNameError, unique_tab_name, validate_tab_name};
