#![forbid(unsafe_code)]

//! Space configuration model and layout reconciliation.
//!
//! - [`model`] - [`SpaceConfig`], [`WidgetInstance`], [`LayoutView`], [`Theme`]
//! - [`reconcile`] - overlap resolution for one grid view
//! - [`recover`] - tolerant decoding of stored configs
//! - [`sanitize`] - whole-config repair with an ordered repair log
//! - [`settings`] - per-widget-type settings validation seam
//!
//! Everything here is synchronous and free of shared state.

pub mod model;
pub mod reconcile;
pub mod recover;
pub mod sanitize;
pub mod settings;

pub use fspace_core::geometry::GridRect;
pub use model::{
    GridPlacement, LayoutKind, LayoutView, Settings, SpaceConfig, Theme, ViewName, WidgetInstance,
    empty_tray, widget_type_from_id,
};
pub use reconcile::{ReconcileOutcome, ShiftedPlacement, reconcile_grid, shift_overlaps_down};
pub use recover::{RecoveredConfig, recover_config};
pub use sanitize::{
    InvariantIssue, OverlapPolicy, RepairAction, SanitizeOptions, SanitizeOutcome,
    invariant_issues, sanitize, sanitize_bytes,
};
pub use settings::{FieldKind, FieldSpec, SchemaRegistry, SettingsCapability, SettingsError};
