//! Space config sanitization.
//!
//! [`sanitize`] takes a candidate [`SpaceConfig`] and returns a repaired copy
//! plus the list of repairs applied. It never fails: every structural
//! problem it knows about has a deterministic repair.
//!
//! # Invariants after sanitization
//!
//! 1. Every id referenced by a view or the tray is a key of `widgets`.
//! 2. Every key of `widgets` is referenced by a view or the tray.
//! 3. No two placements of one grid view overlap.
//! 4. Every widget has a non-empty `widget_type` and `id == key`.
//! 5. `default_view` names an existing view (when any view exists).
//!
//! A config with no views is returned unchanged: there is no layout to
//! reconcile against.
//!
//! # Passes
//!
//! ```text
//! untypeable widgets ─► dangling/duplicate refs ─► orphans ─► backfill
//!        ─► zero-size placements ─► overlap policy ─► orphans ─► default view
//! ```
//!
//! Sanitizing an already sanitized config applies no repairs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use fspace_core::debug;
use serde::{Deserialize, Serialize};

use crate::model::{
    GridPlacement, LayoutView, SpaceConfig, ViewName, WidgetInstance, widget_type_from_id,
};
use crate::reconcile::{first_overlap, reconcile_grid, shift_overlaps_down};
use crate::recover::recover_config;

/// Legacy settings key written by older editors (note the space).
pub const LEGACY_SHADOW_KEY: &str = "fidget Shadow";

/// Canonical spelling of [`LEGACY_SHADOW_KEY`].
pub const SHADOW_KEY: &str = "fidgetShadow";

/// How overlapping grid placements are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Push later placements below earlier ones; nothing is dropped.
    #[default]
    ShiftDown,
    /// Drop later placements that overlap earlier ones.
    Drop,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shift" | "shift_down" | "shift-down" => Ok(Self::ShiftDown),
            "drop" => Ok(Self::Drop),
            other => Err(format!("unknown overlap policy: {other:?}")),
        }
    }
}

/// Sanitizer knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SanitizeOptions {
    pub overlap_policy: OverlapPolicy,
    /// Preferred replacement when `default_view` names a missing view.
    pub default_view: ViewName,
}

impl SanitizeOptions {
    #[must_use]
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    #[must_use]
    pub fn with_default_view(mut self, view: ViewName) -> Self {
        self.default_view = view;
        self
    }
}

/// One deterministic repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RepairAction {
    RemoveUntypeableWidget {
        key: String,
    },
    DropDanglingPlacement {
        view: ViewName,
        id: String,
    },
    DropDuplicatePlacement {
        view: ViewName,
        id: String,
    },
    DropDanglingTrayEntry {
        id: String,
    },
    DropDuplicateTrayEntry {
        id: String,
    },
    RemoveOrphanWidget {
        id: String,
    },
    BackfillWidgetId {
        key: String,
        before: String,
    },
    BackfillWidgetType {
        id: String,
        widget_type: String,
    },
    RenameLegacySetting {
        id: String,
        from: String,
        to: String,
    },
    WidenPlacement {
        view: ViewName,
        id: String,
        before_w: u32,
        before_h: u32,
        after_w: u32,
        after_h: u32,
    },
    ShiftPlacement {
        view: ViewName,
        id: String,
        before_y: u32,
        after_y: u32,
    },
    DropOverlappingPlacement {
        view: ViewName,
        id: String,
    },
    ResetDefaultView {
        before: ViewName,
        after: ViewName,
    },
    /// A top-level field or a view's placement list had the wrong shape.
    ResetMalformedField {
        field: String,
    },
    /// A view with an unknown name or layout kind.
    DropMalformedView {
        view: String,
    },
    DropMalformedWidget {
        key: String,
    },
    /// A list entry (placement, tray id) that could not be decoded.
    DropMalformedEntry {
        field: String,
        index: usize,
    },
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveUntypeableWidget { key } => {
                write!(f, "removed widget {key:?} with no derivable type")
            }
            Self::DropDanglingPlacement { view, id } => {
                write!(f, "{view}: dropped placement of missing widget {id:?}")
            }
            Self::DropDuplicatePlacement { view, id } => {
                write!(f, "{view}: dropped duplicate placement of {id:?}")
            }
            Self::DropDanglingTrayEntry { id } => write!(f, "tray: dropped missing widget {id:?}"),
            Self::DropDuplicateTrayEntry { id } => write!(f, "tray: dropped duplicate {id:?}"),
            Self::RemoveOrphanWidget { id } => write!(f, "removed orphan widget {id:?}"),
            Self::BackfillWidgetId { key, before } => {
                write!(f, "widget {key:?}: id {before:?} reset to key")
            }
            Self::BackfillWidgetType { id, widget_type } => {
                write!(f, "widget {id:?}: type backfilled as {widget_type:?}")
            }
            Self::RenameLegacySetting { id, from, to } => {
                write!(f, "widget {id:?}: setting {from:?} renamed to {to:?}")
            }
            Self::WidenPlacement {
                view,
                id,
                after_w,
                after_h,
                ..
            } => write!(f, "{view}: placement {id:?} widened to {after_w}x{after_h}"),
            Self::ShiftPlacement {
                view,
                id,
                before_y,
                after_y,
            } => write!(f, "{view}: placement {id:?} shifted y {before_y} -> {after_y}"),
            Self::DropOverlappingPlacement { view, id } => {
                write!(f, "{view}: dropped overlapping placement {id:?}")
            }
            Self::ResetDefaultView { before, after } => {
                write!(f, "default view {before} missing, reset to {after}")
            }
            Self::ResetMalformedField { field } => write!(f, "{field}: malformed, reset"),
            Self::DropMalformedView { view } => write!(f, "dropped malformed view {view:?}"),
            Self::DropMalformedWidget { key } => {
                write!(f, "dropped malformed widget {key:?}")
            }
            Self::DropMalformedEntry { field, index } => {
                write!(f, "{field}[{index}]: dropped malformed entry")
            }
        }
    }
}

/// Result of [`sanitize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizeOutcome {
    /// Repaired copy of the input.
    pub sanitized: SpaceConfig,
    /// True iff any repair was applied; callers persist only when set.
    pub has_changes: bool,
    /// Repairs in the order they were applied.
    pub actions: Vec<RepairAction>,
    pub before_hash: u64,
    pub after_hash: u64,
}

/// Repair a candidate config. The input is never modified.
#[must_use]
pub fn sanitize(config: &SpaceConfig, options: &SanitizeOptions) -> SanitizeOutcome {
    let before_hash = config.state_hash();
    let mut sanitized = config.clone();

    if sanitized.views.is_empty() {
        return SanitizeOutcome {
            sanitized,
            has_changes: false,
            actions: Vec::new(),
            before_hash,
            after_hash: before_hash,
        };
    }

    let mut actions = Vec::new();
    remove_untypeable_widgets(&mut sanitized, &mut actions);
    drop_dangling_references(&mut sanitized, &mut actions);
    remove_orphans(&mut sanitized, &mut actions);
    backfill_widgets(&mut sanitized, &mut actions);
    widen_empty_placements(&mut sanitized, &mut actions);
    let dropped = resolve_overlaps(&mut sanitized, options.overlap_policy, &mut actions);
    if dropped {
        remove_orphans(&mut sanitized, &mut actions);
    }
    repair_default_view(&mut sanitized, options.default_view, &mut actions);

    #[cfg(feature = "tracing")]
    for action in &actions {
        debug!(action = %action, "sanitizer repair");
    }

    let after_hash = if actions.is_empty() {
        before_hash
    } else {
        sanitized.state_hash()
    };
    debug!(
        repairs = actions.len(),
        before_hash,
        after_hash,
        "sanitized space config"
    );

    SanitizeOutcome {
        sanitized,
        has_changes: !actions.is_empty(),
        actions,
        before_hash,
        after_hash,
    }
}

/// Decode a stored config tolerantly and sanitize it.
///
/// Values dropped while decoding lead the action list. `before_hash` is
/// the hash of the decoded config. Fails only when `bytes` is not a JSON
/// object.
pub fn sanitize_bytes(
    bytes: &[u8],
    options: &SanitizeOptions,
) -> Result<SanitizeOutcome, serde_json::Error> {
    let recovered = recover_config(bytes)?;
    let mut outcome = sanitize(&recovered.config, options);
    if !recovered.actions.is_empty() {
        let mut actions = recovered.actions;
        actions.append(&mut outcome.actions);
        outcome.actions = actions;
        outcome.has_changes = true;
    }
    Ok(outcome)
}

fn remove_untypeable_widgets(config: &mut SpaceConfig, actions: &mut Vec<RepairAction>) {
    let untypeable = config
        .widgets
        .iter()
        .filter(|(key, widget)| {
            widget.widget_type.is_empty() && widget_type_from_id(key).is_empty()
        })
        .map(|(key, _)| key.clone())
        .collect::<Vec<_>>();
    for key in untypeable {
        let _ = config.widgets.remove(&key);
        actions.push(RepairAction::RemoveUntypeableWidget { key });
    }
}

fn drop_dangling_references(config: &mut SpaceConfig, actions: &mut Vec<RepairAction>) {
    let known = &config.widgets;
    for (view_name, view) in &mut config.views {
        let mut seen = BTreeSet::new();
        match view {
            LayoutView::Grid { placements } => placements.retain(|placement| {
                keep_reference(&placement.i, *view_name, known, &mut seen, actions)
            }),
            LayoutView::Stack { placements } => placements
                .retain(|id| keep_reference(id, *view_name, known, &mut seen, actions)),
        }
    }

    let mut seen = BTreeSet::new();
    config.tray.retain(|id| {
        if !known.contains_key(id) {
            actions.push(RepairAction::DropDanglingTrayEntry { id: id.clone() });
            false
        } else if !seen.insert(id.clone()) {
            actions.push(RepairAction::DropDuplicateTrayEntry { id: id.clone() });
            false
        } else {
            true
        }
    });
}

fn keep_reference(
    id: &str,
    view: ViewName,
    known: &BTreeMap<String, WidgetInstance>,
    seen: &mut BTreeSet<String>,
    actions: &mut Vec<RepairAction>,
) -> bool {
    if !known.contains_key(id) {
        actions.push(RepairAction::DropDanglingPlacement {
            view,
            id: id.to_string(),
        });
        return false;
    }
    if !seen.insert(id.to_string()) {
        actions.push(RepairAction::DropDuplicatePlacement {
            view,
            id: id.to_string(),
        });
        return false;
    }
    true
}

fn remove_orphans(config: &mut SpaceConfig, actions: &mut Vec<RepairAction>) {
    let referenced = config
        .referenced_ids()
        .into_iter()
        .map(str::to_string)
        .collect::<BTreeSet<_>>();
    let orphans = config
        .widgets
        .keys()
        .filter(|key| !referenced.contains(*key))
        .cloned()
        .collect::<Vec<_>>();
    for id in orphans {
        let _ = config.widgets.remove(&id);
        actions.push(RepairAction::RemoveOrphanWidget { id });
    }
}

fn backfill_widgets(config: &mut SpaceConfig, actions: &mut Vec<RepairAction>) {
    for (key, widget) in &mut config.widgets {
        if widget.id != *key {
            actions.push(RepairAction::BackfillWidgetId {
                key: key.clone(),
                before: std::mem::replace(&mut widget.id, key.clone()),
            });
        }
        if widget.widget_type.is_empty() {
            widget.widget_type = widget_type_from_id(key).to_string();
            actions.push(RepairAction::BackfillWidgetType {
                id: key.clone(),
                widget_type: widget.widget_type.clone(),
            });
        }
        if let Some(value) = widget.settings.remove(LEGACY_SHADOW_KEY) {
            let _ = widget.settings.insert(SHADOW_KEY.to_string(), value);
            actions.push(RepairAction::RenameLegacySetting {
                id: key.clone(),
                from: LEGACY_SHADOW_KEY.to_string(),
                to: SHADOW_KEY.to_string(),
            });
        }
    }
}

fn widen_empty_placements(config: &mut SpaceConfig, actions: &mut Vec<RepairAction>) {
    for (view_name, view) in &mut config.views {
        let LayoutView::Grid { placements } = view else {
            continue;
        };
        for placement in placements.iter_mut().filter(|p| p.w == 0 || p.h == 0) {
            let (before_w, before_h) = (placement.w, placement.h);
            placement.w = placement.w.max(1);
            placement.h = placement.h.max(1);
            actions.push(RepairAction::WidenPlacement {
                view: *view_name,
                id: placement.i.clone(),
                before_w,
                before_h,
                after_w: placement.w,
                after_h: placement.h,
            });
        }
    }
}

/// Returns true if any placement was dropped.
fn resolve_overlaps(
    config: &mut SpaceConfig,
    policy: OverlapPolicy,
    actions: &mut Vec<RepairAction>,
) -> bool {
    let mut dropped = false;
    for (view_name, view) in &mut config.views {
        let LayoutView::Grid { placements } = view else {
            continue;
        };

        if policy == OverlapPolicy::ShiftDown {
            for shift in shift_overlaps_down(placements) {
                actions.push(RepairAction::ShiftPlacement {
                    view: *view_name,
                    id: shift.id,
                    before_y: shift.before_y,
                    after_y: shift.after_y,
                });
            }
        }

        // After a shift pass this only fires for placements pinned at the
        // bottom of the coordinate space.
        let outcome = reconcile_grid(placements);
        if !outcome.removed.is_empty() {
            dropped = true;
            for id in outcome.removed {
                actions.push(RepairAction::DropOverlappingPlacement {
                    view: *view_name,
                    id,
                });
            }
            *placements = outcome.kept;
        }
    }
    dropped
}

fn repair_default_view(config: &mut SpaceConfig, preferred: ViewName, actions: &mut Vec<RepairAction>) {
    if config.views.contains_key(&config.default_view) {
        return;
    }
    let after = if config.views.contains_key(&preferred) {
        preferred
    } else if let Some(first) = config.views.keys().next() {
        *first
    } else {
        return;
    };
    actions.push(RepairAction::ResetDefaultView {
        before: config.default_view,
        after,
    });
    config.default_view = after;
}

/// One violated post-sanitization invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum InvariantIssue {
    DanglingReference { id: String },
    OrphanWidget { id: String },
    Overlap { view: ViewName, first: String, second: String },
    MissingWidgetType { id: String },
    IdMismatch { key: String },
    MissingDefaultView { view: ViewName },
}

/// Inspect a config against the sanitizer invariants without repairing it.
///
/// A sanitized config with at least one view yields an empty list.
#[must_use]
pub fn invariant_issues(config: &SpaceConfig) -> Vec<InvariantIssue> {
    let mut issues = Vec::new();
    let referenced = config.referenced_ids();

    for id in &referenced {
        if !config.widgets.contains_key(*id) {
            issues.push(InvariantIssue::DanglingReference { id: id.to_string() });
        }
    }
    for (key, widget) in &config.widgets {
        if !referenced.contains(key.as_str()) {
            issues.push(InvariantIssue::OrphanWidget { id: key.clone() });
        }
        if widget.widget_type.is_empty() {
            issues.push(InvariantIssue::MissingWidgetType { id: key.clone() });
        }
        if widget.id != *key {
            issues.push(InvariantIssue::IdMismatch { key: key.clone() });
        }
    }
    for (view_name, view) in &config.views {
        if let Some(placements) = view.grid_placements()
            && let Some((first, second)) = first_overlap(placements)
        {
            issues.push(InvariantIssue::Overlap {
                view: *view_name,
                first: placements[first].i.clone(),
                second: placements[second].i.clone(),
            });
        }
    }
    if !config.views.is_empty() && !config.views.contains_key(&config.default_view) {
        issues.push(InvariantIssue::MissingDefaultView {
            view: config.default_view,
        });
    }
    issues
}

/// Grid placements of `view`, if it exists and is a grid.
#[must_use]
pub fn grid_of(config: &SpaceConfig, view: ViewName) -> Option<&[GridPlacement]> {
    config.views.get(&view).and_then(LayoutView::grid_placements)
}
