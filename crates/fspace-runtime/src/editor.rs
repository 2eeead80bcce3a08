//! Editing session for one Space.
//!
//! [`SpaceEditor`] holds the in-memory tabs of a Space and applies every
//! user edit through [`with_optimistic_update`]: the change is visible at
//! once, persisted through the [`SpaceStore`], and rolled back if the write
//! fails.
//!
//! # Edit protocol
//!
//! 1. Authorization: the current identity must own the Space.
//! 2. Validation: names, targets, reorders and settings are checked.
//! 3. In-flight guard: each edit claims its targets (the tab order and/or
//!    individual tabs). An edit touching a busy target fails with
//!    [`EditError::Busy`] instead of racing the pending one.
//! 4. Optimistic apply, commit, and rollback of exactly the claimed targets.
//!
//! Steps 1-3 run before any state changes, so a rejected edit leaves no
//! trace. [`SpaceEditor::load`] claims the whole Space: it fails with
//! [`EditError::Busy`] while any edit is unsettled, and edits fail while a
//! load is running. The session is single-threaded: it is `!Sync` and expects the
//! caller's async task model to interleave edits cooperatively.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use fspace_layout::model::{LayoutView, Settings, SpaceConfig, ViewName};
use fspace_layout::sanitize::{SanitizeOutcome, sanitize};
use fspace_layout::settings::{SettingsCapability, SettingsError};

use crate::authorize::{Editability, editability};
use crate::config::EngineConfig;
use crate::optimistic::{ErrorConfig, NoticeLog, with_optimistic_update};
use crate::persistence::ObjectStore;
use crate::space_store::{PersistError, SpaceStore};
use crate::tabs::{
    TabNameError, insert_tab, is_permutation, remove_from_order, rename_in_order,
    validate_tab_name,
};

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why an edit was refused or failed.
#[derive(Debug)]
pub enum EditError {
    /// The current identity does not own the Space.
    NotEditable,
    /// Another edit of `target` has not settled yet.
    Busy { target: EditTarget },
    UnknownTab { tab: String },
    UnknownWidget { tab: String, id: String },
    UnknownView { tab: String, view: ViewName },
    /// A Space keeps at least one tab.
    LastTab,
    /// A reorder was not a permutation of the current tabs.
    InvalidReorder,
    TabName(TabNameError),
    Settings(SettingsError),
    /// The commit failed; local state was rolled back.
    Persist(PersistError),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::NotEditable => f.write_str("this space is not editable by the current identity"),
            EditError::Busy { target } => write!(f, "{target} has an edit in progress"),
            EditError::UnknownTab { tab } => write!(f, "no tab named {tab:?}"),
            EditError::UnknownWidget { tab, id } => write!(f, "tab {tab:?} has no widget {id:?}"),
            EditError::UnknownView { tab, view } => write!(f, "tab {tab:?} has no {view} view"),
            EditError::LastTab => f.write_str("cannot delete the last tab"),
            EditError::InvalidReorder => {
                f.write_str("reorder must list every existing tab exactly once")
            }
            EditError::TabName(e) => write!(f, "invalid tab name: {e}"),
            EditError::Settings(e) => write!(f, "invalid settings: {e}"),
            EditError::Persist(e) => write!(f, "save failed: {e}"),
        }
    }
}

impl std::error::Error for EditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EditError::TabName(e) => Some(e),
            EditError::Settings(e) => Some(e),
            EditError::Persist(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TabNameError> for EditError {
    fn from(e: TabNameError) -> Self {
        EditError::TabName(e)
    }
}

impl From<SettingsError> for EditError {
    fn from(e: SettingsError) -> Self {
        EditError::Settings(e)
    }
}

impl From<PersistError> for EditError {
    fn from(e: PersistError) -> Self {
        EditError::Persist(e)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-flight guards
// ─────────────────────────────────────────────────────────────────────────────

/// Unit of mutual exclusion between edits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditTarget {
    /// Every tab and the tab order at once. Held by [`SpaceEditor::load`].
    Space,
    TabOrder,
    Tab(String),
}

impl EditTarget {
    /// True if claims on `self` and `other` cannot be held together.
    #[must_use]
    pub fn conflicts_with(&self, other: &EditTarget) -> bool {
        self == other || *self == EditTarget::Space || *other == EditTarget::Space
    }
}

impl fmt::Display for EditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditTarget::Space => f.write_str("space"),
            EditTarget::TabOrder => f.write_str("tab order"),
            EditTarget::Tab(name) => write!(f, "tab {name:?}"),
        }
    }
}

/// Set of targets with an unsettled edit.
#[derive(Debug, Default)]
pub struct InFlight {
    busy: RefCell<BTreeSet<EditTarget>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every target or none. Claims are released when the guard drops.
    ///
    /// On conflict the error names the target that is already held.
    pub fn try_acquire(
        &self,
        targets: impl IntoIterator<Item = EditTarget>,
    ) -> Result<InFlightGuard<'_>, EditError> {
        let targets: BTreeSet<EditTarget> = targets.into_iter().collect();
        let mut busy = self.busy.borrow_mut();
        let held = busy
            .iter()
            .find(|held| targets.iter().any(|wanted| held.conflicts_with(wanted)));
        if let Some(held) = held {
            return Err(EditError::Busy {
                target: held.clone(),
            });
        }
        busy.extend(targets.iter().cloned());
        Ok(InFlightGuard {
            owner: self,
            targets,
        })
    }

    #[must_use]
    pub fn is_busy(&self, target: &EditTarget) -> bool {
        self.busy.borrow().contains(target)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.busy.borrow().is_empty()
    }
}

/// Releases its targets on drop.
#[must_use]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    targets: BTreeSet<EditTarget>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self.owner.busy.borrow_mut();
        for target in &self.targets {
            let _ = busy.remove(target);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct EditorState {
    tab_order: Vec<String>,
    tabs: BTreeMap<String, SpaceConfig>,
}

/// Summary of [`SpaceEditor::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Tabs the sanitizer repaired.
    pub repaired: Vec<String>,
    /// Repaired tabs written back to the store.
    pub persisted: Vec<String>,
    /// Tabs in the order without a stored document; provisioned empty.
    pub missing: Vec<String>,
}

/// One editing session over one Space.
pub struct SpaceEditor<'cfg, S> {
    store: SpaceStore<S>,
    config: &'cfg EngineConfig,
    identity: Option<String>,
    state: RefCell<EditorState>,
    in_flight: InFlight,
    notices: NoticeLog,
    capability: Option<Box<dyn SettingsCapability>>,
}

impl<'cfg, S: ObjectStore> SpaceEditor<'cfg, S> {
    /// Session for the Space behind `store`, acting as `identity`.
    ///
    /// Starts with no tabs; call [`load`](Self::load).
    #[must_use]
    pub fn new(store: SpaceStore<S>, config: &'cfg EngineConfig, identity: Option<String>) -> Self {
        Self {
            store,
            config,
            identity,
            state: RefCell::new(EditorState::default()),
            in_flight: InFlight::new(),
            notices: NoticeLog::new(),
            capability: None,
        }
    }

    /// Validate widget settings with `capability` before saving them.
    #[must_use]
    pub fn with_settings_capability(mut self, capability: Box<dyn SettingsCapability>) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Switch the acting identity (sign-in, sign-out, account change).
    pub fn set_identity(&mut self, identity: Option<String>) {
        self.identity = identity;
    }

    #[must_use]
    pub fn editability(&self) -> Editability {
        editability(self.identity.as_deref(), Some(self.store.owner_key()))
    }

    #[must_use]
    pub fn notices(&self) -> &NoticeLog {
        &self.notices
    }

    #[must_use]
    pub fn store(&self) -> &SpaceStore<S> {
        &self.store
    }

    #[must_use]
    pub fn tab_order(&self) -> Vec<String> {
        self.state.borrow().tab_order.clone()
    }

    /// A tab's config with `is_editable` and `tab_names` filled in.
    #[must_use]
    pub fn tab(&self, name: &str) -> Option<SpaceConfig> {
        let state = self.state.borrow();
        let mut config = state.tabs.get(name)?.clone();
        config.is_editable = self.editability().is_editable;
        config.tab_names = state.tab_order.clone();
        Some(config)
    }

    /// Replace in-memory state with what the store holds.
    ///
    /// Every tab is sanitized on the way in. When repairs were needed, the
    /// identity may edit, and [`EngineConfig::persist_repairs`] is set, the
    /// repaired config is written back. A failed write-back is logged and
    /// does not fail the load.
    ///
    /// Fails with [`EditError::Busy`] if any edit is still in flight, since
    /// its rollback would overwrite the freshly loaded state.
    pub async fn load(&self) -> Result<LoadReport, EditError> {
        let _guard = self.in_flight.try_acquire([EditTarget::Space])?;
        let options = self.config.sanitize_options();
        let editable = self.editability().is_editable;
        let mut report = LoadReport::default();

        let mut order = match self.store.load_tab_order().await? {
            Some(order) => order,
            None => self.store.list_tabs().await?,
        };
        dedup_in_place(&mut order);
        if order.is_empty() {
            order.push(self.config.provisioned_tab_name());
        }

        let mut tabs = BTreeMap::new();
        for name in &order {
            let config = match self.store.load_tab(name, &options).await? {
                Some(outcome) => {
                    if outcome.has_changes {
                        report.repaired.push(name.clone());
                        if editable && self.config.persist_repairs {
                            match self.store.save_tab(name, &outcome.sanitized).await {
                                Ok(()) => report.persisted.push(name.clone()),
                                Err(err) => tracing::warn!(
                                    tab = %name,
                                    error = %err,
                                    "failed to persist repaired tab"
                                ),
                            }
                        }
                    }
                    outcome.sanitized
                }
                None => {
                    report.missing.push(name.clone());
                    SpaceConfig::provisioned(self.config.default_view)
                }
            };
            let _ = tabs.insert(name.clone(), config);
        }

        tracing::debug!(
            tabs = order.len(),
            repaired = report.repaired.len(),
            missing = report.missing.len(),
            "loaded space"
        );
        *self.state.borrow_mut() = EditorState {
            tab_order: order,
            tabs,
        };
        Ok(report)
    }

    /// Add an empty tab at the end of the order. Returns the stored name.
    pub async fn create_tab(&self, name: &str) -> Result<String, EditError> {
        self.ensure_editable()?;
        let name = validate_tab_name(
            name,
            &self.tab_order(),
            None,
            self.config.max_tab_name_len,
        )?;
        let _guard = self
            .in_flight
            .try_acquire([EditTarget::TabOrder, EditTarget::Tab(name.clone())])?;

        let previous_order = self.tab_order();
        let next_order = insert_tab(&previous_order, &name, None);
        let config = SpaceConfig::provisioned(self.config.default_view);
        let (store, saved_name, saved_config, saved_order) =
            (&self.store, &name, &config, &next_order);

        with_optimistic_update(
            || {
                let mut state = self.state.borrow_mut();
                let _ = state.tabs.insert(name.clone(), config.clone());
                state.tab_order = next_order.clone();
            },
            move || async move {
                store.save_tab(saved_name, saved_config).await?;
                store.save_tab_order(saved_order).await
            },
            || {
                let mut state = self.state.borrow_mut();
                let _ = state.tabs.remove(&name);
                state.tab_order = previous_order.clone();
            },
            ErrorConfig::new("Failed to create tab").notify(&self.notices),
        )
        .await?;
        Ok(name)
    }

    /// Rename a tab in place. Returns the stored name.
    ///
    /// The document under the old name stays in the store, detached from
    /// the tab order.
    pub async fn rename_tab(&self, from: &str, to: &str) -> Result<String, EditError> {
        self.ensure_editable()?;
        self.ensure_tab(from)?;
        let to = validate_tab_name(
            to,
            &self.tab_order(),
            Some(from),
            self.config.max_tab_name_len,
        )?;
        if to == from {
            return Ok(to);
        }
        let _guard = self.in_flight.try_acquire([
            EditTarget::TabOrder,
            EditTarget::Tab(from.to_string()),
            EditTarget::Tab(to.clone()),
        ])?;

        let previous_order = self.tab_order();
        let next_order = rename_in_order(&previous_order, from, &to);
        let config = self.tab_config(from)?;
        let (store, saved_name, saved_config, saved_order) =
            (&self.store, &to, &config, &next_order);

        with_optimistic_update(
            || {
                let mut state = self.state.borrow_mut();
                if let Some(config) = state.tabs.remove(from) {
                    let _ = state.tabs.insert(to.clone(), config);
                }
                state.tab_order = next_order.clone();
            },
            move || async move {
                store.save_tab(saved_name, saved_config).await?;
                store.save_tab_order(saved_order).await
            },
            || {
                let mut state = self.state.borrow_mut();
                if let Some(config) = state.tabs.remove(&to) {
                    let _ = state.tabs.insert(from.to_string(), config);
                }
                state.tab_order = previous_order.clone();
            },
            ErrorConfig::new("Failed to rename tab").notify(&self.notices),
        )
        .await?;
        Ok(to)
    }

    /// Remove a tab from the Space. Only the tab order is rewritten.
    pub async fn delete_tab(&self, name: &str) -> Result<(), EditError> {
        self.ensure_editable()?;
        self.ensure_tab(name)?;
        if self.state.borrow().tab_order.len() <= 1 {
            return Err(EditError::LastTab);
        }
        let _guard = self
            .in_flight
            .try_acquire([EditTarget::TabOrder, EditTarget::Tab(name.to_string())])?;

        let previous_order = self.tab_order();
        let next_order = remove_from_order(&previous_order, name);
        let removed = self.tab_config(name)?;

        with_optimistic_update(
            || {
                let mut state = self.state.borrow_mut();
                let _ = state.tabs.remove(name);
                state.tab_order = next_order.clone();
            },
            || self.store.save_tab_order(&next_order),
            || {
                let mut state = self.state.borrow_mut();
                let _ = state.tabs.insert(name.to_string(), removed);
                state.tab_order = previous_order.clone();
            },
            ErrorConfig::new("Failed to delete tab").notify(&self.notices),
        )
        .await?;
        Ok(())
    }

    /// Replace the tab order with a permutation of itself.
    pub async fn reorder_tabs(&self, order: Vec<String>) -> Result<(), EditError> {
        self.ensure_editable()?;
        let previous_order = self.tab_order();
        if !is_permutation(&previous_order, &order) {
            return Err(EditError::InvalidReorder);
        }
        let _guard = self.in_flight.try_acquire([EditTarget::TabOrder])?;

        with_optimistic_update(
            || self.state.borrow_mut().tab_order = order.clone(),
            || self.store.save_tab_order(&order),
            || self.state.borrow_mut().tab_order = previous_order.clone(),
            ErrorConfig::new("Failed to reorder tabs").notify(&self.notices),
        )
        .await?;
        Ok(())
    }

    /// Sanitize `candidate` and make it the config of `tab`.
    ///
    /// Returns the sanitizer outcome so callers can surface repairs.
    pub async fn commit_config(
        &self,
        tab: &str,
        candidate: SpaceConfig,
    ) -> Result<SanitizeOutcome, EditError> {
        self.ensure_editable()?;
        self.ensure_tab(tab)?;
        let outcome = sanitize(&candidate, &self.config.sanitize_options());
        let _guard = self
            .in_flight
            .try_acquire([EditTarget::Tab(tab.to_string())])?;

        let previous = self.tab_config(tab)?;
        let next = outcome.sanitized.clone();

        with_optimistic_update(
            || {
                let _ = self
                    .state
                    .borrow_mut()
                    .tabs
                    .insert(tab.to_string(), next.clone());
            },
            || self.store.save_tab(tab, &next),
            || {
                let _ = self
                    .state
                    .borrow_mut()
                    .tabs
                    .insert(tab.to_string(), previous);
            },
            ErrorConfig::new("Failed to save layout").notify(&self.notices),
        )
        .await?;
        Ok(outcome)
    }

    /// Move a widget within one view.
    ///
    /// Grid views take the new top-left corner `(x, y)`; stack views take
    /// `y` as the new index. Collisions are resolved by the sanitizer.
    pub async fn move_widget(
        &self,
        tab: &str,
        view: ViewName,
        id: &str,
        x: u32,
        y: u32,
    ) -> Result<SanitizeOutcome, EditError> {
        self.ensure_editable()?;
        let mut candidate = self.tab_config(tab)?;
        let Some(layout) = candidate.views.get_mut(&view) else {
            return Err(EditError::UnknownView {
                tab: tab.to_string(),
                view,
            });
        };
        let moved = match layout {
            LayoutView::Grid { placements } => {
                placements.iter_mut().find(|p| p.i == id).map(|placement| {
                    placement.x = x;
                    placement.y = y;
                })
            }
            LayoutView::Stack { placements } => {
                placements.iter().position(|p| p == id).map(|from| {
                    let entry = placements.remove(from);
                    let to = usize::try_from(y).unwrap_or(usize::MAX).min(placements.len());
                    placements.insert(to, entry);
                })
            }
        };
        if moved.is_none() {
            return Err(EditError::UnknownWidget {
                tab: tab.to_string(),
                id: id.to_string(),
            });
        }
        self.commit_config(tab, candidate).await
    }

    /// Replace a widget's settings after validating them.
    pub async fn save_widget_settings(
        &self,
        tab: &str,
        id: &str,
        settings: Settings,
    ) -> Result<SanitizeOutcome, EditError> {
        self.ensure_editable()?;
        let mut candidate = self.tab_config(tab)?;
        let Some(widget) = candidate.widgets.get_mut(id) else {
            return Err(EditError::UnknownWidget {
                tab: tab.to_string(),
                id: id.to_string(),
            });
        };
        if let Some(capability) = &self.capability {
            capability.validate(&widget.widget_type, &settings)?;
        }
        widget.settings = settings;
        self.commit_config(tab, candidate).await
    }

    fn ensure_editable(&self) -> Result<(), EditError> {
        if self.editability().is_editable {
            Ok(())
        } else {
            Err(EditError::NotEditable)
        }
    }

    fn ensure_tab(&self, name: &str) -> Result<(), EditError> {
        if self.state.borrow().tabs.contains_key(name) {
            Ok(())
        } else {
            Err(EditError::UnknownTab {
                tab: name.to_string(),
            })
        }
    }

    fn tab_config(&self, name: &str) -> Result<SpaceConfig, EditError> {
        self.state
            .borrow()
            .tabs
            .get(name)
            .cloned()
            .ok_or_else(|| EditError::UnknownTab {
                tab: name.to_string(),
            })
    }
}

impl<S: ObjectStore> fmt::Debug for SpaceEditor<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SpaceEditor")
            .field("store", &self.store)
            .field("identity", &self.identity)
            .field("tab_order", &state.tab_order)
            .field("notices", &self.notices.len())
            .finish()
    }
}

fn dedup_in_place(order: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    order.retain(|name| seen.insert(name.clone()));
}
