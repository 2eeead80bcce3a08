//! Tolerant decoding of stored configs.
//!
//! [`recover_config`] decodes a [`SpaceConfig`] field by field, so one
//! malformed nested value costs only that value instead of the whole
//! document. Every discarded value is reported as a [`RepairAction`].
//! Only bytes that are not a JSON object at all are an error.
//!
//! Use [`crate::sanitize::sanitize_bytes`] to recover and sanitize in one
//! step.

use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use fspace_core::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::model::{GridPlacement, LayoutKind, LayoutView, SpaceConfig, ViewName, WidgetInstance};
use crate::sanitize::RepairAction;

/// Result of [`recover_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredConfig {
    pub config: SpaceConfig,
    /// Values discarded while decoding, in document order.
    pub actions: Vec<RepairAction>,
}

/// Decode `bytes`, dropping or resetting whatever does not fit the model.
pub fn recover_config(bytes: &[u8]) -> Result<RecoveredConfig, serde_json::Error> {
    let mut root: Map<String, Value> = serde_json::from_slice(bytes)?;
    let mut actions = Vec::new();
    let mut config = SpaceConfig::empty();

    if let Some(layout_id) = take_field(&mut root, "layoutId", &mut actions) {
        config.layout_id = layout_id;
    }
    if let Some(views) = take_object(&mut root, "views", &mut actions) {
        config.views = recover_views(views, &mut actions);
    }
    if let Some(default_view) = take_field(&mut root, "defaultView", &mut actions) {
        config.default_view = default_view;
    }
    if let Some(widgets) = take_object(&mut root, "widgets", &mut actions) {
        config.widgets = recover_widgets(widgets, &mut actions);
    }
    if let Some(tray) = take_array(&mut root, "tray", &mut actions) {
        config.tray = recover_ids("tray", tray, &mut actions);
    }
    if let Some(tab_names) = take_array(&mut root, "tabNames", &mut actions) {
        config.tab_names = recover_ids("tabNames", tab_names, &mut actions);
    }
    if let Some(theme) = take_field(&mut root, "theme", &mut actions) {
        config.theme = theme;
    }

    #[cfg(feature = "tracing")]
    for action in &actions {
        debug!(action = %action, "recovered malformed config value");
    }
    Ok(RecoveredConfig { config, actions })
}

// ─────────────────────────────────────────────────────────────────────────────
// Fields
// ─────────────────────────────────────────────────────────────────────────────

fn reset(field: impl Into<String>, actions: &mut Vec<RepairAction>) {
    actions.push(RepairAction::ResetMalformedField {
        field: field.into(),
    });
}

/// Remove `name` from `root`. Missing and `null` both read as absent.
fn take_present(root: &mut Map<String, Value>, name: &str) -> Option<Value> {
    root.remove(name).filter(|value| !value.is_null())
}

fn take_field<T: DeserializeOwned>(
    root: &mut Map<String, Value>,
    name: &str,
    actions: &mut Vec<RepairAction>,
) -> Option<T> {
    let value = take_present(root, name)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(_) => {
            reset(name, actions);
            None
        }
    }
}

fn take_object(
    root: &mut Map<String, Value>,
    name: &str,
    actions: &mut Vec<RepairAction>,
) -> Option<Map<String, Value>> {
    match take_present(root, name)? {
        Value::Object(map) => Some(map),
        _ => {
            reset(name, actions);
            None
        }
    }
}

fn take_array(
    root: &mut Map<String, Value>,
    name: &str,
    actions: &mut Vec<RepairAction>,
) -> Option<Vec<Value>> {
    match take_present(root, name)? {
        Value::Array(items) => Some(items),
        _ => {
            reset(name, actions);
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Nested values
// ─────────────────────────────────────────────────────────────────────────────

fn recover_views(
    views: Map<String, Value>,
    actions: &mut Vec<RepairAction>,
) -> BTreeMap<ViewName, LayoutView> {
    let mut recovered = BTreeMap::new();
    for (key, value) in views {
        let name = serde_json::from_value::<ViewName>(Value::String(key.clone())).ok();
        let kind = value
            .get("layoutKind")
            .cloned()
            .and_then(|kind| serde_json::from_value::<LayoutKind>(kind).ok());
        let (Some(name), Some(kind), Value::Object(mut body)) = (name, kind, value) else {
            actions.push(RepairAction::DropMalformedView { view: key });
            continue;
        };

        let field = format!("views.{name}.placements");
        let entries = take_array(&mut body, "placements", actions).unwrap_or_default();
        let view = match kind {
            LayoutKind::Grid => LayoutView::Grid {
                placements: recover_entries::<GridPlacement>(&field, entries, actions),
            },
            LayoutKind::Stack => LayoutView::Stack {
                placements: recover_ids(&field, entries, actions),
            },
        };
        let _ = recovered.insert(name, view);
    }
    recovered
}

fn recover_widgets(
    widgets: Map<String, Value>,
    actions: &mut Vec<RepairAction>,
) -> BTreeMap<String, WidgetInstance> {
    let mut recovered = BTreeMap::new();
    for (key, value) in widgets {
        match serde_json::from_value::<WidgetInstance>(value) {
            Ok(widget) => {
                let _ = recovered.insert(key, widget);
            }
            Err(_) => actions.push(RepairAction::DropMalformedWidget { key }),
        }
    }
    recovered
}

fn recover_ids(field: &str, entries: Vec<Value>, actions: &mut Vec<RepairAction>) -> Vec<String> {
    recover_entries::<String>(field, entries, actions)
}

fn recover_entries<T: DeserializeOwned>(
    field: &str,
    entries: Vec<Value>,
    actions: &mut Vec<RepairAction>,
) -> Vec<T> {
    let mut recovered = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<T>(entry) {
            Ok(decoded) => recovered.push(decoded),
            Err(_) => actions.push(RepairAction::DropMalformedEntry {
                field: field.to_string(),
                index,
            }),
        }
    }
    recovered
}
