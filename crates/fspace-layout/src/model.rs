//! Space configuration model.
//!
//! A [`SpaceConfig`] is the persisted shape of one tab of a Space: the
//! widget instances it owns, the per-view arrangements of those widgets,
//! the off-canvas tray, and the theme tokens. All maps are ordered so that
//! serialization is canonical and state hashes are stable.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use fspace_core::geometry::GridRect;
use serde::{Deserialize, Deserializer, Serialize};

/// Open per-widget settings mapping.
///
/// Values are whatever the widget's settings schema allows (strings,
/// numbers, booleans, nested theme tokens). The model only requires
/// structural presence; see [`crate::settings`] for validation.
pub type Settings = BTreeMap<String, serde_json::Value>;

/// Separator between the widget type and the instance suffix in an id.
pub const WIDGET_ID_SEPARATOR: char = ':';

/// Presentation context a layout view is rendered in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewName {
    #[default]
    Desktop,
    Mobile,
    Presentation,
}

impl ViewName {
    /// All views in canonical order.
    pub const ALL: [ViewName; 3] = [ViewName::Desktop, ViewName::Mobile, ViewName::Presentation];

    /// Wire name of the view.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Presentation => "presentation",
        }
    }

    /// Layout kind a freshly provisioned view of this name uses.
    #[must_use]
    pub const fn default_kind(self) -> LayoutKind {
        match self {
            Self::Mobile => LayoutKind::Stack,
            Self::Desktop | Self::Presentation => LayoutKind::Grid,
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            "presentation" => Ok(Self::Presentation),
            other => Err(format!("unknown view name: {other:?}")),
        }
    }
}

/// One placed widget instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInstance {
    /// Unique within a Space and stable across edits.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Renderer / settings-schema key. Backfilled from `id` when empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub widget_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: Settings,
}

impl WidgetInstance {
    /// Build an instance with empty settings.
    #[must_use]
    pub fn new(id: impl Into<String>, widget_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            widget_type: widget_type.into(),
            settings: Settings::new(),
        }
    }

    /// Builder-style setting insertion.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let _ = self.settings.insert(key.into(), value.into());
        self
    }
}

/// Widget type implied by an id: the prefix before the first `:`.
///
/// An id without a separator names its own type.
#[must_use]
pub fn widget_type_from_id(id: &str) -> &str {
    id.split(WIDGET_ID_SEPARATOR).next().unwrap_or(id)
}

/// One widget's rectangle in a grid view.
///
/// Missing or null coordinates decode as 0; the sanitizer widens a zero
/// width or height to 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPlacement {
    /// Id of the placed [`WidgetInstance`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub i: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub x: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub y: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub w: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub h: u32,
}

impl GridPlacement {
    #[must_use]
    pub fn new(i: impl Into<String>, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            i: i.into(),
            x,
            y,
            w,
            h,
        }
    }

    /// Rectangle occupied on the grid.
    #[must_use]
    pub const fn rect(&self) -> GridRect {
        GridRect::new(self.x, self.y, self.w, self.h)
    }

    /// True iff the two placements intersect with positive area.
    #[must_use]
    pub const fn overlaps(&self, other: &GridPlacement) -> bool {
        self.rect().overlaps(&other.rect())
    }
}

/// Discriminant of a [`LayoutView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Grid,
    Stack,
}

/// One presentation-context arrangement of the Space's widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layoutKind", rename_all = "lowercase")]
pub enum LayoutView {
    /// Rectangles on an integer grid; order is priority (earlier wins).
    Grid {
        #[serde(default)]
        placements: Vec<GridPlacement>,
    },
    /// Ordered single-column list of widget ids.
    Stack {
        #[serde(default)]
        placements: Vec<String>,
    },
}

impl LayoutView {
    /// Empty view of the given kind.
    #[must_use]
    pub const fn empty(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::Grid => Self::Grid {
                placements: Vec::new(),
            },
            LayoutKind::Stack => Self::Stack {
                placements: Vec::new(),
            },
        }
    }

    #[must_use]
    pub const fn kind(&self) -> LayoutKind {
        match self {
            Self::Grid { .. } => LayoutKind::Grid,
            Self::Stack { .. } => LayoutKind::Stack,
        }
    }

    /// Number of placements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Grid { placements } => placements.len(),
            Self::Stack { placements } => placements.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Referenced widget ids in placement order (duplicates preserved).
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Grid { placements } => placements.iter().map(|p| p.i.as_str()).collect(),
            Self::Stack { placements } => placements.iter().map(String::as_str).collect(),
        }
    }

    /// True if `id` is placed in this view.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        match self {
            Self::Grid { placements } => placements.iter().any(|p| p.i == id),
            Self::Stack { placements } => placements.iter().any(|p| p == id),
        }
    }

    /// Grid placements, or `None` for a stack view.
    #[must_use]
    pub fn grid_placements(&self) -> Option<&[GridPlacement]> {
        match self {
            Self::Grid { placements } => Some(placements),
            Self::Stack { .. } => None,
        }
    }

    /// Remove every reference to `id`. Returns true if anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.len();
        match self {
            Self::Grid { placements } => placements.retain(|p| p.i != id),
            Self::Stack { placements } => placements.retain(|p| p != id),
        }
        self.len() != before
    }
}

/// Flat record of style tokens for a Space tab.
///
/// Values are CSS-like strings; the model does not interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub background: String,
    #[serde(rename = "backgroundHTML")]
    pub background_html: String,
    #[serde(rename = "musicURL")]
    pub music_url: String,
    pub font: String,
    pub font_color: String,
    pub headings_font: String,
    pub headings_font_color: String,
    pub fidget_background: String,
    pub fidget_border_width: String,
    pub fidget_border_color: String,
    pub fidget_shadow: String,
    pub fidget_border_radius: String,
    pub grid_spacing: String,
    /// Forward-compatible extension bag for tokens not modeled above.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default".to_string(),
            background: "#ffffff".to_string(),
            background_html: String::new(),
            music_url: String::new(),
            font: "Inter".to_string(),
            font_color: "#000000".to_string(),
            headings_font: "Inter".to_string(),
            headings_font_color: "#000000".to_string(),
            fidget_background: "#ffffff".to_string(),
            fidget_border_width: "1px".to_string(),
            fidget_border_color: "#eeeeee".to_string(),
            fidget_shadow: "none".to_string(),
            fidget_border_radius: "12px".to_string(),
            grid_spacing: "16".to_string(),
            extensions: BTreeMap::new(),
        }
    }
}

/// Root aggregate: one tab's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpaceConfig {
    /// Active layout record; empty selects the default layout.
    pub layout_id: String,
    pub views: BTreeMap<ViewName, LayoutView>,
    /// View rendered first.
    pub default_view: ViewName,
    /// Instance data store keyed by [`WidgetInstance::id`].
    pub widgets: BTreeMap<String, WidgetInstance>,
    /// Widgets available but not placed in any view.
    pub tray: Vec<String>,
    /// Labels of the sibling tabs of the owning Space.
    pub tab_names: Vec<String>,
    pub theme: Theme,
    /// Computed at read time from the authorizer. Never persisted.
    #[serde(skip)]
    pub is_editable: bool,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self::empty()
    }
}

impl SpaceConfig {
    /// Config with every map and sequence empty.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            layout_id: String::new(),
            views: BTreeMap::new(),
            default_view: ViewName::Desktop,
            widgets: BTreeMap::new(),
            tray: empty_tray(),
            tab_names: Vec::new(),
            theme: Theme::default(),
            is_editable: false,
        }
    }

    /// Empty config with one empty view per [`ViewName`].
    ///
    /// This is what a newly provisioned tab starts from.
    #[must_use]
    pub fn provisioned(default_view: ViewName) -> Self {
        let views = ViewName::ALL
            .into_iter()
            .map(|name| (name, LayoutView::empty(name.default_kind())))
            .collect();
        Self {
            views,
            default_view,
            ..Self::empty()
        }
    }

    /// Ids referenced by any view or by the tray.
    #[must_use]
    pub fn referenced_ids(&self) -> BTreeSet<&str> {
        self.views
            .values()
            .flat_map(LayoutView::ids)
            .chain(self.tray.iter().map(String::as_str))
            .collect()
    }

    /// Insert a widget and append it to the tray.
    pub fn add_to_tray(&mut self, widget: WidgetInstance) {
        let id = widget.id.clone();
        let _ = self.widgets.insert(id.clone(), widget);
        if !self.tray.contains(&id) {
            self.tray.push(id);
        }
    }

    /// Remove a widget and every reference to it.
    pub fn remove_widget(&mut self, id: &str) -> Option<WidgetInstance> {
        for view in self.views.values_mut() {
            let _ = view.remove(id);
        }
        self.tray.retain(|t| t != id);
        self.widgets.remove(id)
    }

    /// Canonical JSON bytes (excludes `is_editable`).
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse from JSON bytes. Missing fields take their empty defaults.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Deterministic FNV-1a hash over the canonical serialization.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        let bytes = self.to_json_bytes().unwrap_or_default();
        bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
        })
    }
}

/// Decode `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The empty widget tray.
#[must_use]
pub fn empty_tray() -> Vec<String> {
    Vec::new()
}
