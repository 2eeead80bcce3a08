//! Widget settings validation seam.
//!
//! The core treats [`Settings`] as an open mapping. Validation is delegated
//! to a [`SettingsCapability`] supplied by whoever owns the widget registry.
//! [`SchemaRegistry`] is a field-list implementation suitable for hosts that
//! describe settings declaratively.

use std::collections::BTreeMap;
use std::fmt;

use crate::model::Settings;

/// Validates a settings mapping for a widget type.
pub trait SettingsCapability {
    /// Accept or reject `settings` for `widget_type`.
    fn validate(&self, widget_type: &str, settings: &Settings) -> Result<(), SettingsError>;
}

/// Why a settings mapping was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// No schema is registered for the widget type.
    UnknownWidgetType { widget_type: String },
    /// A required field is absent.
    MissingField { widget_type: String, field: String },
    /// A field holds a value of the wrong kind.
    WrongKind {
        widget_type: String,
        field: String,
        expected: FieldKind,
    },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownWidgetType { widget_type } => {
                write!(f, "no settings schema for widget type {widget_type:?}")
            }
            Self::MissingField { widget_type, field } => {
                write!(f, "{widget_type}: missing required setting {field:?}")
            }
            Self::WrongKind {
                widget_type,
                field,
                expected,
            } => write!(f, "{widget_type}: setting {field:?} must be a {expected}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Value kind a schema field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    /// Any JSON value, including nested theme tokens.
    Any,
}

impl FieldKind {
    fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Any => true,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "boolean",
            Self::Any => "value",
        };
        f.write_str(name)
    }
}

/// One declared settings field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    #[must_use]
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// Declarative per-widget-type field lists.
///
/// Keys not declared for a type are accepted untouched.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Vec<FieldSpec>>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the fields of a widget type.
    #[must_use]
    pub fn with_widget(
        mut self,
        widget_type: impl Into<String>,
        fields: impl IntoIterator<Item = FieldSpec>,
    ) -> Self {
        let _ = self
            .schemas
            .insert(widget_type.into(), fields.into_iter().collect());
        self
    }

    #[must_use]
    pub fn knows(&self, widget_type: &str) -> bool {
        self.schemas.contains_key(widget_type)
    }
}

impl SettingsCapability for SchemaRegistry {
    fn validate(&self, widget_type: &str, settings: &Settings) -> Result<(), SettingsError> {
        let Some(fields) = self.schemas.get(widget_type) else {
            return Err(SettingsError::UnknownWidgetType {
                widget_type: widget_type.to_string(),
            });
        };
        for field in fields {
            match settings.get(&field.name) {
                None if field.required => {
                    return Err(SettingsError::MissingField {
                        widget_type: widget_type.to_string(),
                        field: field.name.clone(),
                    });
                }
                Some(value) if !field.kind.accepts(value) => {
                    return Err(SettingsError::WrongKind {
                        widget_type: widget_type.to_string(),
                        field: field.name.clone(),
                        expected: field.kind,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}
