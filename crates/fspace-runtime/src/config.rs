//! Engine configuration.
//!
//! [`EngineConfig`] is built once by the application entry point and handed
//! to [`SpaceEditor`](crate::editor::SpaceEditor) and
//! [`SpaceStore`](crate::space_store::SpaceStore) by reference. There is no
//! process-wide instance.
//!
//! # Environment
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `FSPACE_DEFAULT_VIEW` | `default_view` | `desktop` |
//! | `FSPACE_OVERLAP_POLICY` | `overlap_policy` | `shift_down` |
//! | `FSPACE_MAX_TAB_NAME_LEN` | `max_tab_name_len` | `32` |
//! | `FSPACE_PERSIST_REPAIRS` | `persist_repairs` | `true` |
//! | `FSPACE_DEFAULT_TAB_NAME` | `default_tab_name` | `Profile` |
//!
//! Unparseable values keep the default and emit a `warn` event. The default
//! tab name becomes a store path segment, so it must pass
//! [`validate_tab_name`] under the configured length limit.

use std::env;
use std::str::FromStr;

use fspace_layout::model::ViewName;
use fspace_layout::sanitize::{OverlapPolicy, SanitizeOptions};

use crate::tabs::validate_tab_name;

/// Default upper bound on tab name length, in characters.
pub const DEFAULT_MAX_TAB_NAME_LEN: usize = 32;

/// Name of the tab a freshly provisioned Space starts with.
pub const DEFAULT_TAB_NAME: &str = "Profile";

/// Engine-wide knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// View used when a config names a view that does not exist.
    pub default_view: ViewName,
    /// How the sanitizer resolves overlapping placements.
    pub overlap_policy: OverlapPolicy,
    pub max_tab_name_len: usize,
    /// Write sanitized configs back on load when repairs were needed and
    /// the current identity may edit.
    pub persist_repairs: bool,
    pub default_tab_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_view: ViewName::Desktop,
            overlap_policy: OverlapPolicy::ShiftDown,
            max_tab_name_len: DEFAULT_MAX_TAB_NAME_LEN,
            persist_repairs: true,
            default_tab_name: DEFAULT_TAB_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read configuration from `FSPACE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// [`from_env`](Self::from_env) uses the process environment; tests pass
    /// a map.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(view) = parse_var(&lookup, "FSPACE_DEFAULT_VIEW") {
            config.default_view = view;
        }
        if let Some(policy) = parse_var(&lookup, "FSPACE_OVERLAP_POLICY") {
            config.overlap_policy = policy;
        }
        if let Some(len) = parse_var::<usize>(&lookup, "FSPACE_MAX_TAB_NAME_LEN") {
            if len == 0 {
                tracing::warn!(
                    key = "FSPACE_MAX_TAB_NAME_LEN",
                    "zero tab name length ignored, keeping default"
                );
            } else {
                config.max_tab_name_len = len;
            }
        }
        if let Some(raw) = lookup("FSPACE_PERSIST_REPAIRS") {
            match parse_bool(&raw) {
                Some(flag) => config.persist_repairs = flag,
                None => tracing::warn!(
                    key = "FSPACE_PERSIST_REPAIRS",
                    value = %raw,
                    "unrecognized boolean, keeping default"
                ),
            }
        }
        if let Some(name) = lookup("FSPACE_DEFAULT_TAB_NAME") {
            match validate_tab_name(&name, &[], None, config.max_tab_name_len) {
                Ok(name) => config.default_tab_name = name,
                Err(err) => tracing::warn!(
                    key = "FSPACE_DEFAULT_TAB_NAME",
                    value = %name,
                    error = %err,
                    "invalid default tab name, keeping default"
                ),
            }
        }
        config
    }

    /// Set the fallback default view.
    #[must_use]
    pub fn with_default_view(mut self, view: ViewName) -> Self {
        self.default_view = view;
        self
    }

    /// Set the overlap resolution policy.
    #[must_use]
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Set the maximum tab name length.
    #[must_use]
    pub fn with_max_tab_name_len(mut self, len: usize) -> Self {
        self.max_tab_name_len = len;
        self
    }

    /// Enable or disable write-back of load-time repairs.
    #[must_use]
    pub fn with_persist_repairs(mut self, enabled: bool) -> Self {
        self.persist_repairs = enabled;
        self
    }

    /// Set the name of the first tab of a new Space.
    #[must_use]
    pub fn with_default_tab_name(mut self, name: impl Into<String>) -> Self {
        self.default_tab_name = name.into();
        self
    }

    /// Name for the first tab of an empty Space.
    ///
    /// Falls back to [`DEFAULT_TAB_NAME`] with a `warn` event when
    /// `default_tab_name` was set to something that is not a valid tab name.
    #[must_use]
    pub fn provisioned_tab_name(&self) -> String {
        match validate_tab_name(&self.default_tab_name, &[], None, self.max_tab_name_len) {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!(
                    name = %self.default_tab_name,
                    error = %err,
                    "invalid default tab name, falling back to the built-in default"
                );
                DEFAULT_TAB_NAME.to_string()
            }
        }
    }

    /// Sanitizer options derived from this config.
    #[must_use]
    pub fn sanitize_options(&self) -> SanitizeOptions {
        SanitizeOptions::default()
            .with_overlap_policy(self.overlap_policy)
            .with_default_view(self.default_view)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, value = %raw, error = %err, "invalid value, keeping default");
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
