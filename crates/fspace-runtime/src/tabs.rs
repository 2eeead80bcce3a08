//! Tab naming policy and tab-order arithmetic.
//!
//! Tab names double as store path segments, so validation is stricter than
//! "non-empty and unique". Uniqueness is checked under trimmed,
//! case-insensitive equality. Everything here is synchronous and runs
//! before any optimistic mutation starts.

use std::fmt;

/// Why a candidate tab name was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabNameError {
    Empty,
    TooLong { len: usize, max: usize },
    InvalidCharacter { ch: char },
    /// Matches `existing` after trimming and case folding.
    Duplicate { existing: String },
}

impl fmt::Display for TabNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("tab name cannot be empty"),
            Self::TooLong { len, max } => {
                write!(f, "tab name is {len} characters, the limit is {max}")
            }
            Self::InvalidCharacter { ch } => {
                write!(f, "tab name cannot contain {ch:?}")
            }
            Self::Duplicate { existing } => {
                write!(f, "a tab named {existing:?} already exists")
            }
        }
    }
}

impl std::error::Error for TabNameError {}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

/// True if `a` and `b` name the same tab.
#[must_use]
pub fn same_tab_name(a: &str, b: &str) -> bool {
    fold(a) == fold(b)
}

/// Validate a tab name and return its trimmed form.
///
/// `renaming` is the current name of the tab being renamed; it is exempt
/// from the duplicate check so a tab can be renamed to a different casing
/// of itself.
pub fn validate_tab_name(
    candidate: &str,
    existing: &[String],
    renaming: Option<&str>,
    max_len: usize,
) -> Result<String, TabNameError> {
    let name = candidate.trim();
    if name.is_empty() {
        return Err(TabNameError::Empty);
    }
    let len = name.chars().count();
    if len > max_len {
        return Err(TabNameError::TooLong { len, max: max_len });
    }
    if let Some(ch) = name
        .chars()
        .find(|ch| matches!(ch, '/' | '\\') || ch.is_control())
    {
        return Err(TabNameError::InvalidCharacter { ch });
    }
    let folded = fold(name);
    if let Some(clash) = existing
        .iter()
        .filter(|tab| renaming.is_none_or(|current| *tab != current))
        .find(|tab| fold(tab) == folded)
    {
        return Err(TabNameError::Duplicate {
            existing: clash.clone(),
        });
    }
    Ok(name.to_string())
}

/// First of `base`, `base 2`, `base 3`, ... not already taken.
#[must_use]
pub fn unique_tab_name(base: &str, existing: &[String]) -> String {
    let base = base.trim();
    let taken = |name: &str| existing.iter().any(|tab| same_tab_name(tab, name));
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base} {n}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| base.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tab order
// ─────────────────────────────────────────────────────────────────────────────

/// Order with `name` inserted at `index` (clamped to the end).
#[must_use]
pub fn insert_tab(order: &[String], name: &str, index: Option<usize>) -> Vec<String> {
    let mut next = order.to_vec();
    let at = index.unwrap_or(next.len()).min(next.len());
    next.insert(at, name.to_string());
    next
}

/// Order with `from` replaced by `to` in place.
#[must_use]
pub fn rename_in_order(order: &[String], from: &str, to: &str) -> Vec<String> {
    order
        .iter()
        .map(|tab| {
            if tab == from {
                to.to_string()
            } else {
                tab.clone()
            }
        })
        .collect()
}

/// Order with `name` removed.
#[must_use]
pub fn remove_from_order(order: &[String], name: &str) -> Vec<String> {
    order.iter().filter(|tab| *tab != name).cloned().collect()
}

/// Order with `name` moved to `index` (clamped). Unknown names leave the
/// order unchanged.
#[must_use]
pub fn move_in_order(order: &[String], name: &str, index: usize) -> Vec<String> {
    let Some(from) = order.iter().position(|tab| tab == name) else {
        return order.to_vec();
    };
    let mut next = order.to_vec();
    let tab = next.remove(from);
    next.insert(index.min(next.len()), tab);
    next
}

/// True if `candidate` holds exactly the tabs of `order`, each once.
#[must_use]
pub fn is_permutation(order: &[String], candidate: &[String]) -> bool {
    if order.len() != candidate.len() {
        return false;
    }
    let mut a = order.to_vec();
    let mut b = candidate.to_vec();
    a.sort();
    b.sort();
    a == b && a.windows(2).all(|pair| pair[0] != pair[1])
}
