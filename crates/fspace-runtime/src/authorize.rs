//! Editability authorization.
//!
//! Ownership of a Space is proven by key identity alone: the current
//! session may edit iff its public key equals the Space owner's key. Keys
//! arrive from different providers with different formatting, so both
//! sides are normalized before comparison.

/// Result of an editability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Editability {
    pub is_editable: bool,
    /// An input is still being resolved upstream.
    pub is_loading: bool,
}

impl Editability {
    pub const LOADING: Self = Self {
        is_editable: false,
        is_loading: true,
    };

    pub const DENIED: Self = Self {
        is_editable: false,
        is_loading: false,
    };

    pub const GRANTED: Self = Self {
        is_editable: true,
        is_loading: false,
    };
}

/// An identity key that may still be resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityInput<'a> {
    /// The upstream lookup has not finished.
    Pending,
    /// Lookup finished; `None` means no key is registered.
    Resolved(Option<&'a str>),
}

impl<'a> From<Option<&'a str>> for IdentityInput<'a> {
    fn from(key: Option<&'a str>) -> Self {
        Self::Resolved(key)
    }
}

impl<'a> From<&'a str> for IdentityInput<'a> {
    fn from(key: &'a str) -> Self {
        Self::Resolved(Some(key))
    }
}

/// Canonical form of a public key.
///
/// Trims whitespace, strips one leading `0x`/`0X`, lowercases. Returns
/// `None` when nothing is left.
#[must_use]
pub fn normalize_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if body.is_empty() {
        None
    } else {
        Some(body.to_lowercase())
    }
}

/// True iff both keys are present and equal after normalization.
#[must_use]
pub fn is_editable(current: Option<&str>, space_owner: Option<&str>) -> bool {
    match (
        current.and_then(normalize_key),
        space_owner.and_then(normalize_key),
    ) {
        (Some(current), Some(owner)) => current == owner,
        _ => false,
    }
}

/// Full check, including the loading state of either input.
#[must_use]
pub fn editability<'a>(
    current: impl Into<IdentityInput<'a>>,
    space_owner: impl Into<IdentityInput<'a>>,
) -> Editability {
    match (current.into(), space_owner.into()) {
        (IdentityInput::Pending, _) | (_, IdentityInput::Pending) => Editability::LOADING,
        (IdentityInput::Resolved(current), IdentityInput::Resolved(owner)) => {
            if is_editable(current, owner) {
                Editability::GRANTED
            } else {
                Editability::DENIED
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize_key("  0xAbC "), Some("abc".to_string()));
        assert_eq!(normalize_key("0XDEAD"), Some("dead".to_string()));
        assert_eq!(normalize_key("0x0xab"), Some("0xab".to_string()));
        assert_eq!(normalize_key(" 0x "), None);
        assert_eq!(normalize_key(""), None);
    }

    #[test]
    fn formatting_variants_match() {
        assert!(is_editable(Some("0xABC "), Some(" abc")));
        assert!(is_editable(Some("abc"), Some("0XAbC")));
    }

    #[test]
    fn different_keys_do_not_match() {
        assert!(!is_editable(Some("abc"), Some("def")));
    }

    #[test]
    fn missing_owner_never_editable() {
        assert!(!is_editable(Some("abc"), None));
        assert!(!is_editable(None, None));
        assert!(!is_editable(Some(""), Some("")));
        assert!(!is_editable(Some("0x"), Some("0x")));
    }

    #[test]
    fn pending_input_is_loading() {
        assert_eq!(
            editability(IdentityInput::Pending, "abc"),
            Editability::LOADING
        );
        assert_eq!(
            editability("abc", IdentityInput::Pending),
            Editability::LOADING
        );
    }

    #[test]
    fn resolved_inputs() {
        assert_eq!(editability("0xABC", "abc"), Editability::GRANTED);
        assert_eq!(editability("abc", None::<&str>), Editability::DENIED);
        assert_eq!(
            editability(IdentityInput::Resolved(None), "abc"),
            Editability::DENIED
        );
    }
}
