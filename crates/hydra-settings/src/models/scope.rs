//! Settings scopes and namespaced keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scope used when no account is active.
pub const GUEST_SETTINGS_SCOPE: &str = "__guest__";
/// Prefix shared by every namespaced settings key.
pub const ACCOUNT_SETTINGS_KEY_PREFIX: &str = "acctSetting";
/// Bootstrap key (outside any scope) holding the active username.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Isolation namespace for settings, derived from the account username.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// Derive a scope from a username: trimmed, lower-cased, guest when empty.
    pub fn from_username(username: Option<&str>) -> Self {
        let normalized = username.map(|name| name.trim().to_lowercase());
        match normalized {
            Some(name) if !name.is_empty() => Self(name),
            _ => Self::guest(),
        }
    }

    /// A scope spelled exactly as it appears inside a stored key.
    pub fn from_stored(raw: &str) -> Self {
        Self(raw.to_string())
    }

    pub fn guest() -> Self {
        Self(GUEST_SETTINGS_SCOPE.to_string())
    }

    pub fn is_guest(&self) -> bool {
        self.0 == GUEST_SETTINGS_SCOPE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `acctSetting:<scope>:`
    pub fn key_prefix(&self) -> String {
        format!("{ACCOUNT_SETTINGS_KEY_PREFIX}:{}:", self.0)
    }

    /// `acctSetting:<scope>:<setting_key>`
    pub fn namespaced_key(&self, setting_key: &str) -> String {
        format!("{}{setting_key}", self.key_prefix())
    }

    /// Strip this scope's prefix from a namespaced key.
    pub fn setting_key_of<'a>(&self, namespaced_key: &'a str) -> Option<&'a str> {
        namespaced_key
            .strip_prefix(&self.key_prefix())
            .filter(|setting_key| !setting_key.is_empty())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A namespaced key split back into its scope and setting key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedKey {
    pub scope: Scope,
    pub setting_key: String,
}

impl ScopedKey {
    /// Parse `acctSetting:<scope>:<setting_key>`.
    ///
    /// The scope ends at the first separator after the prefix; both parts must
    /// be non-empty.
    pub fn parse(key: &str) -> Option<Self> {
        let rest = key
            .strip_prefix(ACCOUNT_SETTINGS_KEY_PREFIX)?
            .strip_prefix(':')?;
        let (scope, setting_key) = rest.split_once(':')?;
        if scope.is_empty() || setting_key.is_empty() {
            return None;
        }
        Some(Self {
            scope: Scope::from_stored(scope),
            setting_key: setting_key.to_string(),
        })
    }

    /// Whether `key` lives anywhere in the settings namespace.
    pub fn is_namespaced(key: &str) -> bool {
        key.strip_prefix(ACCOUNT_SETTINGS_KEY_PREFIX)
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_normalizes_username() {
        assert_eq!(Scope::from_username(Some("  Alice ")).as_str(), "alice");
        assert!(Scope::from_username(Some("   ")).is_guest());
        assert!(Scope::from_username(None).is_guest());
    }

    #[test]
    fn namespaced_key_format() {
        let scope = Scope::from_username(Some("Bob"));
        assert_eq!(scope.namespaced_key("showUsername"), "acctSetting:bob:showUsername");
        assert_eq!(
            Scope::guest().namespaced_key("blurNSFW"),
            "acctSetting:__guest__:blurNSFW"
        );
    }

    #[test]
    fn setting_key_of_requires_matching_scope() {
        let alice = Scope::from_username(Some("alice"));
        assert_eq!(alice.setting_key_of("acctSetting:alice:x"), Some("x"));
        assert_eq!(alice.setting_key_of("acctSetting:alicia:x"), None);
        assert_eq!(alice.setting_key_of("acctSetting:alice:"), None);
    }

    #[test]
    fn parse_scoped_key() {
        let parsed = ScopedKey::parse("acctSetting:alice:postTitleLength").unwrap();
        assert_eq!(parsed.scope.as_str(), "alice");
        assert_eq!(parsed.setting_key, "postTitleLength");

        assert_eq!(ScopedKey::parse("acctSetting::x"), None);
        assert_eq!(ScopedKey::parse("acctSetting:alice:"), None);
        assert_eq!(ScopedKey::parse("acctSettingX:alice:x"), None);
        assert_eq!(ScopedKey::parse("showUsername"), None);
    }

    #[test]
    fn is_namespaced_checks_separator() {
        assert!(ScopedKey::is_namespaced("acctSetting:alice:x"));
        assert!(!ScopedKey::is_namespaced("acctSettings"));
        assert!(!ScopedKey::is_namespaced("allowErrorReporting"));
    }
}
