//! Registry configuration.
//!
//! Registries built by [`Registries::global`](crate::Registries::global) read
//! their configuration from the environment:
//!
//! | variable                   | values                           | default  |
//! |----------------------------|----------------------------------|----------|
//! | `OPLIB_CLASS_REDEFINITION` | `reject`, `merge`, `replace`     | `reject` |
//!
//! Tests and embedders build a [`RegistryConfig`] directly instead.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

/// Environment variable selecting [`ClassRedefinition`].
pub const CLASS_REDEFINITION_ENV: &str = "OPLIB_CLASS_REDEFINITION";

/// What `register_class` does when the qualified name is already taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClassRedefinition {
    /// Fail with `DuplicateClass`.
    #[default]
    Reject,
    /// Keep the existing registration and its members.
    Merge,
    /// Drop the existing registration and start empty.
    Replace,
}

impl ClassRedefinition {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassRedefinition::Reject => "reject",
            ClassRedefinition::Merge => "merge",
            ClassRedefinition::Replace => "replace",
        }
    }
}

impl fmt::Display for ClassRedefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized redefinition policy name.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown class redefinition policy: {0} (expected reject, merge or replace)")]
pub struct ParsePolicyError(pub String);

impl FromStr for ClassRedefinition {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ClassRedefinition::Reject),
            "merge" => Ok(ClassRedefinition::Merge),
            "replace" => Ok(ClassRedefinition::Replace),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Behavior switches for one set of registries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    pub class_redefinition: ClassRedefinition,
}

impl RegistryConfig {
    #[must_use]
    pub fn with_class_redefinition(mut self, policy: ClassRedefinition) -> Self {
        self.class_redefinition = policy;
        self
    }

    /// Configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Configuration from an arbitrary variable lookup.
    ///
    /// Invalid values are logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = RegistryConfig::default();
        if let Some(raw) = lookup(CLASS_REDEFINITION_ENV) {
            match raw.parse() {
                Ok(policy) => config.class_redefinition = policy,
                Err(err) => warn!(
                    variable = CLASS_REDEFINITION_ENV,
                    %err,
                    "ignoring invalid value, using {}",
                    config.class_redefinition
                ),
            }
        }
        config
    }
}
