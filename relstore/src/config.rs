//! Store configuration.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Environment variable selecting the multi-key registration policy.
pub const KEY_REGISTRATION_ENV: &str = "RELSTORE_KEY_REGISTRATION";

/// How a record with several key fields is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRegistration {
    /// Register each key field on its own. A conflict on a later key leaves
    /// earlier bindings (and the record) in place.
    #[default]
    Independent,
    /// Check every key first; on conflict nothing is registered and the
    /// record is not created.
    Atomic,
}

impl KeyRegistration {
    /// Parse a policy name.
    ///
    /// Valid values: "independent" or "atomic" (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "independent" => Some(Self::Independent),
            "atomic" | "all-or-nothing" | "all_or_nothing" => Some(Self::Atomic),
            _ => None,
        }
    }

    /// Parse the policy from `RELSTORE_KEY_REGISTRATION`.
    ///
    /// Defaults to `Independent` if not set or invalid.
    fn from_env() -> Self {
        match env::var(KEY_REGISTRATION_ENV) {
            Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                warn!(
                    value = %value,
                    "Invalid {}, defaulting to 'independent'", KEY_REGISTRATION_ENV
                );
                Self::Independent
            }),
            Err(_) => Self::Independent,
        }
    }
}

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub key_registration: KeyRegistration,
}

impl StoreConfig {
    /// Read configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RELSTORE_KEY_REGISTRATION`: "independent" or "atomic" (default: independent)
    pub fn from_env() -> Self {
        Self {
            key_registration: KeyRegistration::from_env(),
        }
    }

    pub fn with_key_registration(mut self, policy: KeyRegistration) -> Self {
        self.key_registration = policy;
        self
    }
}
