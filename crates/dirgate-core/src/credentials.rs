//! Service-account credentials for directory binds.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Credentials for the read-only service account used to look up entries
/// before the real user's password has been verified.
///
/// The password is held as a [`SecretString`] so it is redacted from `Debug`
/// output and never serialized.
#[derive(Debug, Clone, Deserialize)]
pub struct BindCredentials {
    bind_dn: String,
    bind_password: SecretString,
}

impl BindCredentials {
    /// Create new bind credentials.
    ///
    /// # Arguments
    ///
    /// * `bind_dn` - The distinguished name of the service account
    /// * `bind_password` - The service account password
    #[must_use]
    pub fn new(bind_dn: impl Into<String>, bind_password: impl Into<String>) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            bind_password: SecretString::from(bind_password.into()),
        }
    }

    /// Get the bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Expose the bind password for a bind call.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.bind_password.expose_secret()
    }
}
