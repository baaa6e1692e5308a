//! Configuration for the directory client.

use crate::{dn::DistinguishedName, filter::FilterTemplate};
use dirgate_core::BindCredentials;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Default directory port.
pub const DEFAULT_PORT: u16 = 389;
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default per-operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Client certificate presented during the TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Path to the PEM-encoded certificate chain.
    pub cert: PathBuf,
    /// Path to the PEM-encoded private key.
    pub key: PathBuf,
}

/// Configuration for connecting to and querying a directory server.
///
/// Immutable once handed to the client. Deserializable so an outer
/// configuration layer can supply it wholesale; the service-account
/// password is never serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DirectoryConfig {
    /// Directory server hostname.
    #[validate(length(min = 1, message = "directory host cannot be empty"))]
    pub host: String,

    /// Directory server port.
    #[validate(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to upgrade the connection with StartTLS.
    #[serde(default)]
    pub use_tls: bool,

    /// Whether to verify TLS certificates.
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Optional client certificate presented to the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_identity: Option<ClientIdentity>,

    /// Base distinguished name every search starts from.
    pub base_dn: DistinguishedName,

    /// Attributes resolved for authenticated users.
    #[serde(default)]
    pub attributes: Vec<String>,

    /// Optional service-account credentials for entry lookups.
    #[serde(default, skip_serializing)]
    pub bind: Option<BindCredentials>,

    /// Filter template selecting the user entry, e.g. `(uid={username})`.
    pub user_filter: FilterTemplate,

    /// Filter template selecting the user's groups, e.g. `(memberUid={username})`.
    pub group_filter: FilterTemplate,

    /// Connection timeout in seconds.
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-operation timeout in seconds.
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

impl DirectoryConfig {
    /// Creates a configuration with defaults for everything optional.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        base_dn: DistinguishedName,
        user_filter: FilterTemplate,
        group_filter: FilterTemplate,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            use_tls: false,
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            client_identity: None,
            base_dn,
            attributes: Vec::new(),
            bind: None,
            user_filter,
            group_filter,
            connect_timeout_secs: default_connect_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }

    /// Overrides the directory port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the service-account credentials.
    #[must_use]
    pub fn with_bind(mut self, bind: BindCredentials) -> Self {
        self.bind = Some(bind);
        self
    }

    /// Replaces the attribute list resolved for users.
    #[must_use]
    pub fn with_attributes<I>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.attributes = attributes.into_iter().collect();
        self
    }

    /// Enables or disables the StartTLS upgrade.
    #[must_use]
    pub const fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets a custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Sets the client certificate presented to the server.
    #[must_use]
    pub fn with_client_identity(mut self, identity: ClientIdentity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connect_timeout_secs(mut self, seconds: u64) -> Self {
        self.connect_timeout_secs = seconds;
        self
    }

    /// Overrides the per-operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }

    /// The `ldap://host:port` endpoint the client dials.
    ///
    /// # Errors
    ///
    /// Returns [`dirgate_core::Error::InvalidEndpoint`] when host and port do
    /// not form a valid URL.
    pub fn endpoint_url(&self) -> crate::Result<url::Url> {
        let url = url::Url::parse(&format!("ldap://{}:{}", self.host, self.port))?;
        Ok(url)
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the per-operation timeout duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::DistinguishedName;
    use dirgate_core::BindCredentials;

    fn base_config() -> DirectoryConfig {
        DirectoryConfig::new(
            "ldap.example.com",
            DistinguishedName::parse("dc=example,dc=com").unwrap(),
            FilterTemplate::new("(uid={username})").unwrap(),
            FilterTemplate::new("(memberUid={username})").unwrap(),
        )
    }

    #[test]
    fn defaults() {
        let config = base_config();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.use_tls);
        assert!(config.tls_verify);
        assert!(config.bind.is_none());
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.operation_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let config = base_config()
            .with_port(636)
            .with_tls(true)
            .with_tls_verification(false)
            .with_bind(BindCredentials::new("cn=admin,dc=example,dc=com", "secret"))
            .with_attributes(vec!["mail".to_string()])
            .with_connect_timeout_secs(20)
            .with_operation_timeout_secs(30);

        assert_eq!(config.port, 636);
        assert!(config.use_tls);
        assert!(!config.tls_verify);
        assert_eq!(config.attributes, ["mail"]);
        assert_eq!(config.connect_timeout(), Duration::from_secs(20));
        assert_eq!(config.operation_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.bind.as_ref().map(BindCredentials::bind_dn),
            Some("cn=admin,dc=example,dc=com")
        );
    }

    #[test]
    fn endpoint_url_formats_host_and_port() {
        let url = base_config().with_port(10389).endpoint_url().unwrap();
        assert_eq!(url.as_str(), "ldap://ldap.example.com:10389");
    }

    #[test]
    fn validation_rejects_empty_host() {
        let config = DirectoryConfig::new(
            "",
            DistinguishedName::parse("dc=example,dc=com").unwrap(),
            FilterTemplate::new("(uid={username})").unwrap(),
            FilterTemplate::new("(memberUid={username})").unwrap(),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_out_of_range_timeout() {
        let config = base_config().with_operation_timeout_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: DirectoryConfig = serde_json::from_str(
            r#"{
                "host": "ldap.example.com",
                "base_dn": "dc=example,dc=com",
                "attributes": ["mail", "givenName"],
                "bind": {"bind_dn": "cn=admin,dc=example,dc=com", "bind_password": "secret"},
                "user_filter": "(uid={username})",
                "group_filter": "(memberUid={username})"
            }"#,
        )
        .unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.tls_verify);
        assert_eq!(config.base_dn.as_str(), "dc=example,dc=com");
        assert_eq!(config.attributes, ["mail", "givenName"]);
        assert_eq!(
            config.bind.as_ref().map(BindCredentials::bind_dn),
            Some("cn=admin,dc=example,dc=com")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn serialization_omits_credentials() {
        let config = base_config().with_bind(BindCredentials::new("cn=admin", "secret"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("bind_dn"));
    }
}
