//! Directory client implementation.

use crate::{
    access,
    config::DirectoryConfig,
    dn::DistinguishedName,
    user::UserRecord,
    Result,
};
use async_trait::async_trait;
use dirgate_core::error::Error;
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use native_tls::{Certificate, Identity, TlsConnector};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use validator::Validate;

/// Attribute holding a group's common name.
const GROUP_NAME_ATTRIBUTE: &str = "cn";

/// Directory entry as returned from a search.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (value order preserved from the server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .get(attribute)
            .map(|values| values.as_slice())
    }
}

/// Typed failure for each step of the authentication sequence.
///
/// Failures past the search step carry the resolved [`UserRecord`] so
/// callers can log which entry was matched; see [`AuthError::record`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The username or password was empty. Rejected before any directory
    /// operation.
    #[error("invalid user or password")]
    EmptyCredentials,

    /// Binding with the service account failed.
    #[error("service account bind failed: {0}")]
    ServiceBind(#[source] Error),

    /// The user search failed at the protocol level.
    #[error("user search failed: {0}")]
    Search(#[source] Error),

    /// No entry matched the user filter.
    #[error("user `{0}` does not exist")]
    NotFound(String),

    /// More than one entry matched the user filter.
    #[error("user filter matched {count} entries for `{username}`")]
    Ambiguous {
        /// Username the filter was rendered with.
        username: String,
        /// Number of entries matched.
        count: usize,
    },

    /// Binding as the resolved user was rejected, i.e. the password is
    /// wrong.
    #[error("credential verification failed for `{}`", .record.dn())]
    InvalidCredentials {
        /// Entry the user resolved to before verification failed.
        record: UserRecord,
        /// Underlying bind failure.
        source: Error,
    },

    /// Re-binding as the service account after verification failed, leaving
    /// the session in an unusable state.
    #[error("service rebind failed after verifying `{}`", .record.dn())]
    Rebind {
        /// Entry that was successfully verified.
        record: UserRecord,
        /// Underlying bind failure.
        source: Error,
    },

    /// Resolving the user's groups failed.
    #[error("group lookup failed: {0}")]
    GroupLookup(#[source] Error),

    /// The user authenticated but belongs to none of the allowed groups.
    #[error("user `{}` belongs to none of the allowed groups", .record.dn())]
    Forbidden {
        /// Entry that was successfully verified.
        record: UserRecord,
        /// Groups the user does belong to.
        groups: Vec<String>,
    },
}

impl AuthError {
    /// Attribute data resolved before the failure, when any was.
    #[must_use]
    pub fn record(&self) -> Option<&UserRecord> {
        match self {
            Self::InvalidCredentials { record, .. }
            | Self::Rebind { record, .. }
            | Self::Forbidden { record, .. } => Some(record),
            _ => None,
        }
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmptyCredentials => {
                Self::InvalidCredentials("empty username or password".to_string())
            }
            AuthError::ServiceBind(source)
            | AuthError::Search(source)
            | AuthError::GroupLookup(source) => source,
            AuthError::NotFound(username) => Self::NotFound(format!("user `{username}`")),
            AuthError::Ambiguous { username, count } => {
                Self::AmbiguousMatch(format!("{count} entries for user `{username}`"))
            }
            AuthError::InvalidCredentials { record, .. } => {
                Self::InvalidCredentials(record.dn().to_string())
            }
            AuthError::Rebind { source, .. } => Self::RebindFailed(source.to_string()),
            AuthError::Forbidden { record, .. } => Self::Forbidden(record.dn().to_string()),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>>;
    async fn unbind(&mut self) -> Result<()>;
}

/// Directory client owning one LDAP session.
///
/// Every authenticate call may rebind the shared session identity, so calls
/// take `&mut self` and one client must never be shared across concurrent
/// requests. The connection is opened by [`DirectoryClient::connect`] and
/// released exactly once by [`DirectoryClient::close`].
pub struct DirectoryClient {
    config: DirectoryConfig,
    session: Box<dyn LdapSession>,
}

impl DirectoryClient {
    /// Dials the configured directory server and wraps the live session.
    ///
    /// Negotiates StartTLS when the configuration asks for it, honoring the
    /// verification policy, CA certificate, and client identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for an invalid configuration and
    /// [`Error::ConnectionFailed`] when the server cannot be reached.
    pub async fn connect(config: DirectoryConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint_url()?;
        let settings = build_conn_settings(&config)?;

        let (conn, ldap) = LdapConnAsync::with_settings(settings, endpoint.as_str())
            .await
            .map_err(|err| Error::ConnectionFailed(err.to_string()))?;
        ldap3::drive!(conn);

        debug!(
            host = %config.host,
            port = config.port,
            use_tls = config.use_tls,
            "connected to directory server"
        );

        let operation_timeout = config.operation_timeout();
        Ok(Self {
            session: Box::new(RealLdapSession {
                inner: ldap,
                operation_timeout,
            }),
            config,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_session(config: DirectoryConfig, session: Box<dyn LdapSession>) -> Self {
        Self { config, session }
    }

    /// Authenticates a user, returning their resolved entry on success.
    ///
    /// Runs the full sequence: optional service-account bind, user search
    /// under the base DN requiring exactly one match, bind as the resolved
    /// entry to verify the password, then service-account rebind to restore
    /// a consistent session identity for subsequent queries.
    ///
    /// # Errors
    ///
    /// Each step fails with its own [`AuthError`] variant; verification and
    /// rebind failures still carry the resolved entry.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> std::result::Result<UserRecord, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::EmptyCredentials);
        }

        self.bind_service_account()
            .await
            .map_err(AuthError::ServiceBind)?;

        let filter = self.config.user_filter.render(username);
        let entries = self
            .session
            .search(self.config.base_dn.as_str(), &filter, &self.config.attributes)
            .await
            .map_err(AuthError::Search)?;

        let entry = match entries.as_slice() {
            [] => return Err(AuthError::NotFound(username.to_string())),
            [entry] => entry,
            matched => {
                return Err(AuthError::Ambiguous {
                    username: username.to_string(),
                    count: matched.len(),
                })
            }
        };
        let record =
            parse_user_record(entry, &self.config.attributes).map_err(AuthError::Search)?;

        // Bind as the resolved entry to verify the password.
        if let Err(source) = self.session.simple_bind(record.dn().as_str(), password).await {
            return Err(AuthError::InvalidCredentials { record, source });
        }

        // Restore the service identity for any further queries.
        if let Err(source) = self.bind_service_account().await {
            return Err(AuthError::Rebind { record, source });
        }

        debug!(user = %record.dn(), "authenticated directory user");
        Ok(record)
    }

    /// Returns the common names of the groups matching the group filter for
    /// the user, in server order. No match is an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Surfaces directory protocol errors verbatim.
    pub async fn groups_of_user(&mut self, username: &str) -> Result<Vec<String>> {
        let filter = self.config.group_filter.render(username);
        let entries = self
            .session
            .search(
                self.config.base_dn.as_str(),
                &filter,
                &[GROUP_NAME_ATTRIBUTE.to_string()],
            )
            .await?;

        let mut groups = Vec::with_capacity(entries.len());
        for entry in &entries {
            match entry.first(GROUP_NAME_ATTRIBUTE) {
                Some(name) => groups.push(name.to_string()),
                None => warn!(dn = %entry.dn, "group entry without a common name, skipping"),
            }
        }

        debug!(username, groups = groups.len(), "resolved group memberships");
        Ok(groups)
    }

    /// Authenticates the user and requires membership in at least one of the
    /// allowed groups.
    ///
    /// # Errors
    ///
    /// Fails like [`DirectoryClient::authenticate`], plus
    /// [`AuthError::GroupLookup`] when the group search fails and
    /// [`AuthError::Forbidden`] when the allow-list intersection is empty.
    pub async fn authorize<A>(
        &mut self,
        username: &str,
        password: &str,
        allowed: &[A],
    ) -> std::result::Result<UserRecord, AuthError>
    where
        A: AsRef<str>,
    {
        let record = self.authenticate(username, password).await?;
        let groups = self
            .groups_of_user(username)
            .await
            .map_err(AuthError::GroupLookup)?;

        if access::member_of_any(&groups, allowed) {
            Ok(record)
        } else {
            Err(AuthError::Forbidden { record, groups })
        }
    }

    /// Releases the connection, unbinding the session.
    ///
    /// Consumes the client so the connection is closed exactly once.
    ///
    /// # Errors
    ///
    /// Surfaces protocol errors from the unbind.
    pub async fn close(mut self) -> Result<()> {
        self.session.unbind().await
    }

    async fn bind_service_account(&mut self) -> Result<()> {
        if let Some(bind) = &self.config.bind {
            self.session
                .simple_bind(bind.bind_dn(), bind.bind_password())
                .await?;
        }
        Ok(())
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = timeout(self.operation_timeout, self.inner.simple_bind(dn, password))
            .await
            .map_err(|_| Error::Timeout("directory bind timed out".to_string()))?
            .map_err(|err| map_ldap_error("bind", &err))?;
        result.success().map_err(|err| map_ldap_error("bind", &err))?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>> {
        let result = timeout(
            self.operation_timeout,
            self.inner
                .search(base_dn, Scope::Subtree, filter, attributes.to_vec()),
        )
        .await
        .map_err(|_| Error::Timeout("directory search timed out".to_string()))?
        .map_err(|err| map_ldap_error("search", &err))?;

        let (entries, _) = result
            .success()
            .map_err(|err| map_ldap_error("search", &err))?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        timeout(self.operation_timeout, self.inner.unbind())
            .await
            .map_err(|_| Error::Timeout("directory unbind timed out".to_string()))?
            .map_err(|err| map_ldap_error("unbind", &err))?;
        Ok(())
    }
}

fn build_conn_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.connect_timeout());
    if !config.use_tls {
        return Ok(settings);
    }

    settings = settings.set_starttls(true);
    let mut builder = TlsConnector::builder();

    if !config.tls_verify {
        builder.danger_accept_invalid_certs(true);
        settings = settings.set_no_tls_verify(true);
    } else if let Some(cert_path) = &config.tls_ca_cert {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid CA certificate: {err}")))?;
        builder.add_root_certificate(certificate);
    }

    if let Some(identity) = &config.client_identity {
        let cert = fs::read(&identity.cert).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read client certificate {}: {err}",
                identity.cert.display()
            ))
        })?;
        let key = fs::read(&identity.key).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read client key {}: {err}",
                identity.key.display()
            ))
        })?;
        let identity = Identity::from_pkcs8(&cert, &key)
            .map_err(|err| Error::ConfigError(format!("invalid client certificate: {err}")))?;
        builder.identity(identity);
    }

    let connector = builder
        .build()
        .map_err(|err| Error::ConfigError(format!("failed to construct TLS connector: {err}")))?;
    Ok(settings.set_connector(connector))
}

fn map_ldap_error(operation: &str, err: &ldap3::LdapError) -> Error {
    Error::Directory {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

fn parse_user_record(entry: &DirectoryEntry, attributes: &[String]) -> Result<UserRecord> {
    let dn = DistinguishedName::parse(&entry.dn)?;

    let mut values = HashMap::with_capacity(attributes.len());
    for attribute in attributes {
        if let Some(value) = entry.first(attribute) {
            values.insert(attribute.clone(), value.to_string());
        }
    }

    Ok(UserRecord::new(dn, values))
}
