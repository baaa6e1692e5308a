//! LDAP directory authentication for dirgate.
//!
//! This crate wraps a single LDAP session behind a typed client that runs the
//! service bind / user search / user bind / service rebind sequence to verify
//! credentials, resolves the user's group memberships, and evaluates group
//! allow-lists.

#![deny(missing_docs)]

mod access;
mod client;
mod config;
mod dn;
mod filter;
mod user;

pub use access::member_of_any;
pub use client::{AuthError, DirectoryClient, DirectoryEntry};
pub use config::{
    ClientIdentity, DirectoryConfig, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_PORT,
};
pub use dn::{DistinguishedName, DnError, Rdn};
pub use filter::{escape_filter_value, FilterTemplate, FilterTemplateError, USERNAME_PLACEHOLDER};
pub use user::{UserRecord, DN_ATTRIBUTE};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = dirgate_core::Result<T>;
